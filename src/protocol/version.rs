//! Protocol version negotiation.
//!
//! # Responsibilities
//! - Compare dotted version strings numerically, component by component
//! - Walk the client's downgrade chain to find a mutually supported version
//!
//! # Design Decisions
//! - Comparison is purely numeric with zero-padding ("2" > "1.9")
//! - The downgrade chain is code, not config: adding a protocol version is
//!   a deliberate compatibility decision
//! - A server advertising a newer version in the same major line is assumed
//!   backward compatible; a newer major line is treated as incompatible

use std::cmp::Ordering;

use crate::error::{EngineResult, Fault};

/// The protocol version this client speaks natively.
pub const CLIENT_PROTOCOL_VERSION: &str = "2.0";

/// The next older version a given version can step down to.
pub fn predecessor(version: &str) -> Option<&'static str> {
    match version {
        "2.0" => Some("1.1"),
        "1.1" => Some("1.0"),
        _ => None,
    }
}

/// Whether a version appears in the client's downgrade chain.
pub fn is_known_version(version: &str) -> bool {
    let mut current = CLIENT_PROTOCOL_VERSION;
    loop {
        if compare_versions(current, version) == Ordering::Equal {
            return true;
        }
        match predecessor(current) {
            Some(prev) => current = prev,
            None => return false,
        }
    }
}

/// Compare two dotted version strings numerically.
///
/// Missing components are zero-padded; non-numeric components count as 0.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parts_a: Vec<u64> = a.split('.').map(|p| p.parse().unwrap_or(0)).collect();
    let parts_b: Vec<u64> = b.split('.').map(|p| p.parse().unwrap_or(0)).collect();
    let len = parts_a.len().max(parts_b.len());
    for i in 0..len {
        let x = parts_a.get(i).copied().unwrap_or(0);
        let y = parts_b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn major_component(version: &str) -> u64 {
    version.split('.').next().and_then(|p| p.parse().ok()).unwrap_or(0)
}

/// Negotiate a version against a single server-advertised version.
///
/// Exact match wins. A numerically newer server in the same major line is
/// assumed backward compatible, so the client's own version is used. A
/// newer major line, or an older version not reachable through the
/// downgrade chain, is incompatible.
pub fn negotiate_version(client_version: &str, server_version: &str) -> EngineResult<String> {
    match compare_versions(server_version, client_version) {
        Ordering::Equal => return Ok(client_version.to_string()),
        Ordering::Greater => {
            if major_component(server_version) == major_component(client_version) {
                return Ok(client_version.to_string());
            }
        }
        Ordering::Less => {
            let mut current = client_version;
            while let Some(prev) = predecessor(current) {
                if compare_versions(prev, server_version) == Ordering::Equal {
                    return Ok(prev.to_string());
                }
                current = prev;
            }
        }
    }
    Err(Fault::protocol(format!(
        "no compatible protocol version: client {}, server {}",
        client_version, server_version
    ))
    .with_detail("client_version", client_version.into())
    .with_detail("server_version", server_version.into()))
}

/// Negotiate against the full advertised set, preferring an exact match
/// and then the highest mutually supported version.
///
/// An empty set means the discovery layer supplied no version data; the
/// client assumes its own version is understood.
pub fn negotiate_best(client_version: &str, advertised: &[String]) -> EngineResult<String> {
    if advertised.is_empty() {
        return Ok(client_version.to_string());
    }
    if advertised
        .iter()
        .any(|v| compare_versions(v, client_version) == Ordering::Equal)
    {
        return Ok(client_version.to_string());
    }
    // Scan newest-first so the best match wins regardless of the order
    // the server listed its versions in.
    let mut candidates: Vec<&String> = advertised.iter().collect();
    candidates.sort_by(|a, b| compare_versions(b, a));
    let mut last_err = None;
    for server_version in candidates {
        match negotiate_version(client_version, server_version) {
            Ok(version) => return Ok(version),
            Err(e) => last_err = Some(e),
        }
    }
    // advertised is non-empty here, so at least one negotiation ran
    Err(last_err.unwrap_or_else(|| Fault::protocol("no compatible protocol version")))
}
