//! Retry decision logic.
//!
//! # Responsibilities
//! - Decide whether a failed attempt should be retried
//! - Classify HTTP statuses into retryable and terminal
//!
//! # Design Decisions
//! - Connection-level failures (no status at all) are always retryable
//! - 5xx, 408 and 429 are retryable; any other 4xx is terminal
//! - `attempt_count` is the number of attempts already made; retries stop
//!   once it reaches `max_retries`

/// Whether a status code indicates a transient failure worth retrying.
pub fn is_retryable_status(status: u16) -> bool {
    status >= 500 || status == 408 || status == 429
}

/// Pure retry decision given the outcome of the attempt just made.
///
/// `status` is `None` for connection-level failures that never produced an
/// HTTP response.
pub fn should_retry(status: Option<u16>, attempt_count: u32, max_retries: u32) -> bool {
    if attempt_count >= max_retries {
        return false;
    }
    match status {
        None => true,
        Some(status) => is_retryable_status(status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_5xx_is_retryable() {
        assert!(should_retry(Some(503), 0, 3));
        assert!(should_retry(Some(500), 1, 3));
        assert!(should_retry(Some(502), 2, 3));
    }

    #[test]
    fn test_timeout_and_throttle_statuses_retryable() {
        assert!(should_retry(Some(408), 0, 3));
        assert!(should_retry(Some(429), 0, 3));
    }

    #[test]
    fn test_other_4xx_not_retryable() {
        assert!(!should_retry(Some(404), 0, 3));
        assert!(!should_retry(Some(400), 0, 3));
        assert!(!should_retry(Some(403), 0, 3));
    }

    #[test]
    fn test_connection_failure_retryable() {
        assert!(should_retry(None, 2, 3));
    }

    #[test]
    fn test_exhausted_attempts() {
        assert!(!should_retry(Some(500), 3, 3));
        assert!(!should_retry(None, 3, 3));
        assert!(!should_retry(Some(503), 5, 3));
    }
}
