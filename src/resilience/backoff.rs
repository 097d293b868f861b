//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Calculate the delay before retry attempt `attempt`.
///
/// `delay = base_ms * 2^(attempt-1)`, capped at `max_ms`, then jittered
/// uniformly within ±5% so concurrent retries against the same endpoint
/// spread out. Attempt 0 (the first attempt) has no delay.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Jitter: uniform in [-5%, +5%] of the computed delay.
    let jitter_span = capped_delay / 20;
    let jittered = if jitter_span > 0 {
        let offset = rand::thread_rng().gen_range(0..=jitter_span * 2);
        capped_delay - jitter_span + offset
    } else {
        capped_delay
    };

    Duration::from_millis(jittered)
}
