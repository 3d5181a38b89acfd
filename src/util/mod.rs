//! Utility functions shared across the service.

mod secret;

pub use secret::SecretString;

use rand::Rng;
use std::time::Duration;

/// Upper bound on any single backoff sleep
const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// Exponential backoff with full jitter.
///
/// `attempt` starts at 1 for the first retry. The returned delay is drawn
/// uniformly from `[0, base * 2^(attempt-1)]`, capped at two seconds, so
/// concurrent losers of the same conditional write do not retry in lockstep.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    let ceiling = base.saturating_mul(1u32 << exp).min(MAX_BACKOFF);
    let millis = ceiling.as_millis() as u64;
    if millis == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=millis))
}
