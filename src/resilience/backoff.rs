//! Linear backoff between retry attempts.

use std::time::Duration;

/// Delay to wait after failed attempt number `attempt` (1-based).
///
/// Grows linearly: `step * attempt`. Attempt 0 yields no delay.
pub fn linear_backoff(attempt: u32, step: Duration) -> Duration {
    step.saturating_mul(attempt)
}
