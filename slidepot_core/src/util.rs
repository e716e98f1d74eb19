//! Time helpers shared by the control loops.

use std::time::Duration;

/// Milliseconds in a duration, saturating at `u64::MAX`.
#[inline]
pub fn duration_ms(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}

/// Seconds to a `Duration`: negative or NaN input maps to zero and
/// overflow saturates at `Duration::MAX`.
#[inline]
pub fn secs_to_duration(secs: f32) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f32(secs).unwrap_or(Duration::MAX)
}
