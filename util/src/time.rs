//! General time utility functions

use std::time::Duration;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a chrono duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration.num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Convert a number of seconds into a `std::time::Duration`.
///
/// Negative and non-finite values are clamped to zero.
pub fn seconds_to_duration(seconds: f64) -> Duration {
    if seconds.is_finite() && seconds > 0.0 {
        Duration::from_secs_f64(seconds)
    }
    else {
        Duration::from_secs(0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_seconds_to_duration() {
        assert_eq!(seconds_to_duration(1.5), Duration::from_millis(1500));
        assert_eq!(seconds_to_duration(-2.0), Duration::from_secs(0));
        assert_eq!(seconds_to_duration(std::f64::NAN), Duration::from_secs(0));
    }

    #[test]
    fn test_duration_to_seconds() {
        let d = chrono::Duration::milliseconds(2500);
        assert_eq!(duration_to_seconds(d), Some(2.5));
    }
}
