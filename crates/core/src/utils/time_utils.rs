use chrono::{DateTime, DurationRound, TimeDelta, Utc};

/// Start of the UTC hour containing `instant`.
///
/// This is the value stored as the hourly usage reset timestamp.
pub fn hour_window_start(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .duration_trunc(TimeDelta::hours(1))
        .unwrap_or(instant)
}

/// Start of the UTC day containing `instant`.
pub fn day_window_start(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .duration_trunc(TimeDelta::days(1))
        .unwrap_or(instant)
}

/// Fractional minutes from `earlier` to `later`; negative if the order is reversed.
pub fn minutes_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 60_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_starts() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 13, 47, 12).unwrap();
        assert_eq!(
            hour_window_start(instant),
            Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap()
        );
        assert_eq!(
            day_window_start(instant),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_window_start_is_idempotent_on_boundary() {
        let boundary = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();
        assert_eq!(hour_window_start(boundary), boundary);
    }

    #[test]
    fn test_minutes_between() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 3, 1, 12, 4, 30).unwrap();
        assert_eq!(minutes_between(start, later), 4.5);
        assert_eq!(minutes_between(later, start), -4.5);
    }
}
