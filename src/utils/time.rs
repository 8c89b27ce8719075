use chrono::{DateTime, Local, NaiveDate, Utc};

/// Calendar date of an instant as seen on the local clock. "Today" comparisons go through this so
/// that daily aggregates follow the user's wall calendar rather than a rolling 24 hour window.
pub fn local_date(moment: DateTime<Utc>) -> NaiveDate {
    moment.with_timezone(&Local).date_naive()
}

/// Whole seconds between two instants, rounded down. A negative span yields zero.
pub fn whole_seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> chrono::Duration {
    let millis = (end - start).num_milliseconds().max(0);
    chrono::Duration::seconds(millis / 1000)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::whole_seconds_between;

    #[test]
    fn whole_seconds_round_down() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let end = start + Duration::milliseconds(125_999);
        assert_eq!(whole_seconds_between(start, end), Duration::seconds(125));
    }

    #[test]
    fn backwards_span_is_zero() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let end = start - Duration::seconds(3);
        assert_eq!(whole_seconds_between(start, end), Duration::zero());
    }
}
