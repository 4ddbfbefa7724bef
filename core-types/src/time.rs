use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse a user-supplied UTC instant.
///
/// Accepts a plain ISO date (`2019-06-01`, midnight UTC), an RFC 3339
/// datetime (`2019-06-01T00:02:00Z`), or a naive datetime assumed UTC.
pub fn parse_utc_instant(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    None
}

/// Truncate an instant to the start of its UTC minute.
pub fn floor_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    let secs = ts.timestamp().div_euclid(60) * 60;
    DateTime::from_timestamp(secs, 0).unwrap_or(ts)
}
