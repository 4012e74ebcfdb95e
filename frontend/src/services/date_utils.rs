use chrono::{DateTime, NaiveDate, Utc};

/// Render an RFC 3339 timestamp as `Tue, 14 Jun 2022 09:30:00` (UTC).
/// Anything that does not parse is returned unchanged.
pub fn format_absence_date_time(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(parsed) => parsed
            .with_timezone(&Utc)
            .format("%a, %d %b %Y %H:%M:%S")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Render a `YYYY-MM-DD` date of birth as e.g. "December 10, 2015".
pub fn format_date_of_birth(raw: &str) -> String {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => date.format("%B %-d, %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Sort key for a timestamp; unparseable values sort after every valid one.
pub(crate) fn timestamp_key(raw: &str) -> (bool, Option<DateTime<Utc>>) {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(parsed) => (false, Some(parsed.with_timezone(&Utc))),
        Err(_) => (true, None),
    }
}
