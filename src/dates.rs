//! Publish-timestamp normalization.
//!
//! Sources report timestamps as ISO-8601 (with or without zone suffix and
//! fractional seconds), RFC-2822 or a bare date. Everything is reduced to the
//! wall-clock `YYYY-MM-DD HH:MM:SS` form stored in the `news` table; zone
//! information is discarded, not converted.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

pub const STORED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("timestamp is missing")]
    Empty,
    #[error("unrecognized timestamp '{0}'")]
    Unrecognized(String),
}

/// Parses a source timestamp strictly; never substitutes the current time.
pub fn normalize(input: &str) -> Result<NaiveDateTime, DateError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DateError::Empty);
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(s, STORED_FORMAT) {
        return Ok(dt);
    }

    if let Some(core) = iso_core(s) {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&core, "%Y-%m-%dT%H:%M:%S") {
            return Ok(dt);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Ok(dt.naive_local());
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }

    Err(DateError::Unrecognized(s.to_string()))
}

pub fn format(dt: &NaiveDateTime) -> String {
    dt.format(STORED_FORMAT).to_string()
}

/// Strips fractional seconds and any zone suffix from an ISO-8601 timestamp,
/// returning `date 'T' HH:MM:SS`. Accepts either `T` or a space as separator.
fn iso_core(s: &str) -> Option<String> {
    let (date, time) = s.split_once(|c: char| c == 'T' || c == ' ')?;
    let end = time
        .find(|c: char| matches!(c, '.' | ',' | 'Z' | 'z' | '+' | '-'))
        .unwrap_or(time.len());
    Some(format!("{date}T{}", time[..end].trim_end()))
}

/// Inclusive calendar-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Lower bound as a stored timestamp string (inclusive).
    pub fn lower_bound(&self) -> String {
        format(&self.start.and_time(NaiveTime::MIN))
    }

    /// Midnight after the last day, as a stored timestamp string (exclusive).
    pub fn upper_bound(&self) -> String {
        let next = self.end.checked_add_days(Days::new(1)).unwrap_or(self.end);
        format(&next.and_time(NaiveTime::MIN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(s: &str) -> String {
        format(&normalize(s).expect("should parse"))
    }

    #[test]
    fn iso_variants_reduce_to_wall_clock() {
        assert_eq!(normalized("2024-10-01T12:34:56Z"), "2024-10-01 12:34:56");
        assert_eq!(normalized("2024-10-01T12:34:56+03:00"), "2024-10-01 12:34:56");
        assert_eq!(normalized("2024-10-01T12:34:56-0500"), "2024-10-01 12:34:56");
        assert_eq!(normalized("2024-10-01T12:34:56.123456Z"), "2024-10-01 12:34:56");
        assert_eq!(normalized("2024-10-01T12:34:56"), "2024-10-01 12:34:56");
    }

    #[test]
    fn rfc2822_keeps_local_time() {
        assert_eq!(
            normalized("Tue, 01 Oct 2024 12:00:00 GMT"),
            "2024-10-01 12:00:00"
        );
        assert_eq!(
            normalized("Tue, 01 Oct 2024 12:00:00 +0300"),
            "2024-10-01 12:00:00"
        );
    }

    #[test]
    fn bare_date_is_midnight() {
        assert_eq!(normalized("2024-09-01"), "2024-09-01 00:00:00");
    }

    #[test]
    fn normalization_is_idempotent_on_its_output() {
        for input in [
            "2024-10-01T12:34:56Z",
            "Tue, 01 Oct 2024 12:00:00 GMT",
            "2025-01-31 23:59:59",
        ] {
            let once = normalized(input);
            assert_eq!(normalized(&once), once);
        }
    }

    #[test]
    fn garbage_is_an_error_not_a_fallback() {
        assert_eq!(normalize(""), Err(DateError::Empty));
        assert_eq!(normalize("   "), Err(DateError::Empty));
        assert!(matches!(
            normalize("yesterday"),
            Err(DateError::Unrecognized(_))
        ));
        assert!(matches!(
            normalize("2024-13-45T99:00:00Z"),
            Err(DateError::Unrecognized(_))
        ));
    }

    #[test]
    fn range_bounds_cover_whole_days() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 30).unwrap(),
        );
        assert_eq!(range.lower_bound(), "2024-09-01 00:00:00");
        assert_eq!(range.upper_bound(), "2024-10-01 00:00:00");
    }
}
