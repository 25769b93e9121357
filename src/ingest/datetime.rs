//! Day-first date/time parsing for spreadsheet exports
//!
//! Survey loggers and hand-edited spreadsheets mix formats freely, so every
//! supported layout is tried in turn. Ambiguous numeric dates are read
//! day-first (`03/04/2024` is 3 April).

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// Layouts carrying both date and time. Two-digit-year layouts come before
/// their four-digit twins: `%Y` also accepts two digits.
const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%y %H:%M:%S",
    "%d/%m/%y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%y %H:%M:%S",
    "%d-%m-%y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d.%m.%y %H:%M:%S",
    "%d.%m.%y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
];

/// Date-only layouts; the time is taken as midnight.
const DATE_FORMATS: &[&str] = &[
    "%d/%m/%y",
    "%d-%m-%y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%y",
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%y",
    "%d-%b-%Y",
];

/// Parse a cell as a timestamp, or `None` when no layout matches.
///
/// Bare numbers are rejected: a displacement reading like `0.25` must never
/// be mistaken for a date.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim().trim_matches('"').trim();

    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("nat") {
        return None;
    }
    if s.parse::<f64>().is_ok() {
        return None;
    }

    // ISO 8601 / RFC 3339 with offset: keep the wall-clock reading
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.naive_local());
    }

    // Trailing "Z" with no offset
    let s = s.strip_suffix('Z').unwrap_or(s);

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd_hms(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|d| d.and_hms_opt(h, mi, s))
            .unwrap()
    }

    #[test]
    fn test_day_first_slash() {
        assert_eq!(parse_datetime("03/04/2024"), Some(ymd_hms(2024, 4, 3, 0, 0, 0)));
    }

    #[test]
    fn test_day_first_with_time() {
        assert_eq!(
            parse_datetime("25/12/2023 14:30"),
            Some(ymd_hms(2023, 12, 25, 14, 30, 0))
        );
    }

    #[test]
    fn test_two_digit_year() {
        assert_eq!(parse_datetime("01/02/23"), Some(ymd_hms(2023, 2, 1, 0, 0, 0)));
    }

    #[test]
    fn test_two_digit_year_dash_and_dot() {
        assert_eq!(
            parse_datetime("01-02-23 14:30"),
            Some(ymd_hms(2023, 2, 1, 14, 30, 0))
        );
        assert_eq!(
            parse_datetime("01-02-23 14:30:05"),
            Some(ymd_hms(2023, 2, 1, 14, 30, 5))
        );
        assert_eq!(
            parse_datetime("01.02.23 08:15"),
            Some(ymd_hms(2023, 2, 1, 8, 15, 0))
        );
        assert_eq!(parse_datetime("01.02.23"), Some(ymd_hms(2023, 2, 1, 0, 0, 0)));
        assert_eq!(
            parse_datetime("01.02.2023 08:15"),
            Some(ymd_hms(2023, 2, 1, 8, 15, 0))
        );
    }

    #[test]
    fn test_iso_formats() {
        assert_eq!(
            parse_datetime("2024-06-01T08:15:00"),
            Some(ymd_hms(2024, 6, 1, 8, 15, 0))
        );
        assert_eq!(parse_datetime("2024-06-01"), Some(ymd_hms(2024, 6, 1, 0, 0, 0)));
        assert_eq!(
            parse_datetime("2024-06-01T08:15:00Z"),
            Some(ymd_hms(2024, 6, 1, 8, 15, 0))
        );
    }

    #[test]
    fn test_rfc3339_keeps_wall_clock() {
        assert_eq!(
            parse_datetime("2024-06-01T08:15:00+01:00"),
            Some(ymd_hms(2024, 6, 1, 8, 15, 0))
        );
    }

    #[test]
    fn test_month_names() {
        assert_eq!(parse_datetime("5 Mar 2024"), Some(ymd_hms(2024, 3, 5, 0, 0, 0)));
        assert_eq!(parse_datetime("05-Mar-2024"), Some(ymd_hms(2024, 3, 5, 0, 0, 0)));
    }

    #[test]
    fn test_numbers_are_not_dates() {
        assert_eq!(parse_datetime("0.25"), None);
        assert_eq!(parse_datetime("20240101"), None);
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("NaN"), None);
        assert_eq!(parse_datetime("sensor offline"), None);
        assert_eq!(parse_datetime("31/02/2024"), None);
    }
}
