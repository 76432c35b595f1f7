//! Lightweight UTC wall-clock utilities (no chrono dependency).
//!
//! Wall times are Unix milliseconds. Conversion to and from ISO-8601 uses
//! Howard Hinnant's civil calendar algorithms.

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub type WallTime = u64;

/// Latest wall time with a four-digit ISO-8601 year: 9999-12-31T23:59:59.999Z
pub const MAX_WALL_TIME: WallTime = 253_402_300_799_999;

/// Current UTC time as Unix milliseconds.
pub fn now_unix_millis() -> WallTime {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Convert Unix milliseconds to an ISO-8601 UTC string with millisecond precision.
pub fn millis_to_iso8601(millis: WallTime) -> String {
    let secs = millis / 1000;
    let ms = millis % 1000;
    let days = (secs / 86400) as i64;
    let time_of_day = secs % 86400;
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;

    let (y, m, d) = civil_from_days(days);
    format!("{y:04}-{m:02}-{d:02}T{hours:02}:{minutes:02}:{seconds:02}.{ms:03}Z")
}

/// Parse `YYYY-MM-DDTHH:MM:SS[.fff]Z` into Unix milliseconds.
///
/// Only the UTC `Z` suffix is accepted. Years outside 1970..=9999 and
/// impossible calendar dates return `None`.
pub fn parse_iso8601(s: &str) -> Option<WallTime> {
    let s = s.strip_suffix('Z')?;
    let (date, time) = s.split_once('T')?;

    let mut date_parts = date.splitn(3, '-');
    let y: i64 = date_parts.next()?.parse().ok()?;
    let m: u64 = date_parts.next()?.parse().ok()?;
    let d: u64 = date_parts.next()?.parse().ok()?;
    if !(1970..=9999).contains(&y) || !(1..=12).contains(&m) {
        return None;
    }
    if d == 0 || d > days_in_month(y, m) {
        return None;
    }

    let (hms, frac) = match time.split_once('.') {
        Some((hms, frac)) => (hms, Some(frac)),
        None => (time, None),
    };
    let mut time_parts = hms.splitn(3, ':');
    let hh: u64 = time_parts.next()?.parse().ok()?;
    let mm: u64 = time_parts.next()?.parse().ok()?;
    let ss: u64 = time_parts.next()?.parse().ok()?;
    if hh > 23 || mm > 59 || ss > 60 {
        return None;
    }

    let ms = match frac {
        Some(f) if !f.is_empty() && f.len() <= 3 && f.bytes().all(|b| b.is_ascii_digit()) => {
            // "5" is 500ms, "05" is 50ms
            let padded = format!("{f:0<3}");
            padded.parse::<u64>().ok()?
        }
        Some(_) => return None,
        None => 0,
    };

    let days = u64::try_from(days_from_civil(y, m, d)).ok()?;
    let secs = days
        .checked_mul(86400)?
        .checked_add(hh * 3600 + mm * 60 + ss)?;
    secs.checked_mul(1000)?.checked_add(ms)
}

fn days_in_month(y: i64, m: u64) -> u64 {
    match m {
        2 if (y % 4 == 0 && y % 100 != 0) || y % 400 == 0 => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Howard Hinnant's civil_from_days: Unix epoch days → (year, month, day).
fn civil_from_days(days: i64) -> (i64, u64, u64) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

/// Howard Hinnant's days_from_civil: (year, month, day) → Unix epoch days.
fn days_from_civil(y: i64, m: u64, d: u64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u64;
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe as i64 - 719468
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_EPOCH_MILLIS;

    #[test]
    fn test_unix_epoch() {
        assert_eq!(millis_to_iso8601(0), "1970-01-01T00:00:00.000Z");
        assert_eq!(parse_iso8601("1970-01-01T00:00:00Z"), Some(0));
    }

    #[test]
    fn test_default_epoch() {
        assert_eq!(
            millis_to_iso8601(DEFAULT_EPOCH_MILLIS),
            "2001-07-08T02:00:00.000Z"
        );
        assert_eq!(
            parse_iso8601("2001-07-08T02:00:00.000Z"),
            Some(DEFAULT_EPOCH_MILLIS)
        );
    }

    #[test]
    fn test_known_date_with_millis() {
        // 2026-02-21T00:00:00Z = 1771632000
        assert_eq!(
            millis_to_iso8601(1_771_632_000_123),
            "2026-02-21T00:00:00.123Z"
        );
        assert_eq!(
            parse_iso8601("2026-02-21T00:00:00.123Z"),
            Some(1_771_632_000_123)
        );
    }

    #[test]
    fn test_short_fraction_is_left_aligned() {
        assert_eq!(parse_iso8601("1970-01-01T00:00:01.5Z"), Some(1_500));
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(parse_iso8601(""), None);
        assert_eq!(parse_iso8601("2026-02-21 00:00:00Z"), None);
        assert_eq!(parse_iso8601("2026-02-21T00:00:00+07:00"), None);
        assert_eq!(parse_iso8601("2026-13-01T00:00:00Z"), None);
        assert_eq!(parse_iso8601("2026-02-21T00:00:00.1234Z"), None);
        assert_eq!(parse_iso8601("1969-12-31T23:59:59Z"), None);
    }

    #[test]
    fn test_huge_year_is_rejected_not_overflowed() {
        assert_eq!(parse_iso8601("9999999999-01-01T00:00:00Z"), None);
        assert_eq!(parse_iso8601("10000-01-01T00:00:00Z"), None);
        assert_eq!(
            parse_iso8601("9999-12-31T23:59:59.999Z"),
            Some(MAX_WALL_TIME)
        );
        assert_eq!(
            millis_to_iso8601(MAX_WALL_TIME),
            "9999-12-31T23:59:59.999Z"
        );
    }

    #[test]
    fn test_day_checked_against_month_length() {
        assert_eq!(parse_iso8601("2026-02-31T00:00:00Z"), None);
        assert_eq!(parse_iso8601("2026-04-31T00:00:00Z"), None);
        assert_eq!(parse_iso8601("2025-02-29T00:00:00Z"), None);
        assert_eq!(parse_iso8601("2100-02-29T00:00:00Z"), None);
        assert!(parse_iso8601("2024-02-29T00:00:00Z").is_some());
        assert!(parse_iso8601("2000-02-29T00:00:00Z").is_some());
        let feb_28 = parse_iso8601("2026-02-28T00:00:00Z").unwrap();
        let mar_01 = parse_iso8601("2026-03-01T00:00:00Z").unwrap();
        assert_eq!(mar_01 - feb_28, 86_400_000);
    }

    #[test]
    fn test_now_is_recent() {
        let ts = millis_to_iso8601(now_unix_millis());
        assert!(ts.starts_with("20"), "timestamp should be this century: {ts}");
    }
}
