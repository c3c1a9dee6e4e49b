//! Lenient parsing of the date-time strings exchanged with the issuing backend.
//!
//! Naive values (no offset) are interpreted in the portal's local time zone.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Parses a configured window boundary.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    {
        return local_to_utc(naive);
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| local_to_utc(date.and_time(NaiveTime::MIN)))
}

/// Parses a record timestamp, additionally accepting the 12-hour locale form
/// `2025/6/5 下午3:04:05` the backend writes into its sheet.
pub fn parse_record_timestamp(raw: &str) -> Option<DateTime<Local>> {
    parse_instant(raw)
        .map(|instant| instant.with_timezone(&Local))
        .or_else(|| parse_meridiem(raw.trim()))
}

fn parse_meridiem(raw: &str) -> Option<DateTime<Local>> {
    let (date_part, time_part) = raw.split_once(' ')?;
    let date = NaiveDate::parse_from_str(date_part, "%Y/%m/%d").ok()?;

    let (afternoon, clock) = if let Some(rest) = time_part.strip_prefix("下午") {
        (true, rest)
    } else if let Some(rest) = time_part.strip_prefix("上午") {
        (false, rest)
    } else {
        return None;
    };

    let mut fields = clock.trim().split(':').map(|field| field.parse::<u32>().ok());
    let hour = fields.next()??;
    let minute = fields.next()??;
    let second = fields.next().flatten().unwrap_or(0);
    if fields.next().is_some() || hour > 12 {
        return None;
    }

    let hour = match (afternoon, hour) {
        (false, 12) => 0,
        (true, h) if h < 12 => h + 12,
        (_, h) => h,
    };
    let naive = date.and_hms_opt(hour, minute, second)?;
    Local.from_local_datetime(&naive).earliest()
}

fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse_instant("2024-05-20T00:00:00Z").expect("parses");
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap());
    }

    #[test]
    fn naive_values_are_local() {
        let parsed = parse_instant("2024-01-01T08:30:00").expect("parses");
        let local = parsed.with_timezone(&Local);
        assert_eq!((local.hour(), local.minute()), (8, 30));
    }

    #[test]
    fn accepts_minute_precision_and_bare_dates() {
        assert!(parse_instant("2024-01-01T08:30").is_some());
        let midnight = parse_instant("2024-01-01").expect("bare date parses");
        assert_eq!(midnight.with_timezone(&Local).hour(), 0);
    }

    #[test]
    fn rejects_blank_and_garbage() {
        assert!(parse_instant("").is_none());
        assert!(parse_instant("   ").is_none());
        assert!(parse_instant("next tuesday").is_none());
    }

    #[test]
    fn parses_meridiem_record_timestamps() {
        let afternoon = parse_record_timestamp("2025/6/5 下午3:04:05").expect("pm parses");
        assert_eq!((afternoon.month(), afternoon.day()), (6, 5));
        assert_eq!((afternoon.hour(), afternoon.minute(), afternoon.second()), (15, 4, 5));

        let after_midnight = parse_record_timestamp("2025/6/5 上午12:10:00").expect("am parses");
        assert_eq!(after_midnight.hour(), 0);
    }
}
