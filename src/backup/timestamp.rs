//! Save timestamps
//!
//! Derives the canonical save time of a file set, parses the relative ages and
//! absolute dates accepted by `restore`, and encodes timestamps in archive
//! names.
//!
//! ## Accepted ages
//!
//! - `H:MM` or `H:MM:SS`, e.g. `1:30`
//! - one or more `<number><unit>` terms, with or without a space and
//!   optionally separated by commas or `and`: `30m`, `6 hours`,
//!   `9 hours, 15 minutes`, `1d12h`
//!
//! Units are seconds, minutes, hours, days and weeks. A bare number is
//! rejected rather than guessed at.
//!
//! ## Accepted dates
//!
//! ISO dates and date-times, RFC 3339, month names (`August 3 2020`,
//! `3 Aug 2020`), and bare times (`16:30`, `4:30 PM`) meaning today.
//! Slashed numeric dates are month-first (`03/04/2021` is March 4th); dotted
//! numeric dates are day-first (`04.03.2021` is also March 4th). A date
//! without a time means the end of that day.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use chrono::{
    DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};

use crate::error::{ScummerError, ScummerResult};

/// Timestamp format used in archive names (ISO 8601 basic format)
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Extended ISO 8601 form, accepted when reading archive names
const EXTENDED_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %I:%M %p",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%d.%m.%Y %H:%M",
    "%B %d %Y %H:%M",
    "%b %d %Y %H:%M",
    "%B %d %Y %I:%M %p",
    "%b %d %Y %I:%M %p",
    "%d %B %Y %H:%M",
    "%d %b %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%d.%m.%Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M %p", "%I:%M%p"];

/// Get the most recent modification time of the given files, truncated to
/// whole seconds
///
/// For a save directory with multiple files this is the best indicator of
/// when the save was made, as not every file changes with each save.
pub fn latest_modified<P: AsRef<Path>>(paths: &[P]) -> ScummerResult<DateTime<Local>> {
    let mut latest: Option<SystemTime> = None;

    for path in paths {
        let path = path.as_ref();
        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|e| {
                ScummerError::Io(format!(
                    "Failed to read modification time of {}: {}",
                    path.display(),
                    e
                ))
            })?;
        latest = Some(latest.map_or(modified, |current| current.max(modified)));
    }

    latest
        .map(truncate_to_seconds)
        .ok_or_else(|| ScummerError::EmptySelection("no files to timestamp".into()))
}

/// Convert a filesystem time to local time with sub-second precision dropped
pub fn truncate_to_seconds(time: SystemTime) -> DateTime<Local> {
    let utc: DateTime<Utc> = time.into();
    DateTime::from_timestamp(utc.timestamp(), 0)
        .unwrap_or(utc)
        .with_timezone(&Local)
}

/// Parse a relative age like `1:30`, `2d` or `9 hours, 15 minutes`
pub fn parse_duration(expression: &str) -> ScummerResult<Duration> {
    let invalid = || ScummerError::InvalidAgeExpression(expression.to_string());
    let text = expression.trim().to_lowercase();
    if text.is_empty() {
        return Err(invalid());
    }

    let seconds = if text.contains(':') {
        parse_clock_duration(&text).ok_or_else(invalid)?
    } else {
        parse_unit_terms(&text).ok_or_else(invalid)?
    };

    if !seconds.is_finite() || !(0.0..1e12).contains(&seconds) {
        return Err(invalid());
    }
    Duration::try_seconds(seconds.round() as i64).ok_or_else(invalid)
}

/// `H:MM` or `H:MM:SS`
fn parse_clock_duration(text: &str) -> Option<f64> {
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }

    let mut values = Vec::with_capacity(parts.len());
    for part in &parts {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        values.push(part.parse::<u64>().ok()?);
    }
    if values[1..].iter().any(|v| *v >= 60) {
        return None;
    }

    let hours = values[0] as f64;
    let minutes = values[1] as f64;
    let seconds = values.get(2).copied().unwrap_or(0) as f64;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// One or more `<number><unit>` terms
fn parse_unit_terms(text: &str) -> Option<f64> {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0;
    let mut total = 0.0;
    let mut terms = 0;

    loop {
        while pos < chars.len() && (chars[pos].is_whitespace() || chars[pos] == ',') {
            pos += 1;
        }
        if pos >= chars.len() {
            break;
        }

        let start = pos;
        while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
            pos += 1;
        }
        let number: String = chars[start..pos].iter().collect();
        if number.is_empty() {
            // Allow "1 hour and 30 minutes"
            let word: String = chars[pos..].iter().take_while(|c| c.is_alphabetic()).collect();
            if word == "and" && terms > 0 {
                pos += word.len();
                continue;
            }
            return None;
        }
        let amount: f64 = number.parse().ok()?;

        while pos < chars.len() && chars[pos].is_whitespace() {
            pos += 1;
        }
        let unit_start = pos;
        while pos < chars.len() && chars[pos].is_alphabetic() {
            pos += 1;
        }
        let unit: String = chars[unit_start..pos].iter().collect();

        total += amount * unit_seconds(&unit)?;
        terms += 1;
    }

    (terms > 0).then_some(total)
}

fn unit_seconds(unit: &str) -> Option<f64> {
    let seconds = match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3600.0,
        "d" | "day" | "days" => 86_400.0,
        "w" | "wk" | "wks" | "week" | "weeks" => 604_800.0,
        _ => return None,
    };
    Some(seconds)
}

/// Parse an absolute date/time, resolving bare times against `now`'s date
pub fn parse_date(expression: &str, now: DateTime<Local>) -> ScummerResult<DateTime<Local>> {
    let invalid = || ScummerError::InvalidDateExpression(expression.to_string());

    let text = expression
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        return Err(invalid());
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&text) {
        return Ok(parsed.with_timezone(&Local));
    }

    let naive = parse_naive_datetime(&text, now.date_naive()).ok_or_else(invalid)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(invalid)
}

fn parse_naive_datetime(text: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    if let Some(parsed) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Some(parsed);
    }

    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
    {
        return date.and_hms_opt(23, 59, 59);
    }

    let time_text = with_minutes(text);
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&time_text, fmt).ok())
        .map(|time| today.and_time(time))
}

/// `4 PM` -> `4:00 PM`, so the hour-and-minute time formats apply
fn with_minutes(text: &str) -> String {
    let lower = text.to_lowercase();
    let Some(hour) = lower
        .strip_suffix("am")
        .or_else(|| lower.strip_suffix("pm"))
        .map(str::trim_end)
    else {
        return text.to_string();
    };

    if !hour.is_empty() && hour.len() <= 2 && hour.chars().all(|c| c.is_ascii_digit()) {
        format!("{}:00 {}", hour, &lower[lower.len() - 2..])
    } else {
        text.to_string()
    }
}

/// Format a save time for use in an archive name
pub fn format_archive_timestamp(time: &DateTime<Local>) -> String {
    time.format(ARCHIVE_TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp as written in archive names
///
/// Accepts `YYYYMMDDTHHMMSS`, or the extended `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_archive_timestamp(text: &str) -> Option<DateTime<Local>> {
    let naive = match text.len() {
        15 => parse_basic_timestamp(text)?,
        19 => NaiveDateTime::parse_from_str(text, EXTENDED_TIMESTAMP_FORMAT).ok()?,
        _ => return None,
    };
    Local.from_local_datetime(&naive).earliest()
}

fn parse_basic_timestamp(text: &str) -> Option<NaiveDateTime> {
    if !text.is_ascii() || text.as_bytes()[8] != b'T' {
        return None;
    }
    let digits = |range: std::ops::Range<usize>| -> Option<u32> {
        let part = &text[range];
        if part.chars().all(|c| c.is_ascii_digit()) {
            part.parse().ok()
        } else {
            None
        }
    };

    let year = digits(0..4)? as i32;
    let month = digits(4..6)?;
    let day = digits(6..8)?;
    let hour = digits(9..11)?;
    let minute = digits(11..13)?;
    let second = digits(13..15)?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_opt(hour, minute, second)?;
    Some(NaiveDateTime::new(date, time))
}

/// Find the save timestamp embedded in an archive filename
///
/// The timestamp is the first segment, at the start of the name or right
/// after a `-`, that parses as an archive timestamp.
pub fn find_archive_timestamp(name: &str) -> Option<DateTime<Local>> {
    let bytes = name.as_bytes();
    (0..name.len())
        .filter(|&i| i == 0 || bytes[i - 1] == b'-')
        .filter(|&i| name.is_char_boundary(i))
        .find_map(|i| {
            [15, 19].iter().find_map(|len| {
                name.get(i..i + len).and_then(parse_archive_timestamp)
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::fs::File;
    use std::time::Duration as StdDuration;
    use tempfile::TempDir;

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2021, 3, 22, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_latest_modified_is_max_truncated() {
        let temp = TempDir::new().unwrap();
        let old = temp.path().join("old.sav");
        let new = temp.path().join("new.sav");
        std::fs::write(&old, "a").unwrap();
        std::fs::write(&new, "b").unwrap();

        let base = SystemTime::UNIX_EPOCH + StdDuration::from_secs(1_600_000_000);
        set_mtime(&old, base);
        set_mtime(&new, base + StdDuration::from_millis(90_750));

        let latest = latest_modified(&[old, new]).unwrap();
        assert_eq!(latest.timestamp(), 1_600_000_090);
        assert_eq!(latest.nanosecond(), 0);
    }

    #[test]
    fn test_latest_modified_empty() {
        let files: Vec<std::path::PathBuf> = Vec::new();
        let result = latest_modified(&files);
        assert!(matches!(result, Err(ScummerError::EmptySelection(_))));
    }

    #[test]
    fn test_latest_modified_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = latest_modified(&[temp.path().join("gone.sav")]);
        assert!(matches!(result, Err(ScummerError::Io(_))));
    }

    #[test]
    fn test_parse_clock_durations() {
        assert_eq!(parse_duration("1:30").unwrap(), Duration::minutes(90));
        assert_eq!(parse_duration("9:15").unwrap(), Duration::minutes(9 * 60 + 15));
        assert_eq!(parse_duration("0:00:45").unwrap(), Duration::seconds(45));
    }

    #[test]
    fn test_parse_unit_durations() {
        assert_eq!(parse_duration("30m").unwrap(), Duration::minutes(30));
        assert_eq!(parse_duration("30 minutes").unwrap(), Duration::minutes(30));
        assert_eq!(parse_duration("6h").unwrap(), Duration::hours(6));
        assert_eq!(parse_duration("2d").unwrap(), Duration::days(2));
        assert_eq!(parse_duration("3 Days").unwrap(), Duration::days(3));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::minutes(90));
        assert_eq!(
            parse_duration("9 hours, 15 minutes").unwrap(),
            Duration::minutes(9 * 60 + 15)
        );
        assert_eq!(
            parse_duration("1 hour and 30 minutes").unwrap(),
            Duration::minutes(90)
        );
        assert_eq!(parse_duration("1d12h").unwrap(), Duration::hours(36));
    }

    #[test]
    fn test_parse_invalid_durations() {
        for bad in ["", "soon", "2", "2 fortnights", "1:75", "1:2:3:4", "-2d", "and 2d"] {
            let result = parse_duration(bad);
            assert!(
                matches!(result, Err(ScummerError::InvalidAgeExpression(_))),
                "expected failure for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_parse_absolute_dates() {
        let now = fixed_now();

        let parsed = parse_date("2021-01-20 16:30", now).unwrap();
        assert_eq!((parsed.month(), parsed.day(), parsed.hour()), (1, 20, 16));

        let parsed = parse_date("August 3, 2020", now).unwrap();
        assert_eq!((parsed.year(), parsed.month(), parsed.day()), (2020, 8, 3));
        assert_eq!((parsed.hour(), parsed.minute(), parsed.second()), (23, 59, 59));

        let parsed = parse_date("Mar 22 2021", now).unwrap();
        assert_eq!((parsed.month(), parsed.day()), (3, 22));

        let parsed = parse_date("2021-01-20T00:09:10+00:00", now).unwrap();
        assert_eq!(parsed.timestamp(), 1_611_101_350);
    }

    #[test]
    fn test_day_first_convention() {
        let now = fixed_now();

        let slashed = parse_date("03/04/2021", now).unwrap();
        assert_eq!((slashed.month(), slashed.day()), (3, 4));

        let dotted = parse_date("04.03.2021", now).unwrap();
        assert_eq!((dotted.month(), dotted.day()), (3, 4));
    }

    #[test]
    fn test_parse_time_only_is_today() {
        let now = fixed_now();

        let parsed = parse_date("16:30", now).unwrap();
        assert_eq!(parsed.date_naive(), now.date_naive());
        assert_eq!((parsed.hour(), parsed.minute()), (16, 30));

        let parsed = parse_date("4:30 PM", now).unwrap();
        assert_eq!((parsed.hour(), parsed.minute()), (16, 30));

        let parsed = parse_date("4 pm", now).unwrap();
        assert_eq!((parsed.hour(), parsed.minute()), (16, 0));
    }

    #[test]
    fn test_parse_invalid_dates() {
        for bad in ["", "yesterday-ish", "2021-13-45", "32/01/2021"] {
            let result = parse_date(bad, fixed_now());
            assert!(
                matches!(result, Err(ScummerError::InvalidDateExpression(_))),
                "expected failure for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_archive_timestamp_formats() {
        let time = Local.with_ymd_and_hms(2021, 1, 20, 0, 9, 10).unwrap();
        assert_eq!(format_archive_timestamp(&time), "20210120T000910");
        assert_eq!(parse_archive_timestamp("20210120T000910"), Some(time));
        assert_eq!(parse_archive_timestamp("2021-01-20T00:09:10"), Some(time));
        assert_eq!(parse_archive_timestamp("20211320T000910"), None);
        assert_eq!(parse_archive_timestamp("2021012OT000910"), None);
    }

    #[test]
    fn test_find_archive_timestamp() {
        let time = Local.with_ymd_and_hms(2021, 1, 20, 0, 9, 10).unwrap();

        assert_eq!(find_archive_timestamp("game1-20210120T000910.zip"), Some(time));
        assert_eq!(
            find_archive_timestamp("dark-souls-3-20210120T000910-boss-fight.zip"),
            Some(time)
        );
        assert_eq!(find_archive_timestamp("game1-2021-01-20T00:09:10.zip"), Some(time));
        assert_eq!(find_archive_timestamp("notes.zip"), None);
    }
}
