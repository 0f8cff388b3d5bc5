//! Human-readable sizes, durations and timestamps

use chrono::{DateTime, Duration, Local};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Format a file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format time elapsed, e.g. "5 minutes ago" or "yesterday"
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.num_seconds().max(0);
    let days = elapsed.num_days().max(0);

    match days {
        0 if seconds < 60 => format!("{} seconds ago", seconds),
        0 if seconds < 3600 => format!("{} minutes ago", seconds / 60),
        0 => format!("{} hours ago", seconds / 3600),
        1 => "yesterday".to_string(),
        _ => format!("{} days ago", days),
    }
}

/// Format a timestamp along with the time elapsed since then
///
/// `None` is shown as "never".
pub fn format_timestamp(time: Option<DateTime<Local>>, now: DateTime<Local>) -> String {
    match time {
        Some(time) => format!(
            "{} ({})",
            time.format(TIMESTAMP_FORMAT),
            format_elapsed(now.signed_duration_since(time))
        ),
        None => "never".to_string(),
    }
}
