//! Label formatting for the now-playing screen

use chrono::{DateTime, TimeZone};
use std::time::Duration;

/// Format an elapsed position as `M:SS`
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!("{}:{:02}", total / 60, total % 60)
}

/// Format a wall-clock time as `HH:mm`
pub fn format_clock<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format("%H:%M").to_string()
}
