//! Time formatting utilities for scheduler output.

use chrono::{SecondsFormat, TimeZone, Utc};

/// Format elapsed seconds as "H:MM:SS".
///
/// Hours carry no leading zero; minutes and seconds are zero-padded.
pub fn format_elapsed(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let mins = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{}:{:02}:{:02}", hours, mins, secs)
}

/// Format a time limit given in minutes.
///
/// Returns "D-HH:MM:SS" for limits of a day or more, "HH:MM:SS" otherwise,
/// and "N/A" for unset or non-positive limits.
pub fn format_time_limit(minutes: i64) -> String {
    if minutes <= 0 {
        return "N/A".to_string();
    }
    let days = minutes / 1440;
    let hours = (minutes % 1440) / 60;
    let mins = minutes % 60;
    if days > 0 {
        format!("{}-{:02}:{:02}:00", days, hours, mins)
    } else {
        format!("{:02}:{:02}:00", hours, mins)
    }
}

/// Convert epoch seconds to an RFC-3339 timestamp, or "N/A" for epoch <= 0.
pub fn epoch_to_rfc3339(epoch: i64) -> String {
    if epoch <= 0 {
        return "N/A".to_string();
    }
    match Utc.timestamp_opt(epoch, 0).single() {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        None => "N/A".to_string(),
    }
}
