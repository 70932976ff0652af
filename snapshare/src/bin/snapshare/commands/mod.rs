pub mod chat;
pub mod feed;
pub mod graph;
pub mod notifications;
pub mod users;

use chrono::{DateTime, Local, Utc};

/// Timestamps in the operator's local time, minute precision.
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Cuts `text` to `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
