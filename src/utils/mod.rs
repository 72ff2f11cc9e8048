//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;
pub mod retry;

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};

/// Maximum number of characters of a response body kept in logs and outcomes
pub const BODY_PREVIEW_CHARS: usize = 400;

/// Western Indonesia Time (UTC+07:00), the zone the backend publishes timestamps in
pub const WIB_OFFSET_SECS: i32 = 7 * 3600;

/// Fixed offset for Western Indonesia Time
pub fn wib() -> FixedOffset {
    FixedOffset::east_opt(WIB_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Parse a backend timestamp (`YYYY-MM-DD HH:mm[:ss]` or `YYYY-MM-DD`) as WIB
///
/// Returns `None` for empty or malformed input. A date without a time is
/// taken as midnight WIB.
pub fn parse_wib_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let naive = match trimmed.split_once(' ') {
        Some((date, time)) => {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
            let time = NaiveTime::parse_from_str(time.trim(), "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M"))
                .ok()?;
            NaiveDateTime::new(date, time)
        }
        None => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?,
    };

    wib()
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Current month in WIB as `YYYY-MM`, the listing filter format
pub fn current_wib_month(now: DateTime<Utc>) -> String {
    now.with_timezone(&wib()).format("%Y-%m").to_string()
}

/// Truncate text to a maximum number of characters
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

/// Shorten a response body for logging
pub fn body_preview(body: &str) -> String {
    truncate_text(body, BODY_PREVIEW_CHARS)
}
