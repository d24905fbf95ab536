//! Formatting utilities for CLI output.

use chrono::{DateTime, Utc};

/// Truncate a string to at most `max_chars` characters, ending in `...`
/// when shortened. Counts characters, so CJK text is cut on boundaries.
///
/// # Examples
///
/// ```
/// use gkr_cli::ui::format::truncate_str;
///
/// assert_eq!(truncate_str("hello", 10), "hello");
/// assert_eq!(truncate_str("hello world", 8), "hello...");
/// ```
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    let count = s.chars().count();
    if count <= max_chars {
        return s.to_string();
    }
    if max_chars <= 3 {
        return ".".repeat(max_chars);
    }
    let kept: String = s.chars().take(max_chars - 3).collect();
    format!("{kept}...")
}

/// Collapse newlines so a summary fits on one table row.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Format a duration in milliseconds: `850µs`, `12.4ms`, `1.52s`.
pub fn format_ms(ms: f64) -> String {
    if ms < 1.0 {
        format!("{:.0}µs", ms * 1000.0)
    } else if ms < 1000.0 {
        format!("{ms:.1}ms")
    } else {
        format!("{:.2}s", ms / 1000.0)
    }
}

/// Format a timestamp as relative time (e.g., "3h ago").
///
/// - Less than 1 hour: "5 mins ago"
/// - Less than 24 hours: "3h ago"
/// - Less than 7 days: "2d ago"
/// - Older: "2025-01-15"
pub fn format_relative_time(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);

    if duration.num_seconds() < 0 {
        return timestamp.format("%Y-%m-%d").to_string();
    }

    if duration.num_minutes() < 1 {
        "just now".to_string()
    } else if duration.num_hours() < 1 {
        format!("{} mins ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{}h ago", duration.num_hours())
    } else if duration.num_days() < 7 {
        format!("{}d ago", duration.num_days())
    } else {
        timestamp.format("%Y-%m-%d").to_string()
    }
}

/// Relative time for an RFC 3339 string from index metadata; `-` if absent
/// or unparseable.
pub fn format_rfc3339_relative(timestamp: Option<&str>) -> String {
    timestamp
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| format_relative_time(t.with_timezone(&Utc)))
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello", 5), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hello", 3), "...");
        assert_eq!(truncate_str("胆汁泰坦的弱点在头部", 6), "胆汁泰...");
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("Weak point:\n  head\tand sacs"), "Weak point: head and sacs");
    }

    #[test]
    fn test_format_ms() {
        assert_eq!(format_ms(0.25), "250µs");
        assert_eq!(format_ms(12.44), "12.4ms");
        assert_eq!(format_ms(1520.0), "1.52s");
    }

    #[test]
    fn test_relative_time() {
        assert_eq!(format_relative_time(Utc::now()), "just now");
        assert_eq!(format_relative_time(Utc::now() - Duration::hours(3)), "3h ago");

        let stamp = (Utc::now() - Duration::days(2)).to_rfc3339();
        assert_eq!(format_rfc3339_relative(Some(&stamp)), "2d ago");
        assert_eq!(format_rfc3339_relative(Some("yesterday")), "-");
        assert_eq!(format_rfc3339_relative(None), "-");
    }
}
