//! Helpers for turning loosely typed upstream values into model fields.
//!
//! Upstream APIs report counts as signed (Reddit karma can go negative) or
//! floating-point numbers, and timestamps as unix seconds or milliseconds.
//! Model counters are unsigned, so negatives clamp to zero here.

use chrono::{DateTime, Utc};

pub fn clamp_u32(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

pub fn clamp_u64(value: i64) -> u64 {
    value.max(0) as u64
}

/// Clamp a percentage into `0.0..=100.0`; non-finite values become `0.0`.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

pub fn from_unix_secs(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// Unix seconds with a fractional part, as Reddit reports them.
pub fn from_unix_secs_f64(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp(secs.trunc() as i64, 0)
}

pub fn from_unix_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// The first line of `text`, cut to `max_chars` characters.
pub fn first_line(text: &str, max_chars: usize) -> String {
    text.lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(max_chars)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamps() {
        assert_eq!(clamp_u32(-5), 0);
        assert_eq!(clamp_u32(42), 42);
        assert_eq!(clamp_u32(i64::MAX), u32::MAX);
        assert_eq!(clamp_u64(-1), 0);
        assert_eq!(clamp_percent(130.0), 100.0);
        assert_eq!(clamp_percent(f64::NAN), 0.0);
    }

    #[test]
    fn test_timestamps() {
        assert_eq!(
            from_unix_secs(0).map(|t| t.to_rfc3339()),
            Some("1970-01-01T00:00:00+00:00".to_string())
        );
        assert_eq!(from_unix_secs_f64(1.9), from_unix_secs(1));
        assert_eq!(from_unix_millis(1_000), from_unix_secs(1));
        assert_eq!(from_unix_secs_f64(f64::INFINITY), None);
    }

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("fix: parser\n\nlong body", 80), "fix: parser");
        assert_eq!(first_line("abcdef", 3), "abc");
        assert_eq!(first_line("", 3), "");
    }
}
