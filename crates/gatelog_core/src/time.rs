//! Timestamp helpers shared by both store backends.
//!
//! All timestamps are RFC 3339 UTC strings with millisecond precision
//! ("2024-01-01T08:00:00.000Z"). The string form sorts lexicographically
//! in chronological order, which the descending-order queries rely on.

use chrono::{SecondsFormat, Utc};

/// Returns the current instant as an RFC 3339 UTC string.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Returns today's UTC calendar day as `YYYY-MM-DD`.
pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Extracts the calendar-day prefix (`YYYY-MM-DD`) of a stored timestamp.
///
/// Range filtering compares calendar days as strings, so a record stamped
/// at 23:59:59 on the range's last day is still included.
pub fn date_of(timestamp: &str) -> &str {
    // Caller-supplied timestamps are not validated on insert, so the
    // prefix slice must tolerate arbitrary (even non-ASCII) input.
    timestamp.get(..10).unwrap_or(timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_iso_shape() {
        let ts = now_iso();
        assert!(ts.ends_with('Z'));
        assert_eq!(date_of(&ts).len(), 10);
    }

    #[test]
    fn date_prefix() {
        assert_eq!(date_of("2024-01-01T08:00:00.000Z"), "2024-01-01");
        assert_eq!(date_of("short"), "short");
    }

    #[test]
    fn date_of_tolerates_non_ascii_input() {
        // Byte offset 10 lands inside the two-byte "é"; the whole
        // string comes back instead of panicking on the split.
        let odd = "123456789éxx";
        assert_eq!(date_of(odd), odd);
    }

    #[test]
    fn iso_strings_sort_chronologically() {
        let earlier = "2024-01-01T08:00:00.000Z";
        let later = "2024-01-01T09:30:00.000Z";
        assert!(earlier < later);
    }
}
