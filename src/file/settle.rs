use std::time::{Duration, SystemTime};

use super::FileEvent;

/// Time since the entry was last modified, relative to `now`
///
/// Returns `None` when the platform gave no modification time. A timestamp in
/// the future (clock skew, touched by another host) counts as age zero.
pub fn file_age(event: &FileEvent, now: SystemTime) -> Option<Duration> {
    let modified = event.modified?;
    Some(now.duration_since(modified).unwrap_or(Duration::ZERO))
}

/// Check whether a file has been quiet long enough to be admitted
///
/// Writers that drop files into the input directory may still be writing
/// when a poll lists them. Only files whose modification time is at least
/// `min_age` old are considered complete. Entries without a modification time
/// are admitted, since there is nothing to wait on.
pub fn is_settled(event: &FileEvent, min_age: Duration, now: SystemTime) -> bool {
    if min_age.is_zero() {
        return true;
    }

    match file_age(event, now) {
        Some(age) => age >= min_age,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;

    fn event_modified_at(modified: Option<SystemTime>) -> FileEvent {
        FileEvent {
            path: PathBuf::from("/in/data.csv"),
            name: "data.csv".to_string(),
            extension: "csv".to_string(),
            is_file: true,
            size: 0,
            modified,
            discovered_at: Utc::now(),
        }
    }

    #[test]
    fn test_fresh_file_not_settled() {
        let now = SystemTime::now();
        let event = event_modified_at(Some(now - Duration::from_millis(100)));

        assert!(!is_settled(&event, Duration::from_millis(500), now));
    }

    #[test]
    fn test_old_file_settled() {
        let now = SystemTime::now();
        let event = event_modified_at(Some(now - Duration::from_secs(2)));

        assert!(is_settled(&event, Duration::from_millis(500), now));
    }

    #[test]
    fn test_zero_min_age_always_settled() {
        let now = SystemTime::now();
        let event = event_modified_at(Some(now));

        assert!(is_settled(&event, Duration::ZERO, now));
    }

    #[test]
    fn test_future_mtime_is_age_zero() {
        let now = SystemTime::now();
        let event = event_modified_at(Some(now + Duration::from_secs(60)));

        assert_eq!(file_age(&event, now), Some(Duration::ZERO));
        assert!(!is_settled(&event, Duration::from_millis(1), now));
    }

    #[test]
    fn test_missing_mtime_admitted() {
        let event = event_modified_at(None);
        assert_eq!(file_age(&event, SystemTime::now()), None);
        assert!(is_settled(&event, Duration::from_secs(10), SystemTime::now()));
    }
}
