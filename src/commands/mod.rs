// src/commands/mod.rs
//! Command handlers for the extconv CLI

mod convert;
mod history;
mod inspect;

pub use convert::{cmd_convert, ConvertOptions};
pub use history::{cmd_history_clear, cmd_history_list, cmd_history_remove};
pub use inspect::cmd_inspect;

use anyhow::Result;
use chrono::{DateTime, Utc};
use extconv::history::default_history_path;
use extconv::HistoryStore;
use std::path::PathBuf;

/// Open the history store at `path`, or at the default location
pub fn open_history(path: Option<PathBuf>) -> Result<HistoryStore> {
    let path = path.or_else(default_history_path).ok_or_else(|| {
        anyhow::anyhow!("Cannot determine a data directory; pass --history-file")
    })?;
    Ok(HistoryStore::new(path))
}

/// Human-readable byte count
pub(crate) fn format_bytes(bytes: u64) -> String {
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

/// "just now", "5m ago", "3h ago", "2d ago"; older timestamps as a date
pub(crate) fn format_relative(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(timestamp);
    if elapsed.num_seconds() < 60 {
        "just now".to_string()
    } else if elapsed.num_minutes() < 60 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_hours() < 24 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_days() < 7 {
        format!("{}d ago", elapsed.num_days())
    } else {
        timestamp.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(60 * 1024 * 1024), "60.0 MB");
    }

    #[test]
    fn test_format_relative() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(format_relative(now - Duration::seconds(5), now), "just now");
        assert_eq!(format_relative(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(format_relative(now - Duration::hours(3), now), "3h ago");
        assert_eq!(format_relative(now - Duration::days(2), now), "2d ago");
        assert_eq!(format_relative(now - Duration::days(30), now), "2026-02-08");
    }

    #[test]
    fn test_open_history_explicit_path() {
        let store = open_history(Some(PathBuf::from("/tmp/h.json"))).unwrap();
        assert_eq!(store.path(), std::path::Path::new("/tmp/h.json"));
    }
}
