// src/commands/history.rs
//! History commands: list, remove and clear recorded conversions

use anyhow::Result;
use chrono::Utc;
use extconv::{HistoryEntry, HistoryStore};
use uuid::Uuid;

use super::format_relative;

/// List recorded conversions, newest first
pub fn cmd_history_list(store: &HistoryStore, limit: Option<usize>) -> Result<()> {
    let ledger = store.load()?;

    if ledger.is_empty() {
        println!("No conversion history.");
        return Ok(());
    }

    let now = Utc::now();
    let shown = limit.unwrap_or(ledger.len()).min(ledger.len());
    println!("Conversion history:");
    for entry in &ledger.entries()[..shown] {
        println!("  {}", describe(entry, now));
    }
    println!("\nTotal: {} conversion(s)", ledger.len());
    Ok(())
}

/// Remove one entry by full id or unique prefix
pub fn cmd_history_remove(store: &HistoryStore, id: &str) -> Result<()> {
    let mut ledger = store.load()?;

    let target = match Uuid::parse_str(id) {
        Ok(uuid) => uuid,
        Err(_) => {
            let matches = ledger.find_by_prefix(id);
            match matches.as_slice() {
                [] => anyhow::bail!("No history entry matches '{}'", id),
                [entry] => entry.id(),
                _ => anyhow::bail!(
                    "'{}' matches {} entries; use a longer prefix",
                    id,
                    matches.len()
                ),
            }
        }
    };

    if !ledger.remove(target) {
        anyhow::bail!("No history entry with id {}", target);
    }
    store.save(&ledger)?;
    println!("Removed history entry {}", target);
    Ok(())
}

/// Remove every entry
pub fn cmd_history_clear(store: &HistoryStore) -> Result<()> {
    let mut ledger = store.load()?;
    let count = ledger.len();
    ledger.clear();
    store.save(&ledger)?;
    println!("Cleared {} history entr{}", count, if count == 1 { "y" } else { "ies" });
    Ok(())
}

fn describe(entry: &HistoryEntry, now: chrono::DateTime<Utc>) -> String {
    let id = entry.id().simple().to_string();
    let short_id = &id[..8];
    let when = format_relative(entry.timestamp(), now);

    if entry.is_success() {
        let direction = match (entry.source_kind(), entry.target_kind()) {
            (Some(from), Some(to)) => format!("{} -> {}", from, to),
            _ => "?".to_string(),
        };
        let warnings = match entry.warning_count() {
            0 => String::new(),
            1 => ", 1 warning".to_string(),
            n => format!(", {} warnings", n),
        };
        format!(
            "[{}] {:>10}  {} -> {} ({}{})",
            short_id,
            when,
            entry.original_name(),
            entry.artifact_name().unwrap_or("?"),
            direction,
            warnings
        )
    } else {
        let kind = entry
            .error_kind()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "error".to_string());
        format!(
            "[{}] {:>10}  {} FAILED ({}): {}",
            short_id,
            when,
            entry.original_name(),
            kind,
            entry.error().unwrap_or("")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extconv::{ContainerKind, ErrorKind, HistoryLedger};

    fn seeded_store(dir: &std::path::Path) -> (HistoryStore, HistoryEntry, HistoryEntry) {
        let store = HistoryStore::new(dir.join("history.json"));
        let ok = HistoryEntry::success("a.crx", ContainerKind::Chrome, "a_converted.xpi", 1);
        let bad = HistoryEntry::failure("b.txt", None, ErrorKind::UnsupportedFormat, "nope");
        let mut ledger = HistoryLedger::new();
        ledger.record(ok.clone());
        ledger.record(bad.clone());
        store.save(&ledger).unwrap();
        (store, ok, bad)
    }

    #[test]
    fn test_remove_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let (store, ok, bad) = seeded_store(dir.path());

        cmd_history_remove(&store, &ok.id().to_string()[..8]).unwrap();
        let ledger = store.load().unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.entries()[0], bad);

        assert!(cmd_history_remove(&store, "zzzz").is_err());
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _, _) = seeded_store(dir.path());
        cmd_history_clear(&store).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_describe_lines() {
        let now = Utc::now();
        let ok = HistoryEntry::success("a.crx", ContainerKind::Chrome, "a_converted.xpi", 2);
        let line = describe(&ok, now);
        assert!(line.contains("a.crx -> a_converted.xpi (Chrome -> Firefox, 2 warnings)"));

        let bad = HistoryEntry::failure("b.txt", None, ErrorKind::UnsupportedFormat, "nope");
        assert!(describe(&bad, now).contains("b.txt FAILED (unsupported_format): nope"));
    }
}
