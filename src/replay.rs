//! Rebuild the registry from storage.

use crate::admin::{apply, CommandRecord};
use crate::error::Result;
use crate::registry::Registry;
use crate::storage::Storage;
use tracing::debug;

/// Load the latest snapshot (or an empty registry) and replay the log tail.
///
/// Returns the registry at the tip together with the number of log entries it
/// reflects, which is the position the next appended command will take.
pub fn replay_to_tip<S: Storage>(storage: &S) -> Result<(Registry, u64)> {
    let (registry, applied) = storage
        .load_snapshot()?
        .unwrap_or_else(|| (Registry::new(), 0));

    let tail = storage.load_commands_from(applied)?;
    debug!(snapshot = applied, tail = tail.len(), "replaying command log");
    replay_commands(registry, applied, &tail)
}

/// Apply `records` in order on top of `registry`, whose log position is `start`.
pub fn replay_commands(
    registry: Registry,
    start: u64,
    records: &[CommandRecord],
) -> Result<(Registry, u64)> {
    let mut current = registry;
    let mut position = start;
    for record in records {
        current = apply(&current, record)?;
        position += 1;
    }
    Ok((current, position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::Command;
    use crate::registry::CatalogKind;
    use crate::storage::FileStorage;
    use tempfile::TempDir;

    fn register(kind: CatalogKind, code: &str) -> CommandRecord {
        CommandRecord::at(
            1,
            Command::RegisterCatalogEntry {
                kind,
                code: code.to_string(),
                description: None,
            },
        )
    }

    fn storage(dir: &TempDir) -> FileStorage {
        FileStorage::with_paths(
            dir.path().join("commands.log"),
            dir.path().join("registry.json"),
        )
    }

    #[test]
    fn test_replay_empty_storage() {
        let dir = TempDir::new().unwrap();
        let (registry, applied) = replay_to_tip(&storage(&dir)).unwrap();
        assert_eq!(registry, Registry::new());
        assert_eq!(applied, 0);
    }

    #[test]
    fn test_replay_from_genesis() {
        let dir = TempDir::new().unwrap();
        let mut storage = storage(&dir);
        storage.append_command(&register(CatalogKind::TransactionType, "TRANSFER")).unwrap();
        storage.append_command(&register(CatalogKind::Channel, "WEB")).unwrap();

        let (registry, applied) = replay_to_tip(&storage).unwrap();
        assert_eq!(applied, 2);
        assert!(registry.active_transaction_type("TRANSFER").is_some());
        assert!(registry.active_channel("WEB").is_some());
    }

    #[test]
    fn test_replay_snapshot_plus_tail() {
        let dir = TempDir::new().unwrap();
        let mut storage = storage(&dir);

        let first = register(CatalogKind::Channel, "WEB");
        storage.append_command(&first).unwrap();
        let registry = apply(&Registry::new(), &first).unwrap();
        storage.persist_snapshot(&registry, 1).unwrap();

        storage.append_command(&register(CatalogKind::Channel, "MOBILE")).unwrap();

        let (registry, applied) = replay_to_tip(&storage).unwrap();
        assert_eq!(applied, 2);
        assert!(registry.active_channel("WEB").is_some());
        assert!(registry.active_channel("MOBILE").is_some());
    }

    #[test]
    fn test_replay_matches_snapshot() {
        let dir = TempDir::new().unwrap();
        let mut storage = storage(&dir);
        let records = vec![
            register(CatalogKind::Channel, "WEB"),
            register(CatalogKind::Channel, "USSD"),
        ];
        for record in &records {
            storage.append_command(record).unwrap();
        }
        let (direct, _) = replay_commands(Registry::new(), 0, &records).unwrap();
        storage.persist_snapshot(&direct, 2).unwrap();

        let (replayed, applied) = replay_to_tip(&storage).unwrap();
        assert_eq!(applied, 2);
        assert_eq!(replayed, direct);
    }
}
