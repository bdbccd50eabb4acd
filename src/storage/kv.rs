use crate::admin::CommandRecord;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;

/// On-disk snapshot layout.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    applied: u64,
    registry: Registry,
}

/// File-backed storage.
///
/// Files:
/// - `commands.log`: append-only command log, each record a u64 little-endian
///   length followed by its JSON encoding
/// - `registry.json`: latest registry snapshot and the count of log entries it covers
/// - `registry.json.tmp`: scratch file for atomic snapshot writes
pub struct FileStorage {
    log_path: PathBuf,
    snapshot_path: PathBuf,
    snapshot_tmp_path: PathBuf,
}

impl FileStorage {
    pub fn new(config: &Config) -> Self {
        FileStorage::with_paths(config.get_command_log_path(), config.get_registry_path())
    }

    /// Storage with explicit paths (tests, tooling).
    pub fn with_paths(log_path: PathBuf, snapshot_path: PathBuf) -> Self {
        let snapshot_tmp_path = snapshot_path.with_extension("json.tmp");
        FileStorage {
            log_path,
            snapshot_path,
            snapshot_tmp_path,
        }
    }

    fn ensure_dir(&self) -> Result<()> {
        for path in [&self.log_path, &self.snapshot_path] {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::StorageError(format!("Failed to create data directory: {}", e))
                })?;
            }
        }
        Ok(())
    }
}

impl Storage for FileStorage {
    fn append_command(&mut self, record: &CommandRecord) -> Result<()> {
        self.ensure_dir()?;

        let bytes = serde_json::to_vec(record)
            .map_err(|e| Error::StorageError(format!("Failed to serialize command: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| Error::StorageError(format!("Failed to open command log: {}", e)))?;

        let len = bytes.len() as u64;
        file.write_all(&len.to_le_bytes())
            .map_err(|e| Error::StorageError(format!("Failed to write record length: {}", e)))?;
        file.write_all(&bytes)
            .map_err(|e| Error::StorageError(format!("Failed to write record: {}", e)))?;
        file.sync_all()
            .map_err(|e| Error::StorageError(format!("Failed to fsync command log: {}", e)))?;

        Ok(())
    }

    fn load_snapshot(&self) -> Result<Option<(Registry, u64)>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }

        let data = fs::read(&self.snapshot_path)
            .map_err(|e| Error::StorageError(format!("Failed to read snapshot: {}", e)))?;
        let snapshot: Snapshot = serde_json::from_slice(&data)
            .map_err(|e| Error::StorageError(format!("Failed to decode snapshot: {}", e)))?;

        Ok(Some((snapshot.registry, snapshot.applied)))
    }

    fn persist_snapshot(&mut self, registry: &Registry, applied: u64) -> Result<()> {
        self.ensure_dir()?;

        let snapshot = Snapshot {
            applied,
            registry: registry.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| Error::StorageError(format!("Failed to serialize snapshot: {}", e)))?;

        let mut file = File::create(&self.snapshot_tmp_path)
            .map_err(|e| Error::StorageError(format!("Failed to create temp snapshot: {}", e)))?;
        file.write_all(&bytes)
            .map_err(|e| Error::StorageError(format!("Failed to write snapshot: {}", e)))?;
        file.sync_all()
            .map_err(|e| Error::StorageError(format!("Failed to fsync temp snapshot: {}", e)))?;
        drop(file);

        fs::rename(&self.snapshot_tmp_path, &self.snapshot_path)
            .map_err(|e| Error::StorageError(format!("Failed to rename temp snapshot: {}", e)))?;

        if let Some(parent) = self.snapshot_path.parent() {
            let dir = File::open(parent)
                .map_err(|e| Error::StorageError(format!("Failed to open data directory: {}", e)))?;
            dir.sync_all()
                .map_err(|e| Error::StorageError(format!("Failed to fsync data directory: {}", e)))?;
        }

        Ok(())
    }

    fn load_commands_from(&self, from: u64) -> Result<Vec<CommandRecord>> {
        if !self.log_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.log_path)
            .map_err(|e| Error::StorageError(format!("Failed to open command log: {}", e)))?;
        let mut remaining = file
            .metadata()
            .map_err(|e| Error::StorageError(format!("Failed to stat command log: {}", e)))?
            .len();
        let mut reader = BufReader::new(file);

        let mut records = Vec::new();
        let mut position = 0u64;

        loop {
            let mut len_buf = [0u8; 8];
            match reader.read_exact(&mut len_buf) {
                Ok(()) => {
                    remaining = remaining.saturating_sub(len_buf.len() as u64);
                    let len = u64::from_le_bytes(len_buf);
                    if len > remaining {
                        return Err(Error::StorageError(format!(
                            "Corrupt record length at {}: {} bytes with {} left in log",
                            position, len, remaining
                        )));
                    }
                    remaining -= len;
                    let mut buf = vec![0u8; len as usize];
                    reader.read_exact(&mut buf).map_err(|e| {
                        Error::StorageError(format!("Truncated record at {}: {}", position, e))
                    })?;

                    if position >= from {
                        let record: CommandRecord = serde_json::from_slice(&buf).map_err(|e| {
                            Error::StorageError(format!("Failed to decode record {}: {}", position, e))
                        })?;
                        records.push(record);
                    }
                    position += 1;
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => {
                    return Err(Error::StorageError(format!(
                        "Failed to read command log: {}",
                        e
                    )))
                }
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::Command;
    use crate::registry::{CatalogEntry, CatalogKind};
    use tempfile::TempDir;

    fn create_test_storage() -> (FileStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::with_paths(
            temp_dir.path().join("commands.log"),
            temp_dir.path().join("registry.json"),
        );
        (storage, temp_dir)
    }

    fn register_channel(code: &str) -> CommandRecord {
        CommandRecord::at(
            1,
            Command::RegisterCatalogEntry {
                kind: CatalogKind::Channel,
                code: code.to_string(),
                description: Some(format!("{} channel", code)),
            },
        )
    }

    #[test]
    fn test_append_and_load_commands() {
        let (mut storage, _temp_dir) = create_test_storage();
        storage.append_command(&register_channel("WEB")).unwrap();

        let records = storage.load_commands_from(0).unwrap();
        assert_eq!(records, vec![register_channel("WEB")]);
    }

    #[test]
    fn test_load_commands_from_offset() {
        let (mut storage, _temp_dir) = create_test_storage();
        for code in ["A", "B", "C", "D", "E"] {
            storage.append_command(&register_channel(code)).unwrap();
        }

        let records = storage.load_commands_from(2).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], register_channel("C"));
        assert!(storage.load_commands_from(9).unwrap().is_empty());
    }

    #[test]
    fn test_missing_log_is_empty() {
        let (storage, _temp_dir) = create_test_storage();
        assert!(storage.load_commands_from(0).unwrap().is_empty());
    }

    #[test]
    fn test_persist_and_load_snapshot() {
        let (mut storage, temp_dir) = create_test_storage();

        let mut registry = Registry::new();
        registry
            .channels
            .insert("WEB".to_string(), CatalogEntry::new("WEB", None));
        storage.persist_snapshot(&registry, 4).unwrap();

        let (loaded, applied) = storage.load_snapshot().unwrap().unwrap();
        assert_eq!(applied, 4);
        assert_eq!(loaded, registry);
        assert!(!temp_dir.path().join("registry.json.tmp").exists());
    }

    #[test]
    fn test_load_snapshot_none() {
        let (storage, _temp_dir) = create_test_storage();
        assert!(storage.load_snapshot().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let (storage, temp_dir) = create_test_storage();
        fs::write(temp_dir.path().join("registry.json"), b"not json").unwrap();
        assert!(matches!(
            storage.load_snapshot(),
            Err(Error::StorageError(_))
        ));
    }

    #[test]
    fn test_truncated_record_is_an_error() {
        let (mut storage, temp_dir) = create_test_storage();
        storage.append_command(&register_channel("WEB")).unwrap();

        let path = temp_dir.path().join("commands.log");
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&100u64.to_le_bytes()).unwrap();
        file.write_all(b"{").unwrap();

        assert!(storage.load_commands_from(0).is_err());
    }

    #[test]
    fn test_oversized_length_prefix_is_rejected() {
        let (mut storage, temp_dir) = create_test_storage();
        storage.append_command(&register_channel("WEB")).unwrap();

        let path = temp_dir.path().join("commands.log");
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&u64::MAX.to_le_bytes()).unwrap();

        match storage.load_commands_from(0) {
            Err(Error::StorageError(message)) => assert!(message.contains("Corrupt record length")),
            other => panic!("expected corrupt length error, got {:?}", other.map(|r| r.len())),
        }
    }
}
