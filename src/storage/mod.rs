pub mod kv;

pub use kv::FileStorage;

use crate::admin::CommandRecord;
use crate::error::Result;
use crate::registry::Registry;

/// Persistence for the admin command log and registry snapshots.
///
/// Implementations must keep the log append-only and write snapshots
/// atomically, so that replaying the log over the last snapshot always
/// reproduces the registry.
pub trait Storage {
    /// Append a command record to the log (fsync before returning).
    fn append_command(&mut self, record: &CommandRecord) -> Result<()>;

    /// Load the latest snapshot together with the number of log entries it covers.
    ///
    /// Returns `None` when no snapshot has been written yet.
    fn load_snapshot(&self) -> Result<Option<(Registry, u64)>>;

    /// Persist a snapshot covering the first `applied` log entries.
    fn persist_snapshot(&mut self, registry: &Registry, applied: u64) -> Result<()>;

    /// Load command records from position `from` (0-based, inclusive) to the end of the log.
    fn load_commands_from(&self, from: u64) -> Result<Vec<CommandRecord>>;
}
