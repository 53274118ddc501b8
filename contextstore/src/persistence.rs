//! Atomic snapshot persistence for the context window (C6c, spec.md §4.6/§6).

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::Path;

use crate::config::Config;
use crate::error::ContextError;
use crate::item::ContextItem;

/// On-disk snapshot format. `version` is required and monotonic (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub version: u32,
    pub items: Vec<ContextItem>,
    pub config: Config,
    pub stats: SnapshotStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub total_added: u64,
    pub total_removed: u64,
    pub total_summarized: u64,
    pub persisted_at: i64,
}

const SNAPSHOT_VERSION: u32 = 1;

/// Write `snapshot` to `path` atomically: write to a sibling temp file, flush,
/// take an advisory exclusive lock for the duration of the write, then rename
/// over the destination. The manager is single-owner, so this never races
/// with another writer in-process; the lock guards against external tools.
pub fn save(path: &Path, mut snapshot: ContextSnapshot) -> Result<(), ContextError> {
    snapshot.version = SNAPSHOT_VERSION;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");
    let file = File::create(&tmp_path)?;
    file.lock_exclusive().map_err(|e| ContextError::Persistence(e.to_string()))?;

    let json = serde_json::to_string_pretty(&snapshot)?;
    fs::write(&tmp_path, json)?;

    FileExt::unlock(&file).map_err(|e| ContextError::Persistence(e.to_string()))?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Restore a snapshot previously written by [`save`].
pub fn restore(path: &Path) -> Result<ContextSnapshot, ContextError> {
    let content = fs::read_to_string(path)?;
    let snapshot: ContextSnapshot = serde_json::from_str(&content)?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snap.json");

        let snapshot = ContextSnapshot {
            version: 0,
            items: vec![],
            config: Config::default(),
            stats: SnapshotStats::default(),
        };
        save(&path, snapshot).unwrap();

        let restored = restore(&path).unwrap();
        assert_eq!(restored.version, SNAPSHOT_VERSION);
    }

    #[test]
    fn missing_file_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("does-not-exist.json");
        assert!(restore(&path).is_err());
    }
}
