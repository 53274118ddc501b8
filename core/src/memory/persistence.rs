//! Atomic task memory snapshot persistence (spec §6: "Task memory snapshot").

use fs2::FileExt;
use std::fs::{self, File};
use std::path::Path;
use thiserror::Error;

use super::store::TaskMemorySnapshot;

#[derive(Debug, Error)]
pub enum MemoryPersistenceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("lock error: {0}")]
    Lock(String),
}

pub fn save(path: &Path, snapshot: &TaskMemorySnapshot) -> Result<(), MemoryPersistenceError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");
    let file = File::create(&tmp_path)?;
    file.lock_exclusive().map_err(|e| MemoryPersistenceError::Lock(e.to_string()))?;

    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(&tmp_path, json)?;

    FileExt::unlock(&file).map_err(|e| MemoryPersistenceError::Lock(e.to_string()))?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn restore(path: &Path) -> Result<TaskMemorySnapshot, MemoryPersistenceError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.json");
        save(&path, &TaskMemorySnapshot::default()).unwrap();
        let restored = restore(&path).unwrap();
        assert!(restored.tasks.is_empty());
    }
}
