//! Atomic supervisor snapshot persistence (spec §6: "Supervisor snapshot").

use fs2::FileExt;
use std::fs::{self, File};
use std::path::Path;
use thiserror::Error;

use super::machine::PersistedState;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("lock error: {0}")]
    Lock(String),
}

/// Write-to-temp, lock, write, unlock, rename — matches the context store's
/// snapshot discipline so both persistence paths behave the same under
/// concurrent external readers.
pub fn save(path: &Path, snapshot: &PersistedState) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");
    let file = File::create(&tmp_path)?;
    file.lock_exclusive().map_err(|e| PersistenceError::Lock(e.to_string()))?;

    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(&tmp_path, json)?;

    FileExt::unlock(&file).map_err(|e| PersistenceError::Lock(e.to_string()))?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn restore(path: &Path) -> Result<PersistedState, PersistenceError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
