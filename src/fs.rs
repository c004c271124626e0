//! Filesystem utilities.
//!
//! Crash-tolerant write primitives backing settings persistence. A partial
//! write must never leave the settings file unparseable, so writes go to a
//! temp file first and land via rename. Windows rename does not overwrite,
//! so a backup-then-swap handles that case.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::engine::{EngineError, EngineResult};

/// Serializes `value` as pretty JSON and writes it atomically to `path`.
pub fn atomic_write_json_pretty<T: Serialize>(path: &Path, value: &T) -> EngineResult<()> {
    let json = serde_json::to_vec_pretty(value)?;
    atomic_write_bytes(path, &json)
}

/// Writes `bytes` to `path` atomically (temp file + rename).
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> EngineResult<()> {
    let parent = path
        .parent()
        .ok_or_else(|| EngineError::Internal(format!("no parent directory for {}", path.display())))?;
    fs::create_dir_all(parent)?;

    let tmp_path = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    #[cfg(windows)]
    {
        // Windows: rename does not overwrite, so swap through a backup.
        if path.exists() {
            let backup = path.with_extension("bak");
            let _ = fs::remove_file(&backup);
            fs::rename(path, &backup)?;
        }
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}
