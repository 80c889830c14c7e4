//! Directory store persistence.
//!
//! File system layout:
//!
//! ```text
//! <store_path>/
//! ├─ LOCK              # Advisory lock for single-run ownership
//! └─ directory.json    # The whole directory, one JSON array
//! ```
//!
//! The LOCK file ensures only one process owns the store at a time; the
//! lock is held for the lifetime of the [`DirectoryStore`] value, which
//! covers a run's single read-then-write window.

use crate::error::{StoreError, StoreResult};
use fleetsync_model::DirectoryEntry;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File names within the store directory.
const DIRECTORY_FILE: &str = "directory.json";
const LOCK_FILE: &str = "LOCK";
/// Temporary file for atomic directory writes.
const DIRECTORY_TEMP: &str = "directory.json.tmp";

/// Durable mapping from identity to per-server client handles.
///
/// Both operations work on the whole collection: [`load`](Self::load)
/// reads every entry, [`save_all`](Self::save_all) replaces every entry.
/// Entries are persisted sorted by identity key so an unchanged
/// collection round-trips byte-identically.
#[derive(Debug)]
pub struct DirectoryStore {
    path: PathBuf,
    /// Lock file handle (held for exclusive access).
    _lock_file: File,
}

impl DirectoryStore {
    /// Opens or creates a store directory and takes the exclusive lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory doesn't exist and
    /// `create_if_missing` is false, if another process holds the lock
    /// (`Locked`), or on I/O failure.
    pub fn open(path: &Path, create_if_missing: bool) -> StoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(StoreError::corrupt(format!(
                    "store directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(StoreError::corrupt(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_path = path.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the whole directory. A store that has never been written
    /// reads as empty.
    pub fn load(&self) -> StoreResult<Vec<DirectoryEntry>> {
        let file_path = self.path.join(DIRECTORY_FILE);
        if !file_path.exists() {
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&file_path)?;
        serde_json::from_str(&raw).map_err(|e| StoreError::corrupt(e.to_string()))
    }

    /// Replaces the whole directory.
    ///
    /// Uses write-then-rename for crash safety: the collection is written
    /// to a temp file, fsynced, and renamed over the live file, so a
    /// failure on any path leaves the previous directory intact.
    pub fn save_all(&self, entries: &[DirectoryEntry]) -> StoreResult<()> {
        let mut sorted: Vec<&DirectoryEntry> = entries.iter().collect();
        sorted.sort_by_key(|entry| entry.identity_key());

        let mut body = serde_json::to_vec_pretty(&sorted)
            .map_err(|e| StoreError::corrupt(e.to_string()))?;
        body.push(b'\n');

        let temp_path = self.path.join(DIRECTORY_TEMP);
        let file_path = self.path.join(DIRECTORY_FILE);

        let mut file = File::create(&temp_path)?;
        file.write_all(&body)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &file_path)?;

        // Fsync the directory so the rename is durable.
        File::open(&self.path)?.sync_all()?;

        debug!(entries = entries.len(), path = %file_path.display(), "directory saved");
        Ok(())
    }
}
