//! Appends records to the log. Never rewrites, never deletes.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::types::error::{PmemError, PmemResult};
use crate::types::Entry;

/// Single-writer handle on the log file.
///
/// Appends are serialized through an in-process lock and issued as one
/// complete, newline-terminated buffer on an `O_APPEND` descriptor, so a
/// concurrent reader sees either the whole record or none of it.
pub struct LogWriter {
    path: PathBuf,
    file: Mutex<File>,
}

impl LogWriter {
    /// Open (creating if needed) the log for appending. A path that cannot
    /// be opened as a file is `StoreUnavailable`.
    pub fn open(path: &Path) -> PmemResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
            .map_err(|source| PmemError::StoreUnavailable {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a single record.
    ///
    /// On failure the log is truncated back to its length before the call.
    /// That rollback only covers writers sharing this handle: if another
    /// process appended after `start`, truncating could cut its records, so
    /// the rollback is skipped when the file has grown past what this call
    /// could have written. A partial line left that way is skipped by readers
    /// as corrupt, and the next append starts on a fresh line.
    pub fn append(&self, entry: &Entry) -> PmemResult<()> {
        entry.validate()?;

        let mut record = entry.to_json_line()?.into_bytes();
        record.push(b'\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| std::io::Error::other("log writer lock poisoned"))?;

        let start = file.metadata()?.len();
        // A foreign writer may have died mid-record; keep ours on its own line.
        if start > 0 && !ends_with_newline(&mut file)? {
            record.insert(0, b'\n');
        }

        if let Err(e) = write_record(&mut file, &record) {
            log::warn!(
                "append of {:?} to {} failed, rolling back to {} bytes: {}",
                entry.id,
                self.path.display(),
                start,
                e
            );
            rollback(&file, &self.path, start, record.len() as u64);
            return Err(e.into());
        }

        log::debug!(
            "appended {:?} ({} bytes) to {}",
            entry.id,
            record.len(),
            self.path.display()
        );
        Ok(())
    }
}

fn write_record(file: &mut File, record: &[u8]) -> std::io::Result<()> {
    file.write_all(record)?;
    file.flush()?;
    file.sync_data()
}

/// Truncate back to `start` unless a foreign writer has appended since.
fn rollback(file: &File, path: &Path, start: u64, attempted: u64) {
    let len = match file.metadata() {
        Ok(meta) => meta.len(),
        Err(e) => {
            log::warn!("rollback of {} skipped: {}", path.display(), e);
            return;
        }
    };
    if len > start + attempted {
        log::warn!(
            "rollback of {} skipped: log grew to {} bytes from another writer",
            path.display(),
            len
        );
        return;
    }
    if let Err(e) = file.set_len(start) {
        log::warn!("rollback of {} failed: {}", path.display(), e);
    }
}

fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
