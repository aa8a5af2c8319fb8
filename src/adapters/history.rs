//! JSON run history plus per-run text logs.
//!
//! Layout inside the history directory:
//!
//! ```text
//! logs/
//! ├── wash_history.json                      pretty JSON array of RunRecord
//! └── washer_log_20250101_083000_SC-0042.txt one text log per run
//! ```
//!
//! The JSON file is rewritten whole through a temporary file and a rename,
//! so a power cut mid-write leaves the previous history intact.  A database
//! that no longer parses is moved aside to `wash_history.json.corrupt` and a
//! fresh one is started; the text log is written regardless.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::RecordSink;
use crate::app::record::RunRecord;
use crate::error::StorageError;

pub const HISTORY_DATABASE: &str = "wash_history.json";

pub struct JsonHistoryStore {
    dir: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn database_path(&self) -> PathBuf {
        self.dir.join(HISTORY_DATABASE)
    }

    /// Every stored record, oldest first.  A missing database is empty.
    pub fn load(&self) -> Result<Vec<RunRecord>, StorageError> {
        let path = self.database_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&path).map_err(|e| io_error(&path, &e))?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|_| StorageError::Corrupted)
    }

    /// File name of the text log for `record`.  Runs of the same scope that
    /// start within the same second get a `_2`, `_3`, ... suffix on disk.
    pub fn text_log_name(record: &RunRecord) -> String {
        let scope: String = record
            .scope_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!(
            "washer_log_{}_{}.txt",
            record.timestamp_start.format("%Y%m%d_%H%M%S"),
            scope
        )
    }

    fn write_text_log(&self, record: &RunRecord) -> Result<PathBuf, StorageError> {
        let path = free_path(self.dir.join(Self::text_log_name(record)));
        fs::write(&path, record.text_report().to_string()).map_err(|e| io_error(&path, &e))?;
        Ok(path)
    }

    fn append_to_database(&self, record: &RunRecord) -> Result<(), StorageError> {
        let mut records = match self.load() {
            Ok(records) => records,
            Err(StorageError::Corrupted) => {
                let path = self.database_path();
                let aside = free_path(path.with_extension("json.corrupt"));
                warn!(
                    "history: {} is unreadable, moved to {}",
                    path.display(),
                    aside.display()
                );
                fs::rename(&path, &aside).map_err(|e| io_error(&aside, &e))?;
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        records.push(record.clone());
        self.write_database(&records)
    }

    fn write_database(&self, records: &[RunRecord]) -> Result<(), StorageError> {
        let path = self.database_path();
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| StorageError::Serialize(e.to_string()))?;
        fs::write(&tmp, json).map_err(|e| io_error(&tmp, &e))?;
        fs::rename(&tmp, &path).map_err(|e| io_error(&path, &e))
    }
}

impl RecordSink for JsonHistoryStore {
    fn store(&mut self, record: &RunRecord) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, &e))?;

        // The text log does not depend on the database being readable.
        let logged = self.write_text_log(record);
        let saved = self.append_to_database(record);
        let text_path = logged?;
        saved?;

        info!("history: run saved to {}", text_path.display());
        Ok(())
    }
}

/// `path` itself if nothing exists there yet, otherwise the first free
/// `<stem>_<n>.<ext>` beside it.
fn free_path(path: PathBuf) -> PathBuf {
    if !path.exists() {
        return path;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let free = (2u32..)
        .map(|n| path.with_file_name(format!("{stem}_{n}{ext}")))
        .find(|candidate| !candidate.exists());
    free.unwrap_or(path)
}

fn io_error(path: &Path, e: &std::io::Error) -> StorageError {
    StorageError::Io(format!("{}: {e}", path.display()))
}
