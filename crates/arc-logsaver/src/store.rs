//! Writes log records into the log directory.
//!
//! The directory is created on demand right before each write. Creation and
//! write are separate steps, and concurrent saves of the same file name are
//! not coordinated. The write is not atomic: an interrupted process can leave
//! a partial file.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::error::{Result, SaveError};
use crate::record::LogRecord;

/// Outcome of a successful save.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedLog {
    /// File name inside the log directory.
    pub file_name: String,
    /// Full path of the written file.
    pub path: PathBuf,
    /// `totalMessages` as rendered in the file name.
    pub total_messages: String,
}

impl SavedLog {
    /// Client-facing success message.
    pub fn message(&self) -> String {
        format!("Saved {} messages to {}", self.total_messages, self.file_name)
    }
}

/// File-backed store rooted at one directory.
#[derive(Clone, Debug)]
pub struct LogStore {
    dir: PathBuf,
}

impl LogStore {
    /// Create a store writing into `dir`. Nothing is touched until the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The log directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `record` as `<name>.json`, using `now` for the timestamp part.
    pub fn save(&self, record: &LogRecord, now: NaiveDateTime) -> Result<SavedLog> {
        let file_name = record.file_name(now);

        // sessionId is not sanitized; refuse anything that would leave the directory
        if Path::new(&file_name).file_name().and_then(|n| n.to_str()) != Some(file_name.as_str())
        {
            return Err(SaveError::Unexpected(format!(
                "refusing to write outside the log directory: {file_name}"
            )));
        }

        let contents = record
            .to_pretty_json()
            .map_err(|e| SaveError::Unexpected(e.to_string()))?;

        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&file_name);
        debug!(path = %path.display(), bytes = contents.len(), "writing log file");
        std::fs::write(&path, contents)?;

        info!(
            file = %file_name,
            session_id = %record.session_id(),
            total_messages = %record.total_messages(),
            "saved game log"
        );

        Ok(SavedLog {
            file_name,
            path,
            total_messages: record.total_messages(),
        })
    }
}
