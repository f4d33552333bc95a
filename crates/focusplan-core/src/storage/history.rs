//! JSON-lines session history.
//!
//! One [`SessionRecord`] per line, append-only. Lines that fail to parse are
//! skipped with a warning instead of failing the whole load.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{HistoryError, Result};
use crate::session::SessionRecord;

#[derive(Debug, Clone)]
pub struct HistoryFile {
    path: PathBuf,
}

impl HistoryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// History at `<data_dir>/sessions.jsonl`.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(super::data_dir()?.join("sessions.jsonl")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every parseable record in file order.
    pub fn load(&self) -> Result<Vec<SessionRecord>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(HistoryError::ReadFailed {
                    path: self.path.clone(),
                    source,
                }
                .into())
            }
        };

        let mut records = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<SessionRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(
                        line = line_no + 1,
                        error = %e,
                        "skipping malformed session record"
                    );
                }
            }
        }
        Ok(records)
    }

    /// Append one record as a new line.
    pub fn append(&self, record: &SessionRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let append_failed = |source: std::io::Error| HistoryError::AppendFailed {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(append_failed)?;
        writeln!(file, "{line}").map_err(append_failed)?;
        Ok(())
    }
}
