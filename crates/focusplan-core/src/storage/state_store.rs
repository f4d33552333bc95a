//! Storage ports for the persisted planner state.
//!
//! The planner never touches the filesystem directly; it is handed a
//! [`StateStore`] at construction. Writes from [`FileStateStore`] are staged
//! in a temp file next to the target and renamed into place, so a failure
//! leaves either the previous blob or the new one on disk.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Result, StateError};
use crate::planner::PlannerState;

/// Persistence port for [`PlannerState`].
pub trait StateStore {
    /// Load the stored state.
    ///
    /// `Ok(None)` means nothing has been stored yet. Implementations should
    /// also return `Ok(None)` for unreadable or corrupt data so planning
    /// falls back to calibration defaults.
    fn load(&self) -> Result<Option<PlannerState>>;

    /// Replace the stored state atomically.
    fn save(&mut self, state: &PlannerState) -> Result<()>;

    /// Remove the stored state.
    fn clear(&mut self) -> Result<()>;
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MemoryStateStore {
    state: Option<PlannerState>,
    saves: usize,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PlannerState) -> Self {
        Self {
            state: Some(state),
            saves: 0,
        }
    }

    pub fn stored(&self) -> Option<&PlannerState> {
        self.state.as_ref()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<Option<PlannerState>> {
        Ok(self.state.clone())
    }

    fn save(&mut self, state: &PlannerState) -> Result<()> {
        self.state = Some(state.clone());
        self.saves += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.state = None;
        Ok(())
    }
}

/// JSON file store with atomic replace.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data_dir>/planner_state.json`.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(super::data_dir()?.join("planner_state.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<Option<PlannerState>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "planner state unreadable, starting fresh"
                );
                return Ok(None);
            }
        };

        match serde_json::from_str::<PlannerState>(&content) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "planner state corrupt, starting fresh"
                );
                Ok(None)
            }
        }
    }

    fn save(&mut self, state: &PlannerState) -> Result<()> {
        let content = serde_json::to_string_pretty(state).map_err(StateError::Encode)?;

        let parent_dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        if !parent_dir.exists() {
            return Err(StateError::NoParent(self.path.clone()).into());
        }

        let persist_failed = |source: std::io::Error| StateError::PersistFailed {
            path: self.path.clone(),
            source,
        };

        let mut temp_file = NamedTempFile::new_in(parent_dir).map_err(persist_failed)?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(persist_failed)?;
        temp_file.flush().map_err(persist_failed)?;
        temp_file
            .persist(&self.path)
            .map_err(|e| persist_failed(e.error))?;

        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Phase;

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStateStore::new(dir.path().join("state.json"));
        assert!(store.load().unwrap().is_none());

        let mut state = PlannerState::default();
        state.phase = Phase::Wave;
        state.floor_seconds = Some(1800);
        store.save(&state).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn corrupt_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = FileStateStore::new(&path);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_replaces_previous_blob_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = FileStateStore::new(&path);

        store.save(&PlannerState::default()).unwrap();
        let mut next = PlannerState::default();
        next.forced_easy = 2;
        store.save(&next).unwrap();

        assert_eq!(store.load().unwrap().unwrap().forced_easy, 2);
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn save_into_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStateStore::new(dir.path().join("missing").join("state.json"));
        assert!(store.save(&PlannerState::default()).is_err());
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStateStore::new(dir.path().join("state.json"));
        store.save(&PlannerState::default()).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
