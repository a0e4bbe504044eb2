//! Build history kept in `.depforge/state.json`.
//!
//! The file is disposable: losing it only loses history, never installed
//! packages. Readers take a shared lock, writers an exclusive one, and
//! writes go through a temp file that is persisted over the target.

use crate::error::{CoreError, Result};
use crate::lock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

const SCHEMA_VERSION: &str = "1.0";
const MAX_HISTORY: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub schema_version: String,
    pub machine: MachineInfo,
    #[serde(default)]
    pub builds: Vec<BuildRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineInfo {
    pub os: String,
    pub arch: String,
}

/// One completed build of a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub name: String,
    pub key: String,
    pub flavor: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Whether a cache package was written after the build.
    pub packaged: bool,
}

impl State {
    pub fn empty() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            machine: MachineInfo::detect(),
            builds: Vec::new(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let parent = ensure_parent_dir(path)?;
        let _guard = lock::acquire_shared_lock(
            &parent.join("state.lock"),
            Duration::from_secs(5),
            "state read",
        )
        .map_err(|e| CoreError::StateRead(format!("Failed to acquire shared lock: {}", e)))?;
        read_unlocked(path)
    }

    /// Load the state, or an empty one when the file is missing or unreadable.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|_| Self::empty())
    }

    /// Append a record to the history stored at `path`.
    ///
    /// Read, append and write happen under one exclusive lock so concurrent
    /// builds never drop each other's records.
    pub fn record(path: impl AsRef<Path>, record: BuildRecord) -> Result<()> {
        let path = path.as_ref();
        let parent = ensure_parent_dir(path)?;
        let _guard = acquire_write_lock(&parent)?;

        let mut state = if path.exists() {
            read_unlocked(path).unwrap_or_else(|_| Self::empty())
        } else {
            Self::empty()
        };
        state.push(record);
        write_unlocked(&state, path, &parent)
    }

    pub fn push(&mut self, record: BuildRecord) {
        self.builds.push(record);
        if self.builds.len() > MAX_HISTORY {
            let excess = self.builds.len() - MAX_HISTORY;
            self.builds.drain(..excess);
        }
    }
}

impl MachineInfo {
    pub fn detect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

fn ensure_parent_dir(path: &Path) -> Result<PathBuf> {
    let parent = path
        .parent()
        .ok_or_else(|| CoreError::StateWrite("State path has no parent directory".to_string()))?;
    std::fs::create_dir_all(parent)
        .map_err(|e| CoreError::StateWrite(format!("Failed to create parent dir: {}", e)))?;
    Ok(parent.to_path_buf())
}

fn acquire_write_lock(parent: &Path) -> Result<lock::LockGuard> {
    lock::acquire_lock(
        &parent.join("state.lock"),
        Duration::from_secs(30),
        "state update",
    )
    .map_err(|e| CoreError::StateWrite(format!("Failed to acquire lock: {}", e)))
}

fn read_unlocked(path: &Path) -> Result<State> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CoreError::StateRead(format!("Failed to read: {}", e)))?;
    let state: State = serde_json::from_str(&content)
        .map_err(|e| CoreError::StateRead(format!("Failed to parse: {}", e)))?;

    match state.schema_version.as_str() {
        SCHEMA_VERSION => Ok(state),
        other => Err(CoreError::StateInvalidSchema(other.to_string())),
    }
}

fn write_unlocked(state: &State, path: &Path, parent: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(state)
        .map_err(|e| CoreError::StateWrite(format!("Failed to serialize: {}", e)))?;

    let mut temp_file = NamedTempFile::new_in(parent)
        .map_err(|e| CoreError::StateWrite(format!("Failed to create temp file: {}", e)))?;
    temp_file
        .write_all(content.as_bytes())
        .map_err(|e| CoreError::StateWrite(format!("Failed to write temp file: {}", e)))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| CoreError::StateWrite(format!("Failed to sync temp file: {}", e)))?;
    temp_file
        .persist(path)
        .map_err(|e| CoreError::StateWrite(format!("Failed to persist temp file: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use depforge_testkit::temp_dir_in_workspace;

    fn record(key: &str, ms: u64) -> BuildRecord {
        BuildRecord {
            name: key.split('-').next().unwrap_or(key).to_string(),
            key: key.to_string(),
            flavor: "linux_clang".to_string(),
            started_at: Utc::now(),
            duration_ms: ms,
            packaged: true,
        }
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let temp = temp_dir_in_workspace();
        let state = State::load_or_empty(temp.path().join(".depforge/state.json"));
        assert_eq!(state.schema_version, "1.0");
        assert!(state.builds.is_empty());
    }

    #[test]
    fn test_record_appends_and_persists() {
        let temp = temp_dir_in_workspace();
        let path = temp.path().join(".depforge/state.json");

        State::record(&path, record("zlib-1.3", 1200)).unwrap();
        State::record(&path, record("lz4-1.9.4", 800)).unwrap();
        State::record(&path, record("zlib-1.3", 900)).unwrap();

        let state = State::load(&path).unwrap();
        assert_eq!(state.builds.len(), 3);
        let keys: Vec<_> = state.builds.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, ["zlib-1.3", "lz4-1.9.4", "zlib-1.3"]);
        assert_eq!(state.builds[2].duration_ms, 900);
    }

    #[test]
    fn test_unknown_schema_rejected() {
        let temp = temp_dir_in_workspace();
        let path = temp.path().join("state.json");
        let mut state = State::empty();
        state.schema_version = "9.9".to_string();
        std::fs::write(&path, serde_json::to_string(&state).unwrap()).unwrap();

        let err = State::load(&path).unwrap_err();
        assert!(matches!(err, CoreError::StateInvalidSchema(ref v) if v == "9.9"));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut state = State::empty();
        for i in 0..(MAX_HISTORY + 5) {
            state.push(record(&format!("lib-{}", i), i as u64));
        }
        assert_eq!(state.builds.len(), MAX_HISTORY);
        assert_eq!(state.builds[0].key, "lib-5");
    }

    #[test]
    fn test_corrupt_file_is_replaced_on_record() {
        let temp = temp_dir_in_workspace();
        let path = temp.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        State::record(&path, record("zlib-1.3", 10)).unwrap();
        assert_eq!(State::load(&path).unwrap().builds.len(), 1);
    }
}
