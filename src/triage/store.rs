use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::StoreError;

pub const ISSUES_FILE: &str = "issues.json";
pub const FINDINGS_FILE: &str = "findings.json";
pub const STATE_FILE: &str = "state.json";

/// Load a JSON document, returning `T::default()` if the file is missing.
///
/// A present but malformed file is an error; nothing is repaired here.
pub fn load_json<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let content = fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Atomically write a JSON document via a `.tmp` sibling and rename.
pub fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StoreError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let content = serde_json::to_string_pretty(data).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, content).map_err(|source| StoreError::Write {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// The triage data directory: `issues.json`, `findings.json`, `state.json`.
///
/// Holds paths only. Every accessor goes back to disk so that documents
/// rewritten by the upstream producer are visible on the next request.
#[derive(Debug, Clone)]
pub struct TriageStore {
    dir: PathBuf,
}

impl TriageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn issues_path(&self) -> PathBuf {
        self.dir.join(ISSUES_FILE)
    }

    pub fn findings_path(&self) -> PathBuf {
        self.dir.join(FINDINGS_FILE)
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    /// Run blocking store work on the blocking pool.
    pub async fn call<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&TriageStore) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| StoreError::Join(e.to_string()))?
    }
}
