use std::fs::OpenOptions;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use fs2::FileExt;

use super::models::{StateDocument, TriageEntry, TriageStatus};
use super::store::{TriageStore, load_json, save_json};
use crate::errors::StoreError;

/// Current time as a sortable RFC 3339 UTC timestamp.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl TriageStore {
    /// Load `state.json`, defaulting `triaged` to an empty map.
    pub fn load_state(&self) -> Result<StateDocument, StoreError> {
        load_json(&self.state_path())
    }

    /// Record a triage decision for `number`, replacing any previous entry.
    ///
    /// The read-modify-write holds an exclusive lock on `state.json.lock`
    /// so concurrent records for different issues are not lost.
    pub fn record(
        &self,
        number: u64,
        action: TriageStatus,
        comment_posted: bool,
        note: &str,
    ) -> Result<TriageEntry, StoreError> {
        let state_path = self.state_path();
        let lock_path = state_path.with_extension("json.lock");
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|source| StoreError::Lock {
                path: lock_path.clone(),
                source,
            })?;
        lock_file.lock_exclusive().map_err(|source| StoreError::Lock {
            path: lock_path.clone(),
            source,
        })?;

        let result = write_entry(&state_path, number, action, comment_posted, note);

        // Dropping the handle releases the lock as well; unlock errors are not actionable.
        let _ = FileExt::unlock(&lock_file);

        if let Ok(entry) = &result {
            tracing::info!(number, action = entry.action.as_str(), "recorded triage decision");
        }
        result
    }
}

fn write_entry(
    state_path: &Path,
    number: u64,
    action: TriageStatus,
    comment_posted: bool,
    note: &str,
) -> Result<TriageEntry, StoreError> {
    let mut state: StateDocument = load_json(state_path)?;
    let entry = TriageEntry {
        action,
        at: now_timestamp(),
        comment_posted,
        note: note.to_string(),
    };
    state
        .insert(number, &entry)
        .map_err(|source| StoreError::Serialize {
            path: state_path.to_path_buf(),
            source,
        })?;
    save_json(state_path, &state)?;
    Ok(entry)
}
