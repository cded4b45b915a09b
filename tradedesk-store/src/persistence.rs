//! Persistence for collection preferences (filters and selection).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tradedesk_core::{EntityId, EntityKind, ListQuery, TenantId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedCollection {
    #[serde(default)]
    pub filters: ListQuery,
    #[serde(default)]
    pub selected_ids: Vec<EntityId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Tenant the preferences were saved for; never applied to another one.
    pub tenant_id: Option<TenantId>,
    #[serde(default)]
    pub collections: BTreeMap<EntityKind, PersistedCollection>,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Read saved preferences. A missing file is not an error.
pub fn load(path: &Path) -> Result<Option<PersistedState>, PersistenceError> {
    let contents = match std::fs::read(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(serde_json::from_slice(&contents)?))
}

/// Write preferences atomically: a crash mid-save leaves the previous file
/// intact, never a truncated one.
pub fn save(path: &Path, state: &PersistedState) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_vec_pretty(state)?;

    let staging = staging_path(path);
    let mut file = std::fs::File::create(&staging)?;
    file.write_all(&contents)?;
    file.sync_all()?;
    drop(file);

    if let Err(err) = std::fs::rename(&staging, path) {
        let _ = std::fs::remove_file(&staging);
        return Err(err.into());
    }
    tracing::debug!(path = %path.display(), bytes = contents.len(), "preferences saved");
    Ok(())
}

/// Sibling of `path`, so the rename never crosses a filesystem.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("preferences"));
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("state.json")).unwrap().is_none());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/prefs/state.json");

        let mut state = PersistedState {
            tenant_id: Some(TenantId::new_v4()),
            ..PersistedState::default()
        };
        state.collections.insert(
            EntityKind::Invoice,
            PersistedCollection {
                filters: ListQuery {
                    status: Some("sent".to_string()),
                    ..ListQuery::default()
                },
                selected_ids: vec![EntityId::from("12")],
            },
        );

        save(&path, &state).unwrap();
        assert_eq!(load(&path).unwrap(), Some(state));
    }

    #[test]
    fn save_replaces_the_file_without_leaving_a_staging_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        save(&path, &PersistedState::default()).unwrap();
        let second = PersistedState {
            tenant_id: Some(TenantId::new_v4()),
            ..PersistedState::default()
        };
        save(&path, &second).unwrap();

        assert_eq!(load(&path).unwrap(), Some(second));
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![OsString::from("state.json")]);
    }

    #[test]
    fn failed_save_keeps_the_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let first = PersistedState {
            tenant_id: Some(TenantId::new_v4()),
            ..PersistedState::default()
        };
        save(&path, &first).unwrap();

        // A directory squatting on the staging name makes the write fail.
        std::fs::create_dir(staging_path(&path)).unwrap();
        assert!(matches!(
            save(&path, &PersistedState::default()),
            Err(PersistenceError::Io(_))
        ));
        assert_eq!(load(&path).unwrap(), Some(first));
    }

    #[test]
    fn corrupt_files_report_serde_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load(&path), Err(PersistenceError::Serde(_))));
    }
}
