//! ---
//! srt_section: "03-persistence-logging"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Technique-scoped key/value scratch store."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{Result, StateError};

/// File holding the data store inside the technique directory.
pub const DATA_STORE_FILE_NAME: &str = "data.json";

/// Flat string map a technique can use to remember facts across invocations.
pub trait DataStore: Send {
    /// Whether `key` has a value.
    fn has(&self, key: &str) -> bool;
    /// Value stored under `key`.
    fn get(&self, key: &str) -> Result<String>;
    /// Store `value` under `key` and persist.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    /// Remove `key` and persist.
    fn clear(&mut self, key: &str) -> Result<()>;
    /// Remove every key and persist.
    fn clear_all(&mut self) -> Result<()>;
}

/// [`DataStore`] backed by a JSON file. Every mutation rewrites the whole map.
#[derive(Debug, Clone)]
pub struct FileSystemDataStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileSystemDataStore {
    /// Load the store from `technique_directory`; a missing file yields an empty store
    /// and is not created until the first write.
    pub fn load(technique_directory: &Path) -> Result<Self> {
        let path = technique_directory.join(DATA_STORE_FILE_NAME);
        let values = if path.is_file() {
            let raw = fs::read(&path).map_err(|err| StateError::io(&path, err))?;
            serde_json::from_slice(&raw).map_err(|err| StateError::json(&path, err))?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, values })
    }

    /// Empty store bound to `technique_directory`, ignoring anything on disk.
    pub fn empty(technique_directory: &Path) -> Self {
        Self {
            path: technique_directory.join(DATA_STORE_FILE_NAME),
            values: BTreeMap::new(),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| StateError::io(parent, err))?;
        }
        let data =
            serde_json::to_vec(&self.values).map_err(|err| StateError::json(&self.path, err))?;
        fs::write(&self.path, data).map_err(|err| StateError::io(&self.path, err))?;
        debug!(path = %self.path.display(), entries = self.values.len(), "data store saved");
        Ok(())
    }
}

impl DataStore for FileSystemDataStore {
    fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn get(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| StateError::KeyNotFound(key.to_owned()))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_owned(), value.to_owned());
        self.save()
    }

    fn clear(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_none() {
            return Err(StateError::KeyNotFound(key.to_owned()));
        }
        self.save()
    }

    fn clear_all(&mut self) -> Result<()> {
        self.values.clear();
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_created_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemDataStore::load(dir.path()).unwrap();
        assert!(!store.has("foo"));
        assert!(!dir.path().join(DATA_STORE_FILE_NAME).exists());
    }

    #[test]
    fn set_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSystemDataStore::load(dir.path()).unwrap();
        store.set("foo", "bar").unwrap();
        assert_eq!(store.get("foo").unwrap(), "bar");

        let raw = fs::read_to_string(dir.path().join(DATA_STORE_FILE_NAME)).unwrap();
        assert_eq!(raw, r#"{"foo":"bar"}"#);

        let reloaded = FileSystemDataStore::load(dir.path()).unwrap();
        assert!(reloaded.has("foo"));
    }

    #[test]
    fn get_and_clear_unknown_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSystemDataStore::load(dir.path()).unwrap();
        assert!(matches!(store.get("nope"), Err(StateError::KeyNotFound(key)) if key == "nope"));
        assert!(matches!(store.clear("nope"), Err(StateError::KeyNotFound(_))));
    }

    #[test]
    fn clear_removes_single_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSystemDataStore::load(dir.path()).unwrap();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.clear("a").unwrap();
        assert!(!store.has("a"));
        assert!(store.has("b"));

        store.clear_all().unwrap();
        let reloaded = FileSystemDataStore::load(dir.path()).unwrap();
        assert!(!reloaded.has("b"));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DATA_STORE_FILE_NAME), "{not json").unwrap();
        assert!(matches!(
            FileSystemDataStore::load(dir.path()),
            Err(StateError::Json { .. })
        ));
    }

    #[test]
    fn save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("aws.discovery.ses-enumerate");
        let mut store = FileSystemDataStore::load(&nested).unwrap();
        store.set("identity", "stratus@example.invalid").unwrap();
        assert!(nested.join(DATA_STORE_FILE_NAME).is_file());
    }
}
