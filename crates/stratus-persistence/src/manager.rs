//! ---
//! srt_section: "03-persistence-logging"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Per-technique state directory management."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use stratus_technique::{AttackTechniqueState, Outputs, Variables};
use tracing::{debug, info, warn};

use crate::datastore::{DataStore, FileSystemDataStore};
use crate::{Result, StateError};

/// Raw lifecycle state bytes.
pub const STATE_FILE_NAME: &str = ".state";
/// Materialized provisioning template.
pub const TERRAFORM_FILE_NAME: &str = "main.tf";
/// JSON map of provisioning outputs.
pub const TERRAFORM_OUTPUTS_FILE_NAME: &str = ".terraform-outputs";
/// JSON map of the variables used at apply time.
pub const TERRAFORM_VARIABLES_FILE_NAME: &str = ".terraform-vars";

/// Durable state of a single technique.
pub trait StateManager: Send + Sync {
    /// Root directory holding every technique directory.
    fn root_directory(&self) -> &Path;
    /// Directory private to this technique.
    fn technique_directory(&self) -> &Path;
    /// Write the provisioning template into the technique directory.
    fn extract_technique(&self, template: &[u8]) -> Result<()>;
    /// Remove the technique directory and forget the data store contents.
    fn cleanup_technique(&mut self) -> Result<()>;
    /// Persisted provisioning outputs, empty when none were written.
    fn terraform_outputs(&self) -> Result<Outputs>;
    /// Persist provisioning outputs.
    fn write_terraform_outputs(&self, outputs: &Outputs) -> Result<()>;
    /// Persisted provisioning variables, empty when none were written.
    fn terraform_variables(&self) -> Result<Variables>;
    /// Persist provisioning variables.
    fn write_terraform_variables(&self, variables: &Variables) -> Result<()>;
    /// Current lifecycle state; `Cold` when nothing is persisted.
    fn technique_state(&self) -> AttackTechniqueState;
    /// Persist a lifecycle state.
    fn set_technique_state(&self, state: AttackTechniqueState) -> Result<()>;
    /// Scratch key/value store of the technique.
    fn data_store(&mut self) -> &mut dyn DataStore;
}

/// [`StateManager`] storing everything under `<root>/<technique id>/`.
#[derive(Debug)]
pub struct FileSystemStateManager {
    root: PathBuf,
    technique_directory: PathBuf,
    data_store: FileSystemDataStore,
}

impl FileSystemStateManager {
    /// Open the state of `technique_id`, creating the root directory when missing.
    ///
    /// The technique directory itself is only created by the first write.
    pub fn new(root: impl Into<PathBuf>, technique_id: &str) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            info!(root = %root.display(), "creating state directory as it doesn't exist yet");
            fs::create_dir_all(&root).map_err(|source| StateError::CreateRoot {
                path: root.clone(),
                source,
            })?;
        }
        let technique_directory = root.join(technique_id);
        let data_store = FileSystemDataStore::load(&technique_directory)?;
        Ok(Self {
            root,
            technique_directory,
            data_store,
        })
    }

    fn file(&self, name: &str) -> PathBuf {
        self.technique_directory.join(name)
    }

    fn write_file(&self, name: &str, contents: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.technique_directory)
            .map_err(|err| StateError::io(&self.technique_directory, err))?;
        let path = self.file(name);
        fs::write(&path, contents).map_err(|err| StateError::io(&path, err))
    }

    fn read_map(&self, name: &str) -> Result<BTreeMap<String, String>> {
        let path = self.file(name);
        match fs::read(&path) {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|err| StateError::json(&path, err)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(StateError::io(&path, err)),
        }
    }

    fn write_map(&self, name: &str, values: &BTreeMap<String, String>) -> Result<()> {
        let data = serde_json::to_vec(values).map_err(|err| StateError::json(self.file(name), err))?;
        self.write_file(name, &data)
    }
}

impl StateManager for FileSystemStateManager {
    fn root_directory(&self) -> &Path {
        &self.root
    }

    fn technique_directory(&self) -> &Path {
        &self.technique_directory
    }

    fn extract_technique(&self, template: &[u8]) -> Result<()> {
        debug!(directory = %self.technique_directory.display(), "extracting provisioning template");
        self.write_file(TERRAFORM_FILE_NAME, template)
    }

    fn cleanup_technique(&mut self) -> Result<()> {
        match fs::remove_dir_all(&self.technique_directory) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(StateError::io(&self.technique_directory, err)),
        }
        self.data_store = FileSystemDataStore::empty(&self.technique_directory);
        Ok(())
    }

    fn terraform_outputs(&self) -> Result<Outputs> {
        self.read_map(TERRAFORM_OUTPUTS_FILE_NAME)
    }

    fn write_terraform_outputs(&self, outputs: &Outputs) -> Result<()> {
        self.write_map(TERRAFORM_OUTPUTS_FILE_NAME, outputs)
    }

    fn terraform_variables(&self) -> Result<Variables> {
        self.read_map(TERRAFORM_VARIABLES_FILE_NAME)
    }

    fn write_terraform_variables(&self, variables: &Variables) -> Result<()> {
        self.write_map(TERRAFORM_VARIABLES_FILE_NAME, variables)
    }

    fn technique_state(&self) -> AttackTechniqueState {
        let path = self.file(STATE_FILE_NAME);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return AttackTechniqueState::Cold,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unable to read technique state, assuming COLD");
                return AttackTechniqueState::Cold;
            }
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return AttackTechniqueState::Cold;
        }
        AttackTechniqueState::from_str(trimmed).unwrap_or_else(|_| {
            warn!(path = %path.display(), state = trimmed, "unknown technique state, assuming COLD");
            AttackTechniqueState::Cold
        })
    }

    fn set_technique_state(&self, state: AttackTechniqueState) -> Result<()> {
        self.write_file(STATE_FILE_NAME, state.as_ref().as_bytes())
    }

    fn data_store(&mut self) -> &mut dyn DataStore {
        &mut self.data_store
    }
}
