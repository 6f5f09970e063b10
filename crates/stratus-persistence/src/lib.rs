//! ---
//! srt_section: "03-persistence-logging"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Persistence abstractions and storage bindings."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Durable per-technique state.
//!
//! Every technique owns a directory named after its identifier under the
//! state root. The [`StateManager`] reads and writes the lifecycle state and
//! provisioning artifacts in it; the [`DataStore`] is a scratch key/value map
//! persisted next to them.

use std::path::PathBuf;

/// Result alias used throughout the persistence crate.
pub type Result<T> = std::result::Result<T, StateError>;

/// Error type for the persistence subsystem.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Reading or writing a state file failed.
    #[error("io error on {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A persisted JSON document could not be encoded or decoded.
    #[error("invalid json in {path}: {source}")]
    Json {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// The state root could not be created.
    #[error("unable to create persistent directory {path}: {source}")]
    CreateRoot {
        /// Requested root directory.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The data store has no entry for the key.
    #[error("key not found: {0}")]
    KeyNotFound(String),
}

impl StateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

pub mod datastore;
pub mod manager;

pub use datastore::{DataStore, FileSystemDataStore, DATA_STORE_FILE_NAME};
pub use manager::{
    FileSystemStateManager, StateManager, STATE_FILE_NAME, TERRAFORM_FILE_NAME,
    TERRAFORM_OUTPUTS_FILE_NAME, TERRAFORM_VARIABLES_FILE_NAME,
};
