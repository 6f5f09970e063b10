//! ---
//! srt_section: "01-core-functionality"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Runner error taxonomy."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::path::PathBuf;

use stratus_persistence::StateError;

/// Errors returned by [`crate::Runner`] operations.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The caller cancelled the operation. Never wrapped.
    #[error("operation cancelled")]
    Cancelled,
    #[error("{id} has already been detonated and is not idempotent. Revert it with 'stratus revert' before detonating it again, or use --force")]
    NotIdempotent { id: String },
    #[error("{id} is not in DETONATED state and should not need to be reverted, use --force to force")]
    NotDetonated { id: String },
    #[error("{id} is already COLD and should already be clean, use --force to force cleanup")]
    AlreadyCold { id: String },
    #[error("unable to set up state for {id}: {source}")]
    Setup {
        id: String,
        #[source]
        source: StateError,
    },
    #[error("unable to extract Terraform file: {source}")]
    Extract {
        #[source]
        source: StateError,
    },
    #[error("unable to retrieve outputs of {id}: {source}")]
    Outputs {
        id: String,
        #[source]
        source: StateError,
    },
    #[error("unable to run terraform apply on prerequisite: {message}")]
    Apply { message: String },
    #[error("unable to cleanup TTP prerequisites: {message}")]
    Destroy { message: String },
    #[error("error while detonating attack technique {id}: {cause:#}")]
    Detonation { id: String, cause: anyhow::Error },
    #[error("unable to revert detonation of {id}: {cause:#}")]
    Reversion { id: String, cause: anyhow::Error },
    #[error("unable to revert detonation of {id} before cleaning up (use --force to cleanup anyway): {source}")]
    RevertBeforeCleanup {
        id: String,
        #[source]
        source: Box<RunnerError>,
    },
    #[error("unable to remove technique directory {path}: {source}")]
    RemoveDirectory {
        path: PathBuf,
        #[source]
        source: StateError,
    },
}

impl RunnerError {
    /// Whether this error means "user aborted" rather than a genuine failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True for errors raised because the technique was in the wrong state.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotIdempotent { .. } | Self::NotDetonated { .. } | Self::AlreadyCold { .. }
        )
    }
}
