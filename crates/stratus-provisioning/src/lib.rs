//! ---
//! srt_section: "05-networking-external-interfaces"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Provisioning adapter abstractions."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
//! Adapter around the external declarative-provisioning binary.
//!
//! The runner only talks to [`ProvisioningRunner`]; [`TerraformManager`] is
//! the production implementation that shells out to `terraform`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use stratus_technique::{Outputs, Variables};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub mod install;
pub mod outputs;
pub mod terraform;

pub use install::TerraformInstaller;
pub use outputs::{friendly_error_message, parse_outputs};
pub use terraform::TerraformManager;

/// Marker written once `init` succeeded in a working directory.
pub const INITIALIZED_SENTINEL: &str = ".terraform-initialized";

/// Result alias used throughout the provisioning crate.
pub type Result<T> = std::result::Result<T, ProvisionError>;

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
    #[error("unable to install terraform: {0}")]
    Install(String),
    #[error("unable to download {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("checksum mismatch for {file}: expected {expected}, got {actual}")]
    Checksum {
        file: String,
        expected: String,
        actual: String,
    },
    #[error("unable to run {binary}: {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("terraform {command} failed ({status}): {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("unable to parse terraform outputs: {0}")]
    Outputs(#[from] serde_json::Error),
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProvisionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Operations the runner needs from the provisioning tool.
///
/// Every call must return [`ProvisionError::Cancelled`] as soon as `cancel` fires.
#[async_trait]
pub trait ProvisioningRunner: Send + Sync {
    /// Prepare `directory` (plugin download, backend setup).
    async fn init(&self, directory: &Path, cancel: &CancellationToken) -> Result<()>;

    /// Create the prerequisites described in `directory` and return their outputs.
    async fn apply(
        &self,
        directory: &Path,
        variables: &Variables,
        cancel: &CancellationToken,
    ) -> Result<Outputs>;

    /// Tear down the prerequisites with the variables used at apply time.
    async fn destroy(
        &self,
        directory: &Path,
        variables: &Variables,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Run [`ProvisioningRunner::init`] unless the sentinel marker already exists.
    async fn ensure_initialized(&self, directory: &Path, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(ProvisionError::Cancelled);
        }
        let sentinel = directory.join(INITIALIZED_SENTINEL);
        if sentinel.is_file() {
            debug!(directory = %directory.display(), "working directory already initialized");
            return Ok(());
        }
        info!(directory = %directory.display(), "initializing terraform to spin up technique prerequisites");
        self.init(directory, cancel).await?;
        tokio::fs::write(&sentinel, b"")
            .await
            .map_err(|err| ProvisionError::io(&sentinel, err))
    }
}

/// Await `future` unless `cancel` fires first.
pub(crate) async fn cancellable<F, T>(cancel: &CancellationToken, future: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProvisionError::Cancelled),
        result = future => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingInit {
        inits: AtomicUsize,
    }

    #[async_trait]
    impl ProvisioningRunner for CountingInit {
        async fn init(&self, _: &Path, _: &CancellationToken) -> Result<()> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn apply(&self, _: &Path, _: &Variables, _: &CancellationToken) -> Result<Outputs> {
            Ok(Outputs::new())
        }

        async fn destroy(&self, _: &Path, _: &Variables, _: &CancellationToken) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn init_runs_once_per_directory() {
        let dir = tempfile::tempdir().unwrap();
        let runner = CountingInit::default();
        let cancel = CancellationToken::new();
        runner.ensure_initialized(dir.path(), &cancel).await.unwrap();
        runner.ensure_initialized(dir.path(), &cancel).await.unwrap();
        assert_eq!(runner.inits.load(Ordering::SeqCst), 1);
        assert!(dir.path().join(INITIALIZED_SENTINEL).is_file());
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let runner = CountingInit::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = runner
            .ensure_initialized(dir.path(), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(runner.inits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellable_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = cancellable(&cancel, async { Ok(42) }).await;
        assert!(matches!(result, Err(ProvisionError::Cancelled)));
    }
}
