//! ---
//! srt_section: "11-simulation"
//! srt_subsection: "01-bootstrap"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Recording provisioning runner."
//! srt_version: "v0.1.0"
//! srt_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use stratus_provisioning::{ProvisionError, ProvisioningRunner, Result};
use stratus_technique::{Outputs, Variables};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionCall {
    Init(PathBuf),
    Apply(PathBuf, Variables),
    Destroy(PathBuf, Variables),
}

#[derive(Debug, Default)]
struct Behaviour {
    outputs: Outputs,
    apply_error: Option<String>,
    destroy_error: Option<String>,
    cancel_apply: bool,
}

/// [`ProvisioningRunner`] that records calls and returns scripted results.
#[derive(Debug, Default)]
pub struct FakeProvisioner {
    calls: Mutex<Vec<ProvisionCall>>,
    behaviour: Mutex<Behaviour>,
}

impl FakeProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outputs returned by every successful apply.
    pub fn with_outputs<I, K, V>(self, outputs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.behaviour.lock().outputs = outputs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn fail_apply(&self, stderr: impl Into<String>) {
        self.behaviour.lock().apply_error = Some(stderr.into());
    }

    pub fn fail_destroy(&self, stderr: impl Into<String>) {
        self.behaviour.lock().destroy_error = Some(stderr.into());
    }

    /// Make apply report a cancellation, as if the operator pressed Ctrl-C mid-run.
    pub fn cancel_apply(&self) {
        self.behaviour.lock().cancel_apply = true;
    }

    pub fn reset_failures(&self) {
        let mut behaviour = self.behaviour.lock();
        behaviour.apply_error = None;
        behaviour.destroy_error = None;
        behaviour.cancel_apply = false;
    }

    pub fn calls(&self) -> Vec<ProvisionCall> {
        self.calls.lock().clone()
    }

    pub fn init_count(&self) -> usize {
        self.count(|call| matches!(call, ProvisionCall::Init(_)))
    }

    pub fn apply_count(&self) -> usize {
        self.count(|call| matches!(call, ProvisionCall::Apply(..)))
    }

    pub fn destroy_count(&self) -> usize {
        self.count(|call| matches!(call, ProvisionCall::Destroy(..)))
    }

    /// Variables passed to the most recent destroy.
    pub fn last_destroy_variables(&self) -> Option<Variables> {
        self.calls.lock().iter().rev().find_map(|call| match call {
            ProvisionCall::Destroy(_, variables) => Some(variables.clone()),
            _ => None,
        })
    }

    fn count(&self, predicate: impl Fn(&ProvisionCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }
}

fn failure(command: &str, stderr: &str) -> ProvisionError {
    ProvisionError::Command {
        command: command.to_owned(),
        status: "exit status: 1".to_owned(),
        stderr: stderr.to_owned(),
    }
}

#[async_trait]
impl ProvisioningRunner for FakeProvisioner {
    async fn init(&self, directory: &Path, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(ProvisionError::Cancelled);
        }
        self.calls
            .lock()
            .push(ProvisionCall::Init(directory.to_path_buf()));
        Ok(())
    }

    async fn apply(
        &self,
        directory: &Path,
        variables: &Variables,
        cancel: &CancellationToken,
    ) -> Result<Outputs> {
        if cancel.is_cancelled() {
            return Err(ProvisionError::Cancelled);
        }
        self.calls.lock().push(ProvisionCall::Apply(
            directory.to_path_buf(),
            variables.clone(),
        ));
        let behaviour = self.behaviour.lock();
        if behaviour.cancel_apply {
            return Err(ProvisionError::Cancelled);
        }
        if let Some(stderr) = &behaviour.apply_error {
            return Err(failure("apply", stderr));
        }
        Ok(behaviour.outputs.clone())
    }

    async fn destroy(
        &self,
        directory: &Path,
        variables: &Variables,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(ProvisionError::Cancelled);
        }
        self.calls.lock().push(ProvisionCall::Destroy(
            directory.to_path_buf(),
            variables.clone(),
        ));
        match &self.behaviour.lock().destroy_error {
            Some(stderr) => Err(failure("destroy", stderr)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_and_scripted_results() {
        let fake = FakeProvisioner::new().with_outputs([("bucket", "stratus-bucket")]);
        let cancel = CancellationToken::new();
        let dir = Path::new("/state/aws.one");

        let outputs = fake.apply(dir, &Variables::new(), &cancel).await.unwrap();
        assert_eq!(outputs["bucket"], "stratus-bucket");

        fake.fail_destroy("BucketNotEmpty");
        let err = fake.destroy(dir, &Variables::new(), &cancel).await.unwrap_err();
        assert!(err.to_string().contains("BucketNotEmpty"));
        assert_eq!(fake.apply_count(), 1);
        assert_eq!(fake.destroy_count(), 1);
    }
}
