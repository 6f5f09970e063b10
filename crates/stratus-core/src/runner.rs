//! ---
//! srt_section: "01-core-functionality"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Technique lifecycle state machine."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stratus_common::StratusConfig;
use stratus_logging::{log_lifecycle_event, srt_info, srt_warn, LifecycleOutcome, LogContext};
use stratus_persistence::{DataStore, FileSystemStateManager, StateManager};
use stratus_provisioning::{friendly_error_message, ProvisionError, ProvisioningRunner};
use stratus_technique::{AttackTechnique, AttackTechniqueState, CloudProviders, Outputs, Variables};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::error::RunnerError;

/// Output whose value is shown to the operator after warm-up.
const DISPLAY_OUTPUT: &str = "display";

/// Collaborators shared by every runner of one invocation.
#[derive(Clone)]
pub struct RunnerContext {
    pub state_root: PathBuf,
    pub provisioner: Arc<dyn ProvisioningRunner>,
    pub providers: Arc<dyn CloudProviders>,
    pub config: Arc<StratusConfig>,
    pub cancel: CancellationToken,
}

impl RunnerContext {
    /// Configuration-driven variables for `technique`, limited to the ones it declares.
    pub fn variables_for(&self, technique: &AttackTechnique) -> Variables {
        if technique.terraform_variables().is_empty() {
            return Variables::new();
        }
        self.config
            .terraform_variables(technique.id(), technique.terraform_variables())
    }
}

/// Drives one technique through `COLD -> WARM -> DETONATED -> WARM -> COLD`.
pub struct Runner {
    technique: Arc<AttackTechnique>,
    state: AttackTechniqueState,
    force: bool,
    state_manager: Box<dyn StateManager>,
    provisioner: Arc<dyn ProvisioningRunner>,
    providers: Arc<dyn CloudProviders>,
    variables: Variables,
    cancel: CancellationToken,
    platform: String,
    correlation_id: String,
}

impl Runner {
    /// Build a runner backed by the technique's directory under the context state root.
    pub fn from_context(
        context: &RunnerContext,
        technique: Arc<AttackTechnique>,
        force: bool,
    ) -> Result<Self, RunnerError> {
        let state_manager = FileSystemStateManager::new(&context.state_root, technique.id())
            .map_err(|source| RunnerError::Setup {
                id: technique.id().to_owned(),
                source,
            })?;
        Ok(Self::with_state_manager(
            context,
            technique,
            Box::new(state_manager),
            force,
        ))
    }

    /// Build a runner around an existing state manager.
    pub fn with_state_manager(
        context: &RunnerContext,
        technique: Arc<AttackTechnique>,
        state_manager: Box<dyn StateManager>,
        force: bool,
    ) -> Self {
        let state = state_manager.technique_state();
        let variables = context.variables_for(&technique);
        Self {
            platform: technique.platform().to_string(),
            correlation_id: context.providers.correlation_id().to_string(),
            technique,
            state,
            force,
            state_manager,
            provisioner: Arc::clone(&context.provisioner),
            providers: Arc::clone(&context.providers),
            variables,
            cancel: context.cancel.clone(),
        }
    }

    pub fn technique(&self) -> &AttackTechnique {
        &self.technique
    }

    /// Lifecycle state as known by this runner.
    pub fn state(&self) -> AttackTechniqueState {
        self.state
    }

    pub fn correlation_id(&self) -> Uuid {
        self.providers.correlation_id()
    }

    pub fn technique_directory(&self) -> &Path {
        self.state_manager.technique_directory()
    }

    pub fn data_store(&mut self) -> &mut dyn DataStore {
        self.state_manager.data_store()
    }

    fn id(&self) -> &str {
        self.technique.id()
    }

    fn log_context(&self) -> LogContext<'_> {
        LogContext::new()
            .with_technique(self.technique.id())
            .with_platform(&self.platform)
            .with_correlation_id(&self.correlation_id)
    }

    fn check_cancelled(&self) -> Result<(), RunnerError> {
        if self.cancel.is_cancelled() {
            return Err(RunnerError::Cancelled);
        }
        Ok(())
    }

    fn persisted_outputs(&self) -> Result<Outputs, RunnerError> {
        self.state_manager
            .terraform_outputs()
            .map_err(|source| RunnerError::Outputs {
                id: self.id().to_owned(),
                source,
            })
    }

    /// Persist `state`; a write failure is logged and the in-memory state still advances.
    fn set_state(&mut self, state: AttackTechniqueState) {
        if let Err(err) = self.state_manager.set_technique_state(state) {
            srt_warn!(context = self.log_context(), "unable to set technique state: {err}");
        }
        self.state = state;
        log_lifecycle_event(
            Some(&self.log_context()),
            "state-transition",
            &format!("{} is now {}", self.id(), state),
            LifecycleOutcome::Success,
        );
    }

    async fn provision(
        &self,
        directory: &Path,
        variables: &Variables,
    ) -> Result<Outputs, ProvisionError> {
        self.provisioner
            .ensure_initialized(directory, &self.cancel)
            .await?;
        self.provisioner
            .apply(directory, variables, &self.cancel)
            .await
    }

    async fn teardown(&self, directory: &Path, variables: &Variables) -> Result<(), ProvisionError> {
        self.provisioner
            .ensure_initialized(directory, &self.cancel)
            .await?;
        self.provisioner
            .destroy(directory, variables, &self.cancel)
            .await
    }

    /// Provision the technique prerequisites and return their outputs.
    ///
    /// Already warm (unless forced) or detonated techniques return the persisted
    /// outputs without provisioning.
    pub async fn warm_up(&mut self) -> Result<Outputs, RunnerError> {
        self.check_cancelled()?;
        let technique = Arc::clone(&self.technique);
        let Some(template) = technique.prerequisites() else {
            debug!(technique = self.id(), "no prerequisites to spin up");
            return Ok(Outputs::new());
        };

        self.state_manager
            .extract_technique(template)
            .map_err(|source| RunnerError::Extract { source })?;

        if self.state == AttackTechniqueState::Warm && !self.force {
            srt_info!(
                context = self.log_context(),
                "Not warming up - {} is already warm. Use --force to force",
                self.id()
            );
            return self.persisted_outputs();
        }
        if self.state == AttackTechniqueState::Detonated {
            srt_info!(
                context = self.log_context(),
                "{} has been detonated but not cleaned up, not warming up as it should be warm already",
                self.id()
            );
            return self.persisted_outputs();
        }

        srt_info!(context = self.log_context(), "Warming up {}", self.id());
        let directory = self.state_manager.technique_directory().to_path_buf();
        let variables = self.variables.clone();
        let outputs = match self.provision(&directory, &variables).await {
            Ok(outputs) => outputs,
            Err(err) => {
                srt_warn!(
                    context = self.log_context(),
                    "Error during warm up. Cleaning up technique prerequisites with terraform destroy"
                );
                if let Err(destroy_err) = self
                    .provisioner
                    .destroy(&directory, &variables, &self.cancel)
                    .await
                {
                    debug!(technique = self.id(), error = %destroy_err, "best-effort destroy after failed apply did not succeed");
                }
                log_lifecycle_event(
                    Some(&self.log_context()),
                    "warmup",
                    &err.to_string(),
                    LifecycleOutcome::Fault,
                );
                if err.is_cancelled() {
                    return Err(RunnerError::Cancelled);
                }
                return Err(RunnerError::Apply {
                    message: friendly_error_message(&err.to_string()),
                });
            }
        };

        if let Err(err) = self.state_manager.write_terraform_outputs(&outputs) {
            srt_warn!(context = self.log_context(), "unable to persist terraform outputs: {err}");
        }
        if let Err(err) = self.state_manager.write_terraform_variables(&variables) {
            srt_warn!(context = self.log_context(), "unable to persist terraform variables: {err}");
        }
        self.set_state(AttackTechniqueState::Warm);

        if let Some(shown) = outputs.get(DISPLAY_OUTPUT) {
            srt_info!(context = self.log_context(), "{}", shown.replace("\\n", "\n"));
        }
        Ok(outputs)
    }

    /// Run the technique's attack, warming it up first when needed.
    pub async fn detonate(&mut self) -> Result<(), RunnerError> {
        self.check_cancelled()?;
        let mut will_warm_up = true;
        if self.state == AttackTechniqueState::Detonated {
            if !self.technique.is_idempotent() && !self.force {
                return Err(RunnerError::NotIdempotent {
                    id: self.id().to_owned(),
                });
            }
            will_warm_up = false;
        }

        if self.technique.is_slow() {
            srt_warn!(
                context = self.log_context(),
                "Note: This is a slow attack technique, it might take a long time to warm up or detonate"
            );
        }

        let outputs = if will_warm_up {
            self.warm_up().await?
        } else {
            self.persisted_outputs()?
        };

        srt_info!(context = self.log_context(), "Detonating {}", self.id());
        let technique = Arc::clone(&self.technique);
        let detonation = technique
            .detonator()
            .detonate(&outputs, self.providers.as_ref());
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(RunnerError::Cancelled),
            result = detonation => result,
        };
        result.map_err(|cause| RunnerError::Detonation {
            id: self.id().to_owned(),
            cause,
        })?;

        self.set_state(AttackTechniqueState::Detonated);
        Ok(())
    }

    /// Undo a detonation. Techniques without a reverter only log a warning.
    pub async fn revert(&mut self) -> Result<(), RunnerError> {
        self.check_cancelled()?;
        if self.state != AttackTechniqueState::Detonated && !self.force {
            return Err(RunnerError::NotDetonated {
                id: self.id().to_owned(),
            });
        }

        let outputs = self.persisted_outputs()?;
        let technique = Arc::clone(&self.technique);
        match technique.reverter() {
            Some(reverter) => {
                srt_info!(context = self.log_context(), "Reverting detonation of technique {}", self.id());
                let reversion = reverter.revert(&outputs, self.providers.as_ref());
                let result = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Err(RunnerError::Cancelled),
                    result = reversion => result,
                };
                result.map_err(|cause| RunnerError::Reversion {
                    id: self.id().to_owned(),
                    cause,
                })?;
            }
            None => {
                srt_warn!(
                    context = self.log_context(),
                    "{} has no revert capability, nothing to revert",
                    self.id()
                );
            }
        }

        self.set_state(AttackTechniqueState::Warm);
        Ok(())
    }

    /// Tear down the prerequisites and remove the technique directory.
    pub async fn clean_up(&mut self) -> Result<(), RunnerError> {
        self.check_cancelled()?;
        if self.state == AttackTechniqueState::Cold && !self.force {
            return Err(RunnerError::AlreadyCold {
                id: self.id().to_owned(),
            });
        }

        srt_info!(context = self.log_context(), "Cleaning up {}", self.id());

        if self.technique.can_revert() && self.state == AttackTechniqueState::Detonated {
            if let Err(err) = self.revert().await {
                if err.is_cancelled() {
                    return Err(err);
                }
                if !self.force {
                    return Err(RunnerError::RevertBeforeCleanup {
                        id: self.id().to_owned(),
                        source: Box::new(err),
                    });
                }
                srt_warn!(
                    context = self.log_context(),
                    "Warning: failed to revert detonation of {}. Ignoring and cleaning up anyway as --force was used: {err}",
                    self.id()
                );
            }
        }

        let technique = Arc::clone(&self.technique);
        if let Some(template) = technique.prerequisites() {
            let variables = self.destroy_variables();
            self.state_manager
                .extract_technique(template)
                .map_err(|source| RunnerError::Extract { source })?;
            srt_info!(
                context = self.log_context(),
                "Cleaning up technique prerequisites with terraform destroy"
            );
            let directory = self.state_manager.technique_directory().to_path_buf();
            if let Err(err) = self.teardown(&directory, &variables).await {
                log_lifecycle_event(
                    Some(&self.log_context()),
                    "cleanup",
                    &err.to_string(),
                    LifecycleOutcome::Fault,
                );
                if err.is_cancelled() {
                    return Err(RunnerError::Cancelled);
                }
                return Err(RunnerError::Destroy {
                    message: friendly_error_message(&err.to_string()),
                });
            }
        }

        self.set_state(AttackTechniqueState::Cold);
        self.state_manager
            .cleanup_technique()
            .map_err(|source| RunnerError::RemoveDirectory {
                path: self.state_manager.technique_directory().to_path_buf(),
                source,
            })
    }

    /// Variables persisted at apply time, falling back to the configured ones.
    fn destroy_variables(&self) -> Variables {
        match self.state_manager.terraform_variables() {
            Ok(persisted) if !persisted.is_empty() => persisted,
            Ok(_) => self.variables.clone(),
            Err(err) => {
                srt_warn!(
                    context = self.log_context(),
                    "unable to read persisted terraform variables, using configured ones: {err}"
                );
                self.variables.clone()
            }
        }
    }
}
