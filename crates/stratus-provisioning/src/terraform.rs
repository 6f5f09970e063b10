//! ---
//! srt_section: "05-networking-external-interfaces"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Terraform subprocess driver."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use stratus_common::TerraformConfig;
use stratus_technique::{Outputs, Variables};
use tokio::process::Command;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::install::TerraformInstaller;
use crate::outputs::parse_outputs;
use crate::{ProvisionError, ProvisioningRunner, Result};

/// File name of the managed binary inside the state root.
pub const TERRAFORM_BINARY_NAME: &str = "terraform";

const USER_AGENT_ENV: &str = "TF_APPEND_USER_AGENT";

/// [`ProvisioningRunner`] backed by the `terraform` CLI.
#[derive(Debug)]
pub struct TerraformManager {
    binary: PathBuf,
    installer: Option<TerraformInstaller>,
    user_agent: String,
    installed: OnceCell<()>,
}

impl TerraformManager {
    /// Manager using the configured binary, or a managed download under `state_root`.
    pub fn new(state_root: &Path, config: &TerraformConfig, user_agent: impl Into<String>) -> Self {
        match &config.binary_path {
            Some(binary) => Self::with_binary(binary.clone(), user_agent),
            None => Self {
                binary: state_root.join(TERRAFORM_BINARY_NAME),
                installer: Some(TerraformInstaller::new(
                    config.version.clone(),
                    config.release_base_url.clone(),
                )),
                user_agent: user_agent.into(),
                installed: OnceCell::new(),
            },
        }
    }

    /// Manager for an existing binary; nothing is ever downloaded.
    pub fn with_binary(binary: impl Into<PathBuf>, user_agent: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            installer: None,
            user_agent: user_agent.into(),
            installed: OnceCell::new(),
        }
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary
    }

    async fn ensure_installed(&self, cancel: &CancellationToken) -> Result<()> {
        self.installed
            .get_or_try_init(|| async {
                if self.binary.is_file() {
                    return Ok(());
                }
                match &self.installer {
                    Some(installer) => installer.install(&self.binary, cancel).await,
                    None => Err(ProvisionError::Install(format!(
                        "configured binary {} does not exist",
                        self.binary.display()
                    ))),
                }
            })
            .await
            .map(|_| ())
    }

    /// Run one terraform command in `directory`, returning its stdout.
    ///
    /// The child is killed if `cancel` fires before it exits.
    async fn run(
        &self,
        directory: &Path,
        command: &str,
        args: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(ProvisionError::Cancelled);
        }
        self.ensure_installed(cancel).await?;

        debug!(command, directory = %directory.display(), "running terraform");
        let child = Command::new(&self.binary)
            .arg(command)
            .args(&args)
            .current_dir(directory)
            .env(USER_AGENT_ENV, &self.user_agent)
            .env("TF_IN_AUTOMATION", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProvisionError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProvisionError::Cancelled),
            output = child.wait_with_output() => output.map_err(|err| ProvisionError::io(directory, err))?,
        };

        if !output.status.success() {
            return Err(ProvisionError::Command {
                command: command.to_owned(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn base_args() -> Vec<String> {
    vec!["-input=false".to_owned(), "-no-color".to_owned()]
}

fn variable_args(variables: &Variables) -> Vec<String> {
    variables
        .iter()
        .flat_map(|(name, value)| ["-var".to_owned(), format!("{name}={value}")])
        .collect()
}

#[async_trait]
impl ProvisioningRunner for TerraformManager {
    async fn init(&self, directory: &Path, cancel: &CancellationToken) -> Result<()> {
        self.run(directory, "init", base_args(), cancel).await?;
        Ok(())
    }

    async fn apply(
        &self,
        directory: &Path,
        variables: &Variables,
        cancel: &CancellationToken,
    ) -> Result<Outputs> {
        info!(directory = %directory.display(), "applying terraform to spin up technique prerequisites");
        let mut args = base_args();
        args.extend(["-auto-approve".to_owned(), "-refresh=false".to_owned()]);
        args.extend(variable_args(variables));
        self.run(directory, "apply", args, cancel).await?;

        let raw = self
            .run(
                directory,
                "output",
                vec!["-json".to_owned(), "-no-color".to_owned()],
                cancel,
            )
            .await?;
        Ok(parse_outputs(&raw)?)
    }

    async fn destroy(
        &self,
        directory: &Path,
        variables: &Variables,
        cancel: &CancellationToken,
    ) -> Result<()> {
        info!(directory = %directory.display(), "destroying technique prerequisites");
        let mut args = base_args();
        args.push("-auto-approve".to_owned());
        args.extend(variable_args(variables));
        self.run(directory, "destroy", args, cancel).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variables_become_flags() {
        let variables = Variables::from([
            ("image".to_owned(), "busybox:stable".to_owned()),
            ("namespace".to_owned(), "stratus".to_owned()),
        ]);
        assert_eq!(
            variable_args(&variables),
            [
                "-var",
                "image=busybox:stable",
                "-var",
                "namespace=stratus"
            ]
        );
    }

    #[test]
    fn managed_binary_lives_in_state_root() {
        let manager = TerraformManager::new(
            Path::new("/home/analyst/.stratus-red-team"),
            &TerraformConfig::default(),
            "stratus-red-team_test",
        );
        assert_eq!(
            manager.binary_path(),
            Path::new("/home/analyst/.stratus-red-team/terraform")
        );

        let config = TerraformConfig {
            binary_path: Some(PathBuf::from("/usr/local/bin/terraform")),
            ..TerraformConfig::default()
        };
        let manager = TerraformManager::new(Path::new("/tmp"), &config, "ua");
        assert_eq!(manager.binary_path(), Path::new("/usr/local/bin/terraform"));
    }

    #[tokio::test]
    async fn missing_configured_binary_is_an_install_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TerraformManager::with_binary(dir.path().join("absent"), "ua");
        let err = manager
            .init(dir.path(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::Install(_)));
    }
}
