//! ---
//! srt_section: "01-core-functionality"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Cloud provider capabilities and authentication preconditions."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexSet;
use tracing::debug;
use uuid::Uuid;

use crate::platform::Platform;
use crate::technique::AttackTechnique;

const AWS_REGION_VARS: &[&str] = &["AWS_REGION", "AWS_DEFAULT_REGION"];
const AWS_CREDENTIAL_VARS: &[&str] = &[
    "AWS_ACCESS_KEY_ID",
    "AWS_PROFILE",
    "AWS_WEB_IDENTITY_TOKEN_FILE",
    "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI",
    "AWS_CONTAINER_CREDENTIALS_FULL_URI",
];
const GCP_PROJECT_VARS: &[&str] = &[
    "GOOGLE_PROJECT",
    "GOOGLE_CLOUD_PROJECT",
    "GCLOUD_PROJECT",
    "CLOUDSDK_CORE_PROJECT",
];
const AZURE_SUBSCRIPTION_VAR: &str = "AZURE_SUBSCRIPTION_ID";
const AZURE_TENANT_VAR: &str = "AZURE_TENANT_ID";
const KUBECONFIG_VAR: &str = "KUBECONFIG";
const IN_CLUSTER_VAR: &str = "KUBERNETES_SERVICE_HOST";

const AWS_HINT: &str = "you are not authenticated against AWS, *or* you have not set your region.\n\n\
Troubleshooting:\n\
1. Are you authenticated against AWS?\n\
2. Do you have a region or default region set (whether in your AWS configuration file or in your environment)? If not, run 'export AWS_REGION=xxx'";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthenticationError {
    #[error("{hint}")]
    NotAuthenticated { platform: Platform, hint: String },
}

impl AuthenticationError {
    fn new(platform: Platform, hint: impl Into<String>) -> Self {
        Self::NotAuthenticated {
            platform,
            hint: hint.into(),
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            Self::NotAuthenticated { platform, .. } => *platform,
        }
    }
}

/// Opaque access to platform credentials handed to technique callbacks.
///
/// The runner itself only uses it for the authentication precondition.
#[async_trait]
pub trait CloudProviders: Send + Sync {
    /// Identifier tagging every call made during this invocation.
    fn correlation_id(&self) -> Uuid;

    fn user_agent(&self) -> String {
        stratus_common::user_agent(&self.correlation_id())
    }

    async fn ensure_authenticated(&self, platform: Platform) -> Result<(), AuthenticationError>;
}

/// Checks the local credential context of each platform from environment variables
/// and well-known configuration files.
#[derive(Debug, Clone)]
pub struct EnvironmentProviders {
    correlation_id: Uuid,
    vars: BTreeMap<String, String>,
    home: Option<PathBuf>,
}

impl EnvironmentProviders {
    /// Snapshot the current process environment.
    pub fn from_process_env(correlation_id: Uuid) -> Self {
        let vars = std::env::vars().collect();
        let home = std::env::var_os("HOME").map(PathBuf::from);
        Self::with_environment(correlation_id, vars, home)
    }

    pub fn with_environment(
        correlation_id: Uuid,
        vars: BTreeMap<String, String>,
        home: Option<PathBuf>,
    ) -> Self {
        Self {
            correlation_id,
            vars,
            home,
        }
    }

    fn is_set(&self, name: &str) -> bool {
        self.vars
            .get(name)
            .is_some_and(|value| !value.trim().is_empty())
    }

    fn any_set(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.is_set(name))
    }

    fn home_file_exists(&self, relative: &str) -> bool {
        self.home
            .as_ref()
            .is_some_and(|home| home.join(relative).is_file())
    }

    /// Kubeconfig location: `KUBECONFIG`, else `~/.kube/config` when it exists.
    pub fn kubeconfig_path(&self) -> Option<PathBuf> {
        if let Some(path) = self.vars.get(KUBECONFIG_VAR).filter(|v| !v.is_empty()) {
            return Some(PathBuf::from(path));
        }
        self.home
            .as_ref()
            .map(|home| home.join(".kube").join("config"))
            .filter(|path| path.is_file())
    }

    fn aws_ready(&self) -> bool {
        let has_credentials = self.any_set(AWS_CREDENTIAL_VARS)
            || self.home_file_exists(".aws/credentials")
            || self.home_file_exists(".aws/config");
        // Terraform needs the region from the environment even when the SDK could infer it.
        has_credentials && self.any_set(AWS_REGION_VARS)
    }

    fn kubernetes_ready(&self) -> bool {
        self.kubeconfig_path().is_some() || self.is_set(IN_CLUSTER_VAR)
    }

    fn check(&self, platform: Platform) -> Result<(), AuthenticationError> {
        match platform {
            Platform::Aws if self.aws_ready() => Ok(()),
            Platform::Aws => Err(AuthenticationError::new(platform, AWS_HINT)),
            Platform::Eks if self.aws_ready() && self.kubernetes_ready() => Ok(()),
            Platform::Eks => Err(AuthenticationError::new(
                platform,
                format!(
                    "you are not authenticated against AWS or an EKS cluster.\n\
                     To use EKS techniques you need to be authenticated both to an AWS account and to an EKS cluster.\n\n{AWS_HINT}\n\
                     3. Are you authenticated against an EKS cluster? If not, run 'aws eks update-kubeconfig --name <cluster-name>'"
                ),
            )),
            Platform::Kubernetes if self.kubernetes_ready() => Ok(()),
            Platform::Kubernetes => Err(AuthenticationError::new(
                platform,
                "you do not have a kubeconfig set up. Set KUBECONFIG or create ~/.kube/config",
            )),
            Platform::Gcp if self.any_set(GCP_PROJECT_VARS) => Ok(()),
            Platform::Gcp => Err(AuthenticationError::new(
                platform,
                "you are not authenticated against GCP, or you have not set your project. \
                 Set your GCP project ID in your environment (export GOOGLE_PROJECT=xxx)",
            )),
            Platform::Azure if self.is_set(AZURE_SUBSCRIPTION_VAR) => Ok(()),
            Platform::Azure => Err(AuthenticationError::new(
                platform,
                "you are not authenticated against Azure, or you have not set your subscription. \
                 Set your Azure subscription ID in your environment (export AZURE_SUBSCRIPTION_ID=xxx)",
            )),
            Platform::EntraId if self.is_set(AZURE_TENANT_VAR) => Ok(()),
            Platform::EntraId => Err(AuthenticationError::new(
                platform,
                "you are not authenticated against Entra ID. \
                 Set your tenant ID in your environment (export AZURE_TENANT_ID=xxx)",
            )),
        }
    }
}

#[async_trait]
impl CloudProviders for EnvironmentProviders {
    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    async fn ensure_authenticated(&self, platform: Platform) -> Result<(), AuthenticationError> {
        self.check(platform)
    }
}

/// Authenticate every distinct platform used by `techniques`, stopping at the first failure.
pub async fn verify_platform_requirements(
    techniques: &[Arc<AttackTechnique>],
    providers: &dyn CloudProviders,
) -> Result<(), AuthenticationError> {
    let platforms: IndexSet<Platform> = techniques.iter().map(|t| t.platform()).collect();
    for platform in platforms {
        debug!(%platform, "checking authentication");
        providers.ensure_authenticated(platform).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn providers(vars: &[(&str, &str)], home: Option<PathBuf>) -> EnvironmentProviders {
        EnvironmentProviders::with_environment(
            Uuid::nil(),
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            home,
        )
    }

    #[tokio::test]
    async fn aws_requires_region() {
        let no_region = providers(&[("AWS_PROFILE", "sandbox")], None);
        let err = no_region
            .ensure_authenticated(Platform::Aws)
            .await
            .unwrap_err();
        assert_eq!(err.platform(), Platform::Aws);
        assert!(err.to_string().contains("export AWS_REGION"));

        let ready = providers(
            &[("AWS_PROFILE", "sandbox"), ("AWS_DEFAULT_REGION", "eu-west-1")],
            None,
        );
        ready.ensure_authenticated(Platform::Aws).await.unwrap();
    }

    #[tokio::test]
    async fn aws_credentials_file_counts() {
        let home = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(home.path().join(".aws")).unwrap();
        std::fs::write(home.path().join(".aws/credentials"), "[default]\n").unwrap();
        let providers = providers(
            &[("AWS_REGION", "us-east-1")],
            Some(home.path().to_path_buf()),
        );
        providers.ensure_authenticated(Platform::Aws).await.unwrap();
    }

    #[tokio::test]
    async fn kubeconfig_resolution() {
        let home = tempfile::tempdir().unwrap();
        let missing = providers(&[], Some(home.path().to_path_buf()));
        assert!(missing.kubeconfig_path().is_none());
        assert!(missing
            .ensure_authenticated(Platform::Kubernetes)
            .await
            .is_err());

        std::fs::create_dir_all(home.path().join(".kube")).unwrap();
        std::fs::write(home.path().join(".kube/config"), "apiVersion: v1\n").unwrap();
        let found = providers(&[], Some(home.path().to_path_buf()));
        assert_eq!(
            found.kubeconfig_path(),
            Some(home.path().join(".kube").join("config"))
        );

        let explicit = providers(&[("KUBECONFIG", "/etc/kube/admin.conf")], None);
        assert_eq!(
            explicit.kubeconfig_path(),
            Some(PathBuf::from("/etc/kube/admin.conf"))
        );
    }

    #[tokio::test]
    async fn gcp_accepts_any_project_variable() {
        let providers = providers(&[("CLOUDSDK_CORE_PROJECT", "sandbox-1234")], None);
        providers.ensure_authenticated(Platform::Gcp).await.unwrap();
        assert!(providers
            .ensure_authenticated(Platform::Azure)
            .await
            .is_err());
    }

    #[test]
    fn user_agent_carries_correlation_id() {
        let providers = providers(&[], None);
        assert_eq!(
            providers.user_agent(),
            "stratus-red-team_00000000-0000-0000-0000-000000000000"
        );
    }
}
