//! ---
//! srt_section: "01-core-functionality"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Configuration file loading and Terraform variable rendering."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use stratus_logging::LoggingConfig;
use tracing::{debug, warn};

use crate::paths::CONFIG_FILE_NAME;

/// Environment variable pointing at an explicit configuration file.
pub const ENV_CONFIG_PATH: &str = "STRATUS_CONFIG_PATH";

/// Terraform release pinned by default.
pub const DEFAULT_TERRAFORM_VERSION: &str = "1.1.2";

fn default_terraform_version() -> String {
    DEFAULT_TERRAFORM_VERSION.to_owned()
}

fn default_release_base_url() -> String {
    "https://releases.hashicorp.com/terraform".to_owned()
}

/// Root configuration object. Every section is optional in the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StratusConfig {
    #[serde(default)]
    pub kubernetes: KubernetesConfig,
    #[serde(default)]
    pub terraform: TerraformConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where a [`StratusConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: StratusConfig,
    pub source: Option<PathBuf>,
}

impl StratusConfig {
    /// Load configuration honouring `STRATUS_CONFIG_PATH`, then `<state root>/config.yaml`.
    pub fn load(state_root: &Path) -> Result<LoadedConfig> {
        let env_path = std::env::var(ENV_CONFIG_PATH).ok();
        Self::discover(env_path.as_deref(), state_root)
    }

    /// Resolve the configuration file from an optional explicit path and the state root.
    ///
    /// A missing file is not an error: the default configuration is returned with no source.
    pub fn discover(explicit: Option<&str>, state_root: &Path) -> Result<LoadedConfig> {
        if let Some(raw) = explicit.map(str::trim).filter(|raw| !raw.is_empty()) {
            let path = PathBuf::from(raw);
            if path.is_file() {
                let config = Self::from_path(&path)?;
                return Ok(LoadedConfig {
                    config,
                    source: Some(path),
                });
            }
            warn!(config_path = %path.display(), "{ENV_CONFIG_PATH} points to a missing file, ignoring it");
        }

        let default_path = state_root.join(CONFIG_FILE_NAME);
        if default_path.is_file() {
            let config = Self::from_path(&default_path)?;
            return Ok(LoadedConfig {
                config,
                source: Some(default_path),
            });
        }

        Ok(LoadedConfig {
            config: Self::default(),
            source: None,
        })
    }

    /// Parse a YAML configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = serde_yaml::from_str::<StratusConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Terraform variables for a technique, restricted to the variables it declares.
    pub fn terraform_variables<S: AsRef<str>>(
        &self,
        technique_id: &str,
        requested: &[S],
    ) -> BTreeMap<String, String> {
        let mut result = BTreeMap::new();
        result.extend(self.kubernetes.terraform_variables(technique_id, requested));
        result
    }
}

/// Settings for the provisioning binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TerraformConfig {
    #[serde(default = "default_terraform_version")]
    pub version: String,
    /// Use an existing binary instead of the managed download.
    #[serde(default)]
    pub binary_path: Option<PathBuf>,
    #[serde(default = "default_release_base_url")]
    pub release_base_url: String,
}

impl Default for TerraformConfig {
    fn default() -> Self {
        Self {
            version: default_terraform_version(),
            binary_path: None,
            release_base_url: default_release_base_url(),
        }
    }
}

/// Terraform variable names fed from the Kubernetes section.
pub mod kubernetes_variables {
    pub const NAMESPACE: &str = "namespace";
    pub const IMAGE: &str = "image";
    pub const LABELS: &str = "labels";
    pub const TOLERATIONS: &str = "tolerations";
    pub const NODE_SELECTOR: &str = "node_selector";
    pub const SECURITY_CONTEXT: &str = "security_context";
}

/// Overrides for techniques that provision into a shared cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KubernetesConfig {
    /// Namespace used by every Kubernetes technique.
    #[serde(default)]
    pub namespace: String,
    /// Pod settings applied to every technique unless overridden.
    #[serde(default)]
    pub defaults: PodConfig,
    /// Per-technique overrides keyed by technique identifier.
    #[serde(default)]
    pub techniques: IndexMap<String, PodConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PodConfig {
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub tolerations: Vec<Toleration>,
    #[serde(default, rename = "nodeSelector")]
    pub node_selector: BTreeMap<String, String>,
    #[serde(default, rename = "securityContext")]
    pub security_context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Toleration {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub effect: String,
}

impl KubernetesConfig {
    /// Merged pod configuration: non-empty technique values win over defaults.
    pub fn pod_config(&self, technique_id: &str) -> PodConfig {
        let mut result = self.defaults.clone();
        if let Some(overrides) = self.techniques.get(technique_id) {
            if !overrides.image.is_empty() {
                result.image = overrides.image.clone();
            }
            if !overrides.labels.is_empty() {
                result.labels = overrides.labels.clone();
            }
            if !overrides.tolerations.is_empty() {
                result.tolerations = overrides.tolerations.clone();
            }
            if !overrides.node_selector.is_empty() {
                result.node_selector = overrides.node_selector.clone();
            }
            if overrides.security_context.is_some() {
                result.security_context = overrides.security_context.clone();
            }
        }
        result
    }

    pub fn terraform_variables<S: AsRef<str>>(
        &self,
        technique_id: &str,
        requested: &[S],
    ) -> BTreeMap<String, String> {
        let mut all = self.pod_config(technique_id).to_terraform_variables();
        if !self.namespace.is_empty() {
            all.insert(
                kubernetes_variables::NAMESPACE.to_owned(),
                self.namespace.clone(),
            );
        }
        filter_variables(all, requested)
    }
}

impl PodConfig {
    /// Render the pod settings as Terraform variables; structured values become JSON.
    pub fn to_terraform_variables(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        if !self.image.is_empty() {
            vars.insert(kubernetes_variables::IMAGE.to_owned(), self.image.clone());
        }
        if !self.labels.is_empty() {
            insert_json(&mut vars, kubernetes_variables::LABELS, &self.labels);
        }
        if !self.tolerations.is_empty() {
            insert_json(&mut vars, kubernetes_variables::TOLERATIONS, &self.tolerations);
        }
        if !self.node_selector.is_empty() {
            insert_json(
                &mut vars,
                kubernetes_variables::NODE_SELECTOR,
                &self.node_selector,
            );
        }
        if let Some(security_context) = &self.security_context {
            insert_json(
                &mut vars,
                kubernetes_variables::SECURITY_CONTEXT,
                security_context,
            );
        }
        vars
    }
}

fn insert_json<T: Serialize>(vars: &mut BTreeMap<String, String>, name: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => {
            vars.insert(name.to_owned(), json);
        }
        Err(err) => {
            warn!(variable = name, error = %err, "unable to render config value as a terraform variable, ignoring it");
        }
    }
}

/// Keep only the requested variables; an empty request keeps everything.
pub fn filter_variables<S: AsRef<str>>(
    all: BTreeMap<String, String>,
    requested: &[S],
) -> BTreeMap<String, String> {
    if requested.is_empty() {
        return all;
    }
    requested
        .iter()
        .filter_map(|name| {
            all.get(name.as_ref())
                .map(|value| (name.as_ref().to_owned(), value.clone()))
        })
        .collect()
}
