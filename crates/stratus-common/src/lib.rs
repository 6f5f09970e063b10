//! ---
//! srt_section: "01-core-functionality"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Shared primitives and utilities for the lifecycle runner."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
//! Core shared primitives for the Stratus workspace.
//! This crate exposes configuration loading, state directory resolution,
//! correlation identifiers and version metadata consumed across the workspace.

pub mod config;
pub mod correlation;
pub mod paths;
pub mod version;

pub use config::{
    filter_variables, KubernetesConfig, LoadedConfig, PodConfig, StratusConfig, TerraformConfig,
    Toleration, DEFAULT_TERRAFORM_VERSION,
};
pub use correlation::{resolve_correlation_id, user_agent, CORRELATION_ID_ENV};
pub use paths::{state_root, STATE_DIR_ENV};
pub use stratus_logging::{LogFormat, LoggingConfig};
