//! ---
//! srt_section: "01-core-functionality"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Technique descriptors, registry and provider capabilities."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
//! Attack technique model shared by the runner and the CLI.
//!
//! A technique is an immutable [`AttackTechnique`] value registered once in a
//! [`Registry`]. Its imperative actions are expressed through the
//! [`Detonator`] and optional [`Reverter`] capabilities, which receive the
//! provisioning outputs and an opaque [`CloudProviders`] handle.

use std::collections::BTreeMap;

pub mod platform;
pub mod providers;
pub mod registry;
pub mod state;
pub mod tactic;
pub mod technique;

/// Provisioning outputs replayed into detonation and reversion.
pub type Outputs = BTreeMap<String, String>;
/// Provisioning input variables persisted for destroy.
pub type Variables = BTreeMap<String, String>;

pub use platform::Platform;
pub use providers::{
    verify_platform_requirements, AuthenticationError, CloudProviders, EnvironmentProviders,
};
pub use registry::{Registry, RegistryError, TechniqueFilter};
pub use state::AttackTechniqueState;
pub use tactic::Tactic;
pub use technique::{AttackTechnique, AttackTechniqueBuilder, Detonator, Reverter};
