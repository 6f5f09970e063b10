//! ---
//! srt_section: "11-simulation"
//! srt_subsection: "01-bootstrap"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Test doubles shared by the workspace test suites."
//! srt_version: "v0.1.0"
//! srt_owner: "tbd"
//! ---
//! In-memory collaborators for exercising the runner without a cloud account
//! or a Terraform binary.

pub mod provisioner;
pub mod providers;
pub mod techniques;

pub use provisioner::{FakeProvisioner, ProvisionCall};
pub use providers::FakeProviders;
pub use techniques::{ScriptedAction, TestTechnique, TestTechniqueBuilder};
