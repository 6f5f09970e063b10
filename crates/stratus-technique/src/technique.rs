//! ---
//! srt_section: "01-core-functionality"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Attack technique descriptor and its capabilities."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::platform::Platform;
use crate::providers::CloudProviders;
use crate::tactic::Tactic;
use crate::Outputs;

/// Imperative attack action run against warm infrastructure.
#[async_trait]
pub trait Detonator: Send + Sync {
    /// Execute the technique using the persisted provisioning outputs.
    async fn detonate(&self, outputs: &Outputs, providers: &dyn CloudProviders)
        -> anyhow::Result<()>;
}

/// Undoes the side effects of a detonation.
#[async_trait]
pub trait Reverter: Send + Sync {
    /// Revert the detonation using the persisted provisioning outputs.
    async fn revert(&self, outputs: &Outputs, providers: &dyn CloudProviders)
        -> anyhow::Result<()>;
}

/// Immutable description of one simulation unit.
#[derive(Clone)]
pub struct AttackTechnique {
    id: String,
    platform: Platform,
    friendly_name: String,
    description: String,
    detection: String,
    tactics: Vec<Tactic>,
    is_slow: bool,
    is_idempotent: bool,
    prerequisites: Option<Arc<[u8]>>,
    terraform_variables: Vec<String>,
    detonator: Arc<dyn Detonator>,
    reverter: Option<Arc<dyn Reverter>>,
}

impl AttackTechnique {
    /// Start building a technique. The identifier doubles as its state directory name.
    pub fn builder(
        id: impl Into<String>,
        platform: Platform,
        detonator: Arc<dyn Detonator>,
    ) -> AttackTechniqueBuilder {
        let id = id.into();
        AttackTechniqueBuilder {
            technique: AttackTechnique {
                friendly_name: id.clone(),
                id,
                platform,
                description: String::new(),
                detection: String::new(),
                tactics: Vec::new(),
                is_slow: false,
                is_idempotent: false,
                prerequisites: None,
                terraform_variables: Vec::new(),
                detonator,
                reverter: None,
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn detection(&self) -> &str {
        &self.detection
    }

    pub fn tactics(&self) -> &[Tactic] {
        &self.tactics
    }

    pub fn is_slow(&self) -> bool {
        self.is_slow
    }

    /// Whether detonation may be repeated without reverting first.
    pub fn is_idempotent(&self) -> bool {
        self.is_idempotent
    }

    /// Provisioning template bytes, if the technique needs infrastructure.
    pub fn prerequisites(&self) -> Option<&[u8]> {
        self.prerequisites.as_deref()
    }

    pub fn has_prerequisites(&self) -> bool {
        self.prerequisites.is_some()
    }

    /// Configuration-driven Terraform variables the template declares.
    pub fn terraform_variables(&self) -> &[String] {
        &self.terraform_variables
    }

    pub fn detonator(&self) -> &dyn Detonator {
        self.detonator.as_ref()
    }

    pub fn reverter(&self) -> Option<&dyn Reverter> {
        self.reverter.as_deref()
    }

    pub fn can_revert(&self) -> bool {
        self.reverter.is_some()
    }
}

impl fmt::Debug for AttackTechnique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttackTechnique")
            .field("id", &self.id)
            .field("platform", &self.platform)
            .field("tactics", &self.tactics)
            .field("is_idempotent", &self.is_idempotent)
            .field("has_prerequisites", &self.has_prerequisites())
            .field("can_revert", &self.can_revert())
            .finish()
    }
}

impl fmt::Display for AttackTechnique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Builder for [`AttackTechnique`].
pub struct AttackTechniqueBuilder {
    technique: AttackTechnique,
}

impl AttackTechniqueBuilder {
    pub fn friendly_name(mut self, name: impl Into<String>) -> Self {
        self.technique.friendly_name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.technique.description = description.into();
        self
    }

    pub fn detection(mut self, detection: impl Into<String>) -> Self {
        self.technique.detection = detection.into();
        self
    }

    pub fn tactic(mut self, tactic: Tactic) -> Self {
        self.technique.tactics.push(tactic);
        self
    }

    pub fn slow(mut self, is_slow: bool) -> Self {
        self.technique.is_slow = is_slow;
        self
    }

    pub fn idempotent(mut self, is_idempotent: bool) -> Self {
        self.technique.is_idempotent = is_idempotent;
        self
    }

    pub fn prerequisites(mut self, template: impl Into<Vec<u8>>) -> Self {
        self.technique.prerequisites = Some(Arc::from(template.into()));
        self
    }

    pub fn reverter(mut self, reverter: Arc<dyn Reverter>) -> Self {
        self.technique.reverter = Some(reverter);
        self
    }

    pub fn terraform_variable(mut self, name: impl Into<String>) -> Self {
        self.technique.terraform_variables.push(name.into());
        self
    }

    pub fn build(self) -> AttackTechnique {
        self.technique
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl Detonator for Noop {
        async fn detonate(&self, _: &Outputs, _: &dyn CloudProviders) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl Reverter for Noop {
        async fn revert(&self, _: &Outputs, _: &dyn CloudProviders) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn builder_defaults() {
        let technique =
            AttackTechnique::builder("aws.discovery.ses-enumerate", Platform::Aws, Arc::new(Noop))
                .build();
        assert_eq!(technique.friendly_name(), "aws.discovery.ses-enumerate");
        assert!(!technique.has_prerequisites());
        assert!(!technique.can_revert());
        assert!(!technique.is_idempotent());
        assert!(technique.tactics().is_empty());
    }

    #[test]
    fn builder_sets_every_field() {
        let technique = AttackTechnique::builder(
            "k8s.persistence.create-token",
            Platform::Kubernetes,
            Arc::new(Noop),
        )
        .friendly_name("Create Long-Lived Token")
        .description("Creates a token for a service account.")
        .detection("Watch for TokenRequest calls.")
        .tactic(Tactic::Persistence)
        .slow(true)
        .idempotent(true)
        .prerequisites(b"resource \"null_resource\" \"x\" {}".to_vec())
        .reverter(Arc::new(Noop))
        .terraform_variable("namespace")
        .build();

        assert_eq!(technique.to_string(), "k8s.persistence.create-token");
        assert_eq!(technique.tactics(), &[Tactic::Persistence]);
        assert!(technique.is_slow());
        assert!(technique.has_prerequisites());
        assert!(technique.can_revert());
        assert_eq!(technique.terraform_variables(), &["namespace".to_owned()]);
        assert!(format!("{technique:?}").contains("can_revert: true"));
    }
}
