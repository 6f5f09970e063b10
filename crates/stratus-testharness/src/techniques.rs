//! ---
//! srt_section: "11-simulation"
//! srt_subsection: "01-bootstrap"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Scripted attack techniques."
//! srt_version: "v0.1.0"
//! srt_owner: "tbd"
//! ---
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use stratus_technique::{
    AttackTechnique, CloudProviders, Detonator, Outputs, Platform, Reverter, Tactic,
};

/// Template bytes used by techniques that need prerequisites.
pub const SAMPLE_TEMPLATE: &[u8] = b"resource \"null_resource\" \"prerequisite\" {}\n";

/// Detonation or reversion action that counts calls and can be told to fail.
#[derive(Debug, Default)]
pub struct ScriptedAction {
    calls: AtomicUsize,
    failure: Mutex<Option<String>>,
    seen_outputs: Mutex<Vec<Outputs>>,
}

impl ScriptedAction {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    pub fn succeed(&self) {
        *self.failure.lock() = None;
    }

    /// Outputs received by the most recent call.
    pub fn last_outputs(&self) -> Option<Outputs> {
        self.seen_outputs.lock().last().cloned()
    }

    fn invoke(&self, outputs: &Outputs) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_outputs.lock().push(outputs.clone());
        match self.failure.lock().as_ref() {
            Some(message) => Err(anyhow::anyhow!(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Detonator for ScriptedAction {
    async fn detonate(&self, outputs: &Outputs, _: &dyn CloudProviders) -> anyhow::Result<()> {
        self.invoke(outputs)
    }
}

#[async_trait]
impl Reverter for ScriptedAction {
    async fn revert(&self, outputs: &Outputs, _: &dyn CloudProviders) -> anyhow::Result<()> {
        self.invoke(outputs)
    }
}

/// A technique together with handles on its scripted actions.
#[derive(Debug, Clone)]
pub struct TestTechnique {
    pub technique: Arc<AttackTechnique>,
    pub detonation: Arc<ScriptedAction>,
    pub reversion: Option<Arc<ScriptedAction>>,
}

impl TestTechnique {
    pub fn builder(id: impl Into<String>) -> TestTechniqueBuilder {
        TestTechniqueBuilder {
            id: id.into(),
            platform: Platform::Aws,
            tactic: Tactic::DefenseEvasion,
            prerequisites: false,
            idempotent: false,
            revertible: false,
            slow: false,
            variables: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        self.technique.id()
    }
}

pub struct TestTechniqueBuilder {
    id: String,
    platform: Platform,
    tactic: Tactic,
    prerequisites: bool,
    idempotent: bool,
    revertible: bool,
    slow: bool,
    variables: Vec<String>,
}

impl TestTechniqueBuilder {
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn tactic(mut self, tactic: Tactic) -> Self {
        self.tactic = tactic;
        self
    }

    /// Attach [`SAMPLE_TEMPLATE`] as provisioning prerequisites.
    pub fn with_prerequisites(mut self) -> Self {
        self.prerequisites = true;
        self
    }

    pub fn idempotent(mut self) -> Self {
        self.idempotent = true;
        self
    }

    pub fn revertible(mut self) -> Self {
        self.revertible = true;
        self
    }

    pub fn slow(mut self) -> Self {
        self.slow = true;
        self
    }

    pub fn terraform_variable(mut self, name: impl Into<String>) -> Self {
        self.variables.push(name.into());
        self
    }

    pub fn build(self) -> TestTechnique {
        let detonation = Arc::new(ScriptedAction::default());
        let reversion = self
            .revertible
            .then(|| Arc::new(ScriptedAction::default()));

        let mut builder = AttackTechnique::builder(
            self.id,
            self.platform,
            Arc::clone(&detonation) as Arc<dyn Detonator>,
        )
        .tactic(self.tactic)
        .idempotent(self.idempotent)
        .slow(self.slow);
        if self.prerequisites {
            builder = builder.prerequisites(SAMPLE_TEMPLATE);
        }
        if let Some(reversion) = &reversion {
            builder = builder.reverter(Arc::clone(reversion) as Arc<dyn Reverter>);
        }
        for variable in self.variables {
            builder = builder.terraform_variable(variable);
        }

        TestTechnique {
            technique: Arc::new(builder.build()),
            detonation,
            reversion,
        }
    }
}
