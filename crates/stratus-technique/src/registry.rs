//! ---
//! srt_section: "01-core-functionality"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "In-memory catalog of attack techniques."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::sync::Arc;

use indexmap::IndexMap;

use crate::platform::Platform;
use crate::tactic::Tactic;
use crate::technique::AttackTechnique;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("attack technique {0} is already registered")]
    Duplicate(String),
}

/// Criteria used when listing techniques. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TechniqueFilter {
    pub platform: Option<Platform>,
    pub tactic: Option<Tactic>,
}

impl TechniqueFilter {
    fn matches(&self, technique: &AttackTechnique) -> bool {
        let platform_matches = self
            .platform
            .map_or(true, |platform| technique.platform() == platform);
        let tactic_matches = self
            .tactic
            .map_or(true, |tactic| technique.tactics().contains(&tactic));
        platform_matches && tactic_matches
    }
}

/// Catalog of known techniques, in registration order.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    techniques: IndexMap<String, Arc<AttackTechnique>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, technique: AttackTechnique) -> Result<(), RegistryError> {
        if self.techniques.contains_key(technique.id()) {
            return Err(RegistryError::Duplicate(technique.id().to_owned()));
        }
        self.techniques
            .insert(technique.id().to_owned(), Arc::new(technique));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<AttackTechnique>> {
        self.techniques.get(id).cloned()
    }

    pub fn list(&self) -> Vec<Arc<AttackTechnique>> {
        self.techniques.values().cloned().collect()
    }

    pub fn filter(&self, filter: &TechniqueFilter) -> Vec<Arc<AttackTechnique>> {
        self.techniques
            .values()
            .filter(|technique| filter.matches(technique))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.techniques.len()
    }

    pub fn is_empty(&self) -> bool {
        self.techniques.is_empty()
    }
}
