//! ---
//! srt_section: "01-core-functionality"
//! srt_subsection: "tests"
//! srt_type: "test"
//! srt_scope: "code"
//! srt_description: "Shared fixtures for runner and batch suites."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use stratus_common::StratusConfig;
use stratus_core::{Runner, RunnerContext};
use stratus_persistence::{FileSystemStateManager, StateManager};
use stratus_technique::{AttackTechniqueState, Outputs};
use stratus_testharness::{FakeProviders, FakeProvisioner, TestTechnique};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

pub struct Harness {
    pub root: TempDir,
    pub provisioner: Arc<FakeProvisioner>,
    pub providers: Arc<FakeProviders>,
    pub context: RunnerContext,
}

pub fn harness() -> Harness {
    harness_with(FakeProvisioner::new(), StratusConfig::default())
}

pub fn harness_with(provisioner: FakeProvisioner, config: StratusConfig) -> Harness {
    let root = tempfile::tempdir().unwrap();
    let provisioner = Arc::new(provisioner);
    let providers = Arc::new(FakeProviders::default());
    let context = RunnerContext {
        state_root: root.path().to_path_buf(),
        provisioner: provisioner.clone(),
        providers: providers.clone(),
        config: Arc::new(config),
        cancel: CancellationToken::new(),
    };
    Harness {
        root,
        provisioner,
        providers,
        context,
    }
}

/// File names and contents directly under `directory`.
pub fn snapshot(directory: &Path) -> BTreeMap<String, Vec<u8>> {
    fs::read_dir(directory)
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            let name = entry.file_name().to_string_lossy().into_owned();
            (name, fs::read(entry.path()).unwrap())
        })
        .collect()
}

pub fn outputs(pairs: &[(&str, &str)]) -> Outputs {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Harness {
    pub fn manager(&self, id: &str) -> FileSystemStateManager {
        FileSystemStateManager::new(self.root.path(), id).unwrap()
    }

    /// Persist a starting state, and outputs when any are given.
    pub fn seed(&self, id: &str, state: AttackTechniqueState, persisted: &Outputs) {
        let manager = self.manager(id);
        manager.set_technique_state(state).unwrap();
        if !persisted.is_empty() {
            manager.write_terraform_outputs(persisted).unwrap();
        }
    }

    pub fn runner(&self, technique: &TestTechnique, force: bool) -> Runner {
        Runner::from_context(&self.context, technique.technique.clone(), force).unwrap()
    }

    pub fn persisted_state(&self, id: &str) -> AttackTechniqueState {
        self.manager(id).technique_state()
    }
}
