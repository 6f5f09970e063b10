//! ---
//! srt_section: "05-networking-external-interfaces"
//! srt_subsection: "binary"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Command implementations on top of the runner and batch executor."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use indexmap::IndexSet;
use stratus_core::{BatchExecutor, BatchReport, Runner, RunnerContext};
use stratus_persistence::{FileSystemStateManager, StateManager};
use stratus_technique::{
    verify_platform_requirements, AttackTechnique, AttackTechniqueState, Platform, Registry,
    Tactic, TechniqueFilter,
};
use tracing::{info, warn};

use crate::output;

/// Registry and runner collaborators for one invocation.
pub struct App {
    registry: Registry,
    context: RunnerContext,
}

impl App {
    pub fn new(registry: Registry, context: RunnerContext) -> Self {
        Self { registry, context }
    }

    pub fn all(&self) -> Vec<Arc<AttackTechnique>> {
        self.registry.list()
    }

    /// Look up every id, failing on the first unknown one.
    ///
    /// Repeated ids collapse to their first occurrence so no two workers share a
    /// technique directory.
    pub fn resolve(&self, ids: &[String]) -> Result<Vec<Arc<AttackTechnique>>> {
        unique_ids(ids)
            .into_iter()
            .map(|id| {
                self.registry
                    .get(id)
                    .ok_or_else(|| anyhow!("unknown technique name {id}"))
            })
            .collect()
    }

    /// Techniques whose persisted state is anything but `COLD`.
    pub fn not_cold(&self) -> Vec<Arc<AttackTechnique>> {
        self.all()
            .into_iter()
            .filter(|technique| self.state_of(technique) != AttackTechniqueState::Cold)
            .collect()
    }

    fn state_of(&self, technique: &AttackTechnique) -> AttackTechniqueState {
        match FileSystemStateManager::new(&self.context.state_root, technique.id()) {
            Ok(manager) => manager.technique_state(),
            Err(err) => {
                warn!(technique = technique.id(), error = %err, "unable to read technique state");
                AttackTechniqueState::Cold
            }
        }
    }

    pub fn list(&self, platform: Option<&str>, tactic: Option<&str>) -> Result<()> {
        let filter = TechniqueFilter {
            platform: platform.map(parse_platform).transpose()?,
            tactic: tactic.map(parse_tactic).transpose()?,
        };
        output::print_techniques(&self.registry.filter(&filter));
        Ok(())
    }

    pub fn show(&self, techniques: &[Arc<AttackTechnique>]) {
        for technique in techniques {
            output::print_details(technique);
        }
    }

    pub fn status(&self, techniques: &[Arc<AttackTechnique>]) {
        let rows: Vec<_> = techniques
            .iter()
            .map(|technique| (Arc::clone(technique), self.state_of(technique)))
            .collect();
        output::print_status(&rows);
    }

    async fn authenticate(&self, techniques: &[Arc<AttackTechnique>]) -> Result<()> {
        verify_platform_requirements(techniques, self.context.providers.as_ref())
            .await
            .context("platform authentication check failed")
    }

    /// Print the resulting states; `false` when any technique failed.
    fn finish(&self, techniques: &[Arc<AttackTechnique>], report: BatchReport) -> bool {
        self.status(techniques);
        !report.failed()
    }

    pub async fn warm_up(&self, techniques: Vec<Arc<AttackTechnique>>, force: bool) -> Result<bool> {
        self.authenticate(&techniques).await?;
        let context = self.context.clone();
        let report = BatchExecutor::new("warmup")
            .run(techniques.clone(), move |technique| {
                let context = context.clone();
                async move {
                    let mut runner = Runner::from_context(&context, technique, force)?;
                    runner.warm_up().await?;
                    anyhow::Ok(())
                }
            })
            .await;
        Ok(self.finish(&techniques, report))
    }

    pub async fn detonate(
        &self,
        techniques: Vec<Arc<AttackTechnique>>,
        force: bool,
        cleanup: bool,
    ) -> Result<bool> {
        self.authenticate(&techniques).await?;
        let context = self.context.clone();
        let report = BatchExecutor::new("detonate")
            .run(techniques.clone(), move |technique| {
                let context = context.clone();
                async move {
                    let mut runner = Runner::from_context(&context, technique, force)?;
                    let detonated = runner.detonate().await;
                    let cleaned = if cleanup {
                        runner.clean_up().await
                    } else {
                        Ok(())
                    };
                    detonated?;
                    cleaned?;
                    anyhow::Ok(())
                }
            })
            .await;
        Ok(self.finish(&techniques, report))
    }

    pub async fn revert(&self, techniques: Vec<Arc<AttackTechnique>>, force: bool) -> Result<bool> {
        let (revertible, skipped): (Vec<_>, Vec<_>) =
            techniques.iter().cloned().partition(|t| t.can_revert());
        for technique in &skipped {
            warn!(
                technique = technique.id(),
                "{} cannot be reverted and does not need to, skipping",
                technique.id()
            );
        }
        if revertible.is_empty() {
            return Ok(true);
        }

        self.authenticate(&revertible).await?;
        let context = self.context.clone();
        let report = BatchExecutor::new("revert")
            .run(revertible, move |technique| {
                let context = context.clone();
                async move {
                    let mut runner = Runner::from_context(&context, technique, force)?;
                    runner.revert().await?;
                    anyhow::Ok(())
                }
            })
            .await;
        Ok(self.finish(&techniques, report))
    }

    pub async fn clean_up(&self, techniques: Vec<Arc<AttackTechnique>>, force: bool) -> Result<bool> {
        if techniques.is_empty() {
            info!("no technique to clean up");
            return Ok(true);
        }
        info!(count = techniques.len(), "cleaning up techniques");
        let context = self.context.clone();
        let report = BatchExecutor::new("cleanup")
            .run(techniques.clone(), move |technique| {
                let context = context.clone();
                async move {
                    let mut runner = Runner::from_context(&context, technique, force)?;
                    runner.clean_up().await?;
                    anyhow::Ok(())
                }
            })
            .await;
        Ok(self.finish(&techniques, report))
    }
}

fn unique_ids(ids: &[String]) -> IndexSet<&str> {
    ids.iter().map(String::as_str).collect()
}

fn parse_platform(raw: &str) -> Result<Platform> {
    Platform::from_str(raw.trim()).map_err(|_| anyhow!("unknown platform {raw}"))
}

/// Accepts display names ("Defense Evasion") and their kebab-case form ("defense-evasion").
fn parse_tactic(raw: &str) -> Result<Tactic> {
    let normalized = raw.trim().replace(['-', '_'], " ");
    match Tactic::from_str(&normalized) {
        Ok(tactic) => Ok(tactic),
        Err(_) => bail!("unknown MITRE ATT&CK tactic {raw}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_ids_keep_first_occurrence_order() {
        let ids: Vec<String> = ["b", "a", "b", "c", "a"].iter().map(|s| s.to_string()).collect();
        let unique: Vec<_> = unique_ids(&ids).into_iter().collect();
        assert_eq!(unique, ["b", "a", "c"]);
    }

    #[test]
    fn tactic_accepts_kebab_case() {
        assert_eq!(parse_tactic("defense-evasion").unwrap(), Tactic::DefenseEvasion);
        assert_eq!(parse_tactic("Discovery").unwrap(), Tactic::Discovery);
        assert!(parse_tactic("reconnaissance").is_err());
    }

    #[test]
    fn platform_is_case_insensitive() {
        assert_eq!(parse_platform("aws").unwrap(), Platform::Aws);
        assert_eq!(parse_platform("k8s").unwrap(), Platform::Kubernetes);
        assert!(parse_platform("oracle").is_err());
    }
}
