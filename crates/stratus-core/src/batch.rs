//! ---
//! srt_section: "01-core-functionality"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Best-effort concurrent execution across techniques."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use anyhow::anyhow;
use futures::future::join_all;
use stratus_technique::AttackTechnique;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};

/// Result of the operation for one technique.
#[derive(Debug)]
pub struct TechniqueOutcome {
    pub technique_id: String,
    pub result: anyhow::Result<()>,
}

impl TechniqueOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Aggregated outcome of a batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Number of workers spawned, always equal to the number of techniques submitted.
    pub workers: usize,
    /// One entry per technique, in completion order.
    pub results: Vec<TechniqueOutcome>,
}

impl BatchReport {
    /// Whether at least one technique failed.
    pub fn failed(&self) -> bool {
        self.results.iter().any(|outcome| !outcome.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &TechniqueOutcome> {
        self.results.iter().filter(|outcome| !outcome.is_success())
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|outcome| outcome.is_success()).count()
    }
}

/// Runs one operation over many techniques with one worker per technique.
///
/// Failures never stop sibling workers; every failure is logged with its technique id.
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    operation: String,
}

impl BatchExecutor {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    pub async fn run<F, Fut>(&self, techniques: Vec<Arc<AttackTechnique>>, operation: F) -> BatchReport
    where
        F: Fn(Arc<AttackTechnique>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let total = techniques.len();
        if total == 0 {
            return BatchReport::default();
        }
        debug!(operation = %self.operation, workers = total, "starting batch");

        // Jobs and outcomes carry the submission index so a technique listed twice
        // still accounts for two results.
        let (job_tx, job_rx) = mpsc::channel::<(usize, Arc<AttackTechnique>)>(total);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<(usize, TechniqueOutcome)>(total);
        let operation = Arc::new(operation);

        let handles: Vec<_> = (0..total)
            .map(|_| {
                let jobs = Arc::clone(&job_rx);
                let results = result_tx.clone();
                let operation = Arc::clone(&operation);
                tokio::spawn(async move {
                    loop {
                        let next = jobs.lock().await.recv().await;
                        let Some((index, technique)) = next else { break };
                        let technique_id = technique.id().to_owned();
                        let result = operation(technique).await;
                        let outcome = TechniqueOutcome {
                            technique_id,
                            result,
                        };
                        if results
                            .send((index, outcome))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                })
            })
            .collect();
        drop(result_tx);

        for (index, technique) in techniques.iter().enumerate() {
            if job_tx.send((index, Arc::clone(technique))).await.is_err() {
                warn!(operation = %self.operation, "every batch worker stopped before dispatch completed");
                break;
            }
        }
        drop(job_tx);

        let mut results = Vec::with_capacity(total);
        let mut reported = HashSet::with_capacity(total);
        while results.len() < total {
            match result_rx.recv().await {
                Some((index, outcome)) => {
                    reported.insert(index);
                    results.push(outcome);
                }
                None => break,
            }
        }

        for joined in join_all(handles).await {
            if let Err(err) = joined {
                warn!(operation = %self.operation, error = %err, "batch worker terminated abnormally");
            }
        }

        for (index, technique) in techniques.iter().enumerate() {
            if !reported.contains(&index) {
                results.push(TechniqueOutcome {
                    technique_id: technique.id().to_owned(),
                    result: Err(anyhow!("worker stopped before reporting a result")),
                });
            }
        }

        for outcome in results.iter().filter(|o| !o.is_success()) {
            if let Err(err) = &outcome.result {
                error!(
                    operation = %self.operation,
                    technique = %outcome.technique_id,
                    error = %format!("{err:#}"),
                    "technique failed"
                );
            }
        }

        BatchReport {
            workers: total,
            results,
        }
    }
}
