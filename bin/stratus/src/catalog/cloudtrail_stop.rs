//! ---
//! srt_section: "05-networking-external-interfaces"
//! srt_subsection: "binary"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Stop CloudTrail logging technique."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use stratus_technique::{
    AttackTechnique, CloudProviders, Detonator, Outputs, Platform, Reverter, Tactic,
};
use tracing::info;

use super::aws_cli::AwsCli;

pub const ID: &str = "aws.defense-evasion.cloudtrail-stop";
const TEMPLATE: &str = include_str!("cloudtrail_stop.tf");
const TRAIL_OUTPUT: &str = "cloudtrail_trail_name";

const DESCRIPTION: &str = "
Stops a CloudTrail Trail from logging. Simulates an attacker disrupting CloudTrail logging.

Warm-up:

- Create a CloudTrail Trail.

Detonation:

- Call cloudtrail:StopLogging to stop CloudTrail logging.
";

const DETECTION: &str = "
Identify when a CloudTrail trail is disabled, through CloudTrail's StopLogging event.
";

fn trail_name(outputs: &Outputs) -> Result<&str> {
    outputs
        .get(TRAIL_OUTPUT)
        .map(String::as_str)
        .with_context(|| format!("missing {TRAIL_OUTPUT} in prerequisite outputs"))
}

struct StopLogging;

#[async_trait]
impl Detonator for StopLogging {
    async fn detonate(&self, outputs: &Outputs, providers: &dyn CloudProviders) -> Result<()> {
        let trail = trail_name(outputs)?;
        info!("Stopping CloudTrail trail {trail}");
        AwsCli::new(providers)
            .call::<Value>("cloudtrail", "stop-logging", &["--name", trail])
            .await
            .context("unable to stop CloudTrail logging")?;
        Ok(())
    }
}

struct StartLogging;

#[async_trait]
impl Reverter for StartLogging {
    async fn revert(&self, outputs: &Outputs, providers: &dyn CloudProviders) -> Result<()> {
        let trail = trail_name(outputs)?;
        info!("Restarting CloudTrail trail {trail}");
        AwsCli::new(providers)
            .call::<Value>("cloudtrail", "start-logging", &["--name", trail])
            .await
            .context("unable to restart CloudTrail logging")?;
        Ok(())
    }
}

pub fn technique() -> AttackTechnique {
    AttackTechnique::builder(ID, Platform::Aws, Arc::new(StopLogging))
        .friendly_name("Stop CloudTrail Trail")
        .description(DESCRIPTION)
        .detection(DETECTION)
        .tactic(Tactic::DefenseEvasion)
        // cloudtrail:StopLogging is idempotent
        .idempotent(true)
        .prerequisites(TEMPLATE)
        .reverter(Arc::new(StartLogging))
        .build()
}
