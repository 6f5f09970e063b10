//! ---
//! srt_section: "05-networking-external-interfaces"
//! srt_subsection: "binary"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Thin async wrapper around the aws command line."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use stratus_technique::CloudProviders;
use tokio::process::Command;
use tracing::debug;

/// Overrides the `aws` executable, mostly for tests.
const AWS_CLI_ENV: &str = "STRATUS_AWS_CLI";
/// The aws CLI appends this value to its user agent.
const EXECUTION_ENV: &str = "AWS_EXECUTION_ENV";

pub struct AwsCli {
    program: String,
    user_agent: String,
}

impl AwsCli {
    pub fn new(providers: &dyn CloudProviders) -> Self {
        Self {
            program: std::env::var(AWS_CLI_ENV).unwrap_or_else(|_| "aws".to_owned()),
            user_agent: providers.user_agent(),
        }
    }

    /// Run `aws <service> <operation> <args> --output json` and decode stdout.
    ///
    /// The child is killed if the returned future is dropped.
    pub async fn call<T: DeserializeOwned>(
        &self,
        service: &str,
        operation: &str,
        args: &[&str],
    ) -> Result<T> {
        debug!(service, operation, "calling aws cli");
        let output = Command::new(&self.program)
            .arg(service)
            .arg(operation)
            .args(args)
            .args(["--output", "json"])
            .env(EXECUTION_ENV, &self.user_agent)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("unable to run {}", self.program))?;

        if !output.status.success() {
            bail!(
                "aws {service} {operation} failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let body = match stdout.trim() {
            "" => "null",
            body => body,
        };
        serde_json::from_str(body)
            .with_context(|| format!("unexpected output from aws {service} {operation}"))
    }
}
