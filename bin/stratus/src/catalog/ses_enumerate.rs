//! ---
//! srt_section: "05-networking-external-interfaces"
//! srt_subsection: "binary"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "SES enumeration discovery technique."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use stratus_technique::{AttackTechnique, CloudProviders, Detonator, Outputs, Platform, Tactic};
use tracing::info;

use super::aws_cli::AwsCli;

pub const ID: &str = "aws.discovery.ses-enumerate";

const DESCRIPTION: &str = "
Simulates an attacker enumerating SES. Attackers frequently use this enumeration technique after
having compromised an access key, to use it to launch phishing campaigns or further resell stolen
credentials.

Warm-up: None.

Detonation:

- Perform sesv2:GetAccount to discover whether e-mail sending is enabled and the current quotas.
- Perform ses:ListIdentities to discover the list of identities in the account.
- When identities are found, use ses:GetIdentityVerificationAttributes to discover the
  verification status of each identity.
";

const DETECTION: &str = "
Through CloudTrail's GetAccount and ListIdentities events.
";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Account {
    #[serde(default)]
    sending_enabled: bool,
    #[serde(default)]
    production_access_enabled: bool,
    #[serde(default)]
    send_quota: SendQuota,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SendQuota {
    #[serde(default)]
    max_24_hour_send: f64,
    #[serde(default)]
    max_send_rate: f64,
    #[serde(default)]
    sent_last_24_hours: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Identities {
    #[serde(default)]
    identities: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VerificationAttributes {
    #[serde(default)]
    verification_attributes: BTreeMap<String, VerificationStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct VerificationStatus {
    #[serde(default)]
    verification_status: String,
}

struct Enumerate;

#[async_trait]
impl Detonator for Enumerate {
    async fn detonate(&self, _: &Outputs, providers: &dyn CloudProviders) -> Result<()> {
        let aws = AwsCli::new(providers);

        info!("Checking if SES e-mail sending is enabled in the current region, and quotas in place");
        let account: Account = aws
            .call("sesv2", "get-account", &[])
            .await
            .context("unable to get SES account details")?;
        if account.sending_enabled {
            info!("SES e-mail sending is enabled in the current region");
        } else {
            info!("SES e-mail sending is disabled in the current region");
        }
        if account.production_access_enabled {
            info!("SES is in production mode!");
        } else {
            info!("SES is in sandbox mode");
        }
        info!(
            "SES quotas: max24hoursend: {}, maxsendrate: {}, sentlast24hours: {}",
            account.send_quota.max_24_hour_send as i64,
            account.send_quota.max_send_rate as i64,
            account.send_quota.sent_last_24_hours as i64
        );

        info!("Enumerating verified SES identities using ses:ListIdentities");
        let identities: Identities = aws
            .call("ses", "list-identities", &[])
            .await
            .context("unable to list SES identities")?;
        if identities.identities.is_empty() {
            info!("No verified SES identities found");
            return Ok(());
        }

        info!("Found {} verified SES identities", identities.identities.len());
        let mut args = vec!["--identities"];
        args.extend(identities.identities.iter().map(String::as_str));
        let attributes: VerificationAttributes = aws
            .call("ses", "get-identity-verification-attributes", &args)
            .await
            .context("unable to get identity verification attributes")?;
        for (identity, status) in &attributes.verification_attributes {
            info!(
                "- Identity {identity} has verification status '{}'",
                status.verification_status
            );
        }
        Ok(())
    }
}

pub fn technique() -> AttackTechnique {
    AttackTechnique::builder(ID, Platform::Aws, Arc::new(Enumerate))
        .friendly_name("Enumerate SES")
        .description(DESCRIPTION)
        .detection(DETECTION)
        .tactic(Tactic::Discovery)
        .idempotent(true)
        .build()
}
