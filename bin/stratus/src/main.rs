//! ---
//! srt_section: "05-networking-external-interfaces"
//! srt_subsection: "binary"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Command line entrypoint driving the technique lifecycle."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use stratus_common::config::ENV_CONFIG_PATH;
use stratus_common::version::version_string;
use stratus_common::{resolve_correlation_id, state_root, user_agent, StratusConfig, CORRELATION_ID_ENV};
use stratus_core::RunnerContext;
use stratus_logging::init_tracing;
use stratus_provisioning::TerraformManager;
use stratus_technique::EnvironmentProviders;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

mod catalog;
mod commands;
mod output;

use commands::App;

#[derive(Debug, Parser)]
#[command(
    name = "stratus",
    author,
    disable_version_flag = true,
    about = "Granular, actionable adversary emulation for the cloud",
    long_about = None
)]
struct Cli {
    /// Configuration file overriding Kubernetes and Terraform settings.
    #[arg(long, global = true, value_name = "FILE", env = ENV_CONFIG_PATH)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List attack techniques
    List(ListArgs),
    /// Display detailed information about attack techniques
    Show {
        #[arg(value_name = "ATTACK_TECHNIQUE_ID", required = true)]
        ids: Vec<String>,
    },
    /// Display the status of attack techniques
    Status {
        /// Techniques to display; all of them when omitted.
        #[arg(value_name = "ATTACK_TECHNIQUE_ID")]
        ids: Vec<String>,
    },
    /// Spin up the prerequisite infrastructure or configuration, without detonating
    Warmup {
        #[arg(value_name = "ATTACK_TECHNIQUE_ID", required = true)]
        ids: Vec<String>,
        /// Force re-provisioning of techniques that are already warm
        #[arg(short, long)]
        force: bool,
    },
    /// Detonate one or multiple attack techniques
    Detonate {
        #[arg(value_name = "ATTACK_TECHNIQUE_ID", required = true)]
        ids: Vec<String>,
        /// Force detonation of techniques that are not idempotent and were already detonated
        #[arg(short, long)]
        force: bool,
        /// Clean up the prerequisites once the detonation is done
        #[arg(long)]
        cleanup: bool,
    },
    /// Revert the detonation of attack techniques
    Revert {
        #[arg(value_name = "ATTACK_TECHNIQUE_ID", required = true)]
        ids: Vec<String>,
        /// Force reverting techniques that are not detonated
        #[arg(short, long)]
        force: bool,
    },
    /// Clean up any leftover infrastructure or configuration from attack techniques
    #[command(alias = "clean")]
    Cleanup {
        #[arg(value_name = "ATTACK_TECHNIQUE_ID", required_unless_present = "all")]
        ids: Vec<String>,
        /// Clean up every technique that is not COLD
        #[arg(long, conflicts_with = "ids")]
        all: bool,
        /// Force cleanup even if the technique is already COLD
        #[arg(short, long)]
        force: bool,
    },
    /// Print the stratus version
    Version,
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Filter on a specific platform
    #[arg(long, value_name = "PLATFORM")]
    platform: Option<String>,
    /// Filter on a specific MITRE ATT&CK tactic
    #[arg(long = "mitre-attack-tactic", value_name = "TACTIC")]
    mitre_attack_tactic: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    if let Commands::Version = cli.command {
        println!("{}", version_string());
        return Ok(ExitCode::SUCCESS);
    }

    let state_root = state_root()?;
    let loaded = StratusConfig::discover(cli.config.as_deref(), &state_root)?;
    init_tracing("stratus", &loaded.config.logging)?;
    if let Some(source) = &loaded.source {
        debug!(config_path = %source.display(), "configuration loaded");
    }

    let correlation_id = resolve_correlation_id(std::env::var(CORRELATION_ID_ENV).ok().as_deref())?;
    let agent = user_agent(&correlation_id);
    let cancel = CancellationToken::new();
    let context = RunnerContext {
        provisioner: Arc::new(TerraformManager::new(
            &state_root,
            &loaded.config.terraform,
            agent,
        )),
        providers: Arc::new(EnvironmentProviders::from_process_env(correlation_id)),
        config: Arc::new(loaded.config),
        cancel: cancel.clone(),
        state_root,
    };
    debug!(%correlation_id, "detonation correlation id");

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling in-flight operations");
            cancel.cancel();
        }
    });

    let app = App::new(catalog::registry()?, context);
    let succeeded = dispatch(&app, cli.command).await;
    stratus_logging::shutdown();
    Ok(if succeeded? {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Run one command; `Ok(false)` means at least one technique failed.
async fn dispatch(app: &App, command: Commands) -> Result<bool> {
    match command {
        Commands::List(args) => {
            app.list(args.platform.as_deref(), args.mitre_attack_tactic.as_deref())?;
            Ok(true)
        }
        Commands::Show { ids } => {
            app.show(&app.resolve(&ids)?);
            Ok(true)
        }
        Commands::Status { ids } => {
            let techniques = if ids.is_empty() {
                app.all()
            } else {
                app.resolve(&ids)?
            };
            app.status(&techniques);
            Ok(true)
        }
        Commands::Warmup { ids, force } => app.warm_up(app.resolve(&ids)?, force).await,
        Commands::Detonate {
            ids,
            force,
            cleanup,
        } => app.detonate(app.resolve(&ids)?, force, cleanup).await,
        Commands::Revert { ids, force } => app.revert(app.resolve(&ids)?, force).await,
        Commands::Cleanup { ids, all, force } => {
            let techniques = if all {
                app.not_cold()
            } else {
                app.resolve(&ids)?
            };
            app.clean_up(techniques, force).await
        }
        Commands::Version => Ok(true),
    }
}
