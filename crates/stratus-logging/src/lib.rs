//! ---
//! srt_section: "03-persistence-logging"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Structured logging adapters and sinks."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Tracing setup and technique-scoped logging helpers shared by the workspace.

use std::path::PathBuf;

use anyhow::Result;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Registry;

pub mod macros;

/// Environment variable holding a custom filter directive.
pub const LOG_ENV: &str = "STRATUS_LOG";

static GUARDS: Lazy<Mutex<Vec<WorkerGuard>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Available console log formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Human readable single-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    StructuredJson,
}

/// Logging section of the Stratus configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Console output format.
    #[serde(default)]
    pub format: LogFormat,
    /// Optional directory receiving a daily rolling JSON log file.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

/// Initialize a baseline tracing subscriber suitable for tests and development.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Initialize the tracing subscriber from configuration and environment variables.
///
/// `STRATUS_LOG` overrides the filter; otherwise `RUST_LOG` is honoured and the
/// fallback is `info`. Console output goes to stderr so command output on stdout
/// stays machine readable.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    GUARDS.lock().push(stderr_guard);

    let filter = match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(directive).unwrap_or_else(|err| {
            eprintln!("invalid {LOG_ENV} directive ({err}); defaulting to info logging");
            EnvFilter::new("info")
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let console_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(stderr_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(stderr_writer)
            .boxed(),
    };

    let file_layer = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)?;
            let appender = daily(directory, format!("{service_name}.log"));
            let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
            GUARDS.lock().push(file_guard);
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .json()
                    .with_writer(file_writer)
                    .boxed(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .ok();

    tracing::debug!(service = %service_name, format = ?config.format, "tracing initialised");
    Ok(())
}

/// Flush buffered events and stop the background writers started by [`init_tracing`].
///
/// Call once right before the process exits; later events are dropped.
pub fn shutdown() {
    GUARDS.lock().clear();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Attack technique identifier.
    pub technique: Option<&'a str>,
    /// Platform the technique targets.
    pub platform: Option<&'a str>,
    /// Correlation identifier of the runner invocation.
    pub correlation_id: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a technique identifier.
    pub fn with_technique(mut self, technique: &'a str) -> Self {
        self.technique = Some(technique);
        self
    }

    /// Attach a platform name.
    pub fn with_platform(mut self, platform: &'a str) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Attach a correlation identifier.
    pub fn with_correlation_id(mut self, correlation_id: &'a str) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// The transition completed.
    Success,
    /// The transition failed or was aborted.
    Fault,
}

impl LifecycleOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            LifecycleOutcome::Success => "success",
            LifecycleOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized lifecycle event with a success/fault outcome.
pub fn log_lifecycle_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: LifecycleOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    match outcome {
        LifecycleOutcome::Success => tracing::info!(
            event,
            outcome = outcome.as_str(),
            technique = ctx.technique.unwrap_or(""),
            platform = ctx.platform.unwrap_or(""),
            correlation_id = ctx.correlation_id.unwrap_or(""),
            "{message}"
        ),
        LifecycleOutcome::Fault => tracing::error!(
            event,
            outcome = outcome.as_str(),
            technique = ctx.technique.unwrap_or(""),
            platform = ctx.platform.unwrap_or(""),
            correlation_id = ctx.correlation_id.unwrap_or(""),
            "{message}"
        ),
    }
}
