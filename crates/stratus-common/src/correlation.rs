//! ---
//! srt_section: "01-core-functionality"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Correlation identifiers attached to provider calls."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use uuid::Uuid;

/// Pins the correlation identifier instead of generating a fresh one.
pub const CORRELATION_ID_ENV: &str = "STRATUS_CORRELATION_ID";

const USER_AGENT_PREFIX: &str = "stratus-red-team";

/// Use the supplied identifier when present, otherwise generate a random one.
pub fn resolve_correlation_id(explicit: Option<&str>) -> Result<Uuid> {
    match explicit.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => Uuid::parse_str(raw)
            .with_context(|| format!("{CORRELATION_ID_ENV} is not a valid UUID: {raw}")),
        None => Ok(Uuid::new_v4()),
    }
}

/// User agent attached to every provider request so activity can be traced back to a run.
pub fn user_agent(correlation_id: &Uuid) -> String {
    format!("{USER_AGENT_PREFIX}_{correlation_id}")
}
