//! ---
//! srt_section: "05-networking-external-interfaces"
//! srt_subsection: "binary"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Built-in attack technique catalog."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
//! Techniques shipped with the binary. Each one shells out to the `aws` CLI so the
//! catalog carries no cloud SDK.

use stratus_technique::{Registry, RegistryError};

mod aws_cli;
mod cloudtrail_stop;
mod ses_enumerate;

/// Registry holding every built-in technique.
pub fn registry() -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();
    registry.register(cloudtrail_stop::technique())?;
    registry.register(ses_enumerate::technique())?;
    Ok(registry)
}
