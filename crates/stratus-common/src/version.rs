//! ---
//! srt_section: "01-core-functionality"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Build version metadata."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---

/// Crate version baked in at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version string shown by the CLI.
pub fn version_string() -> String {
    format!("stratus {VERSION}")
}
