//! ---
//! srt_section: "01-core-functionality"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "State directory resolution."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{bail, Result};

/// Overrides the state root directory.
pub const STATE_DIR_ENV: &str = "STRATUS_STATE_DIR";
/// Directory created under the home directory when no override is set.
pub const STATE_DIRECTORY_NAME: &str = ".stratus-red-team";
/// Name of the configuration file looked up inside the state root.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Resolve the state root from the process environment.
pub fn state_root() -> Result<PathBuf> {
    resolve_state_root(
        std::env::var_os(STATE_DIR_ENV).map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

/// Pick the state root: an explicit, non-empty override wins over `<home>/.stratus-red-team`.
pub fn resolve_state_root(explicit: Option<PathBuf>, home: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(path);
    }
    match home.filter(|path| !path.as_os_str().is_empty()) {
        Some(home) => Ok(home.join(STATE_DIRECTORY_NAME)),
        None => bail!("unable to determine the home directory; set {STATE_DIR_ENV}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_directory_wins() {
        let root = resolve_state_root(
            Some(PathBuf::from("/var/lib/stratus")),
            Some(PathBuf::from("/home/analyst")),
        )
        .unwrap();
        assert_eq!(root, PathBuf::from("/var/lib/stratus"));
    }

    #[test]
    fn home_directory_fallback() {
        let root = resolve_state_root(Some(PathBuf::new()), Some(PathBuf::from("/home/analyst")))
            .unwrap();
        assert_eq!(root, PathBuf::from("/home/analyst/.stratus-red-team"));
    }

    #[test]
    fn no_home_is_an_error() {
        assert!(resolve_state_root(None, None).is_err());
    }
}
