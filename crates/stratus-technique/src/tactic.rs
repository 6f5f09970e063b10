//! ---
//! srt_section: "01-core-functionality"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "MITRE ATT&CK tactics."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// MITRE ATT&CK enterprise tactic a technique maps to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum Tactic {
    #[strum(serialize = "Initial Access")]
    InitialAccess,
    Execution,
    Persistence,
    #[strum(serialize = "Privilege Escalation")]
    PrivilegeEscalation,
    #[strum(serialize = "Defense Evasion")]
    DefenseEvasion,
    #[strum(serialize = "Credential Access")]
    CredentialAccess,
    Discovery,
    #[strum(serialize = "Lateral Movement")]
    LateralMovement,
    Collection,
    Exfiltration,
    Impact,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_display_names() {
        assert_eq!(Tactic::from_str("defense evasion").unwrap(), Tactic::DefenseEvasion);
        assert_eq!(Tactic::from_str("Impact").unwrap(), Tactic::Impact);
        assert_eq!(Tactic::PrivilegeEscalation.to_string(), "Privilege Escalation");
        assert!(Tactic::from_str("Reconnaissance").is_err());
    }
}
