//! ---
//! srt_section: "01-core-functionality"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Target platforms."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Platform a technique targets; selects the credential check applied before running it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter,
    Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum Platform {
    #[strum(serialize = "AWS")]
    #[serde(rename = "AWS")]
    Aws,
    #[strum(serialize = "Azure")]
    Azure,
    #[strum(serialize = "GCP")]
    #[serde(rename = "GCP")]
    Gcp,
    #[strum(to_string = "Kubernetes", serialize = "k8s")]
    Kubernetes,
    #[strum(serialize = "EKS")]
    #[serde(rename = "EKS")]
    Eks,
    #[strum(to_string = "EntraID", serialize = "entra-id")]
    #[serde(rename = "EntraID")]
    EntraId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Platform::from_str("aws").unwrap(), Platform::Aws);
        assert_eq!(Platform::from_str("KUBERNETES").unwrap(), Platform::Kubernetes);
        assert_eq!(Platform::from_str("k8s").unwrap(), Platform::Kubernetes);
        assert_eq!(Platform::from_str("azure").unwrap(), Platform::Azure);
        assert!(Platform::from_str("openstack").is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for platform in Platform::iter() {
            assert_eq!(Platform::from_str(&platform.to_string()).unwrap(), platform);
        }
        assert_eq!(Platform::Gcp.to_string(), "GCP");
        assert_eq!(Platform::EntraId.to_string(), "EntraID");
    }
}
