//! ---
//! srt_section: "01-core-functionality"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Lifecycle states."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Persisted lifecycle state of a technique.
///
/// The on-disk form is the upper-case name (`COLD`, `WARM`, `DETONATED`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttackTechniqueState {
    /// No prerequisite infrastructure exists.
    #[default]
    Cold,
    /// Prerequisites are provisioned; nothing has been detonated.
    Warm,
    /// The technique has been detonated.
    Detonated,
}
