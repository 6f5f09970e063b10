//! ---
//! srt_section: "01-core-functionality"
//! srt_subsection: "module"
//! srt_type: "source"
//! srt_scope: "code"
//! srt_description: "Primary orchestration and lifecycle management."
//! srt_version: "v0.0.0-prealpha"
//! srt_owner: "tbd"
//! ---
//! Lifecycle runner for attack techniques.
//!
//! A [`Runner`] drives one technique through warm-up, detonation, reversion
//! and clean-up. [`BatchExecutor`] applies a runner operation to many
//! techniques concurrently.

pub mod batch;
pub mod error;
pub mod runner;

pub use batch::{BatchExecutor, BatchReport, TechniqueOutcome};
pub use error::RunnerError;
pub use runner::{Runner, RunnerContext};
