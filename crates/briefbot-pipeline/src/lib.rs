//! Orchestration crate tying providers, scoring, cache, and intent
//! classification into one research run (spec §4.9, §6).

pub mod error;
pub mod fixtures;
pub mod orchestrator;
pub mod progress;
pub mod sources;

pub use error::{PipelineError, Result};
pub use orchestrator::{run, RunRequest};
pub use progress::{NoopProgress, ProgressSink};
pub use sources::{resolve_sources, Requested, Resolution};
