pub mod config;
pub mod content;
pub mod error;
pub mod timeframe;

pub use content::{
    Brief, CacheMark, Channel, Complexity, IntentDiagnostics, Interaction, Mode, ModelChoices,
    RunStats, Scorecard, Signal, SourceErrors, Span, Stance, ThreadNote, TimeConfidence,
};
pub use error::{ContentError, Result};
