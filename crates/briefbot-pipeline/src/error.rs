//! Orchestrator-level error type, in the per-crate `thiserror` idiom
//! every other crate in the workspace follows.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid span: {0}")]
    InvalidSpan(String),

    #[error("config error: {0}")]
    Config(String),
}
