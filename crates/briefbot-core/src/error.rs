use thiserror::Error;

/// Errors raised by the content model and configuration layers.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid span: start {start} is after end {end}")]
    InvalidSpan { start: String, end: String },

    #[error("duplicate signal key: {0}")]
    DuplicateKey(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ContentError {
    /// Stable machine-readable code, mirroring the teacher's per-variant
    /// `.code()` convention.
    pub fn code(&self) -> &'static str {
        match self {
            ContentError::Config(_) => "CONFIG",
            ContentError::InvalidSpan { .. } => "INVALID_SPAN",
            ContentError::DuplicateKey(_) => "DUPLICATE_KEY",
            ContentError::Serialization(_) => "SERIALIZATION",
        }
    }
}

pub type Result<T> = std::result::Result<T, ContentError>;
