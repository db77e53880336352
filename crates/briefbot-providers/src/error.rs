//! Provider error type, in the teacher's `ProviderError` style
//! (`skynet-agent/provider.rs`).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(#[from] briefbot_net::TransportError),

    #[error("access error ({status}): {message}")]
    Access { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    pub fn is_access_error(&self) -> bool {
        matches!(self, ProviderError::Access { .. })
    }
}
