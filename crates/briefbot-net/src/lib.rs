pub mod client;
pub mod error;

pub use client::{reddit_json_url, HttpClient, DEFAULT_ATTEMPTS, DEFAULT_TIMEOUT_SECS};
pub use error::{Result, TransportError};
