//! Per-channel discovery providers and Reddit thread enrichment.
//!
//! Every LLM-backed provider (Reddit, X, YouTube, LinkedIn) shares the
//! same shape: build a prompt + tool-call payload, run it through
//! [`fallback::with_model_fallback`], and hand the raw JSON to a
//! `parse_*`/`to_signal` pair. Web performs no network call of its own;
//! the caller supplies raw search hits for normalization and hard date
//! filtering.

pub mod enrichment;
pub mod error;
pub mod fallback;
pub mod json_scan;
pub mod linkedin;
pub mod reddit;
pub mod sampling;
pub mod web;
pub mod x;
pub mod youtube;

pub use error::{ProviderError, Result};
