pub mod cache;
pub mod error;
pub mod registry;

pub use cache::{cache_key, CacheStats, ResponseCache, DEFAULT_TTL_HOURS};
pub use error::{CacheError, Result};
pub use registry::{
    ModelRegistry, MODEL_TTL_DAYS, OPENAI_DEFAULT_MODELS, XAI_HARDCODED_FALLBACK,
    XAI_MODEL_PREFERENCE,
};
