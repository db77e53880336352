pub mod classify;
pub mod decompose;

pub use classify::{classify_complexity, classify_epistemic_stance, stance_weights};
pub use decompose::decompose_query;
