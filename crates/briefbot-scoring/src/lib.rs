pub mod dedup;
pub mod rank;

pub use dedup::{deduplicate, sequence_ratio};
pub use rank::{
    apply_stance_weights, interaction_pulse, percentile_ranks, raw_trust, score_platform_batch,
    score_web_batch, sort_items,
};
