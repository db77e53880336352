//! Percentile normalization, per-channel interaction composites ("pulse"),
//! and the platform/web scoring formulas.

use briefbot_core::content::{Channel, Interaction, Scorecard, Signal, TimeConfidence};
use briefbot_core::timeframe;

pub const PLATFORM_WEIGHTS: [(&str, f64); 4] = [
    ("topicality", 0.38),
    ("freshness", 0.27),
    ("traction", 0.23),
    ("trust", 0.12),
];
pub const WEB_WEIGHTS: [(&str, f64); 3] = [("topicality", 0.52), ("freshness", 0.33), ("trust", 0.15)];

const TRUST_BASE: &[(Channel, f64)] = &[
    (Channel::Reddit, 61.0),
    (Channel::X, 53.0),
    (Channel::Youtube, 59.0),
    (Channel::Linkedin, 66.0),
    (Channel::Web, 49.0),
];

const TRACTION_FALLBACK: f64 = 42.0;
const MISSING_INTERACTION_PENALTY: f64 = 7.0;

fn scale(x: Option<i64>) -> f64 {
    match x {
        Some(v) if v > 0 => (v as f64).sqrt(),
        _ => 0.0,
    }
}

/// Derives the per-channel interaction composite ("pulse") from raw
/// engagement counts. Populated by scoring, never by providers.
pub fn interaction_pulse(channel: Channel, interaction: &Interaction) -> f64 {
    match channel {
        Channel::Reddit => {
            let ratio = interaction.vote_ratio.unwrap_or(0.55).clamp(0.0, 1.0);
            0.40 * scale(interaction.upvotes) + 0.40 * scale(interaction.comments) + 0.20 * (ratio * 10.0)
        }
        Channel::X => {
            0.46 * scale(interaction.likes)
                + 0.26 * scale(interaction.replies)
                + 0.16 * scale(interaction.reposts)
                + 0.12 * scale(interaction.quotes)
        }
        Channel::Youtube => 0.68 * scale(interaction.views) + 0.32 * scale(interaction.likes),
        Channel::Linkedin => 0.62 * scale(interaction.reactions) + 0.38 * scale(interaction.comments),
        Channel::Web => 0.0,
    }
}

fn trust_base(channel: Channel) -> f64 {
    TRUST_BASE
        .iter()
        .find(|(c, _)| *c == channel)
        .map(|(_, v)| *v)
        .unwrap_or(50.0)
}

fn trust_adjustment(time_confidence: TimeConfidence) -> f64 {
    match time_confidence {
        TimeConfidence::Solid => 6.0,
        TimeConfidence::Weak => -5.0,
        TimeConfidence::Unknown => -10.0,
        TimeConfidence::Soft => 0.0,
    }
}

/// Raw (pre-normalization) trust score for a single item.
pub fn raw_trust(channel: Channel, time_confidence: TimeConfidence) -> f64 {
    trust_base(channel) + trust_adjustment(time_confidence)
}

/// Percentile rank of each value in `values` after ascending sort:
/// `(rank_index / max(1, n-1)) * 100`. `None` entries are replaced by
/// `fallback` before ranking. Returns scores aligned to the input order.
pub fn percentile_ranks(values: &[Option<f64>], fallback: f64) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let filled: Vec<f64> = values.iter().map(|v| v.unwrap_or(fallback)).collect();

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| filled[a].partial_cmp(&filled[b]).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let denom = (n - 1).max(1) as f64;
    for (rank_index, &original_index) in order.iter().enumerate() {
        ranks[original_index] = (rank_index as f64 / denom) * 100.0;
    }
    ranks
}

fn weighted_geometric_mean(components: &[(f64, f64)]) -> f64 {
    let weight_sum: f64 = components.iter().map(|(_, w)| w).sum();
    let product: f64 = components.iter().map(|(v, w)| v.max(1.0).powf(*w)).product();
    product.powf(1.0 / weight_sum)
}

/// Scores a batch of same-shape (Reddit/X/YouTube/LinkedIn) items in place.
/// Populates `interaction.pulse`, `scorecard`, and `rank` on each [`Signal`].
/// `max_days` is the span length used for freshness recency scoring.
pub fn score_platform_batch(items: &mut [Signal], max_days: i64) {
    if items.is_empty() {
        return;
    }

    let raw_topicality: Vec<Option<f64>> = items.iter().map(|s| Some(s.topicality * 100.0)).collect();
    let raw_freshness: Vec<Option<f64>> = items
        .iter()
        .map(|s| Some(timeframe::recency_score(s.dated.as_deref(), max_days) as f64))
        .collect();

    let interaction_was_empty: Vec<bool> = items.iter().map(|s| s.interaction.is_empty()).collect();
    let raw_traction: Vec<Option<f64>> = items
        .iter()
        .map(|s| {
            let pulse = interaction_pulse(s.channel, &s.interaction);
            if s.interaction.is_empty() {
                None
            } else {
                Some(pulse)
            }
        })
        .collect();
    for (item, pulse) in items.iter_mut().zip(raw_traction.iter()) {
        item.interaction.pulse = Some(pulse.unwrap_or(0.0));
    }

    let raw_trust: Vec<Option<f64>> = items
        .iter()
        .map(|s| Some(raw_trust(s.channel, s.time_confidence)))
        .collect();

    let topicality_pct = percentile_ranks(&raw_topicality, TRACTION_FALLBACK);
    let freshness_pct = percentile_ranks(&raw_freshness, TRACTION_FALLBACK);
    let traction_pct = percentile_ranks(&raw_traction, TRACTION_FALLBACK);
    let trust_pct = percentile_ranks(&raw_trust, TRACTION_FALLBACK);

    for (i, item) in items.iter_mut().enumerate() {
        let combined = weighted_geometric_mean(&[
            (topicality_pct[i], 0.38),
            (freshness_pct[i], 0.27),
            (traction_pct[i], 0.23),
            (trust_pct[i], 0.12),
        ]);

        let mut adjusted = combined;
        if interaction_was_empty[i] {
            adjusted -= MISSING_INTERACTION_PENALTY;
        }
        match item.time_confidence {
            TimeConfidence::Weak => adjusted -= 5.0,
            TimeConfidence::Unknown => adjusted -= 9.0,
            _ => {}
        }

        let clamped = adjusted.clamp(0.0, 100.0).round() as i32;
        item.rank = clamped;
        item.scorecard = Scorecard {
            topicality: topicality_pct[i].round() as i32,
            freshness: freshness_pct[i].round() as i32,
            traction: traction_pct[i].round() as i32,
            trust: trust_pct[i].round() as i32,
        };
    }
}

const WEB_SOURCE_PENALTY: f64 = 6.0;

/// Scores a batch of Web items in place (no traction dimension).
pub fn score_web_batch(items: &mut [Signal], max_days: i64) {
    if items.is_empty() {
        return;
    }

    let raw_topicality: Vec<Option<f64>> = items.iter().map(|s| Some(s.topicality * 100.0)).collect();
    let raw_freshness: Vec<Option<f64>> = items
        .iter()
        .map(|s| Some(timeframe::recency_score(s.dated.as_deref(), max_days) as f64))
        .collect();
    let raw_trust: Vec<Option<f64>> = items
        .iter()
        .map(|s| Some(raw_trust(s.channel, s.time_confidence)))
        .collect();

    let topicality_pct = percentile_ranks(&raw_topicality, TRACTION_FALLBACK);
    let freshness_pct = percentile_ranks(&raw_freshness, TRACTION_FALLBACK);
    let trust_pct = percentile_ranks(&raw_trust, TRACTION_FALLBACK);

    for (i, item) in items.iter_mut().enumerate() {
        let mut total =
            0.52 * topicality_pct[i] + 0.33 * freshness_pct[i] + 0.15 * trust_pct[i] - WEB_SOURCE_PENALTY;
        total += match item.time_confidence {
            TimeConfidence::Solid => 5.0,
            TimeConfidence::Weak => -9.0,
            TimeConfidence::Unknown => -13.0,
            TimeConfidence::Soft => 0.0,
        };

        let clamped = total.clamp(0.0, 100.0).round() as i32;
        item.rank = clamped;
        item.scorecard = Scorecard {
            topicality: topicality_pct[i].round() as i32,
            freshness: freshness_pct[i].round() as i32,
            traction: 0,
            trust: trust_pct[i].round() as i32,
        };
    }
}

/// Multiplies each item's rank by its channel's stance weight, clamping and
/// rounding back into `[0, 100]`.
pub fn apply_stance_weights(items: &mut [Signal], weights: &std::collections::HashMap<Channel, f64>) {
    for item in items.iter_mut() {
        let weight = weights.get(&item.channel).copied().unwrap_or(1.0);
        item.rank = ((item.rank as f64 * weight).clamp(0.0, 100.0)).round() as i32;
    }
}

/// Stable, deterministic global ordering key:
/// `(-rank, -trust, -date_ordinal, lowercased headline)`.
pub fn sort_items(items: &mut [Signal]) {
    items.sort_by(|a, b| {
        let rank_cmp = b.rank.cmp(&a.rank);
        if rank_cmp != std::cmp::Ordering::Equal {
            return rank_cmp;
        }
        let trust_cmp = b.scorecard.trust.cmp(&a.scorecard.trust);
        if trust_cmp != std::cmp::Ordering::Equal {
            return trust_cmp;
        }
        let date_cmp = b.dated.cmp(&a.dated);
        if date_cmp != std::cmp::Ordering::Equal {
            return date_cmp;
        }
        a.headline.to_lowercase().cmp(&b.headline.to_lowercase())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use briefbot_core::content::{Channel, Interaction, Scorecard, Signal, TimeConfidence};
    use std::collections::HashMap;

    fn signal(channel: Channel, headline: &str, topicality: f64, dated: Option<&str>) -> Signal {
        Signal {
            key: format!("{channel}-{headline}"),
            channel,
            headline: headline.to_string(),
            url: format!("https://example.com/{headline}"),
            byline: None,
            blurb: None,
            dated: dated.map(str::to_string),
            time_confidence: TimeConfidence::Solid,
            interaction: Interaction::default(),
            topicality,
            rationale: None,
            rank: 0,
            scorecard: Scorecard::default(),
            thread_notes: vec![],
            notables: vec![],
            extras: HashMap::new(),
        }
    }

    #[test]
    fn percentile_ranks_span_zero_to_hundred() {
        let values = vec![Some(1.0), Some(5.0), Some(10.0)];
        let ranks = percentile_ranks(&values, 42.0);
        assert_eq!(ranks[0], 0.0);
        assert_eq!(ranks[2], 100.0);
        assert_eq!(ranks[1], 50.0);
    }

    #[test]
    fn scenario_d_percentile_rank_five_values() {
        let values = vec![Some(10.0), Some(20.0), Some(30.0), Some(40.0), Some(50.0)];
        let ranks = percentile_ranks(&values, 42.0);
        assert_eq!(ranks, vec![0.0, 25.0, 50.0, 75.0, 100.0]);
    }

    #[test]
    fn percentile_ranks_single_value_is_zero() {
        let ranks = percentile_ranks(&[Some(5.0)], 42.0);
        assert_eq!(ranks, vec![0.0]);
    }

    #[test]
    fn reddit_pulse_uses_default_vote_ratio_when_absent() {
        let interaction = Interaction {
            upvotes: Some(100),
            comments: Some(25),
            ..Default::default()
        };
        let pulse = interaction_pulse(Channel::Reddit, &interaction);
        let expected = 0.40 * 10.0 + 0.40 * 5.0 + 0.20 * (0.55 * 10.0);
        assert!((pulse - expected).abs() < 1e-9);
    }

    #[test]
    fn missing_interaction_batch_still_scores_with_penalty() {
        let mut items = vec![
            signal(Channel::Reddit, "alpha", 0.9, Some("2026-01-01")),
            signal(Channel::Reddit, "beta", 0.1, Some("2025-01-01")),
        ];
        score_platform_batch(&mut items, 30);
        assert!(items[0].rank >= items[1].rank);
        assert!(items.iter().all(|s| (0..=100).contains(&s.rank)));
    }

    #[test]
    fn web_batch_applies_fixed_penalties() {
        let mut items = vec![signal(Channel::Web, "gamma", 0.8, Some("2026-01-01"))];
        items[0].time_confidence = TimeConfidence::Unknown;
        score_web_batch(&mut items, 30);
        assert!(items[0].rank <= 100);
    }

    #[test]
    fn stance_weights_scale_rank_and_clamp() {
        let mut items = vec![signal(Channel::X, "delta", 0.5, None)];
        items[0].rank = 90;
        let mut weights = HashMap::new();
        weights.insert(Channel::X, 1.5);
        apply_stance_weights(&mut items, &weights);
        assert_eq!(items[0].rank, 100);
    }

    #[test]
    fn sort_is_stable_by_rank_then_trust_then_date_then_headline() {
        let mut a = signal(Channel::Web, "Zebra", 0.5, Some("2026-01-01"));
        a.rank = 80;
        a.scorecard.trust = 50;
        let mut b = signal(Channel::Web, "alpha", 0.5, Some("2026-01-01"));
        b.rank = 80;
        b.scorecard.trust = 50;
        let mut items = vec![a, b];
        sort_items(&mut items);
        // equal rank/trust/date falls through to lowercased headline order
        assert_eq!(items[0].headline, "alpha");
    }
}
