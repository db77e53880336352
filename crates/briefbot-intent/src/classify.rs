//! Rule-based complexity and epistemic-stance classifiers, and the
//! fixed per-stance channel weight table.

use std::collections::HashMap;

use briefbot_core::content::{Channel, Complexity, Stance};
use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9][a-z0-9.+_-]*").unwrap());

fn tokenize(topic: &str) -> Vec<String> {
    TOKEN_RE
        .find_iter(&topic.to_ascii_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

const GENERIC_TOPIC_WORDS: &[&str] = &["news", "updates", "trends", "trend", "overview"];
const COMPLEXITY_TRIGGERS: &[&str] = &[
    "why",
    "how",
    "despite",
    "because",
    "impact",
    "effect",
    "cause",
    "barrier",
    "replace",
    "replacing",
    "adoption",
    "versus",
    "vs",
    "compare",
    "difference",
    "tradeoff",
];
const MULTI_CLAUSE_CUES: &[&str] = &["and", "but", "while", "despite"];

/// `(class, reason)` — see spec §4.6 for the exact branch semantics.
pub fn classify_complexity(topic: &str) -> (Complexity, String) {
    let lower = topic.to_ascii_lowercase();
    let tokens = tokenize(&lower);

    if tokens.len() <= 2 {
        return (
            Complexity::BroadExploratory,
            "topic has two or fewer word-tokens".to_string(),
        );
    }
    if lower.contains("what's new") || tokens.iter().any(|t| GENERIC_TOPIC_WORDS.contains(&t.as_str())) {
        return (
            Complexity::BroadExploratory,
            "topic matches a generic/overview word".to_string(),
        );
    }
    if let Some(word) = tokens.iter().find(|t| COMPLEXITY_TRIGGERS.contains(&t.as_str())) {
        return (
            Complexity::ComplexAnalytical,
            format!("topic contains analytical cue word '{word}'"),
        );
    }
    if lower.contains('?') && MULTI_CLAUSE_CUES.iter().any(|cue| lower.contains(cue)) {
        return (
            Complexity::ComplexAnalytical,
            "topic is a multi-clause question".to_string(),
        );
    }
    if lower.contains("vs") || lower.contains("versus") {
        return (
            Complexity::ComplexAnalytical,
            "topic contains a comparison marker".to_string(),
        );
    }
    (
        Complexity::BroadExploratory,
        "no complexity signal matched; defaulting broad".to_string(),
    )
}

const HOWTO_PHRASES: &[&str] = &[
    "how to", "tutorial", "guide", "steps", "walkthrough", "install", "setup", "build",
];
const TRENDING_PHRASES: &[&str] = &[
    "breaking", "latest", "today", "this week", "right now", "news", "now", "live",
];
const OPINION_PHRASES: &[&str] = &[
    "opinion",
    "sentiment",
    "community",
    "what do people think",
    "hot take",
    "reddit",
    "x",
];

static FACTUAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(why|when|where|facts?|data|statistics|spec|documentation|technical|price|policy)\b").unwrap()
});

/// `(stance, reason)`, ordered HOWTO -> TRENDING -> OPINION -> FACTUAL ->
/// BALANCED, matching spec §4.6's explicit priority.
pub fn classify_epistemic_stance(topic: &str) -> (Stance, String) {
    let lower = topic.to_ascii_lowercase();

    if let Some(phrase) = HOWTO_PHRASES.iter().find(|p| lower.contains(*p)) {
        return (Stance::HowToTutorial, format!("topic contains '{phrase}'"));
    }
    if let Some(phrase) = TRENDING_PHRASES.iter().find(|p| lower.contains(*p)) {
        return (Stance::TrendingBreaking, format!("topic contains '{phrase}'"));
    }
    if let Some(phrase) = OPINION_PHRASES.iter().find(|p| lower.contains(*p)) {
        return (
            Stance::ExperientialOpinion,
            format!("topic contains '{phrase}'"),
        );
    }
    if let Some(m) = FACTUAL_RE.find(&lower) {
        return (
            Stance::FactualTemporal,
            format!("topic contains '{}'", m.as_str()),
        );
    }
    (Stance::Balanced, "no stance cue matched".to_string())
}

/// The fixed per-stance, per-channel weight table (see SPEC_FULL.md §4.6).
pub fn stance_weights(stance: Stance) -> HashMap<Channel, f64> {
    use Channel::*;
    let table: &[(Channel, f64)] = match stance {
        Stance::Balanced => &[(Reddit, 1.00), (X, 1.00), (Youtube, 1.00), (Linkedin, 1.00), (Web, 1.00)],
        Stance::ExperientialOpinion => {
            &[(Reddit, 1.18), (X, 1.18), (Youtube, 1.00), (Linkedin, 0.95), (Web, 0.88)]
        }
        Stance::FactualTemporal => {
            &[(Reddit, 0.92), (X, 0.92), (Youtube, 0.95), (Linkedin, 1.00), (Web, 1.20)]
        }
        Stance::TrendingBreaking => {
            &[(Reddit, 1.05), (X, 1.26), (Youtube, 0.92), (Linkedin, 0.90), (Web, 0.90)]
        }
        Stance::HowToTutorial => {
            &[(Reddit, 1.00), (X, 0.92), (Youtube, 1.28), (Linkedin, 0.96), (Web, 1.08)]
        }
    };
    table.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_topic_is_broad_exploratory() {
        let (class, _) = classify_complexity("rust news");
        assert_eq!(class, Complexity::BroadExploratory);
    }

    #[test]
    fn analytical_cue_word_wins() {
        let (class, _) = classify_complexity("why is rust adoption growing despite its learning curve");
        assert_eq!(class, Complexity::ComplexAnalytical);
    }

    #[test]
    fn comparison_marker_is_analytical() {
        let (class, _) = classify_complexity("rust versus golang for backend services");
        assert_eq!(class, Complexity::ComplexAnalytical);
    }

    #[test]
    fn howto_beats_trending_when_both_present() {
        let (stance, _) = classify_epistemic_stance("how to set up the latest rust toolchain today");
        assert_eq!(stance, Stance::HowToTutorial);
    }

    #[test]
    fn opinion_phrase_detected() {
        let (stance, _) = classify_epistemic_stance("what does the reddit community think about rust");
        assert_eq!(stance, Stance::ExperientialOpinion);
    }

    #[test]
    fn trending_phrase_outranks_factual_cue() {
        // "latest" (TRENDING) is checked before "data" (FACTUAL), so
        // trending wins even though both cues are present.
        let (stance, _) = classify_epistemic_stance("latest pricing data for cloud gpus");
        assert_eq!(stance, Stance::TrendingBreaking);
    }

    #[test]
    fn factual_cue_wins_without_a_trending_phrase() {
        let (stance, _) = classify_epistemic_stance("why does gpu pricing data vary by region");
        assert_eq!(stance, Stance::FactualTemporal);
    }

    #[test]
    fn balanced_default_weights_are_all_one() {
        let weights = stance_weights(Stance::Balanced);
        assert!(weights.values().all(|w| (*w - 1.0).abs() < f64::EPSILON));
    }

    #[test]
    fn trending_breaking_boosts_x_most() {
        let weights = stance_weights(Stance::TrendingBreaking);
        assert_eq!(weights[&Channel::X], 1.26);
    }
}
