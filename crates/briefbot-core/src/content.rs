//! The unified content model: one discovered item is a [`Signal`], a run's
//! aggregate output is a [`Brief`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ContentError, Result};

/// One of the five discovery sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Reddit,
    X,
    Youtube,
    Linkedin,
    Web,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Reddit => "reddit",
            Channel::X => "x",
            Channel::Youtube => "youtube",
            Channel::Linkedin => "linkedin",
            Channel::Web => "web",
        }
    }

    pub const ALL: [Channel; 5] = [
        Channel::Reddit,
        Channel::X,
        Channel::Youtube,
        Channel::Linkedin,
        Channel::Web,
    ];
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Confidence of a Signal's `dated` field relative to the query span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeConfidence {
    Solid,
    Soft,
    Weak,
    Unknown,
}

/// Platform-agnostic engagement metrics. Unknown = absent, never zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upvotes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reposts: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quotes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactions: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmarks: Option<i64>,
    /// Derived per-channel composite. Populated by scoring, not by providers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulse: Option<f64>,
}

impl Interaction {
    /// True when every raw engagement field is absent (pulse doesn't count —
    /// it's derived, and its absence is what drives the missing-interaction
    /// ranking penalty in the first place).
    pub fn is_empty(&self) -> bool {
        self.upvotes.is_none()
            && self.comments.is_none()
            && self.vote_ratio.is_none()
            && self.likes.is_none()
            && self.reposts.is_none()
            && self.replies.is_none()
            && self.quotes.is_none()
            && self.views.is_none()
            && self.reactions.is_none()
            && self.bookmarks.is_none()
    }
}

/// Four integer 0..100 subscores.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Scorecard {
    pub topicality: i32,
    pub freshness: i32,
    pub traction: i32,
    pub trust: i32,
}

/// One Reddit comment excerpt attached to an enriched Signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadNote {
    pub score: Option<i64>,
    pub dated: Option<String>,
    pub author: String,
    pub excerpt: String,
    pub url: String,
}

/// A single discovered item, normalized into the unified content model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub key: String,
    pub channel: Channel,
    pub headline: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blurb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dated: Option<String>,
    pub time_confidence: TimeConfidence,
    pub interaction: Interaction,
    pub topicality: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    pub rank: i32,
    pub scorecard: Scorecard,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thread_notes: Vec<ThreadNote>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notables: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extras: HashMap<String, String>,
}

impl Signal {
    /// Clamp `topicality` into `[0, 1]` — invariant from spec §3.
    pub fn clamp_topicality(&mut self) {
        self.topicality = self.topicality.clamp(0.0, 1.0);
    }
}

/// The `(start, end)` date window, both inclusive ISO dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub start: String,
    pub end: String,
}

impl Span {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Result<Self> {
        let start = start.into();
        let end = end.into();
        if start > end {
            return Err(ContentError::InvalidSpan { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: &str) -> bool {
        self.start.as_str() <= date && date <= self.end.as_str()
    }
}

/// Effective channel-selection mode a run resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    Auto,
    Reddit,
    X,
    Youtube,
    Linkedin,
    Web,
    All,
    Both,
    RedditWeb,
    XWeb,
    /// No credentials were available; only the caller-supplied web channel
    /// contributed. Not named in the original mode list but required by
    /// §4.9's "no credentials" fallback.
    WebOnly,
}

/// `{openai, xai}` selected model identifiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelChoices {
    pub openai: Option<String>,
    pub xai: Option<String>,
}

/// Complexity classification of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Complexity {
    BroadExploratory,
    ComplexAnalytical,
}

/// Epistemic stance classification of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stance {
    Balanced,
    ExperientialOpinion,
    FactualTemporal,
    TrendingBreaking,
    HowToTutorial,
}

/// Intent-classification diagnostics, always present on a Brief.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentDiagnostics {
    pub complexity_class: Complexity,
    pub complexity_reason: String,
    pub epistemic_stance: Stance,
    pub epistemic_reason: String,
    pub decomposition: Vec<String>,
    pub decomposition_source: String,
}

/// Whether a Brief was served from the response cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheMark {
    pub enabled: bool,
    pub age_hours: Option<f64>,
}

/// Run-level metrics populated at the end of the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub search_duration_ms: u64,
    pub item_count: usize,
}

/// Per-channel human-readable error messages. `set` with `None` is a no-op,
/// matching the original's `SourceErrors.set()` contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceErrors(HashMap<String, String>);

impl SourceErrors {
    pub fn get(&self, channel: Channel) -> Option<&str> {
        self.0.get(channel.as_str()).map(|s| s.as_str())
    }

    pub fn set(&mut self, channel: Channel, message: Option<String>) {
        if let Some(message) = message {
            self.0.insert(channel.as_str().to_string(), message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The aggregated output of a research run over a topic and time span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brief {
    pub topic: String,
    pub span: Span,
    pub generated_at: DateTime<Utc>,
    pub mode: Mode,
    pub models: ModelChoices,
    pub intent: IntentDiagnostics,
    pub items: Vec<Signal>,
    pub errors: SourceErrors,
    pub cache: CacheMark,
    pub metrics: RunStats,
}

impl Brief {
    pub fn new(topic: impl Into<String>, span: Span, mode: Mode, intent: IntentDiagnostics) -> Self {
        Self {
            topic: topic.into(),
            span,
            generated_at: Utc::now(),
            mode,
            models: ModelChoices::default(),
            intent,
            items: Vec::new(),
            errors: SourceErrors::default(),
            cache: CacheMark::default(),
            metrics: RunStats::default(),
        }
    }

    fn channel_items(&self, channel: Channel) -> impl Iterator<Item = &Signal> {
        self.items.iter().filter(move |s| s.channel == channel)
    }

    pub fn reddit(&self) -> Vec<&Signal> {
        self.channel_items(Channel::Reddit).collect()
    }

    pub fn x(&self) -> Vec<&Signal> {
        self.channel_items(Channel::X).collect()
    }

    pub fn youtube(&self) -> Vec<&Signal> {
        self.channel_items(Channel::Youtube).collect()
    }

    pub fn linkedin(&self) -> Vec<&Signal> {
        self.channel_items(Channel::Linkedin).collect()
    }

    pub fn web(&self) -> Vec<&Signal> {
        self.channel_items(Channel::Web).collect()
    }

    /// Verify the `key`-uniqueness invariant from spec §3. Intended for use
    /// in tests and at the end of pipeline post-processing, not on every
    /// mutation (keys are assigned before items ever reach a Brief).
    pub fn check_unique_keys(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for item in &self.items {
            if !seen.insert(item.key.as_str()) {
                return Err(ContentError::DuplicateKey(item.key.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_rejects_inverted_range() {
        assert!(Span::new("2026-02-01", "2026-01-01").is_err());
        assert!(Span::new("2026-01-01", "2026-02-01").is_ok());
    }

    #[test]
    fn source_errors_set_none_is_noop() {
        let mut errors = SourceErrors::default();
        errors.set(Channel::Reddit, None);
        assert!(errors.is_empty());
        errors.set(Channel::Reddit, Some("boom".into()));
        assert_eq!(errors.get(Channel::Reddit), Some("boom"));
    }

    #[test]
    fn channel_accessors_filter_flat_items() {
        let span = Span::new("2026-01-01", "2026-01-31").unwrap();
        let intent = IntentDiagnostics {
            complexity_class: Complexity::BroadExploratory,
            complexity_reason: "short topic".into(),
            epistemic_stance: Stance::Balanced,
            epistemic_reason: "no cues".into(),
            decomposition: vec![],
            decomposition_source: "skipped".into(),
        };
        let mut brief = Brief::new("rust async", span, Mode::All, intent);
        brief.items.push(Signal {
            key: "RDT-01".into(),
            channel: Channel::Reddit,
            headline: "h".into(),
            url: "https://reddit.com/r/rust/1".into(),
            byline: None,
            blurb: None,
            dated: None,
            time_confidence: TimeConfidence::Unknown,
            interaction: Interaction::default(),
            topicality: 0.5,
            rationale: None,
            rank: 0,
            scorecard: Scorecard::default(),
            thread_notes: vec![],
            notables: vec![],
            extras: HashMap::new(),
        });
        assert_eq!(brief.reddit().len(), 1);
        assert_eq!(brief.x().len(), 0);
        assert!(brief.check_unique_keys().is_ok());
    }
}
