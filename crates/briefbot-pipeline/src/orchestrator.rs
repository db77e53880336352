//! The pipeline orchestrator (spec §4.9): validates requested channels
//! against available credentials, fans out to selected providers
//! concurrently via a bounded [`tokio::task::JoinSet`], then runs a
//! single-threaded normalization -> date-filter -> enrichment -> rank ->
//! dedup -> stance -> sort pass, grounded on `skynet-scheduler/engine.rs`'s
//! bounded-task-join shape.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{info, warn};

use briefbot_cache::{cache_key, ModelRegistry, ResponseCache, DEFAULT_TTL_HOURS};
use briefbot_core::config::{Credentials, SamplingTier};
use briefbot_core::content::{
    Brief, CacheMark, Channel, IntentDiagnostics, ModelChoices, RunStats, Signal, SourceErrors, Span,
};
use briefbot_intent::{classify_complexity, classify_epistemic_stance, decompose_query, stance_weights};
use briefbot_net::HttpClient;
use briefbot_providers::{enrichment, linkedin, reddit, web, x, youtube};
use briefbot_scoring::{apply_stance_weights, deduplicate, score_platform_batch, score_web_batch, sort_items};

use crate::error::{PipelineError, Result};
use crate::fixtures::{self, load_fixture};
use crate::progress::{NoopProgress, ProgressSink};
use crate::sources::{resolve_sources, Requested};

const DEFAULT_RECENCY_HORIZON_DAYS: i64 = 30;

/// Everything the orchestrator needs for one run. Constructed by the
/// caller (CLI, chat bot, scheduler — all out of core scope); the core
/// exposes only this request shape and [`run`].
pub struct RunRequest {
    pub topic: String,
    pub requested: Requested,
    pub span: Span,
    pub sampling: SamplingTier,
    /// When true, every provider call is satisfied from `fixtures_dir`
    /// instead of the network (spec §6), and the response cache is
    /// bypassed entirely so fixture runs never read or write it.
    pub mock: bool,
    /// Bypasses a fresh cache hit and forces the pipeline to run.
    pub refresh: bool,
    /// Drop Signals with no `dated` instead of keeping them (spec §4.9
    /// step 3's `exclude_undated` flag).
    pub exclude_undated: bool,
    /// Whether the caller is supplying a web-search channel at all (the
    /// core never performs its own web search).
    pub include_web: bool,
    pub web_hits: Vec<web::RawHit>,
    pub cache_dir: String,
    pub fixtures_dir: Option<String>,
}

struct ProviderOutcome {
    channel: Channel,
    items: Vec<Signal>,
    error: Option<String>,
}

fn span_days(span: &Span) -> i64 {
    let parsed = NaiveDate::parse_from_str(&span.start, "%Y-%m-%d")
        .ok()
        .zip(NaiveDate::parse_from_str(&span.end, "%Y-%m-%d").ok());
    match parsed {
        Some((start, end)) => (end - start).num_days().max(1).max(DEFAULT_RECENCY_HORIZON_DAYS),
        None => DEFAULT_RECENCY_HORIZON_DAYS,
    }
}

fn channel_set_key(channels: &[Channel]) -> String {
    let mut names: Vec<&str> = channels.iter().map(Channel::as_str).collect();
    names.sort_unstable();
    names.join(",")
}

async fn dispatch_reddit(
    http: Arc<HttpClient>,
    registry: Arc<ModelRegistry>,
    credentials: Arc<Credentials>,
    topic: String,
    span: Span,
    sampling: SamplingTier,
    model: Option<String>,
    fixture: Option<serde_json::Value>,
    progress: Arc<dyn ProgressSink>,
) -> ProviderOutcome {
    progress.start_reddit();
    let Some(cred) = credentials.openai.as_ref() else {
        return ProviderOutcome {
            channel: Channel::Reddit,
            items: Vec::new(),
            error: Some("openai credential missing".to_string()),
        };
    };
    let Some(model) = model else {
        return ProviderOutcome {
            channel: Channel::Reddit,
            items: Vec::new(),
            error: Some("no openai model selected".to_string()),
        };
    };

    let result = reddit::search(
        &http,
        &registry,
        &cred.api_key,
        &model,
        &topic,
        &span.start,
        &span.end,
        sampling,
        fixture,
    )
    .await;

    match result {
        Ok(raw) => {
            let items: Vec<Signal> = reddit::parse_reddit(&raw)
                .into_iter()
                .map(|thread| reddit::to_signal(thread, &span))
                .collect();
            progress.end_reddit(items.len());
            ProviderOutcome {
                channel: Channel::Reddit,
                items,
                error: None,
            }
        }
        Err(err) => {
            progress.show_error(&err.to_string());
            ProviderOutcome {
                channel: Channel::Reddit,
                items: Vec::new(),
                error: Some(err.to_string()),
            }
        }
    }
}

async fn dispatch_x(
    http: Arc<HttpClient>,
    registry: Arc<ModelRegistry>,
    credentials: Arc<Credentials>,
    topic: String,
    span: Span,
    sampling: SamplingTier,
    model: Option<String>,
    fixture: Option<serde_json::Value>,
    progress: Arc<dyn ProgressSink>,
) -> ProviderOutcome {
    progress.start_x();
    let Some(cred) = credentials.xai.as_ref() else {
        return ProviderOutcome {
            channel: Channel::X,
            items: Vec::new(),
            error: Some("xai credential missing".to_string()),
        };
    };
    let Some(model) = model else {
        return ProviderOutcome {
            channel: Channel::X,
            items: Vec::new(),
            error: Some("no xai model selected".to_string()),
        };
    };

    let result = x::search(
        &http,
        &registry,
        &cred.api_key,
        &model,
        &topic,
        &span.start,
        &span.end,
        sampling,
        fixture,
    )
    .await;

    match result {
        Ok(raw) => {
            let items: Vec<Signal> = x::parse_x(&raw).into_iter().map(|post| x::to_signal(post, &span)).collect();
            progress.end_x(items.len());
            ProviderOutcome {
                channel: Channel::X,
                items,
                error: None,
            }
        }
        Err(err) => {
            progress.show_error(&err.to_string());
            ProviderOutcome {
                channel: Channel::X,
                items: Vec::new(),
                error: Some(err.to_string()),
            }
        }
    }
}

async fn dispatch_youtube(
    http: Arc<HttpClient>,
    registry: Arc<ModelRegistry>,
    credentials: Arc<Credentials>,
    topic: String,
    span: Span,
    sampling: SamplingTier,
    model: Option<String>,
    fixture: Option<serde_json::Value>,
    progress: Arc<dyn ProgressSink>,
) -> ProviderOutcome {
    progress.start_youtube();
    let Some(cred) = credentials.openai.as_ref() else {
        return ProviderOutcome {
            channel: Channel::Youtube,
            items: Vec::new(),
            error: Some("openai credential missing".to_string()),
        };
    };
    let Some(model) = model else {
        return ProviderOutcome {
            channel: Channel::Youtube,
            items: Vec::new(),
            error: Some("no openai model selected".to_string()),
        };
    };

    let result = youtube::search(
        &http,
        &registry,
        &cred.api_key,
        &model,
        &topic,
        &span.start,
        &span.end,
        sampling,
        fixture,
    )
    .await;

    match result {
        Ok(raw) => {
            let items: Vec<Signal> = youtube::parse_youtube(&raw)
                .into_iter()
                .map(|video| youtube::to_signal(video, &span))
                .collect();
            progress.end_youtube(items.len());
            ProviderOutcome {
                channel: Channel::Youtube,
                items,
                error: None,
            }
        }
        Err(err) => {
            progress.show_error(&err.to_string());
            ProviderOutcome {
                channel: Channel::Youtube,
                items: Vec::new(),
                error: Some(err.to_string()),
            }
        }
    }
}

async fn dispatch_linkedin(
    http: Arc<HttpClient>,
    registry: Arc<ModelRegistry>,
    credentials: Arc<Credentials>,
    topic: String,
    span: Span,
    sampling: SamplingTier,
    model: Option<String>,
    fixture: Option<serde_json::Value>,
    progress: Arc<dyn ProgressSink>,
) -> ProviderOutcome {
    progress.start_linkedin();
    let Some(cred) = credentials.openai.as_ref() else {
        return ProviderOutcome {
            channel: Channel::Linkedin,
            items: Vec::new(),
            error: Some("openai credential missing".to_string()),
        };
    };
    let Some(model) = model else {
        return ProviderOutcome {
            channel: Channel::Linkedin,
            items: Vec::new(),
            error: Some("no openai model selected".to_string()),
        };
    };

    let result = linkedin::search(
        &http,
        &registry,
        &cred.api_key,
        &model,
        &topic,
        &span.start,
        &span.end,
        sampling,
        fixture,
    )
    .await;

    match result {
        Ok(raw) => {
            let items: Vec<Signal> = linkedin::parse_linkedin(&raw)
                .into_iter()
                .map(|post| linkedin::to_signal(post, &span))
                .collect();
            progress.end_linkedin(items.len());
            ProviderOutcome {
                channel: Channel::Linkedin,
                items,
                error: None,
            }
        }
        Err(err) => {
            progress.show_error(&err.to_string());
            ProviderOutcome {
                channel: Channel::Linkedin,
                items: Vec::new(),
                error: Some(err.to_string()),
            }
        }
    }
}

async fn dispatch_web(
    hits: Vec<web::RawHit>,
    span: Span,
    progress: Arc<dyn ProgressSink>,
) -> ProviderOutcome {
    progress.start_web();
    let processed = web::process_results(&hits, &span.start, &span.end);
    let deduped = web::dedup_urls(processed);
    let items: Vec<Signal> = deduped.into_iter().map(|item| web::to_signal(item, &span)).collect();
    progress.end_web(items.len());
    ProviderOutcome {
        channel: Channel::Web,
        items,
        error: None,
    }
}

/// Runs the full research pipeline for one request, returning the
/// populated [`Brief`]. This is the core's single programmatic entry
/// point (spec §6).
pub async fn run(request: RunRequest, progress: Option<Arc<dyn ProgressSink>>, credentials: Credentials) -> Result<Brief> {
    if request.span.start > request.span.end {
        return Err(PipelineError::InvalidSpan(format!(
            "{} is after {}",
            request.span.start, request.span.end
        )));
    }

    let progress: Arc<dyn ProgressSink> = progress.unwrap_or_else(|| Arc::new(NoopProgress));
    let credentials = Arc::new(credentials);

    let resolution = resolve_sources(
        request.requested,
        credentials.has_openai(),
        credentials.has_xai(),
        request.include_web,
    );
    if let Some(warning) = &resolution.warning {
        warn!(topic = %request.topic, warning, "channel resolution produced a warning");
    }
    let channels = resolution.channels;
    let channel_set = channel_set_key(&channels);

    let cache = ResponseCache::new(request.cache_dir.as_str());
    let key = cache_key(&request.topic, &request.span.start, &request.span.end, &channel_set);

    if !request.mock && !request.refresh {
        let (cached, age) = cache.load_with_age(&key, DEFAULT_TTL_HOURS);
        if let Some(value) = cached {
            match serde_json::from_value::<Brief>(value) {
                Ok(mut brief) => {
                    brief.cache = CacheMark {
                        enabled: true,
                        age_hours: age,
                    };
                    info!(topic = %request.topic, key, "served brief from cache");
                    return Ok(brief);
                }
                Err(err) => {
                    warn!(key, error = %err, "cached brief failed to deserialize, running fresh");
                }
            }
        }
    }

    let started = Instant::now();
    let net = Arc::new(HttpClient::new());
    let registry = Arc::new(ModelRegistry::new(request.cache_dir.as_str()));

    let (complexity_class, complexity_reason) = classify_complexity(&request.topic);
    let (epistemic_stance, epistemic_reason) = classify_epistemic_stance(&request.topic);

    let model_mock_list = request.mock.then(Vec::new);

    let openai_model = match credentials.openai.as_ref() {
        Some(cred) => {
            registry
                .choose_openai_model(
                    cred.model_policy.clone(),
                    cred.model_pin.as_deref(),
                    model_mock_list.clone(),
                    &cred.api_key,
                )
                .await
        }
        None => None,
    };
    let xai_model = match credentials.xai.as_ref() {
        Some(cred) => {
            registry
                .choose_xai_model(
                    cred.model_policy.clone(),
                    cred.model_pin.as_deref(),
                    model_mock_list,
                    &cred.api_key,
                )
                .await
        }
        None => None,
    };

    let (decomposition, decomposition_source) = if channels.contains(&Channel::Reddit)
        || channels.contains(&Channel::Youtube)
        || channels.contains(&Channel::Linkedin)
    {
        decompose_query(
            &request.topic,
            credentials.openai.as_ref().map(|c| c.api_key.as_str()),
            openai_model.as_deref(),
        )
        .await
    } else {
        (Vec::new(), "skipped")
    };

    progress.start_processing();

    let mut join_set = tokio::task::JoinSet::new();
    for channel in &channels {
        let http = net.clone();
        let registry = registry.clone();
        let credentials = credentials.clone();
        let topic = request.topic.clone();
        let span = request.span.clone();
        let sampling = request.sampling;
        let progress = progress.clone();

        match channel {
            Channel::Reddit => {
                let fixture = request
                    .fixtures_dir
                    .as_deref()
                    .and_then(|dir| load_fixture(dir, fixtures::OPENAI_SAMPLE))
                    .filter(|_| request.mock);
                let model = openai_model.clone();
                join_set.spawn(dispatch_reddit(http, registry, credentials, topic, span, sampling, model, fixture, progress));
            }
            Channel::X => {
                let fixture = request
                    .fixtures_dir
                    .as_deref()
                    .and_then(|dir| load_fixture(dir, fixtures::XAI_SAMPLE))
                    .filter(|_| request.mock);
                let model = xai_model.clone();
                join_set.spawn(dispatch_x(http, registry, credentials, topic, span, sampling, model, fixture, progress));
            }
            Channel::Youtube => {
                let fixture = request
                    .fixtures_dir
                    .as_deref()
                    .and_then(|dir| load_fixture(dir, fixtures::YOUTUBE_SAMPLE))
                    .filter(|_| request.mock);
                let model = openai_model.clone();
                join_set.spawn(dispatch_youtube(http, registry, credentials, topic, span, sampling, model, fixture, progress));
            }
            Channel::Linkedin => {
                let fixture = request
                    .fixtures_dir
                    .as_deref()
                    .and_then(|dir| load_fixture(dir, fixtures::LINKEDIN_SAMPLE))
                    .filter(|_| request.mock);
                let model = openai_model.clone();
                join_set.spawn(dispatch_linkedin(
                    http, registry, credentials, topic, span, sampling, model, fixture, progress,
                ));
            }
            Channel::Web => {
                let hits = request.web_hits.clone();
                join_set.spawn(dispatch_web(hits, span, progress));
            }
        }
    }

    let mut items_all: Vec<Signal> = Vec::new();
    let mut errors = SourceErrors::default();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(outcome) => {
                errors.set(outcome.channel, outcome.error);
                items_all.extend(outcome.items);
            }
            Err(join_err) => {
                warn!(error = %join_err, "provider task panicked");
            }
        }
    }

    // Sequential Reddit thread enrichment (spec §4.5, §4.9 step 1): one
    // HTTP call per Reddit item, run after the concurrent fan-out.
    let reddit_fixture = request
        .fixtures_dir
        .as_deref()
        .and_then(|dir| load_fixture(dir, fixtures::REDDIT_THREAD_SAMPLE))
        .filter(|_| request.mock);
    let reddit_indices: Vec<usize> = items_all
        .iter()
        .enumerate()
        .filter(|(_, s)| s.channel == Channel::Reddit)
        .map(|(i, _)| i)
        .collect();
    if !reddit_indices.is_empty() {
        let total = reddit_indices.len();
        progress.start_reddit_enrich(0, total);
        for (i, idx) in reddit_indices.iter().enumerate() {
            enrichment::enrich_reddit_signal(&net, &mut items_all[*idx], reddit_fixture.clone()).await;
            items_all[*idx].time_confidence =
                briefbot_core::timeframe::date_confidence(items_all[*idx].dated.as_deref(), &request.span);
            progress.update_reddit_enrich(i + 1, total);
        }
        progress.end_reddit_enrich();
    }

    // Hard date filter (spec §4.9 step 3): undated items survive unless
    // the caller explicitly asked to exclude them.
    items_all.retain(|item| match item.dated.as_deref() {
        Some(date) => request.span.contains(date),
        None => !request.exclude_undated,
    });

    for item in items_all.iter_mut() {
        item.clamp_topicality();
    }

    // Rank (spec §4.7): platform channels are percentile-normalized
    // together so items from different channels land on one comparable
    // scale; web uses its own three-dimension formula.
    let max_days = span_days(&request.span);
    let (mut platform_items, mut web_items): (Vec<Signal>, Vec<Signal>) =
        items_all.into_iter().partition(|s| s.channel != Channel::Web);
    score_platform_batch(&mut platform_items, max_days);
    score_web_batch(&mut web_items, max_days);
    let mut items_all = platform_items;
    items_all.extend(web_items);

    // Dedup (spec §4.8) runs on raw ranks, before stance weighting, per
    // the literal step order in §4.9.
    let mut items_all = deduplicate(items_all, None);

    // Stance weighting (spec §4.6).
    let weights = stance_weights(epistemic_stance);
    for item in items_all.iter_mut() {
        let weight = weights.get(&item.channel).copied().unwrap_or(1.0);
        if (weight - 1.0).abs() > f64::EPSILON {
            item.extras.insert("stance_weight".to_string(), format!("{weight:.2}"));
        }
    }
    apply_stance_weights(&mut items_all, &weights);

    // Global ordering (spec §4.7).
    sort_items(&mut items_all);

    progress.end_processing();

    let intent = IntentDiagnostics {
        complexity_class,
        complexity_reason,
        epistemic_stance,
        epistemic_reason,
        decomposition,
        decomposition_source: decomposition_source.to_string(),
    };

    let mut brief = Brief::new(request.topic.clone(), request.span.clone(), resolution.mode, intent);
    brief.models = ModelChoices {
        openai: openai_model,
        xai: xai_model,
    };
    let item_count = items_all.len();
    brief.items = items_all;
    if let Err(err) = brief.check_unique_keys() {
        warn!(error = %err, "post-processing produced a duplicate item key");
    }
    brief.errors = errors;
    brief.cache = CacheMark::default();
    brief.metrics = RunStats {
        search_duration_ms: started.elapsed().as_millis() as u64,
        item_count,
    };

    progress.show_complete(item_count, brief.metrics.search_duration_ms);

    if !request.mock {
        if let Ok(value) = serde_json::to_value(&brief) {
            cache.save(&key, &value);
        }
    }

    Ok(brief)
}

#[cfg(test)]
mod tests {
    use super::*;
    use briefbot_core::config::{ModelPolicy, OpenAiCredential};

    fn base_request(cache_dir: &std::path::Path) -> RunRequest {
        RunRequest {
            topic: "rust async runtimes".to_string(),
            requested: Requested::Reddit,
            span: Span::new("2026-01-01", "2026-01-31").unwrap(),
            sampling: SamplingTier::Standard,
            mock: true,
            refresh: false,
            exclude_undated: false,
            include_web: false,
            web_hits: Vec::new(),
            cache_dir: cache_dir.to_str().unwrap().to_string(),
            fixtures_dir: Some("fixtures-unused".to_string()),
        }
    }

    #[tokio::test]
    async fn no_credentials_yields_web_only_brief_with_no_network() {
        let dir = tempfile::tempdir().unwrap();
        let request = RunRequest {
            include_web: true,
            web_hits: vec![web::RawHit {
                url: "https://example.com/a".to_string(),
                title: "A title".to_string(),
                snippet: "A snippet".to_string(),
                date: Some("2026-01-15".to_string()),
                relevance: Some(0.8),
                why_relevant: "matches".to_string(),
            }],
            requested: Requested::Auto,
            ..base_request(dir.path())
        };
        let brief = run(request, None, Credentials::default()).await.unwrap();
        assert_eq!(brief.mode, briefbot_core::content::Mode::WebOnly);
        assert_eq!(brief.items.len(), 1);
        assert!(brief.errors.is_empty());
    }

    #[tokio::test]
    async fn mock_reddit_run_parses_fixture_and_scores_items() {
        let dir = tempfile::tempdir().unwrap();
        let fixtures_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            fixtures_dir.path().join("openai_sample.json"),
            serde_json::json!({
                "output": "{\"threads\": [{\"headline\": \"Async runtimes compared\", \"url\": \"https://www.reddit.com/r/rust/comments/abc/x/\", \"forum\": \"rust\", \"dated\": \"2026-01-10\", \"topicality\": 0.8, \"rationale\": \"relevant\"}]}"
            })
            .to_string(),
        )
        .unwrap();
        std::fs::write(
            fixtures_dir.path().join("reddit_thread_sample.json"),
            serde_json::json!([
                {"data": {"children": [{"data": {"score": 120, "num_comments": 4, "upvote_ratio": 0.9, "created_utc": 1767830400.0}}]}},
                {"data": {"children": []}},
            ])
            .to_string(),
        )
        .unwrap();

        let mut credentials = Credentials::default();
        credentials.openai = Some(OpenAiCredential {
            api_key: "sk-test".to_string(),
            model_policy: ModelPolicy::Auto,
            model_pin: None,
        });

        let request = RunRequest {
            fixtures_dir: Some(fixtures_dir.path().to_str().unwrap().to_string()),
            ..base_request(dir.path())
        };
        let brief = run(request, None, credentials).await.unwrap();
        assert_eq!(brief.items.len(), 1);
        assert_eq!(brief.items[0].interaction.upvotes, Some(120));
        assert!((0..=100).contains(&brief.items[0].rank));
    }
}
