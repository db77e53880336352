//! Near-duplicate detection over a ranked list of signals.
//!
//! The Ratcliff/Obershelp-style matching-blocks ratio below has no
//! off-the-shelf crate equivalent in this corpus (`strsim`'s Jaro-Winkler
//! and Levenshtein distances don't reproduce it), so it's hand-rolled here
//! as the dedup algorithm itself rather than ambient infrastructure.

use briefbot_core::content::Signal;

const DEFAULT_THRESHOLD: f64 = 0.88;
const SUBSTRING_FLOOR: f64 = 0.92;

fn squash(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = true; // swallow leading whitespace
    for ch in text.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    out.trim_end().to_string()
}

fn text_signature(item: &Signal) -> String {
    let parts = [
        item.headline.as_str(),
        item.byline.as_deref().unwrap_or(""),
        item.blurb.as_deref().unwrap_or(""),
    ];
    squash(&parts.join(" "))
}

fn url_key(url: &str) -> String {
    let lower = url.to_lowercase();
    let without_fragment = lower.split('#').next().unwrap_or("");
    let without_query = without_fragment.split('?').next().unwrap_or("");
    without_query.trim_end_matches('/').to_string()
}

/// Length of the longest common substring of `a` and `b`, returning the
/// match bounds `(a_start, b_start, len)` — the core primitive of the
/// Ratcliff/Obershelp recursive matching-blocks algorithm.
fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    if a.is_empty() || b.is_empty() {
        return (0, 0, 0);
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut best = (0, 0, 0);
    for i in 0..a.len() {
        let mut curr = vec![0usize; b.len() + 1];
        for j in 0..b.len() {
            if a[i] == b[j] {
                let len = prev[j] + 1;
                curr[j + 1] = len;
                if len > best.2 {
                    best = (i + 1 - len, j + 1 - len, len);
                }
            }
        }
        prev = curr;
    }
    best
}

fn matching_block_total(a: &[char], b: &[char]) -> usize {
    let (a_start, b_start, len) = longest_match(a, b);
    if len == 0 {
        return 0;
    }
    let left = matching_block_total(&a[..a_start], &b[..b_start]);
    let right = matching_block_total(&a[a_start + len..], &b[b_start + len..]);
    len + left + right
}

/// `SequenceMatcher(a, b).ratio()`: `2 * matches / (len(a) + len(b))`.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let total_len = a_chars.len() + b_chars.len();
    if total_len == 0 {
        return 1.0;
    }
    let matches = matching_block_total(&a_chars, &b_chars);
    (2.0 * matches as f64) / total_len as f64
}

fn similarity(a: &Signal, b: &Signal) -> f64 {
    let key_a = url_key(&a.url);
    let key_b = url_key(&b.url);
    if !key_a.is_empty() && key_a == key_b {
        return 1.0;
    }

    let sig_a = text_signature(a);
    let sig_b = text_signature(b);
    let ratio = sequence_ratio(&sig_a, &sig_b);
    if !sig_a.is_empty() && !sig_b.is_empty() && (sig_a.contains(&sig_b) || sig_b.contains(&sig_a)) {
        ratio.max(SUBSTRING_FLOOR)
    } else {
        ratio
    }
}

/// Removes near-duplicates from an already-ranked list of signals,
/// discarding the lower-ranked item of any pair whose similarity meets or
/// exceeds `threshold` (ties keep the lower-indexed item). Preserves the
/// pre-existing order of survivors.
pub fn deduplicate(items: Vec<Signal>, threshold: Option<f64>) -> Vec<Signal> {
    let threshold = threshold.unwrap_or(DEFAULT_THRESHOLD);
    let n = items.len();
    let mut discarded = vec![false; n];

    for i in 0..n {
        if discarded[i] {
            continue;
        }
        for j in (i + 1)..n {
            if discarded[j] {
                continue;
            }
            if similarity(&items[i], &items[j]) >= threshold {
                // lower-ranked item of the pair is discarded; ties keep i.
                if items[j].rank > items[i].rank {
                    discarded[i] = true;
                    break;
                } else {
                    discarded[j] = true;
                }
            }
        }
    }

    items
        .into_iter()
        .zip(discarded)
        .filter_map(|(item, was_discarded)| if was_discarded { None } else { Some(item) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use briefbot_core::content::{Channel, Interaction, Scorecard, Signal, TimeConfidence};
    use std::collections::HashMap;

    fn signal(key: &str, headline: &str, url: &str, rank: i32) -> Signal {
        Signal {
            key: key.to_string(),
            channel: Channel::Web,
            headline: headline.to_string(),
            url: url.to_string(),
            byline: None,
            blurb: None,
            dated: None,
            time_confidence: TimeConfidence::Unknown,
            interaction: Interaction::default(),
            topicality: 0.5,
            rationale: None,
            rank,
            scorecard: Scorecard::default(),
            thread_notes: vec![],
            notables: vec![],
            extras: HashMap::new(),
        }
    }

    #[test]
    fn identical_strings_have_ratio_one() {
        assert_eq!(sequence_ratio("rust async runtimes", "rust async runtimes"), 1.0);
    }

    #[test]
    fn completely_different_strings_have_low_ratio() {
        assert!(sequence_ratio("abcdef", "uvwxyz") < 0.2);
    }

    #[test]
    fn same_url_key_ignoring_query_is_full_similarity() {
        let a = signal("W-01", "Rust 2.0 announced", "https://example.com/post?utm=1", 80);
        let b = signal("W-02", "A totally different headline", "https://example.com/post/", 60);
        let survivors = deduplicate(vec![a, b], None);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].key, "W-01");
    }

    #[test]
    fn scenario_e_near_duplicate_headlines_collapse_keeping_higher_rank() {
        let a = signal(
            "W-01",
            "Rust adoption grows across backend teams",
            "https://a.example.com/rust-adoption",
            75,
        );
        let b = signal(
            "W-02",
            "Rust adoption grows across backend teams in 2026",
            "https://b.example.com/rust-adoption-2026",
            60,
        );
        let survivors = deduplicate(vec![a, b], None);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].key, "W-01");
    }

    #[test]
    fn distinct_items_both_survive() {
        let a = signal("W-01", "Rust async runtimes compared", "https://a.example.com/x", 70);
        let b = signal("W-02", "Python packaging overhaul announced", "https://b.example.com/y", 65);
        let survivors = deduplicate(vec![a, b], None);
        assert_eq!(survivors.len(), 2);
    }

    #[test]
    fn ties_keep_lower_indexed_item() {
        let a = signal("W-01", "same headline text here", "https://a.example.com/1", 50);
        let b = signal("W-02", "same headline text here", "https://b.example.com/2", 50);
        let survivors = deduplicate(vec![a, b], None);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].key, "W-01");
    }
}
