//! Date window computation, multi-format date parsing, date extraction from
//! URLs and free text, and confidence labeling of a date against a span.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::content::{Span, TimeConfidence};

/// `end` = UTC today, `start` = `end - days_back`, both ISO dates.
pub fn span(days_back: i64) -> (String, String) {
    let end = Utc::now().date_naive();
    let start = end - Duration::days(days_back);
    (start.to_string(), end.to_string())
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d",
    "%B %d, %Y",
    "%d %B %Y",
];

/// Accepts a Unix timestamp (int or numeric string), ISO date/datetime (with
/// or without `Z`), `"Month D, Y"` and `"D Month Y"`. Returns a UTC instant.
pub fn parse_moment(s: &str) -> Option<DateTime<Utc>> {
    let trimmed = s.trim();

    if let Ok(ts) = trimmed.parse::<f64>() {
        if ts.is_finite() && ts > 0.0 {
            return Utc.timestamp_opt(ts as i64, 0).single();
        }
    }

    for fmt in NAIVE_FORMATS {
        if fmt.contains("%z") {
            if let Ok(dt) = DateTime::parse_from_str(trimmed, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
            continue;
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).unwrap()));
        }
    }
    None
}

/// Unix timestamp -> `YYYY-MM-DD`, or `None` if out of range.
pub fn to_iso_date(unix: i64) -> Option<String> {
    Utc.timestamp_opt(unix, 0)
        .single()
        .map(|dt| dt.date_naive().to_string())
}

/// SOLID if inside `[span.start, span.end]`; SOFT within a small tolerance
/// band outside; WEAK well outside; UNKNOWN if absent/unparseable.
const GRACE_DAYS: i64 = 3;

pub fn date_confidence(date: Option<&str>, span: &Span) -> TimeConfidence {
    let Some(date) = date else {
        return TimeConfidence::Unknown;
    };
    let Some(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok() else {
        return TimeConfidence::Unknown;
    };
    if span.contains(date) {
        return TimeConfidence::Solid;
    }
    let start = NaiveDate::parse_from_str(&span.start, "%Y-%m-%d").ok();
    let end = NaiveDate::parse_from_str(&span.end, "%Y-%m-%d").ok();
    let within_grace = match (start, end) {
        (Some(start), Some(end)) => {
            (parsed < start && (start - parsed).num_days() <= GRACE_DAYS)
                || (parsed > end && (parsed - end).num_days() <= GRACE_DAYS)
        }
        _ => false,
    };
    if within_grace {
        TimeConfidence::Soft
    } else {
        TimeConfidence::Weak
    }
}

/// Days between `date` and today, clamped to 0 for future dates. `None` if
/// absent/unparseable.
pub fn days_since(date: Option<&str>) -> Option<i64> {
    let date = date?;
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let today = Utc::now().date_naive();
    Some((today - parsed).num_days().max(0))
}

/// Today = 100; `max_days` ago = 0; absent date = 0. Uses a slightly concave
/// interpolation (exponent 0.95), matching the canonical implementation this
/// was distilled from.
pub fn recency_score(date: Option<&str>, max_days: i64) -> i32 {
    let Some(age) = days_since(date) else {
        return 0;
    };
    if age >= max_days {
        return 0;
    }
    let fraction = (max_days - age) as f64 / max_days as f64;
    (100.0 * fraction.powf(0.95)).round() as i32
}

static URL_YMD_SLASH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(\d{4})/(\d{2})/(\d{2})/").unwrap()
});
static URL_YMD_COMPACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d{8})/").unwrap());
static URL_YMD_DASH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/(\d{4})-(\d{2})-(\d{2})[-/]").unwrap()
});

fn year_in_range(year: i32) -> bool {
    (2019..=2033).contains(&year)
}

/// Recognizes `/YYYY/MM/DD/`, `/YYYYMMDD/`, `/YYYY-MM-DD/` with the year
/// restricted to a reasonable span.
pub fn scan_url_date(url: &str) -> Option<String> {
    if let Some(caps) = URL_YMD_SLASH.captures(url) {
        let y: i32 = caps[1].parse().ok()?;
        if year_in_range(y) {
            return NaiveDate::from_ymd_opt(y, caps[2].parse().ok()?, caps[3].parse().ok()?)
                .map(|d| d.to_string());
        }
    }
    if let Some(caps) = URL_YMD_COMPACT.captures(url) {
        let digits = &caps[1];
        let y: i32 = digits[0..4].parse().ok()?;
        if year_in_range(y) {
            return NaiveDate::from_ymd_opt(
                y,
                digits[4..6].parse().ok()?,
                digits[6..8].parse().ok()?,
            )
            .map(|d| d.to_string());
        }
    }
    if let Some(caps) = URL_YMD_DASH.captures(url) {
        let y: i32 = caps[1].parse().ok()?;
        if year_in_range(y) {
            return NaiveDate::from_ymd_opt(y, caps[2].parse().ok()?, caps[3].parse().ok()?)
                .map(|d| d.to_string());
        }
    }
    None
}

static TEXT_ISO: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());
static TEXT_MONTH_DD_YYYY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{1,2}),?\s+(\d{4})\b").unwrap()
});
static TEXT_DD_MONTH_YYYY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s+(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{4})\b").unwrap()
});
static TEXT_DAYS_AGO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(\d{1,3})\s+days?\s+ago\b").unwrap());
static TEXT_HOURS_AGO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b\d{1,2}\s+hours?\s+ago\b").unwrap());

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january", "february", "march", "april", "may", "june", "july", "august", "september",
        "october", "november", "december",
    ];
    MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(name))
        .map(|i| i as u32 + 1)
}

/// Recognizes `Month D[, Y]`, `D Month Y`, ISO `YYYY-MM-DD`, and relative
/// forms (`today`, `yesterday`, `N days ago` with N<=90, `N hours ago` ->
/// today, `last week` -> -7d, `this week` -> -3d, `last month` -> -30d).
pub fn scan_text_date(text: &str) -> Option<String> {
    let lower = text.to_ascii_lowercase();
    let today = Utc::now().date_naive();

    if let Some(caps) = TEXT_ISO.captures(text) {
        let y: i32 = caps[1].parse().ok()?;
        let m: u32 = caps[2].parse().ok()?;
        let d: u32 = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
            return Some(date.to_string());
        }
    }
    if let Some(caps) = TEXT_MONTH_DD_YYYY.captures(text) {
        let month = month_number(&caps[1])?;
        let day: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date.to_string());
        }
    }
    if let Some(caps) = TEXT_DD_MONTH_YYYY.captures(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year: i32 = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date.to_string());
        }
    }
    if lower.contains("today") {
        return Some(today.to_string());
    }
    if lower.contains("yesterday") {
        return Some((today - Duration::days(1)).to_string());
    }
    if let Some(caps) = TEXT_DAYS_AGO.captures(&lower) {
        let n: i64 = caps[1].parse().ok()?;
        if n <= 90 {
            return Some((today - Duration::days(n)).to_string());
        }
    }
    if TEXT_HOURS_AGO.is_match(&lower) {
        return Some(today.to_string());
    }
    if lower.contains("last week") {
        return Some((today - Duration::days(7)).to_string());
    }
    if lower.contains("this week") {
        return Some((today - Duration::days(3)).to_string());
    }
    if lower.contains("last month") {
        return Some((today - Duration::days(30)).to_string());
    }
    None
}

/// URL hit returns SOLID; title hit returns SOFT; snippet hit returns SOFT;
/// none returns `(None, WEAK)`.
pub fn detect_date(url: &str, snippet: &str, title: &str) -> (Option<String>, TimeConfidence) {
    if let Some(date) = scan_url_date(url) {
        return (Some(date), TimeConfidence::Solid);
    }
    if let Some(date) = scan_text_date(title) {
        return (Some(date), TimeConfidence::Soft);
    }
    if let Some(date) = scan_text_date(snippet) {
        return (Some(date), TimeConfidence::Soft);
    }
    (None, TimeConfidence::Weak)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_computes_inclusive_window() {
        let (start, end) = span(30);
        assert!(start < end);
    }

    #[test]
    fn parse_moment_handles_unix_and_iso() {
        assert!(parse_moment("1700000000").is_some());
        assert!(parse_moment("2026-01-15").is_some());
        assert!(parse_moment("January 15, 2026").is_some());
        assert!(parse_moment("15 January 2026").is_some());
        assert!(parse_moment("not a date").is_none());
    }

    #[test]
    fn recency_score_today_is_100_and_old_is_0() {
        let (_, today) = span(0);
        assert_eq!(recency_score(Some(&today), 30), 100);
        assert_eq!(recency_score(None, 30), 0);
    }

    #[test]
    fn scenario_c_date_detection_priority() {
        let (date, confidence) = detect_date(
            "https://ex.com/2026/02/07/post/",
            "Published January 15, 2026.",
            "Solar",
        );
        assert_eq!(date.as_deref(), Some("2026-02-07"));
        assert!(matches!(confidence, TimeConfidence::Solid));
    }

    #[test]
    fn date_confidence_classifies_solid_soft_weak_unknown() {
        let span = Span::new("2026-01-01", "2026-01-31").unwrap();
        assert!(matches!(
            date_confidence(Some("2026-01-15"), &span),
            TimeConfidence::Solid
        ));
        assert!(matches!(
            date_confidence(Some("2026-02-02"), &span),
            TimeConfidence::Soft
        ));
        assert!(matches!(
            date_confidence(Some("2026-06-01"), &span),
            TimeConfidence::Weak
        ));
        assert!(matches!(date_confidence(None, &span), TimeConfidence::Unknown));
    }

    #[test]
    fn scan_url_date_rejects_out_of_range_years() {
        assert_eq!(scan_url_date("https://ex.com/2040/02/07/post/"), None);
        assert_eq!(
            scan_url_date("https://ex.com/2026/02/07/post/"),
            Some("2026-02-07".to_string())
        );
        assert_eq!(
            scan_url_date("https://ex.com/20260207/post/"),
            Some("2026-02-07".to_string())
        );
    }

    #[test]
    fn scan_text_date_handles_relative_forms() {
        assert!(scan_text_date("posted 5 days ago").is_some());
        assert!(scan_text_date("posted 400 days ago").is_none());
        assert!(scan_text_date("last week roundup").is_some());
        assert!(scan_text_date("this week in rust").is_some());
    }
}
