//! Channel-selection resolution (spec §4.9): maps a requested mode to an
//! effective set of channels given which credentials are present.

use briefbot_core::content::{Channel, Mode};

/// The CLI-facing requested-mode vocabulary: `auto|reddit|x|youtube|
/// linkedin|web|both|all|reddit-web|x-web`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requested {
    Auto,
    Reddit,
    X,
    Youtube,
    Linkedin,
    Web,
    Both,
    All,
    RedditWeb,
    XWeb,
}

/// The outcome of resolving a requested mode against available
/// credentials: the effective [`Mode`] to record on the Brief, the
/// concrete channel set to dispatch, and an optional advisory warning
/// (e.g. "reddit requested but no OpenAI credential configured").
pub struct Resolution {
    pub mode: Mode,
    pub channels: Vec<Channel>,
    pub warning: Option<String>,
}

fn llm_channels() -> [Channel; 3] {
    [Channel::Reddit, Channel::Youtube, Channel::Linkedin]
}

/// `has_openai`/`has_xai` gate the LLM-backed and xAI-backed channels
/// respectively; `include_web` is whether the caller supplied (or will
/// supply) a web-search channel at all.
pub fn resolve_sources(requested: Requested, has_openai: bool, has_xai: bool, include_web: bool) -> Resolution {
    let (desired, base_mode): (Vec<Channel>, Mode) = match requested {
        // Auto queries Reddit + X only (YouTube/LinkedIn are opt-in via an
        // explicit request), plus web if the caller supplied a channel.
        Requested::Auto => (
            [Channel::Reddit, Channel::X]
                .into_iter()
                .chain(include_web.then_some(Channel::Web))
                .collect(),
            Mode::Auto,
        ),
        Requested::All => (
            llm_channels()
                .into_iter()
                .chain(std::iter::once(Channel::X))
                .chain(include_web.then_some(Channel::Web))
                .collect(),
            Mode::All,
        ),
        Requested::Reddit => (vec![Channel::Reddit], Mode::Reddit),
        Requested::X => (vec![Channel::X], Mode::X),
        Requested::Youtube => (vec![Channel::Youtube], Mode::Youtube),
        Requested::Linkedin => (vec![Channel::Linkedin], Mode::Linkedin),
        Requested::Web => (vec![Channel::Web], Mode::Web),
        Requested::Both => (vec![Channel::Reddit, Channel::X], Mode::Both),
        Requested::RedditWeb => (vec![Channel::Reddit, Channel::Web], Mode::RedditWeb),
        Requested::XWeb => (vec![Channel::X, Channel::Web], Mode::XWeb),
    };

    let mut dropped = Vec::new();
    let channels: Vec<Channel> = desired
        .into_iter()
        .filter(|channel| match channel {
            Channel::Reddit | Channel::Youtube | Channel::Linkedin => {
                let ok = has_openai;
                if !ok {
                    dropped.push(channel.as_str());
                }
                ok
            }
            Channel::X => {
                let ok = has_xai;
                if !ok {
                    dropped.push(channel.as_str());
                }
                ok
            }
            Channel::Web => include_web,
        })
        .collect();

    if channels.is_empty() {
        let warning = if include_web {
            Some("no credentials available; falling back to web-only".to_string())
        } else {
            Some("no credentials and no web channel available; run will yield no items".to_string())
        };
        return Resolution {
            mode: Mode::WebOnly,
            channels: if include_web { vec![Channel::Web] } else { Vec::new() },
            warning,
        };
    }

    let warning = if dropped.is_empty() {
        None
    } else {
        Some(format!(
            "channel(s) {} requested without the required credential, skipped",
            dropped.join(", ")
        ))
    };

    Resolution {
        mode: base_mode,
        channels,
        warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_credentials_falls_back_to_web_only() {
        let res = resolve_sources(Requested::Auto, false, false, true);
        assert_eq!(res.mode, Mode::WebOnly);
        assert_eq!(res.channels, vec![Channel::Web]);
        assert!(res.warning.is_some());
    }

    #[test]
    fn reddit_without_openai_drops_to_empty_with_warning() {
        let res = resolve_sources(Requested::Reddit, false, true, false);
        assert_eq!(res.mode, Mode::WebOnly);
        assert!(res.channels.is_empty());
    }

    #[test]
    fn all_with_full_credentials_includes_every_channel() {
        let res = resolve_sources(Requested::All, true, true, true);
        assert_eq!(res.mode, Mode::All);
        assert_eq!(res.channels.len(), 5);
    }

    #[test]
    fn both_is_reddit_and_x_only() {
        let res = resolve_sources(Requested::Both, true, true, true);
        assert_eq!(res.channels, vec![Channel::Reddit, Channel::X]);
        assert_eq!(res.mode, Mode::Both);
    }
}
