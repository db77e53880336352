//! Target item-count ranges per sampling tier (spec §4.4) and the
//! per-provider, per-tier timeouts of spec §5.

use std::time::Duration;

use briefbot_core::config::SamplingTier;
use briefbot_core::content::Channel;

/// `(min, max)` target item count for a channel under a tier. `standard`
/// carries per-channel overrides; `lite`/`dense` use the general range for
/// every channel.
pub fn target_range(tier: SamplingTier, channel: Channel) -> (u32, u32) {
    match tier {
        SamplingTier::Lite => (6, 14),
        SamplingTier::Dense => (26, 74),
        SamplingTier::Standard => match channel {
            Channel::Reddit => (18, 32),
            Channel::X => (14, 30),
            Channel::Youtube | Channel::Linkedin => (12, 22),
            Channel::Web => (12, 36),
        },
    }
}

/// Per-task HTTP timeout for a provider's `search` call under a tier
/// (spec §5: Reddit 60/90/150s, X 70/100/145s, YouTube & LinkedIn
/// 90/120/180s). Web performs no network call of its own.
pub fn search_timeout(tier: SamplingTier, channel: Channel) -> Duration {
    let secs = match channel {
        Channel::Reddit => match tier {
            SamplingTier::Lite => 60,
            SamplingTier::Standard => 90,
            SamplingTier::Dense => 150,
        },
        Channel::X => match tier {
            SamplingTier::Lite => 70,
            SamplingTier::Standard => 100,
            SamplingTier::Dense => 145,
        },
        Channel::Youtube | Channel::Linkedin => match tier {
            SamplingTier::Lite => 90,
            SamplingTier::Standard => 120,
            SamplingTier::Dense => 180,
        },
        Channel::Web => 0,
    };
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_tier_has_reddit_override() {
        assert_eq!(target_range(SamplingTier::Standard, Channel::Reddit), (18, 32));
    }

    #[test]
    fn lite_tier_is_uniform_across_channels() {
        assert_eq!(target_range(SamplingTier::Lite, Channel::X), (6, 14));
        assert_eq!(target_range(SamplingTier::Lite, Channel::Web), (6, 14));
    }

    #[test]
    fn search_timeout_matches_spec_table() {
        assert_eq!(search_timeout(SamplingTier::Lite, Channel::Reddit).as_secs(), 60);
        assert_eq!(search_timeout(SamplingTier::Dense, Channel::X).as_secs(), 145);
        assert_eq!(
            search_timeout(SamplingTier::Standard, Channel::Youtube).as_secs(),
            120
        );
    }
}
