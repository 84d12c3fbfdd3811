// Category-based TTL policy. Callers pick a category, the cache owns the numbers.

use std::time::Duration;

use crate::config::CacheConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtlCategory {
    Stats,
    Games,
    Seasons,
    TopPlayers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    stats: Duration,
    games: Duration,
    seasons: Duration,
    top_players: Duration,
}

impl TtlPolicy {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            stats: config.stats_ttl(),
            games: config.games_ttl(),
            seasons: config.seasons_ttl(),
            top_players: config.top_players_ttl(),
        }
    }

    pub fn ttl(&self, category: TtlCategory) -> Duration {
        match category {
            TtlCategory::Stats => self.stats,
            TtlCategory::Games => self.games,
            TtlCategory::Seasons => self.seasons,
            TtlCategory::TopPlayers => self.top_players,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_suggested_lifetimes() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.ttl(TtlCategory::Stats), Duration::from_secs(180));
        assert_eq!(policy.ttl(TtlCategory::Games), Duration::from_secs(300));
        assert_eq!(policy.ttl(TtlCategory::Seasons), Duration::from_secs(1800));
        assert_eq!(policy.ttl(TtlCategory::TopPlayers), Duration::from_secs(120));
    }

    #[test]
    fn policy_reads_config() {
        let config = CacheConfig {
            stats_ttl_secs: 1,
            games_ttl_secs: 2,
            seasons_ttl_secs: 3,
            top_players_ttl_secs: 4,
        };
        let policy = TtlPolicy::from_config(&config);
        assert_eq!(policy.ttl(TtlCategory::TopPlayers), Duration::from_secs(4));
        assert_eq!(policy.ttl(TtlCategory::Seasons), Duration::from_secs(3));
    }
}
