// Cache key grammar: `entity:scope[:qualifier]`, colon-delimited. The literal
// entity and scope segments are lower-case; ids are embedded unchanged, since
// `Alice` and `alice` are different players.
//
// Keys are only ever produced by the constructors below so that writers and
// pattern invalidators agree on the exact strings.

use std::fmt;

pub const STATS_PREFIX: &str = "stats:";
pub const GAMES_PREFIX: &str = "games:";
pub const SEASONS_PREFIX: &str = "seasons:";
pub const TEAMS_PREFIX: &str = "teams:";
pub const RATINGS_PREFIX: &str = "ratings:";

/// A canonical cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    fn build(parts: &[&str]) -> Self {
        CacheKey(parts.join(":"))
    }

    /// `stats:player:<id>` - career aggregate for one player.
    pub fn player_stats(player_id: &str) -> Self {
        Self::build(&["stats", "player", player_id])
    }

    /// `stats:player:<id>:season:<season>` - one player's aggregate within a season.
    pub fn player_season_stats(player_id: &str, season_id: &str) -> Self {
        Self::build(&["stats", "player", player_id, "season", season_id])
    }

    /// `stats:game:<id>` - the box score of a single game.
    pub fn game_stats(game_id: &str) -> Self {
        Self::build(&["stats", "game", game_id])
    }

    /// `stats:bulk:<ids>` with the ids sorted and de-duplicated, so any call
    /// order over the same set maps to the same key.
    pub fn bulk_stats<S: AsRef<str>>(player_ids: &[S]) -> Self {
        let mut ids: Vec<&str> = player_ids.iter().map(|id| id.as_ref()).collect();
        ids.sort_unstable();
        ids.dedup();
        Self::build(&["stats", "bulk", &ids.join(",")])
    }

    /// `stats:top_players:<days>`, or `stats:top_players:<days>:<yyyy-mm-dd>`
    /// when the window is anchored to an explicit date.
    pub fn top_players(window_days: u32, as_of: Option<chrono::NaiveDate>) -> Self {
        let days = window_days.to_string();
        match as_of {
            Some(date) => {
                let date = date.format("%Y-%m-%d").to_string();
                Self::build(&["stats", "top_players", &days, &date])
            }
            None => Self::build(&["stats", "top_players", &days]),
        }
    }

    /// `stats:standings:<season>`, `all` for the whole history.
    pub fn standings(season_id: Option<&str>) -> Self {
        Self::build(&["stats", "standings", season_id.unwrap_or("all")])
    }

    /// `ratings:game:<id>` - the peer-vote summary of a game.
    pub fn game_ratings(game_id: &str) -> Self {
        Self::build(&["ratings", "game", game_id])
    }

    /// `games:all`
    pub fn games() -> Self {
        Self::build(&["games", "all"])
    }

    /// `seasons:all`
    pub fn seasons() -> Self {
        Self::build(&["seasons", "all"])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Invalidation
// ---------------------------------------------------------------------------

/// A write to a raw record, as seen by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// A box-score row was created, edited or deleted.
    StatChanged { game_id: String },
    /// A game record (score, date, season) changed.
    GameChanged { game_id: String },
    SeasonChanged { season_id: String },
    TeamChanged { team_id: String },
    /// A ballot for the game was cast or revised.
    BallotsChanged { game_id: String },
}

/// What to drop from the cache for a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    Key(CacheKey),
    Pattern(&'static str),
}

impl Mutation {
    /// Game scores decide wins and losses, and game dates and seasons decide
    /// which rows a filter keeps, so game and season changes reach every
    /// derived stat. Team records carry no game ids, so a team change drops
    /// all of `stats:` as well.
    pub fn invalidations(&self) -> Vec<Invalidation> {
        match self {
            Mutation::StatChanged { .. } => vec![Invalidation::Pattern(STATS_PREFIX)],
            Mutation::GameChanged { game_id } => vec![
                Invalidation::Pattern(GAMES_PREFIX),
                Invalidation::Pattern(SEASONS_PREFIX),
                Invalidation::Pattern(STATS_PREFIX),
                Invalidation::Key(CacheKey::game_ratings(game_id)),
            ],
            Mutation::SeasonChanged { .. } => vec![
                Invalidation::Pattern(SEASONS_PREFIX),
                Invalidation::Pattern(STATS_PREFIX),
            ],
            Mutation::TeamChanged { .. } => vec![
                Invalidation::Pattern(TEAMS_PREFIX),
                Invalidation::Pattern(STATS_PREFIX),
            ],
            // Exact key: a substring pattern for game "g1" would also hit "g10".
            Mutation::BallotsChanged { game_id } => {
                vec![Invalidation::Key(CacheKey::game_ratings(game_id))]
            }
        }
    }
}
