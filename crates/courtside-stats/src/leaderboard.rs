// Leaderboard facade: cache-aside reads over the stat source, with the
// aggregation engine and the vote aggregator doing the computing.
//
// Only fully computed results are cached. An upstream failure is returned to
// the caller and leaves the cache untouched, so whatever fresh value it held
// keeps being served to later reads.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use courtside_core::cache::{CacheKey, Mutation, ResultCache, TtlCategory};
use courtside_core::config::LeaderboardConfig;
use futures_util::future::try_join_all;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use crate::boxscore::{self, GameBoxScore};
use crate::engine::{self, AggregatedPlayerStats, DateWindow, GameFilter};
use crate::leaders::{self, LeaderRules, TopPlayers};
use crate::model::{GameOutcome, RankBallot, RawPlayerGameStat, Season, StatsError};
use crate::source::{SourceError, StatSource};
use crate::standings::{StandingsScope, StandingsTable};
use crate::voting::{self, GameRatingSummary};

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("unknown game: {0}")]
    UnknownGame(String),

    #[error(transparent)]
    Invalid(#[from] StatsError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardSettings {
    pub rules: LeaderRules,
    /// Window used when a caller asks for "the" top players.
    pub top_players_window_days: u32,
}

impl Default for LeaderboardSettings {
    fn default() -> Self {
        Self::from(&LeaderboardConfig::default())
    }
}

impl From<&LeaderboardConfig> for LeaderboardSettings {
    fn from(config: &LeaderboardConfig) -> Self {
        Self {
            rules: LeaderRules {
                min_shooting_attempts: config.min_shooting_attempts,
                efficiency_leaders: config.efficiency_leaders,
            },
            top_players_window_days: config.top_players_window_days,
        }
    }
}

pub struct Leaderboard {
    source: Arc<dyn StatSource>,
    cache: Arc<ResultCache>,
    settings: LeaderboardSettings,
}

impl Leaderboard {
    pub fn new(
        source: Arc<dyn StatSource>,
        cache: Arc<ResultCache>,
        settings: LeaderboardSettings,
    ) -> Self {
        Self {
            source,
            cache,
            settings,
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    // -----------------------------------------------------------------------
    // Fetch helpers
    // -----------------------------------------------------------------------

    fn cached<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let hit = self.cache.get(key);
        if hit.is_some() {
            debug!(key = %key, "cache hit");
        }
        hit
    }

    /// Every game outcome, cached under `games:all`.
    pub async fn get_games(&self) -> Result<Vec<GameOutcome>, LeaderboardError> {
        let key = CacheKey::games();
        if let Some(games) = self.cached(&key) {
            return Ok(games);
        }
        let games = self.source.games().await?;
        self.cache.set(&key, &games, TtlCategory::Games);
        Ok(games)
    }

    async fn player_rows(&self, player_id: &str) -> Result<Vec<RawPlayerGameStat>, LeaderboardError> {
        Ok(self.source.player_stats(player_id).await?)
    }

    async fn all_rows(&self) -> Result<Vec<RawPlayerGameStat>, LeaderboardError> {
        Ok(self.source.all_player_stats().await?)
    }

    async fn player_aggregate(
        &self,
        key: CacheKey,
        player_id: &str,
        filter: GameFilter,
    ) -> Result<Option<AggregatedPlayerStats>, LeaderboardError> {
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }
        let (games, rows) = tokio::try_join!(self.get_games(), self.player_rows(player_id))?;
        let aggregate = engine::aggregate_player(player_id, &rows, &games, &filter);
        self.cache.set(&key, &aggregate, TtlCategory::Stats);
        Ok(aggregate)
    }

    // -----------------------------------------------------------------------
    // Player reads
    // -----------------------------------------------------------------------

    /// Career aggregate, or `None` if the player has no recorded games.
    pub async fn get_player_career_stats(
        &self,
        player_id: &str,
    ) -> Result<Option<AggregatedPlayerStats>, LeaderboardError> {
        self.player_aggregate(
            CacheKey::player_stats(player_id),
            player_id,
            GameFilter::default(),
        )
        .await
    }

    pub async fn get_player_season_stats(
        &self,
        player_id: &str,
        season_id: &str,
    ) -> Result<Option<AggregatedPlayerStats>, LeaderboardError> {
        self.player_aggregate(
            CacheKey::player_season_stats(player_id, season_id),
            player_id,
            GameFilter::season(season_id),
        )
        .await
    }

    /// Career aggregates for several players in one round trip. Each entry
    /// equals what [`get_player_career_stats`](Self::get_player_career_stats)
    /// returns for that id; the single-player keys are filled as a side effect.
    pub async fn get_bulk_player_stats<S: AsRef<str>>(
        &self,
        player_ids: &[S],
    ) -> Result<BTreeMap<String, Option<AggregatedPlayerStats>>, LeaderboardError> {
        let key = CacheKey::bulk_stats(player_ids);
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let mut ids: Vec<&str> = player_ids.iter().map(|id| id.as_ref()).collect();
        ids.sort_unstable();
        ids.dedup();

        let (games, rows) = tokio::try_join!(
            self.get_games(),
            try_join_all(ids.iter().map(|id| self.player_rows(id)))
        )?;

        let filter = GameFilter::default();
        let mut results = BTreeMap::new();
        for (id, rows) in ids.iter().zip(rows) {
            let aggregate = engine::aggregate_player(id, &rows, &games, &filter);
            self.cache
                .set(&CacheKey::player_stats(id), &aggregate, TtlCategory::Stats);
            results.insert(id.to_string(), aggregate);
        }

        self.cache.set(&key, &results, TtlCategory::Stats);
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // League views
    // -----------------------------------------------------------------------

    /// Leaders over the last `window_days` days, ending at `as_of` or today.
    pub async fn get_top_players(
        &self,
        window_days: u32,
        as_of: Option<NaiveDate>,
    ) -> Result<TopPlayers, LeaderboardError> {
        let key = CacheKey::top_players(window_days, as_of);
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let window = match as_of {
            Some(as_of) => DateWindow::LastDays {
                days: window_days,
                as_of,
            },
            None => DateWindow::last_days(window_days),
        };
        let (games, rows) = tokio::try_join!(self.get_games(), self.all_rows())?;
        let players = engine::aggregate_players(&rows, &games, &GameFilter::window(window));
        let top = leaders::top_players(window_days, window.bounds(), players, self.settings.rules);

        self.cache.set(&key, &top, TtlCategory::TopPlayers);
        Ok(top)
    }

    /// Top players over the configured default window.
    pub async fn get_default_top_players(&self) -> Result<TopPlayers, LeaderboardError> {
        self.get_top_players(self.settings.top_players_window_days, None)
            .await
    }

    pub async fn get_season_standings_table(
        &self,
        scope: &StandingsScope,
    ) -> Result<StandingsTable, LeaderboardError> {
        let key = CacheKey::standings(scope.season_id());
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let filter = match scope.season_id() {
            Some(season_id) => GameFilter::season(season_id),
            None => GameFilter::default(),
        };
        let (games, rows) = tokio::try_join!(self.get_games(), self.all_rows())?;
        let table = StandingsTable::new(
            scope.clone(),
            engine::aggregate_players(&rows, &games, &filter),
        );

        self.cache.set(&key, &table, TtlCategory::Stats);
        Ok(table)
    }

    /// Seasons derived from the game list.
    pub async fn get_seasons(&self) -> Result<Vec<Season>, LeaderboardError> {
        let key = CacheKey::seasons();
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }
        let seasons = engine::seasons_from_games(&self.get_games().await?);
        self.cache.set(&key, &seasons, TtlCategory::Seasons);
        Ok(seasons)
    }

    // -----------------------------------------------------------------------
    // Games and votes
    // -----------------------------------------------------------------------

    pub async fn get_game_stats(&self, game_id: &str) -> Result<GameBoxScore, LeaderboardError> {
        let key = CacheKey::game_stats(game_id);
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let (game, rows) = tokio::try_join!(
            async { Ok::<_, LeaderboardError>(self.source.game(game_id).await?) },
            async { Ok::<_, LeaderboardError>(self.source.game_stats(game_id).await?) }
        )?;
        let game = game.ok_or_else(|| LeaderboardError::UnknownGame(game_id.to_string()))?;
        let score = boxscore::box_score(&game, &rows);

        self.cache.set(&key, &score, TtlCategory::Stats);
        Ok(score)
    }

    pub async fn get_game_ratings(
        &self,
        game_id: &str,
    ) -> Result<GameRatingSummary, LeaderboardError> {
        let key = CacheKey::game_ratings(game_id);
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }
        let ballots = self.source.ballots(game_id).await?;
        let summary = voting::summarize_ballots(game_id, ballots);
        self.cache.set(&key, &summary, TtlCategory::Stats);
        Ok(summary)
    }

    /// Record a ballot and drop the game's cached vote summary. Voting again
    /// for the same candidate replaces the earlier rank.
    pub async fn submit_ballot(&self, ballot: RankBallot) -> Result<(), LeaderboardError> {
        ballot.validate()?;
        if self.source.game(&ballot.game_id).await?.is_none() {
            return Err(LeaderboardError::UnknownGame(ballot.game_id));
        }

        let game_id = ballot.game_id.clone();
        self.source.save_ballot(ballot).await?;
        self.apply_mutation(&Mutation::BallotsChanged { game_id });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Writes from elsewhere
    // -----------------------------------------------------------------------

    /// Tell the cache a raw record changed.
    pub fn apply_mutation(&self, mutation: &Mutation) {
        info!(?mutation, "invalidating cached results");
        self.cache.apply(mutation);
    }
}
