// In-memory stat source behind tokio RwLocks. Backs the CSV loader and tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{SourceError, StatSource};
use crate::model::{GameOutcome, RankBallot, RawPlayerGameStat, StatsError};
use crate::voting::BallotBox;

#[derive(Debug, Default)]
struct Tables {
    games: BTreeMap<String, GameOutcome>,
    /// Keyed by (game_id, player_id): one line per player per game.
    stats: BTreeMap<(String, String), RawPlayerGameStat>,
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryStatSource {
    tables: Arc<RwLock<Tables>>,
    ballots: Arc<RwLock<BallotBox>>,
}

impl InMemoryStatSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source from records, validating each one.
    pub fn from_records(
        games: Vec<GameOutcome>,
        stats: Vec<RawPlayerGameStat>,
        ballots: Vec<RankBallot>,
    ) -> Result<Self, StatsError> {
        let mut tables = Tables::default();
        for game in games {
            game.validate()?;
            tables.games.insert(game.game_id.clone(), game);
        }
        for stat in stats {
            stat.validate()?;
            tables
                .stats
                .insert((stat.game_id.clone(), stat.player_id.clone()), stat);
        }
        let mut ballot_box = BallotBox::new();
        for ballot in ballots {
            ballot_box.submit(ballot)?;
        }
        Ok(Self {
            tables: Arc::new(RwLock::new(tables)),
            ballots: Arc::new(RwLock::new(ballot_box)),
        })
    }

    /// Insert or replace a game.
    pub async fn upsert_game(&self, game: GameOutcome) -> Result<(), StatsError> {
        game.validate()?;
        let mut tables = self.tables.write().await;
        tables.games.insert(game.game_id.clone(), game);
        Ok(())
    }

    /// Remove a game and every stat row recorded for it.
    pub async fn remove_game(&self, game_id: &str) -> bool {
        let mut tables = self.tables.write().await;
        tables.stats.retain(|(g, _), _| g != game_id);
        tables.games.remove(game_id).is_some()
    }

    /// Insert or replace a player's line for a game.
    pub async fn upsert_stat(&self, stat: RawPlayerGameStat) -> Result<(), StatsError> {
        stat.validate()?;
        let mut tables = self.tables.write().await;
        tables
            .stats
            .insert((stat.game_id.clone(), stat.player_id.clone()), stat);
        Ok(())
    }

    pub async fn remove_stat(&self, game_id: &str, player_id: &str) -> bool {
        let mut tables = self.tables.write().await;
        tables
            .stats
            .remove(&(game_id.to_string(), player_id.to_string()))
            .is_some()
    }

    pub async fn game_count(&self) -> usize {
        self.tables.read().await.games.len()
    }

    pub async fn stat_count(&self) -> usize {
        self.tables.read().await.stats.len()
    }
}

#[async_trait]
impl StatSource for InMemoryStatSource {
    async fn games(&self) -> Result<Vec<GameOutcome>, SourceError> {
        let tables = self.tables.read().await;
        Ok(tables.games.values().cloned().collect())
    }

    async fn game(&self, game_id: &str) -> Result<Option<GameOutcome>, SourceError> {
        let tables = self.tables.read().await;
        Ok(tables.games.get(game_id).cloned())
    }

    async fn player_stats(&self, player_id: &str) -> Result<Vec<RawPlayerGameStat>, SourceError> {
        let tables = self.tables.read().await;
        Ok(tables
            .stats
            .values()
            .filter(|s| s.player_id == player_id)
            .cloned()
            .collect())
    }

    async fn game_stats(&self, game_id: &str) -> Result<Vec<RawPlayerGameStat>, SourceError> {
        let tables = self.tables.read().await;
        Ok(tables
            .stats
            .values()
            .filter(|s| s.game_id == game_id)
            .cloned()
            .collect())
    }

    async fn all_player_stats(&self) -> Result<Vec<RawPlayerGameStat>, SourceError> {
        let tables = self.tables.read().await;
        Ok(tables.stats.values().cloned().collect())
    }

    async fn ballots(&self, game_id: &str) -> Result<Vec<RankBallot>, SourceError> {
        let ballots = self.ballots.read().await;
        Ok(ballots.ballots(game_id))
    }

    async fn save_ballot(&self, ballot: RankBallot) -> Result<(), SourceError> {
        let mut ballots = self.ballots.write().await;
        ballots.submit(ballot)?;
        Ok(())
    }
}
