// Upstream stat source: the async seam the leaderboard facade reads through.

pub mod loader;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{GameOutcome, RankBallot, RawPlayerGameStat, StatsError};

pub use loader::{load_from_paths, load_source};
pub use memory::InMemoryStatSource;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("stat source unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("rejected record: {0}")]
    Rejected(#[from] StatsError),

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Read access to raw league data, plus ballot writes.
///
/// Implementations return records that already passed validation.
#[async_trait]
pub trait StatSource: Send + Sync {
    /// Every game outcome.
    async fn games(&self) -> Result<Vec<GameOutcome>, SourceError>;

    async fn game(&self, game_id: &str) -> Result<Option<GameOutcome>, SourceError>;

    /// All stat rows for one player, in any order.
    async fn player_stats(&self, player_id: &str) -> Result<Vec<RawPlayerGameStat>, SourceError>;

    /// All stat rows recorded for one game.
    async fn game_stats(&self, game_id: &str) -> Result<Vec<RawPlayerGameStat>, SourceError>;

    async fn all_player_stats(&self) -> Result<Vec<RawPlayerGameStat>, SourceError>;

    /// Stored ballots for one game.
    async fn ballots(&self, game_id: &str) -> Result<Vec<RankBallot>, SourceError>;

    /// Store a ballot, replacing any earlier rank from the same voter for
    /// the same candidate in the same game.
    async fn save_ballot(&self, ballot: RankBallot) -> Result<(), SourceError>;
}
