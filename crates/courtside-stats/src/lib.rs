// Library root: the box-score model, the aggregation engine, peer voting,
// leaderboards, and the cached leaderboard facade over an upstream source.

pub mod boxscore;
pub mod engine;
pub mod leaderboard;
pub mod leaders;
pub mod model;
pub mod source;
pub mod standings;
pub mod voting;

pub use leaderboard::{Leaderboard, LeaderboardError, LeaderboardSettings};
pub use model::{
    GameOutcome, GameResult, RankBallot, RawPlayerGameStat, Season, StatsError, TeamSide,
};
