// Typed raw records: box-score rows, game outcomes and rank ballots.
//
// Records are validated once, where they enter the system (CSV loader,
// in-memory source, ballot submission); the engine trusts them afterwards.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Games
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TeamSide {
    #[serde(alias = "a")]
    A,
    #[serde(alias = "b")]
    B,
}

impl TeamSide {
    pub fn opponent(self) -> Self {
        match self {
            TeamSide::A => TeamSide::B,
            TeamSide::B => TeamSide::A,
        }
    }
}

/// How a game went for one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Win,
    Loss,
    /// Equal scores: neither a win nor a loss.
    Tie,
}

/// Final score of a game plus the metadata filters need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub game_id: String,
    pub season_id: Option<String>,
    pub played_on: NaiveDate,
    pub team_a_score: u32,
    pub team_b_score: u32,
}

impl GameOutcome {
    pub fn winner(&self) -> Option<TeamSide> {
        match self.team_a_score.cmp(&self.team_b_score) {
            std::cmp::Ordering::Greater => Some(TeamSide::A),
            std::cmp::Ordering::Less => Some(TeamSide::B),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn result_for(&self, side: TeamSide) -> GameResult {
        match self.winner() {
            Some(winner) if winner == side => GameResult::Win,
            Some(_) => GameResult::Loss,
            None => GameResult::Tie,
        }
    }

    pub fn score_for(&self, side: TeamSide) -> u32 {
        match side {
            TeamSide::A => self.team_a_score,
            TeamSide::B => self.team_b_score,
        }
    }

    pub fn validate(&self) -> Result<(), StatsError> {
        if self.game_id.trim().is_empty() {
            return Err(StatsError::Validation("game_id must not be blank".into()));
        }
        if self
            .season_id
            .as_deref()
            .is_some_and(|s| s.trim().is_empty())
        {
            return Err(StatsError::Validation(format!(
                "game {}: season_id must be absent or non-blank",
                self.game_id
            )));
        }
        Ok(())
    }
}

/// A season as seen through its games.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub season_id: String,
    pub games: usize,
    pub first_game: NaiveDate,
    pub last_game: NaiveDate,
}

// ---------------------------------------------------------------------------
// Box-score rows
// ---------------------------------------------------------------------------

/// Ceiling for any single counting field in one game's line. Rows above it
/// are rejected at ingestion.
pub const MAX_STAT_PER_GAME: u32 = 250;

/// One player's line in one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPlayerGameStat {
    pub game_id: String,
    pub player_id: String,
    pub team_side: TeamSide,
    pub two_point_attempts: u32,
    pub two_point_made: u32,
    pub three_point_attempts: u32,
    pub three_point_made: u32,
    pub offensive_rebounds: u32,
    pub defensive_rebounds: u32,
    pub assists: u32,
}

impl RawPlayerGameStat {
    pub fn validate(&self) -> Result<(), StatsError> {
        if self.game_id.trim().is_empty() || self.player_id.trim().is_empty() {
            return Err(StatsError::Validation(
                "stat row needs a game_id and a player_id".into(),
            ));
        }
        let fields = [
            ("2PA", self.two_point_attempts),
            ("2PM", self.two_point_made),
            ("3PA", self.three_point_attempts),
            ("3PM", self.three_point_made),
            ("OREB", self.offensive_rebounds),
            ("DREB", self.defensive_rebounds),
            ("AST", self.assists),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| *v > MAX_STAT_PER_GAME) {
            return Err(StatsError::Validation(format!(
                "player {} in game {}: {name} {value} is above the per-game limit of {MAX_STAT_PER_GAME}",
                self.player_id, self.game_id
            )));
        }
        if self.two_point_made > self.two_point_attempts {
            return Err(StatsError::Validation(format!(
                "player {} in game {}: 2PM {} exceeds 2PA {}",
                self.player_id, self.game_id, self.two_point_made, self.two_point_attempts
            )));
        }
        if self.three_point_made > self.three_point_attempts {
            return Err(StatsError::Validation(format!(
                "player {} in game {}: 3PM {} exceeds 3PA {}",
                self.player_id, self.game_id, self.three_point_made, self.three_point_attempts
            )));
        }
        Ok(())
    }

    // Saturating, so rows that skipped `validate` still cannot panic.

    pub fn points(&self) -> u32 {
        self.two_point_made
            .saturating_mul(2)
            .saturating_add(self.three_point_made.saturating_mul(3))
    }

    pub fn rebounds(&self) -> u32 {
        self.offensive_rebounds
            .saturating_add(self.defensive_rebounds)
    }

    pub fn field_goal_attempts(&self) -> u32 {
        self.two_point_attempts
            .saturating_add(self.three_point_attempts)
    }

    pub fn field_goal_made(&self) -> u32 {
        self.two_point_made.saturating_add(self.three_point_made)
    }

    pub fn two_point_percentage(&self) -> f64 {
        crate::engine::percentage(self.two_point_made, self.two_point_attempts)
    }

    pub fn three_point_percentage(&self) -> f64 {
        crate::engine::percentage(self.three_point_made, self.three_point_attempts)
    }

    /// Single-game EFF, unrounded.
    ///
    /// `2*2PM + 3*3PM + 1.5*AST + 0.8*DREB + 1.2*OREB - (0.8*missed 2PA + 1.2*missed 3PA)`
    pub fn efficiency(&self) -> f64 {
        let missed_two = self.two_point_attempts.saturating_sub(self.two_point_made);
        let missed_three = self
            .three_point_attempts
            .saturating_sub(self.three_point_made);

        2.0 * self.two_point_made as f64
            + 3.0 * self.three_point_made as f64
            + 1.5 * self.assists as f64
            + 0.8 * self.defensive_rebounds as f64
            + 1.2 * self.offensive_rebounds as f64
            - (0.8 * missed_two as f64 + 1.2 * missed_three as f64)
    }
}

// ---------------------------------------------------------------------------
// Ballots
// ---------------------------------------------------------------------------

/// One voter's rank for one candidate in one game. Rank 1 is best.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankBallot {
    pub game_id: String,
    pub voter_id: String,
    pub rated_player_id: String,
    pub rank: u32,
}

impl RankBallot {
    pub fn validate(&self) -> Result<(), StatsError> {
        if self.game_id.trim().is_empty()
            || self.voter_id.trim().is_empty()
            || self.rated_player_id.trim().is_empty()
        {
            return Err(StatsError::Validation(
                "ballot needs a game_id, voter_id and rated_player_id".into(),
            ));
        }
        if self.rank == 0 {
            return Err(StatsError::Validation(format!(
                "ballot from {} for {}: ranks start at 1",
                self.voter_id, self.rated_player_id
            )));
        }
        if self.voter_id == self.rated_player_id {
            return Err(StatsError::Validation(format!(
                "voter {} cannot rate themselves",
                self.voter_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn line() -> RawPlayerGameStat {
        RawPlayerGameStat {
            game_id: "g1".into(),
            player_id: "p1".into(),
            team_side: TeamSide::A,
            two_point_attempts: 8,
            two_point_made: 4,
            three_point_attempts: 5,
            three_point_made: 2,
            offensive_rebounds: 2,
            defensive_rebounds: 4,
            assists: 3,
        }
    }

    fn game(a: u32, b: u32) -> GameOutcome {
        GameOutcome {
            game_id: "g1".into(),
            season_id: None,
            played_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            team_a_score: a,
            team_b_score: b,
        }
    }

    #[test]
    fn efficiency_reference_line() {
        // 8 + 6 + 4.5 + 3.2 + 2.4 - (3.2 + 3.6) = 17.3
        assert!(approx_eq(line().efficiency(), 17.3));
    }

    #[test]
    fn efficiency_can_go_negative() {
        let stat = RawPlayerGameStat {
            two_point_attempts: 5,
            two_point_made: 0,
            three_point_attempts: 0,
            three_point_made: 0,
            offensive_rebounds: 0,
            defensive_rebounds: 0,
            assists: 0,
            ..line()
        };
        assert!(approx_eq(stat.efficiency(), -4.0));
    }

    #[test]
    fn derived_counts() {
        let stat = line();
        assert_eq!(stat.points(), 14);
        assert_eq!(stat.rebounds(), 6);
        assert_eq!(stat.field_goal_attempts(), 13);
        assert_eq!(stat.field_goal_made(), 6);
        assert!(approx_eq(stat.two_point_percentage(), 50.0));
        assert!(approx_eq(stat.three_point_percentage(), 40.0));
    }

    #[test]
    fn zero_attempts_give_zero_percentage() {
        let stat = RawPlayerGameStat {
            two_point_attempts: 0,
            two_point_made: 0,
            three_point_attempts: 0,
            three_point_made: 0,
            ..line()
        };
        assert_eq!(stat.two_point_percentage(), 0.0);
        assert_eq!(stat.three_point_percentage(), 0.0);
        assert!(!stat.two_point_percentage().is_nan());
    }

    #[test]
    fn validation_rejects_made_above_attempts() {
        let stat = RawPlayerGameStat {
            three_point_made: 6,
            ..line()
        };
        assert!(matches!(stat.validate(), Err(StatsError::Validation(_))));
        assert!(line().validate().is_ok());
    }

    #[test]
    fn validation_rejects_values_above_per_game_limit() {
        let huge = RawPlayerGameStat {
            two_point_attempts: 3_000_000_000,
            two_point_made: 3_000_000_000,
            ..line()
        };
        assert!(matches!(huge.validate(), Err(StatsError::Validation(_))));

        let at_limit = RawPlayerGameStat {
            assists: MAX_STAT_PER_GAME,
            ..line()
        };
        assert!(at_limit.validate().is_ok());
        let over = RawPlayerGameStat {
            assists: MAX_STAT_PER_GAME + 1,
            ..line()
        };
        assert!(over.validate().is_err());
    }

    #[test]
    fn derived_counts_saturate_instead_of_panicking() {
        let huge = RawPlayerGameStat {
            two_point_attempts: 3_000_000_000,
            two_point_made: 3_000_000_000,
            offensive_rebounds: u32::MAX,
            ..line()
        };
        assert_eq!(huge.points(), u32::MAX);
        assert_eq!(huge.rebounds(), u32::MAX);
        assert_eq!(huge.field_goal_attempts(), 3_000_000_005);
    }

    #[test]
    fn game_result_per_side() {
        assert_eq!(game(50, 40).result_for(TeamSide::A), GameResult::Win);
        assert_eq!(game(50, 40).result_for(TeamSide::B), GameResult::Loss);
        assert_eq!(game(38, 41).result_for(TeamSide::B), GameResult::Win);
        assert_eq!(game(40, 40).result_for(TeamSide::A), GameResult::Tie);
        assert_eq!(game(40, 40).winner(), None);
        assert_eq!(game(40, 41).score_for(TeamSide::B.opponent()), 40);
    }

    #[test]
    fn ballot_validation() {
        let ballot = RankBallot {
            game_id: "g1".into(),
            voter_id: "v".into(),
            rated_player_id: "p".into(),
            rank: 1,
        };
        assert!(ballot.validate().is_ok());
        assert!(RankBallot { rank: 0, ..ballot.clone() }.validate().is_err());
        assert!(RankBallot {
            rated_player_id: "v".into(),
            ..ballot
        }
        .validate()
        .is_err());
    }
}
