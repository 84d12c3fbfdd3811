// Single-game box score: every player's line plus per-team totals.

use serde::{Deserialize, Serialize};

use crate::engine::{percentage, round1};
use crate::model::{GameOutcome, RawPlayerGameStat, TeamSide};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerGameLine {
    pub player_id: String,
    pub team_side: TeamSide,
    pub points: u32,
    pub rebounds: u32,
    pub offensive_rebounds: u32,
    pub defensive_rebounds: u32,
    pub assists: u32,
    pub two_point_made: u32,
    pub two_point_attempts: u32,
    pub three_point_made: u32,
    pub three_point_attempts: u32,
    pub two_point_percentage: f64,
    pub three_point_percentage: f64,
    pub efficiency: f64,
}

impl From<&RawPlayerGameStat> for PlayerGameLine {
    fn from(stat: &RawPlayerGameStat) -> Self {
        Self {
            player_id: stat.player_id.clone(),
            team_side: stat.team_side,
            points: stat.points(),
            rebounds: stat.rebounds(),
            offensive_rebounds: stat.offensive_rebounds,
            defensive_rebounds: stat.defensive_rebounds,
            assists: stat.assists,
            two_point_made: stat.two_point_made,
            two_point_attempts: stat.two_point_attempts,
            three_point_made: stat.three_point_made,
            three_point_attempts: stat.three_point_attempts,
            two_point_percentage: round1(stat.two_point_percentage()),
            three_point_percentage: round1(stat.three_point_percentage()),
            efficiency: round1(stat.efficiency()),
        }
    }
}

/// Team totals summed from the player lines. `score` is the recorded final
/// score, which may differ from `points` when a line is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamTotals {
    pub side: TeamSide,
    pub score: u32,
    pub players: u32,
    pub points: u32,
    pub rebounds: u32,
    pub assists: u32,
    pub two_point_made: u32,
    pub two_point_attempts: u32,
    pub three_point_made: u32,
    pub three_point_attempts: u32,
    pub two_point_percentage: f64,
    pub three_point_percentage: f64,
    pub field_goal_percentage: f64,
}

impl TeamTotals {
    fn from_lines(side: TeamSide, score: u32, lines: &[PlayerGameLine]) -> Self {
        let mine = lines.iter().filter(|l| l.team_side == side);
        let mut totals = Self {
            side,
            score,
            players: 0,
            points: 0,
            rebounds: 0,
            assists: 0,
            two_point_made: 0,
            two_point_attempts: 0,
            three_point_made: 0,
            three_point_attempts: 0,
            two_point_percentage: 0.0,
            three_point_percentage: 0.0,
            field_goal_percentage: 0.0,
        };
        for line in mine {
            totals.players += 1;
            totals.points = totals.points.saturating_add(line.points);
            totals.rebounds = totals.rebounds.saturating_add(line.rebounds);
            totals.assists = totals.assists.saturating_add(line.assists);
            totals.two_point_made = totals.two_point_made.saturating_add(line.two_point_made);
            totals.two_point_attempts = totals.two_point_attempts.saturating_add(line.two_point_attempts);
            totals.three_point_made = totals.three_point_made.saturating_add(line.three_point_made);
            totals.three_point_attempts = totals.three_point_attempts.saturating_add(line.three_point_attempts);
        }
        totals.two_point_percentage =
            round1(percentage(totals.two_point_made, totals.two_point_attempts));
        totals.three_point_percentage =
            round1(percentage(totals.three_point_made, totals.three_point_attempts));
        totals.field_goal_percentage = round1(percentage(
            totals.two_point_made.saturating_add(totals.three_point_made),
            totals.two_point_attempts.saturating_add(totals.three_point_attempts),
        ));
        totals
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameBoxScore {
    pub game: GameOutcome,
    pub winner: Option<TeamSide>,
    pub team_a: TeamTotals,
    pub team_b: TeamTotals,
    /// Team A first, then by points descending, then player id.
    pub players: Vec<PlayerGameLine>,
}

/// Build the box score for `game` from its stat rows. Rows belonging to
/// other games are ignored.
pub fn box_score(game: &GameOutcome, stats: &[RawPlayerGameStat]) -> GameBoxScore {
    let mut players: Vec<PlayerGameLine> = stats
        .iter()
        .filter(|s| s.game_id == game.game_id)
        .map(PlayerGameLine::from)
        .collect();
    players.sort_by(|a, b| {
        a.team_side
            .cmp(&b.team_side)
            .then_with(|| b.points.cmp(&a.points))
            .then_with(|| a.player_id.cmp(&b.player_id))
    });

    GameBoxScore {
        game: game.clone(),
        winner: game.winner(),
        team_a: TeamTotals::from_lines(TeamSide::A, game.team_a_score, &players),
        team_b: TeamTotals::from_lines(TeamSide::B, game.team_b_score, &players),
        players,
    }
}
