// Season standings: one aggregate row per player, sortable by any column.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::AggregatedPlayerStats;

/// Which games a standings table covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandingsScope {
    All,
    Season(String),
}

impl StandingsScope {
    pub fn season_id(&self) -> Option<&str> {
        match self {
            StandingsScope::All => None,
            StandingsScope::Season(id) => Some(id.as_str()),
        }
    }
}

impl From<Option<&str>> for StandingsScope {
    fn from(season: Option<&str>) -> Self {
        match season {
            Some(id) => StandingsScope::Season(id.to_string()),
            None => StandingsScope::All,
        }
    }
}

impl fmt::Display for StandingsScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StandingsScope::All => f.write_str("all"),
            StandingsScope::Season(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// Every numeric dimension of a standings row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandingsColumn {
    GamesPlayed,
    Wins,
    Losses,
    Ties,
    WinPercentage,
    CurrentWinStreak,
    BestWinStreak,
    Last5Wins,
    Last5Losses,
    TotalPoints,
    TotalRebounds,
    TotalAssists,
    AvgPoints,
    AvgRebounds,
    AvgOffensiveRebounds,
    AvgDefensiveRebounds,
    AvgAssists,
    AvgEfficiency,
    TwoPointAttempts,
    TwoPointMade,
    TwoPointPercentage,
    ThreePointAttempts,
    ThreePointMade,
    ThreePointPercentage,
    FieldGoalPercentage,
}

impl StandingsColumn {
    pub const ALL: [StandingsColumn; 25] = [
        StandingsColumn::GamesPlayed,
        StandingsColumn::Wins,
        StandingsColumn::Losses,
        StandingsColumn::Ties,
        StandingsColumn::WinPercentage,
        StandingsColumn::CurrentWinStreak,
        StandingsColumn::BestWinStreak,
        StandingsColumn::Last5Wins,
        StandingsColumn::Last5Losses,
        StandingsColumn::TotalPoints,
        StandingsColumn::TotalRebounds,
        StandingsColumn::TotalAssists,
        StandingsColumn::AvgPoints,
        StandingsColumn::AvgRebounds,
        StandingsColumn::AvgOffensiveRebounds,
        StandingsColumn::AvgDefensiveRebounds,
        StandingsColumn::AvgAssists,
        StandingsColumn::AvgEfficiency,
        StandingsColumn::TwoPointAttempts,
        StandingsColumn::TwoPointMade,
        StandingsColumn::TwoPointPercentage,
        StandingsColumn::ThreePointAttempts,
        StandingsColumn::ThreePointMade,
        StandingsColumn::ThreePointPercentage,
        StandingsColumn::FieldGoalPercentage,
    ];

    /// Short name used on the command line and in report headers.
    pub fn name(self) -> &'static str {
        match self {
            StandingsColumn::GamesPlayed => "gp",
            StandingsColumn::Wins => "wins",
            StandingsColumn::Losses => "losses",
            StandingsColumn::Ties => "ties",
            StandingsColumn::WinPercentage => "win_pct",
            StandingsColumn::CurrentWinStreak => "streak",
            StandingsColumn::BestWinStreak => "best_streak",
            StandingsColumn::Last5Wins => "last5_wins",
            StandingsColumn::Last5Losses => "last5_losses",
            StandingsColumn::TotalPoints => "points",
            StandingsColumn::TotalRebounds => "rebounds",
            StandingsColumn::TotalAssists => "assists",
            StandingsColumn::AvgPoints => "ppg",
            StandingsColumn::AvgRebounds => "rpg",
            StandingsColumn::AvgOffensiveRebounds => "orpg",
            StandingsColumn::AvgDefensiveRebounds => "drpg",
            StandingsColumn::AvgAssists => "apg",
            StandingsColumn::AvgEfficiency => "eff",
            StandingsColumn::TwoPointAttempts => "2pa",
            StandingsColumn::TwoPointMade => "2pm",
            StandingsColumn::TwoPointPercentage => "2p_pct",
            StandingsColumn::ThreePointAttempts => "3pa",
            StandingsColumn::ThreePointMade => "3pm",
            StandingsColumn::ThreePointPercentage => "3p_pct",
            StandingsColumn::FieldGoalPercentage => "fg_pct",
        }
    }

    pub fn value(self, row: &AggregatedPlayerStats) -> f64 {
        match self {
            StandingsColumn::GamesPlayed => f64::from(row.games_played),
            StandingsColumn::Wins => f64::from(row.wins),
            StandingsColumn::Losses => f64::from(row.losses),
            StandingsColumn::Ties => f64::from(row.ties),
            StandingsColumn::WinPercentage => row.win_percentage,
            StandingsColumn::CurrentWinStreak => f64::from(row.current_win_streak),
            StandingsColumn::BestWinStreak => f64::from(row.best_win_streak),
            StandingsColumn::Last5Wins => f64::from(row.last5_wins),
            StandingsColumn::Last5Losses => f64::from(row.last5_losses),
            StandingsColumn::TotalPoints => f64::from(row.total_points),
            StandingsColumn::TotalRebounds => f64::from(row.total_rebounds),
            StandingsColumn::TotalAssists => f64::from(row.total_assists),
            StandingsColumn::AvgPoints => row.avg_points,
            StandingsColumn::AvgRebounds => row.avg_rebounds,
            StandingsColumn::AvgOffensiveRebounds => row.avg_offensive_rebounds,
            StandingsColumn::AvgDefensiveRebounds => row.avg_defensive_rebounds,
            StandingsColumn::AvgAssists => row.avg_assists,
            StandingsColumn::AvgEfficiency => row.avg_efficiency,
            StandingsColumn::TwoPointAttempts => f64::from(row.two_point_attempts),
            StandingsColumn::TwoPointMade => f64::from(row.two_point_made),
            StandingsColumn::TwoPointPercentage => row.two_point_percentage,
            StandingsColumn::ThreePointAttempts => f64::from(row.three_point_attempts),
            StandingsColumn::ThreePointMade => f64::from(row.three_point_made),
            StandingsColumn::ThreePointPercentage => row.three_point_percentage,
            StandingsColumn::FieldGoalPercentage => row.field_goal_percentage,
        }
    }
}

impl FromStr for StandingsColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        StandingsColumn::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| format!("unknown standings column: {s}"))
    }
}

/// Player rows for one scope, kept in player-id order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingsTable {
    pub scope: StandingsScope,
    pub rows: Vec<AggregatedPlayerStats>,
}

impl StandingsTable {
    pub fn new(scope: StandingsScope, mut rows: Vec<AggregatedPlayerStats>) -> Self {
        rows.sort_by(|a, b| a.player_id.cmp(&b.player_id));
        Self { scope, rows }
    }

    /// Rows ordered by `column`. The sort is stable against the table's own
    /// order, so exact ties stay in player-id order in either direction.
    pub fn sorted_by(
        &self,
        column: StandingsColumn,
        direction: SortDirection,
    ) -> Vec<&AggregatedPlayerStats> {
        let mut rows: Vec<&AggregatedPlayerStats> = self.rows.iter().collect();
        rows.sort_by(|a, b| {
            let ord = column.value(a).total_cmp(&column.value(b));
            match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        rows
    }

    pub fn row(&self, player_id: &str) -> Option<&AggregatedPlayerStats> {
        self.rows.iter().find(|r| r.player_id == player_id)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
