// Stat aggregation: turns raw box-score rows plus game outcomes into
// per-player aggregates (averages, percentages, records, streaks).
//
// Everything here is pure; fetching and caching live in the leaderboard facade.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{GameOutcome, GameResult, RawPlayerGameStat, Season};

/// How many of the most recent games the short-form record covers.
pub const RECENT_FORM_GAMES: usize = 5;

// ---------------------------------------------------------------------------
// Numeric helpers
// ---------------------------------------------------------------------------

/// `made / attempts * 100`, or 0 when there were no attempts.
pub fn percentage(made: u32, attempts: u32) -> f64 {
    if attempts == 0 {
        return 0.0;
    }
    made as f64 / attempts as f64 * 100.0
}

/// Round to one decimal place, halves away from zero for positive values.
pub fn round1(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// A date range over `played_on`. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateWindow {
    /// The last `days` days up to and including `as_of`.
    LastDays { days: u32, as_of: NaiveDate },
    /// The full calendar month before the one containing `as_of`.
    LastCalendarMonth { as_of: NaiveDate },
    Between { from: NaiveDate, to: NaiveDate },
}

impl DateWindow {
    /// The last `days` days, anchored to today (UTC).
    pub fn last_days(days: u32) -> Self {
        DateWindow::LastDays {
            days,
            as_of: Utc::now().date_naive(),
        }
    }

    pub fn bounds(&self) -> (NaiveDate, NaiveDate) {
        match *self {
            DateWindow::LastDays { days, as_of } => {
                let from = as_of
                    .checked_sub_days(Days::new(u64::from(days)))
                    .unwrap_or(NaiveDate::MIN);
                (from, as_of)
            }
            DateWindow::LastCalendarMonth { as_of } => {
                let first_this_month = as_of - Days::new(u64::from(as_of.day0()));
                let last_prev_month = first_this_month.pred_opt().unwrap_or(NaiveDate::MIN);
                let first_prev_month =
                    last_prev_month - Days::new(u64::from(last_prev_month.day0()));
                (first_prev_month, last_prev_month)
            }
            DateWindow::Between { from, to } => (from, to),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let (from, to) = self.bounds();
        from <= date && date <= to
    }
}

/// Which games count toward an aggregate. The default admits every game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameFilter {
    pub season_id: Option<String>,
    pub window: Option<DateWindow>,
}

impl GameFilter {
    pub fn season(season_id: impl Into<String>) -> Self {
        Self {
            season_id: Some(season_id.into()),
            window: None,
        }
    }

    pub fn window(window: DateWindow) -> Self {
        Self {
            season_id: None,
            window: Some(window),
        }
    }

    pub fn admits(&self, game: &GameOutcome) -> bool {
        if let Some(season) = &self.season_id {
            if game.season_id.as_deref() != Some(season.as_str()) {
                return false;
            }
        }
        match &self.window {
            Some(window) => window.contains(game.played_on),
            None => true,
        }
    }
}

/// Index games by id for the join against stat rows.
pub fn index_games(games: &[GameOutcome]) -> HashMap<&str, &GameOutcome> {
    games.iter().map(|g| (g.game_id.as_str(), g)).collect()
}

/// Join stat rows to their games, drop rows the filter rejects, and order
/// the result most-recent-first. Rows whose game is unknown are skipped.
pub fn select_games<'a>(
    stats: &'a [RawPlayerGameStat],
    games: &HashMap<&str, &'a GameOutcome>,
    filter: &GameFilter,
) -> Vec<(&'a RawPlayerGameStat, &'a GameOutcome)> {
    let mut rows: Vec<(&RawPlayerGameStat, &GameOutcome)> = Vec::with_capacity(stats.len());
    for stat in stats {
        let Some(game) = games.get(stat.game_id.as_str()).copied() else {
            debug!(
                player_id = %stat.player_id,
                game_id = %stat.game_id,
                "skipping stat row with no matching game"
            );
            continue;
        };
        if filter.admits(game) {
            rows.push((stat, game));
        }
    }
    // Stable: rows from the same day keep their input order.
    rows.sort_by(|a, b| b.1.played_on.cmp(&a.1.played_on));
    rows
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// A player's numbers over a filtered set of games. Averages and
/// percentages are rounded to one decimal; totals are exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPlayerStats {
    pub player_id: String,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub win_percentage: f64,
    pub current_win_streak: u32,
    pub best_win_streak: u32,
    pub last5_wins: u32,
    pub last5_losses: u32,

    pub total_points: u32,
    pub total_rebounds: u32,
    pub total_assists: u32,

    pub avg_points: f64,
    pub avg_rebounds: f64,
    pub avg_offensive_rebounds: f64,
    pub avg_defensive_rebounds: f64,
    pub avg_assists: f64,
    pub avg_efficiency: f64,

    pub two_point_attempts: u32,
    pub two_point_made: u32,
    pub two_point_percentage: f64,
    pub three_point_attempts: u32,
    pub three_point_made: u32,
    pub three_point_percentage: f64,
    pub field_goal_percentage: f64,
}

impl AggregatedPlayerStats {
    pub fn field_goal_attempts(&self) -> u32 {
        self.two_point_attempts
            .saturating_add(self.three_point_attempts)
    }
}

/// Consecutive wins counted from the front of `results` (most recent first).
/// A loss or a tie ends the streak.
pub fn current_win_streak(results: &[GameResult]) -> u32 {
    results
        .iter()
        .take_while(|r| **r == GameResult::Win)
        .count() as u32
}

/// Longest run of consecutive wins anywhere in `results`.
pub fn best_win_streak(results: &[GameResult]) -> u32 {
    let mut best = 0;
    let mut run = 0;
    for result in results {
        if *result == GameResult::Win {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }
    best
}

/// Aggregate one player's rows, which must already be ordered
/// most-recent-first (see [`select_games`]). Returns `None` for an empty set.
pub fn aggregate(
    player_id: &str,
    rows: &[(&RawPlayerGameStat, &GameOutcome)],
) -> Option<AggregatedPlayerStats> {
    if rows.is_empty() {
        return None;
    }

    let results: Vec<GameResult> = rows
        .iter()
        .map(|(stat, game)| game.result_for(stat.team_side))
        .collect();

    let count = |items: &[GameResult], wanted: GameResult| {
        items.iter().filter(|r| **r == wanted).count() as u32
    };
    let recent = &results[..results.len().min(RECENT_FORM_GAMES)];

    let mut total_points = 0u32;
    let mut total_oreb = 0u32;
    let mut total_dreb = 0u32;
    let mut total_assists = 0u32;
    let mut two_pa = 0u32;
    let mut two_pm = 0u32;
    let mut three_pa = 0u32;
    let mut three_pm = 0u32;
    let mut efficiency_sum = 0.0f64;

    for (stat, _) in rows {
        total_points = total_points.saturating_add(stat.points());
        total_oreb = total_oreb.saturating_add(stat.offensive_rebounds);
        total_dreb = total_dreb.saturating_add(stat.defensive_rebounds);
        total_assists = total_assists.saturating_add(stat.assists);
        two_pa = two_pa.saturating_add(stat.two_point_attempts);
        two_pm = two_pm.saturating_add(stat.two_point_made);
        three_pa = three_pa.saturating_add(stat.three_point_attempts);
        three_pm = three_pm.saturating_add(stat.three_point_made);
        efficiency_sum += stat.efficiency();
    }

    let games_played = rows.len() as u32;
    let wins = count(&results, GameResult::Win);
    let average = |total: f64| round1(total / games_played as f64);

    Some(AggregatedPlayerStats {
        player_id: player_id.to_string(),
        games_played,
        wins,
        losses: count(&results, GameResult::Loss),
        ties: count(&results, GameResult::Tie),
        win_percentage: round1(percentage(wins, games_played)),
        current_win_streak: current_win_streak(&results),
        best_win_streak: best_win_streak(&results),
        last5_wins: count(recent, GameResult::Win),
        last5_losses: count(recent, GameResult::Loss),

        total_points,
        total_rebounds: total_oreb.saturating_add(total_dreb),
        total_assists,

        avg_points: average(total_points as f64),
        avg_rebounds: average(total_oreb as f64 + total_dreb as f64),
        avg_offensive_rebounds: average(total_oreb as f64),
        avg_defensive_rebounds: average(total_dreb as f64),
        avg_assists: average(total_assists as f64),
        avg_efficiency: average(efficiency_sum),

        two_point_attempts: two_pa,
        two_point_made: two_pm,
        two_point_percentage: round1(percentage(two_pm, two_pa)),
        three_point_attempts: three_pa,
        three_point_made: three_pm,
        three_point_percentage: round1(percentage(three_pm, three_pa)),
        field_goal_percentage: round1(percentage(
            two_pm.saturating_add(three_pm),
            two_pa.saturating_add(three_pa),
        )),
    })
}

/// Aggregate a single player's stat rows against the game list.
pub fn aggregate_player(
    player_id: &str,
    stats: &[RawPlayerGameStat],
    games: &[GameOutcome],
    filter: &GameFilter,
) -> Option<AggregatedPlayerStats> {
    let index = index_games(games);
    let rows = select_games(stats, &index, filter);
    aggregate(player_id, &rows)
}

/// Aggregate every player present in `stats`, ordered by player id.
/// Players with no admitted games are left out.
pub fn aggregate_players(
    stats: &[RawPlayerGameStat],
    games: &[GameOutcome],
    filter: &GameFilter,
) -> Vec<AggregatedPlayerStats> {
    let index = index_games(games);
    let mut by_player: BTreeMap<&str, Vec<RawPlayerGameStat>> = BTreeMap::new();
    for stat in stats {
        by_player
            .entry(stat.player_id.as_str())
            .or_default()
            .push(stat.clone());
    }

    by_player
        .into_iter()
        .filter_map(|(player_id, rows)| {
            let selected = select_games(&rows, &index, filter);
            aggregate(player_id, &selected)
        })
        .collect()
}

/// Distinct seasons referenced by `games`, ordered by first game date.
pub fn seasons_from_games(games: &[GameOutcome]) -> Vec<Season> {
    let mut seasons: BTreeMap<&str, Season> = BTreeMap::new();
    for game in games {
        let Some(season_id) = game.season_id.as_deref() else {
            continue;
        };
        seasons
            .entry(season_id)
            .and_modify(|s| {
                s.games += 1;
                s.first_game = s.first_game.min(game.played_on);
                s.last_game = s.last_game.max(game.played_on);
            })
            .or_insert_with(|| Season {
                season_id: season_id.to_string(),
                games: 1,
                first_game: game.played_on,
                last_game: game.played_on,
            });
    }

    let mut seasons: Vec<Season> = seasons.into_values().collect();
    seasons.sort_by(|a, b| {
        a.first_game
            .cmp(&b.first_game)
            .then_with(|| a.season_id.cmp(&b.season_id))
    });
    seasons
}
