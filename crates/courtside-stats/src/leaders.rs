// League leaderboards over a set of player aggregates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::engine::AggregatedPlayerStats;

/// Qualification rules for the leaderboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderRules {
    /// Minimum attempts before a player appears on a shooting leaderboard.
    pub min_shooting_attempts: u32,
    /// Length of the efficiency leaderboard.
    pub efficiency_leaders: usize,
}

impl Default for LeaderRules {
    fn default() -> Self {
        Self {
            min_shooting_attempts: 5,
            efficiency_leaders: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leader {
    pub player_id: String,
    pub value: f64,
}

/// Leaders for one date window, plus the aggregates they were picked from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPlayers {
    pub window_days: u32,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub most_points: Option<Leader>,
    pub best_shooting: Option<Leader>,
    pub most_rebounds: Option<Leader>,
    pub most_assists: Option<Leader>,
    pub top_efficiency: Vec<Leader>,
    pub dominant_two_point: Option<Leader>,
    pub dominant_three_point: Option<Leader>,
    pub players: Vec<AggregatedPlayerStats>,
}

/// Pick the highest `value` among qualifying players. On a tie the player
/// that comes first in `players` keeps the spot.
fn best_by<V, Q>(players: &[AggregatedPlayerStats], value: V, qualifies: Q) -> Option<Leader>
where
    V: Fn(&AggregatedPlayerStats) -> f64,
    Q: Fn(&AggregatedPlayerStats) -> bool,
{
    let mut best: Option<Leader> = None;
    for player in players.iter().filter(|p| qualifies(p)) {
        let v = value(player);
        if best.as_ref().map_or(true, |b| v > b.value) {
            best = Some(Leader {
                player_id: player.player_id.clone(),
                value: v,
            });
        }
    }
    best
}

/// Build the leaderboards. `players` should be in a stable order (the
/// engine returns them by player id); ties resolve to the earlier player.
pub fn top_players(
    window_days: u32,
    (from, to): (NaiveDate, NaiveDate),
    players: Vec<AggregatedPlayerStats>,
    rules: LeaderRules,
) -> TopPlayers {
    let min = rules.min_shooting_attempts;
    let anyone = |_: &AggregatedPlayerStats| true;

    let mut by_efficiency: Vec<&AggregatedPlayerStats> = players.iter().collect();
    by_efficiency.sort_by(|a, b| b.avg_efficiency.total_cmp(&a.avg_efficiency));
    let top_efficiency = by_efficiency
        .into_iter()
        .take(rules.efficiency_leaders)
        .map(|p| Leader {
            player_id: p.player_id.clone(),
            value: p.avg_efficiency,
        })
        .collect();

    TopPlayers {
        window_days,
        from,
        to,
        most_points: best_by(&players, |p| f64::from(p.total_points), anyone),
        best_shooting: best_by(
            &players,
            |p| p.field_goal_percentage,
            |p| p.field_goal_attempts() >= min,
        ),
        most_rebounds: best_by(&players, |p| f64::from(p.total_rebounds), anyone),
        most_assists: best_by(&players, |p| f64::from(p.total_assists), anyone),
        top_efficiency,
        dominant_two_point: best_by(
            &players,
            |p| p.two_point_percentage,
            |p| p.two_point_attempts >= min,
        ),
        dominant_three_point: best_by(
            &players,
            |p| p.three_point_percentage,
            |p| p.three_point_attempts >= min,
        ),
        players,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn player(id: &str) -> AggregatedPlayerStats {
        AggregatedPlayerStats {
            player_id: id.into(),
            games_played: 1,
            wins: 1,
            losses: 0,
            ties: 0,
            win_percentage: 100.0,
            current_win_streak: 1,
            best_win_streak: 1,
            last5_wins: 1,
            last5_losses: 0,
            total_points: 10,
            total_rebounds: 5,
            total_assists: 2,
            avg_points: 10.0,
            avg_rebounds: 5.0,
            avg_offensive_rebounds: 2.0,
            avg_defensive_rebounds: 3.0,
            avg_assists: 2.0,
            avg_efficiency: 10.0,
            two_point_attempts: 10,
            two_point_made: 5,
            two_point_percentage: 50.0,
            three_point_attempts: 10,
            three_point_made: 0,
            three_point_percentage: 0.0,
            field_goal_percentage: 25.0,
        }
    }

    fn window() -> (NaiveDate, NaiveDate) {
        (date(2024, 3, 1), date(2024, 3, 31))
    }

    #[test]
    fn three_point_leader_needs_minimum_attempts() {
        let mut sniper = player("sniper");
        sniper.three_point_attempts = 3;
        sniper.three_point_made = 3;
        sniper.three_point_percentage = 100.0;

        let mut volume = player("volume");
        volume.three_point_attempts = 10;
        volume.three_point_made = 4;
        volume.three_point_percentage = 40.0;

        let top = top_players(30, window(), vec![sniper, volume], LeaderRules::default());
        let leader = top.dominant_three_point.unwrap();
        assert_eq!(leader.player_id, "volume");
        assert_eq!(leader.value, 40.0);
    }

    #[test]
    fn no_qualifier_means_no_leader() {
        let mut p = player("p1");
        p.two_point_attempts = 2;
        p.three_point_attempts = 2;

        let top = top_players(30, window(), vec![p], LeaderRules::default());
        assert!(top.dominant_two_point.is_none());
        assert!(top.dominant_three_point.is_none());
        assert!(top.best_shooting.is_none());
        assert_eq!(top.most_points.unwrap().player_id, "p1");
    }

    #[test]
    fn counting_leaders_use_totals() {
        let mut a = player("a");
        a.total_points = 40;
        a.avg_points = 10.0;
        let mut b = player("b");
        b.total_points = 30;
        b.avg_points = 30.0;
        b.total_assists = 9;

        let top = top_players(30, window(), vec![a, b], LeaderRules::default());
        assert_eq!(top.most_points.unwrap().player_id, "a");
        assert_eq!(top.most_assists.unwrap().value, 9.0);
    }

    #[test]
    fn ties_go_to_the_earlier_player() {
        let top = top_players(
            30,
            window(),
            vec![player("amy"), player("bob")],
            LeaderRules::default(),
        );
        assert_eq!(top.most_rebounds.unwrap().player_id, "amy");
        assert_eq!(top.top_efficiency[0].player_id, "amy");
    }

    #[test]
    fn efficiency_board_is_limited_and_sorted() {
        let players: Vec<_> = [("a", 5.0), ("b", 20.0), ("c", 12.5), ("d", 15.0)]
            .into_iter()
            .map(|(id, eff)| AggregatedPlayerStats {
                avg_efficiency: eff,
                ..player(id)
            })
            .collect();

        let top = top_players(30, window(), players, LeaderRules::default());
        let ids: Vec<_> = top
            .top_efficiency
            .iter()
            .map(|l| l.player_id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "d", "c"]);
        assert_eq!(top.players.len(), 4);
    }

    #[test]
    fn empty_window_has_no_leaders() {
        let top = top_players(7, window(), Vec::new(), LeaderRules::default());
        assert!(top.most_points.is_none());
        assert!(top.top_efficiency.is_empty());
        assert_eq!(top.window_days, 7);
    }
}
