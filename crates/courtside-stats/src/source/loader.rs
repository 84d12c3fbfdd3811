// CSV loading of games, box-score rows and ballots into an in-memory source.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use courtside_core::config::{Config, DataPaths};
use serde::Deserialize;
use tracing::{info, warn};

use super::{InMemoryStatSource, SourceError};
use crate::model::{GameOutcome, RankBallot, RawPlayerGameStat, TeamSide};

// ---------------------------------------------------------------------------
// Raw CSV rows (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawGame {
    game_id: String,
    #[serde(default)]
    season_id: Option<String>,
    #[serde(alias = "date")]
    played_on: String,
    team_a_score: u32,
    team_b_score: u32,
}

#[derive(Debug, Deserialize)]
struct RawStatRow {
    game_id: String,
    player_id: String,
    #[serde(alias = "team_side")]
    team: TeamSide,
    #[serde(alias = "2pa")]
    two_point_attempts: u32,
    #[serde(alias = "2pm")]
    two_point_made: u32,
    #[serde(alias = "3pa")]
    three_point_attempts: u32,
    #[serde(alias = "3pm")]
    three_point_made: u32,
    #[serde(alias = "oreb")]
    offensive_rebounds: u32,
    #[serde(alias = "dreb")]
    defensive_rebounds: u32,
    #[serde(alias = "ast")]
    assists: u32,
}

#[derive(Debug, Deserialize)]
struct RawBallot {
    game_id: String,
    voter_id: String,
    rated_player_id: String,
    rank: u32,
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_games_from_reader<R: Read>(rdr: R) -> Result<Vec<GameOutcome>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut games = Vec::new();
    for result in reader.deserialize::<RawGame>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed game row: {}", e);
                continue;
            }
        };
        let Ok(played_on) = NaiveDate::parse_from_str(raw.played_on.trim(), "%Y-%m-%d") else {
            warn!(
                "skipping game '{}': unreadable date '{}'",
                raw.game_id.trim(),
                raw.played_on
            );
            continue;
        };
        let game = GameOutcome {
            game_id: raw.game_id.trim().to_string(),
            season_id: raw
                .season_id
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            played_on,
            team_a_score: raw.team_a_score,
            team_b_score: raw.team_b_score,
        };
        match game.validate() {
            Ok(()) => games.push(game),
            Err(e) => warn!("skipping game row: {}", e),
        }
    }
    Ok(games)
}

fn load_stats_from_reader<R: Read>(rdr: R) -> Result<Vec<RawPlayerGameStat>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut stats = Vec::new();
    for result in reader.deserialize::<RawStatRow>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed stat row: {}", e);
                continue;
            }
        };
        let stat = RawPlayerGameStat {
            game_id: raw.game_id.trim().to_string(),
            player_id: raw.player_id.trim().to_string(),
            team_side: raw.team,
            two_point_attempts: raw.two_point_attempts,
            two_point_made: raw.two_point_made,
            three_point_attempts: raw.three_point_attempts,
            three_point_made: raw.three_point_made,
            offensive_rebounds: raw.offensive_rebounds,
            defensive_rebounds: raw.defensive_rebounds,
            assists: raw.assists,
        };
        match stat.validate() {
            Ok(()) => stats.push(stat),
            Err(e) => warn!("skipping stat row: {}", e),
        }
    }
    Ok(stats)
}

fn load_ballots_from_reader<R: Read>(rdr: R) -> Result<Vec<RankBallot>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut ballots = Vec::new();
    for result in reader.deserialize::<RawBallot>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed ballot row: {}", e);
                continue;
            }
        };
        let ballot = RankBallot {
            game_id: raw.game_id.trim().to_string(),
            voter_id: raw.voter_id.trim().to_string(),
            rated_player_id: raw.rated_player_id.trim().to_string(),
            rank: raw.rank,
        };
        match ballot.validate() {
            Ok(()) => ballots.push(ballot),
            Err(e) => warn!("skipping ballot row: {}", e),
        }
    }
    Ok(ballots)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, SourceError> {
    std::fs::File::open(path).map_err(|e| SourceError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn csv_error(path: &Path) -> impl FnOnce(csv::Error) -> SourceError + '_ {
    move |e| SourceError::Csv {
        path: path.display().to_string(),
        source: e,
    }
}

pub fn load_games(path: &Path) -> Result<Vec<GameOutcome>, SourceError> {
    load_games_from_reader(open(path)?).map_err(csv_error(path))
}

pub fn load_player_stats(path: &Path) -> Result<Vec<RawPlayerGameStat>, SourceError> {
    load_stats_from_reader(open(path)?).map_err(csv_error(path))
}

pub fn load_ballots(path: &Path) -> Result<Vec<RankBallot>, SourceError> {
    load_ballots_from_reader(open(path)?).map_err(csv_error(path))
}

/// Load every data file named in the config into an in-memory source.
pub fn load_source(config: &Config) -> Result<InMemoryStatSource, SourceError> {
    load_from_paths(&config.data_paths)
}

/// Load from explicit paths. A missing ballots entry means no ballots yet.
pub fn load_from_paths(paths: &DataPaths) -> Result<InMemoryStatSource, SourceError> {
    let games = load_games(Path::new(&paths.games))?;
    let stats = load_player_stats(Path::new(&paths.player_stats))?;
    let ballots = match &paths.ballots {
        Some(path) => load_ballots(Path::new(path))?,
        None => Vec::new(),
    };

    if games.is_empty() {
        return Err(SourceError::Validation(
            "games CSV produced zero valid rows".into(),
        ));
    }

    info!(
        "Loaded {} games, {} stat rows, {} ballots",
        games.len(),
        stats.len(),
        ballots.len()
    );

    InMemoryStatSource::from_records(games, stats, ballots).map_err(SourceError::from)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StatSource;

    const GAMES: &str = "\
game_id,season_id,played_on,team_a_score,team_b_score
g1,2024-spring,2024-03-02,21,17
g2,,2024-03-09,15,15
g3,2024-spring,not-a-date,10,2
";

    const STATS: &str = "\
game_id,player_id,team,two_point_attempts,two_point_made,three_point_attempts,three_point_made,offensive_rebounds,defensive_rebounds,assists
g1,p1,A,8,4,5,2,2,4,3
g1,p2,b,6,3,2,1,0,5,1
g1,p3,A,2,5,0,0,0,0,0
g1,p4,C,1,1,0,0,0,0,0
";

    #[test]
    fn games_parse_and_bad_dates_are_skipped() {
        let games = load_games_from_reader(GAMES.as_bytes()).unwrap();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].season_id.as_deref(), Some("2024-spring"));
        assert_eq!(games[1].season_id, None);
        assert_eq!(
            games[0].played_on,
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
        );
    }

    #[test]
    fn stat_rows_validate_at_load() {
        let stats = load_stats_from_reader(STATS.as_bytes()).unwrap();
        // p3 made more than attempted, p4 has an unknown team.
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[1].team_side, TeamSide::B);
        assert_eq!(stats[0].efficiency().round(), 17.0);
    }

    #[test]
    fn short_column_names_are_accepted() {
        let csv = "game_id,player_id,team_side,2pa,2pm,3pa,3pm,oreb,dreb,ast\ng1,p1,A,4,2,0,0,1,1,1\n";
        let stats = load_stats_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].two_point_made, 2);
    }

    #[test]
    fn stat_rows_above_per_game_limit_are_skipped() {
        let csv = "game_id,player_id,team,2pa,2pm,3pa,3pm,oreb,dreb,ast\n\
                   g1,p1,A,4,2,0,0,1,1,1\n\
                   g1,p2,A,3000000000,3000000000,0,0,0,0,0\n";
        let stats = load_stats_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].player_id, "p1");
    }

    #[test]
    fn ballots_with_rank_zero_are_skipped() {
        let csv = "game_id,voter_id,rated_player_id,rank\ng1,v1,p1,1\ng1,v1,p2,0\n";
        let ballots = load_ballots_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ballots.len(), 1);
    }

    #[test]
    fn empty_csv_returns_empty_vec() {
        let csv = "game_id,voter_id,rated_player_id,rank\n";
        assert!(load_ballots_from_reader(csv.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_games(Path::new("/nonexistent/games.csv")).unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[tokio::test]
    async fn load_from_paths_builds_source() {
        let dir = std::env::temp_dir().join("courtside_loader_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("games.csv"), GAMES).unwrap();
        std::fs::write(dir.join("stats.csv"), STATS).unwrap();

        let paths = DataPaths {
            games: dir.join("games.csv").display().to_string(),
            player_stats: dir.join("stats.csv").display().to_string(),
            ballots: None,
        };
        let source = load_from_paths(&paths).unwrap();
        assert_eq!(source.games().await.unwrap().len(), 2);
        assert_eq!(source.all_player_stats().await.unwrap().len(), 2);
        assert!(source.ballots("g1").await.unwrap().is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
