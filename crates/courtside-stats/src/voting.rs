// Ranked peer voting: ballot storage with per-(game, voter, candidate)
// upsert, and the per-game summary with a single deterministic MVP.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{RankBallot, StatsError};

/// One candidate's standing in a game's vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRating {
    pub player_id: String,
    pub average_rank: f64,
    pub total_votes: u32,
    pub is_mvp: bool,
}

/// The vote for one game. `ratings` is ordered best first; at most one
/// entry carries `is_mvp`, and it is the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRatingSummary {
    pub game_id: String,
    pub ratings: Vec<PlayerRating>,
    pub mvp: Option<String>,
    pub total_voters: usize,
    pub total_players: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct BallotKey {
    voter_id: String,
    rated_player_id: String,
}

/// Ballots grouped by game. Re-submitting for the same
/// (game, voter, candidate) replaces the earlier rank.
#[derive(Debug, Clone, Default)]
pub struct BallotBox {
    games: HashMap<String, BTreeMap<BallotKey, u32>>,
}

impl BallotBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a box from stored ballots. Invalid ballots are logged and dropped.
    pub fn from_ballots<I>(ballots: I) -> Self
    where
        I: IntoIterator<Item = RankBallot>,
    {
        let mut ballot_box = Self::new();
        for ballot in ballots {
            if let Err(e) = ballot_box.submit(ballot) {
                warn!("ignoring stored ballot: {e}");
            }
        }
        ballot_box
    }

    /// Record a ballot, returning the rank it replaced, if any.
    pub fn submit(&mut self, ballot: RankBallot) -> Result<Option<u32>, StatsError> {
        ballot.validate()?;
        let key = BallotKey {
            voter_id: ballot.voter_id,
            rated_player_id: ballot.rated_player_id,
        };
        Ok(self
            .games
            .entry(ballot.game_id)
            .or_default()
            .insert(key, ballot.rank))
    }

    /// All ballots for a game, ordered by voter then candidate.
    pub fn ballots(&self, game_id: &str) -> Vec<RankBallot> {
        let Some(game) = self.games.get(game_id) else {
            return Vec::new();
        };
        game.iter()
            .map(|(key, rank)| RankBallot {
                game_id: game_id.to_string(),
                voter_id: key.voter_id.clone(),
                rated_player_id: key.rated_player_id.clone(),
                rank: *rank,
            })
            .collect()
    }

    pub fn ballot_count(&self, game_id: &str) -> usize {
        self.games.get(game_id).map_or(0, BTreeMap::len)
    }

    pub fn has_voted(&self, game_id: &str, voter_id: &str) -> bool {
        self.games
            .get(game_id)
            .is_some_and(|game| game.keys().any(|k| k.voter_id == voter_id))
    }

    /// Distinct voters for a game, sorted.
    pub fn voters(&self, game_id: &str) -> Vec<String> {
        let Some(game) = self.games.get(game_id) else {
            return Vec::new();
        };
        let voters: BTreeSet<&str> = game.keys().map(|k| k.voter_id.as_str()).collect();
        voters.into_iter().map(String::from).collect()
    }

    /// Summarize a game's vote.
    ///
    /// Candidates are ordered by average rank ascending, then by vote count
    /// descending, then by player id. The first candidate is the MVP. A game
    /// with no ballots has no ratings and no MVP.
    pub fn summarize(&self, game_id: &str) -> GameRatingSummary {
        let mut tallies: BTreeMap<&str, (u64, u32)> = BTreeMap::new();
        let mut voters: BTreeSet<&str> = BTreeSet::new();

        if let Some(game) = self.games.get(game_id) {
            for (key, rank) in game {
                let tally = tallies.entry(key.rated_player_id.as_str()).or_default();
                tally.0 += u64::from(*rank);
                tally.1 += 1;
                voters.insert(key.voter_id.as_str());
            }
        }

        let mut ratings: Vec<PlayerRating> = tallies
            .into_iter()
            .map(|(player_id, (rank_sum, votes))| PlayerRating {
                player_id: player_id.to_string(),
                average_rank: rank_sum as f64 / f64::from(votes),
                total_votes: votes,
                is_mvp: false,
            })
            .collect();

        ratings.sort_by(|a, b| {
            a.average_rank
                .total_cmp(&b.average_rank)
                .then_with(|| b.total_votes.cmp(&a.total_votes))
                .then_with(|| a.player_id.cmp(&b.player_id))
        });

        let mvp = ratings.first_mut().map(|top| {
            top.is_mvp = true;
            top.player_id.clone()
        });

        GameRatingSummary {
            game_id: game_id.to_string(),
            total_players: ratings.len(),
            total_voters: voters.len(),
            ratings,
            mvp,
        }
    }
}

/// Summarize a game straight from a list of stored ballots.
pub fn summarize_ballots(game_id: &str, ballots: Vec<RankBallot>) -> GameRatingSummary {
    BallotBox::from_ballots(ballots).summarize(game_id)
}
