use futures::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::Display;
use tracing::{debug, warn};

use crate::error::BoardResult;
use crate::store::{ScoreEntry, ScoreStore, Stores, WinStore};

/// What to do when the win lookup of a single ranked user fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WinLookupPolicy {
    /// Fail the whole leaderboard.
    #[default]
    Strict,
    /// Show the user with 0 wins and log the failure.
    Lenient,
}

// A ranked user joined with its wins. Only exists for the time of a read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    pub user: String,
    pub points: i64,
    pub wins: i64,
}

impl LeaderboardRow {
    pub fn new(user: &str, points: i64, wins: i64) -> Self {
        LeaderboardRow {
            user: user.to_string(),
            points,
            wins,
        }
    }
}

// Scores are floats in the sorted set. Increments are whole numbers, so
// rounding half away from zero only hides accumulation artifacts.
pub fn coerce_points(score: f64) -> i64 {
    score.round() as i64
}

#[derive(Clone)]
pub struct Leaderboard {
    scores: Arc<dyn ScoreStore>,
    wins: Arc<dyn WinStore>,
    policy: WinLookupPolicy,
}

impl Leaderboard {
    pub fn new(stores: &Stores, policy: WinLookupPolicy) -> Self {
        Leaderboard {
            scores: stores.scores.clone(),
            wins: stores.wins.clone(),
            policy,
        }
    }

    pub fn policy(&self) -> WinLookupPolicy {
        self.policy
    }

    /// Ranked users, highest points first, each with its win count.
    ///
    /// Membership and order come from the points ranking only: a user with
    /// wins but no points is not listed, and rows are never re-sorted by
    /// wins. Equal points keep the store's own tie-break.
    ///
    /// Costs one range read plus one win lookup per ranked user.
    pub async fn build(&self) -> BoardResult<Vec<LeaderboardRow>> {
        let ranked = self.scores.ranked().await?;
        debug!("Fetched {} ranked entries", ranked.len());

        let lookups = ranked.iter().map(|entry| self.wins.wins(&entry.user));

        let wins = match self.policy {
            WinLookupPolicy::Strict => try_join_all(lookups).await?,
            WinLookupPolicy::Lenient => join_all(lookups)
                .await
                .into_iter()
                .zip(ranked.iter())
                .map(|(lookup, entry)| {
                    lookup.unwrap_or_else(|e| {
                        warn!("Could not retrieve wins of '{}', showing 0. {e}", entry.user);
                        0
                    })
                })
                .collect(),
        };

        Ok(ranked
            .iter()
            .zip(wins)
            .map(|(ScoreEntry { user, score }, wins)| {
                LeaderboardRow::new(user, coerce_points(*score), wins)
            })
            .collect())
    }
}
