use std::sync::Arc;
use tracing::{error, info};

use crate::error::{BoardError, BoardResult};
use crate::store::{ScoreStore, Stores, WinStore};

// Longest username accepted, in characters.
pub const MAX_USERNAME_LEN: usize = 64;

pub fn validate_username(username: &str) -> BoardResult<()> {
    if username.trim().is_empty() {
        return Err(BoardError::MalformedInput("username is empty".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(BoardError::MalformedInput(format!(
            "username is longer than {MAX_USERNAME_LEN} characters"
        )));
    }
    if username.chars().any(char::is_control) {
        return Err(BoardError::MalformedInput(
            "username contains control characters".to_string(),
        ));
    }
    Ok(())
}

/// The write side of the leaderboard. Each operation is one atomic
/// single-key increment in the store, nothing is read back in-process.
#[derive(Clone)]
pub struct Scorekeeper {
    scores: Arc<dyn ScoreStore>,
    wins: Arc<dyn WinStore>,
}

impl Scorekeeper {
    pub fn new(stores: &Stores) -> Self {
        Scorekeeper {
            scores: stores.scores.clone(),
            wins: stores.wins.clone(),
        }
    }

    pub async fn record_score_event(&self, user: &str) -> BoardResult<()> {
        validate_username(user)?;
        self.scores.increment_points(user, 1).await.map(|_| ()).map_err(|e| {
            error!("Error incrementing leaderboard points of '{user}'. {e}");
            e
        })
    }

    pub async fn record_win(&self, user: &str) -> BoardResult<()> {
        validate_username(user)?;
        self.wins.increment_wins(user, 1).await.map(|_| ()).map_err(|e| {
            error!("Error incrementing wins of '{user}'. {e}");
            e
        })
    }

    // Two independent writes: a failure after the first one leaves the
    // point recorded without its win.
    pub async fn start_game(&self, username: &str) -> BoardResult<()> {
        info!("Starting game for username: {username}");
        self.record_score_event(username).await?;
        self.record_win(username).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::leaderboard::{Leaderboard, LeaderboardRow, WinLookupPolicy};
    use crate::store::{MemoryStore, ScoreEntry};
    use async_trait::async_trait;

    struct DownWins;

    #[async_trait]
    impl WinStore for DownWins {
        async fn increment_wins(&self, _user: &str, _delta: i64) -> BoardResult<i64> {
            Err(BoardError::StoreUnavailable("connection refused".to_string()))
        }

        async fn wins(&self, _user: &str) -> BoardResult<i64> {
            Err(BoardError::StoreUnavailable("connection refused".to_string()))
        }
    }

    #[test]
    fn usernames_are_validated() {
        assert!(validate_username("carol").is_ok());
        assert!(validate_username("Jean-Luc Picard").is_ok());
        assert!(validate_username(&"é".repeat(MAX_USERNAME_LEN)).is_ok());

        for invalid in ["", "   ", "tab\tbed", "new\nline"] {
            assert!(matches!(
                validate_username(invalid),
                Err(BoardError::MalformedInput(_))
            ));
        }
        assert!(validate_username(&"x".repeat(MAX_USERNAME_LEN + 1)).is_err());
    }

    #[tokio::test]
    async fn points_equal_number_of_score_events() {
        let store = MemoryStore::new();
        let keeper = Scorekeeper::new(&Stores::memory(store.clone()));
        for _ in 0..7 {
            keeper.record_score_event("alice").await.unwrap();
        }
        assert_eq!(
            store.ranked().await.unwrap(),
            vec![ScoreEntry {
                user: "alice".to_string(),
                score: 7.0
            }]
        );
        assert_eq!(store.wins("alice").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn record_win_only_touches_wins() {
        let store = MemoryStore::new();
        let keeper = Scorekeeper::new(&Stores::memory(store.clone()));
        keeper.record_win("bob").await.unwrap();
        keeper.record_win("bob").await.unwrap();
        assert_eq!(store.wins("bob").await.unwrap(), 2);
        assert!(store.ranked().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn start_game_records_a_point_and_a_win() {
        let stores = Stores::memory(MemoryStore::new());
        let keeper = Scorekeeper::new(&stores);
        keeper.start_game("carol").await.unwrap();

        let rows = Leaderboard::new(&stores, WinLookupPolicy::Strict)
            .build()
            .await
            .unwrap();
        assert_eq!(rows, vec![LeaderboardRow::new("carol", 1, 1)]);
    }

    #[tokio::test]
    async fn start_game_rejects_invalid_username_without_writing() {
        let store = MemoryStore::new();
        let keeper = Scorekeeper::new(&Stores::memory(store.clone()));
        assert!(matches!(
            keeper.start_game("").await,
            Err(BoardError::MalformedInput(_))
        ));
        assert!(store.ranked().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_operations_reject_invalid_usernames() {
        let store = MemoryStore::new();
        let keeper = Scorekeeper::new(&Stores::memory(store.clone()));
        assert!(matches!(
            keeper.record_score_event("").await,
            Err(BoardError::MalformedInput(_))
        ));
        assert!(matches!(
            keeper.record_win(" \t").await,
            Err(BoardError::MalformedInput(_))
        ));
        assert!(store.ranked().await.unwrap().is_empty());
        assert_eq!(store.wins("").await.unwrap(), 0);
        assert_eq!(store.wins(" \t").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_win_write_is_surfaced_and_keeps_the_point() {
        let store = MemoryStore::new();
        let stores = Stores {
            scores: Arc::new(store.clone()),
            wins: Arc::new(DownWins),
        };
        let keeper = Scorekeeper::new(&stores);
        assert!(matches!(
            keeper.start_game("dave").await,
            Err(BoardError::StoreUnavailable(_))
        ));
        assert_eq!(store.ranked().await.unwrap()[0].score, 1.0);
    }

    #[tokio::test]
    async fn concurrent_score_events_all_count() {
        let store = MemoryStore::new();
        let keeper = Scorekeeper::new(&Stores::memory(store.clone()));
        let handles = (0..50)
            .map(|_| {
                let keeper = keeper.clone();
                tokio::spawn(async move { keeper.record_score_event("erin").await })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.ranked().await.unwrap()[0].score, 50.0);
    }
}
