//! Score and win storage.
//!
//! Points live in a sorted set (member = username, score = points) and wins
//! in a flat hash (field = username, value = wins). The two structures are
//! written independently and only joined on read by
//! [`Leaderboard`](crate::core::leaderboard::Leaderboard).
//!
//! ```text
//! leaderboard → ZSET  username → points   (ZINCRBY / ZREVRANGE 0 -1 WITHSCORES)
//! wins        → HASH  username → wins     (HINCRBY / HGET)
//! ```

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use strum::Display;
use tracing::info;

use crate::config::Settings;
use crate::error::{BoardError, BoardResult};

/// A member of the points ranking with its raw store score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreEntry {
    pub user: String,
    pub score: f64,
}

#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Adds `delta` to the user's score, creating the entry if absent.
    /// Returns the new raw score.
    async fn increment_points(&self, user: &str, delta: i64) -> BoardResult<f64>;

    /// Every entry, highest score first.
    async fn ranked(&self) -> BoardResult<Vec<ScoreEntry>>;
}

#[async_trait]
pub trait WinStore: Send + Sync {
    /// Adds `delta` to the user's win counter, creating it if absent.
    /// Returns the new counter value.
    async fn increment_wins(&self, user: &str, delta: i64) -> BoardResult<i64>;

    /// The user's win counter, 0 when the user never won.
    async fn wins(&self, user: &str) -> BoardResult<i64>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

/// Handles to both structures, shared by every request.
#[derive(Clone)]
pub struct Stores {
    pub scores: Arc<dyn ScoreStore>,
    pub wins: Arc<dyn WinStore>,
}

impl Stores {
    pub async fn connect(settings: &Settings) -> BoardResult<Self> {
        info!("Using {} store backend.", settings.store_backend);
        match settings.store_backend {
            StoreBackend::Redis => {
                let store = Arc::new(RedisStore::connect(settings).await?);
                Ok(Stores {
                    scores: store.clone(),
                    wins: store,
                })
            }
            StoreBackend::Memory => Ok(Stores::memory(MemoryStore::new())),
        }
    }

    pub fn memory(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Stores {
            scores: store.clone(),
            wins: store,
        }
    }
}

// Members are usernames written by this service. Anything else in the
// sorted set means the key is shared or was tampered with.
pub(crate) fn validate_member(raw: Vec<u8>, score: f64) -> BoardResult<ScoreEntry> {
    let user = String::from_utf8(raw)
        .map_err(|e| BoardError::CorruptData(format!("member is not valid UTF-8: {e}")))?;
    if user.is_empty() {
        return Err(BoardError::CorruptData("empty member in ranking".to_string()));
    }
    if !score.is_finite() {
        return Err(BoardError::CorruptData(format!(
            "member '{user}' has non finite score {score}"
        )));
    }
    Ok(ScoreEntry { user, score })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_member_is_accepted() {
        let entry = validate_member(b"alice".to_vec(), 3.0).unwrap();
        assert_eq!(
            entry,
            ScoreEntry {
                user: "alice".to_string(),
                score: 3.0
            }
        );
    }

    #[test]
    fn invalid_members_are_corrupt_data() {
        assert!(matches!(
            validate_member(vec![0xff, 0xfe], 1.0),
            Err(BoardError::CorruptData(_))
        ));
        assert!(matches!(
            validate_member(Vec::new(), 1.0),
            Err(BoardError::CorruptData(_))
        ));
        assert!(matches!(
            validate_member(b"bob".to_vec(), f64::INFINITY),
            Err(BoardError::CorruptData(_))
        ));
    }
}
