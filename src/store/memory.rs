use async_trait::async_trait;
use itertools::Itertools;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{BoardError, BoardResult};
use crate::store::{ScoreEntry, ScoreStore, WinStore};

#[derive(Debug, Default)]
struct Tables {
    points: HashMap<String, f64>,
    wins: HashMap<String, i64>,
}

type SharedTables = Arc<Mutex<Tables>>;

/// In-process store with the same observable behavior as the Redis one.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    data: SharedTables,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    fn tables(&self) -> BoardResult<MutexGuard<'_, Tables>> {
        self.data
            .lock()
            .map_err(|_| BoardError::StoreUnavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn increment_points(&self, user: &str, delta: i64) -> BoardResult<f64> {
        let mut tables = self.tables()?;
        let score = tables.points.entry(user.to_string()).or_insert(0.0);
        *score += delta as f64;
        Ok(*score)
    }

    async fn ranked(&self) -> BoardResult<Vec<ScoreEntry>> {
        let tables = self.tables()?;
        // Same order as ZREVRANGE: score descending, then member descending.
        Ok(tables
            .points
            .iter()
            .sorted_by(|a, b| b.1.total_cmp(a.1).then_with(|| b.0.cmp(a.0)))
            .map(|(user, score)| ScoreEntry {
                user: user.clone(),
                score: *score,
            })
            .collect())
    }
}

#[async_trait]
impl WinStore for MemoryStore {
    async fn increment_wins(&self, user: &str, delta: i64) -> BoardResult<i64> {
        let mut tables = self.tables()?;
        let wins = tables.wins.entry(user.to_string()).or_insert(0);
        *wins += delta;
        Ok(*wins)
    }

    async fn wins(&self, user: &str) -> BoardResult<i64> {
        let tables = self.tables()?;
        Ok(tables.wins.get(user).copied().unwrap_or_default())
    }
}
