use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{
    AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo, RedisError, RedisResult,
};
use std::future::Future;
use std::time::Duration;
use strum::Display;
use tokio::time;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::{BoardError, BoardResult};
use crate::store::{validate_member, ScoreEntry, ScoreStore, WinStore};

/// Redis backed store. Cloning is cheap, all clones share one multiplexed
/// connection that reconnects on its own.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    points_key: String,
    wins_key: String,
    timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
}

impl RedisStore {
    pub async fn connect(settings: &Settings) -> BoardResult<Self> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(settings.redis_host.clone(), settings.redis_port),
            redis: RedisConnectionInfo {
                db: settings.redis_db,
                password: settings.redis_password.clone(),
                ..Default::default()
            },
        };
        let client = redis::Client::open(info)?;

        debug!(
            "Connecting to Redis at {}:{}/{}",
            settings.redis_host, settings.redis_port, settings.redis_db
        );
        let conn = time::timeout(settings.redis_timeout(), ConnectionManager::new(client))
            .await
            .map_err(|_| {
                BoardError::StoreUnavailable(format!(
                    "could not connect to {}:{} within {:?}",
                    settings.redis_host,
                    settings.redis_port,
                    settings.redis_timeout()
                ))
            })??;

        Ok(RedisStore {
            conn,
            points_key: settings.points_key.clone(),
            wins_key: settings.wins_key.clone(),
            timeout: settings.redis_timeout(),
            max_retries: settings.redis_max_retries,
            retry_backoff: settings.redis_retry_backoff(),
        })
    }

    // Runs one command under the configured deadline, retrying failures with
    // exponential backoff when repeating the command is safe.
    async fn call<T, F, Fut>(&self, command: Command, op: F) -> BoardResult<T>
    where
        F: Fn(ConnectionManager) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let mut attempt = 0;
        let mut backoff = self.retry_backoff;
        loop {
            let (error, replayable) =
                match time::timeout(self.timeout, op(self.conn.clone())).await {
                    Ok(Ok(reply)) => return Ok(reply),
                    Ok(Err(e)) => {
                        let replayable = command.replayable(&e);
                        (BoardError::from(e), replayable)
                    }
                    // The command may have reached the server.
                    Err(_) => (
                        BoardError::StoreUnavailable(format!(
                            "{command} timed out after {:?}",
                            self.timeout
                        )),
                        command.is_read(),
                    ),
                };

            if !replayable || !error.is_transient() || attempt >= self.max_retries {
                return Err(error);
            }
            attempt += 1;
            warn!("{command} failed ({error}), retry {attempt}/{} in {backoff:?}", self.max_retries);
            time::sleep(backoff).await;
            backoff *= 2;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
enum Command {
    Zincrby,
    Zrevrange,
    Hincrby,
    Hget,
}

impl Command {
    fn is_read(&self) -> bool {
        matches!(self, Command::Zrevrange | Command::Hget)
    }

    // Increments are not idempotent: they are only sent again when the
    // connection was refused, i.e. the first attempt never left the client.
    fn replayable(&self, error: &RedisError) -> bool {
        self.is_read() || error.is_connection_refusal()
    }
}

#[async_trait]
impl ScoreStore for RedisStore {
    async fn increment_points(&self, user: &str, delta: i64) -> BoardResult<f64> {
        self.call(Command::Zincrby, |mut conn| {
            let key = self.points_key.clone();
            let member = user.to_string();
            async move {
                let score: RedisResult<f64> = conn.zincr(key, member, delta).await;
                score
            }
        })
        .await
    }

    async fn ranked(&self) -> BoardResult<Vec<ScoreEntry>> {
        // Members are read as raw bytes so they can be checked before use.
        let raw = self
            .call(Command::Zrevrange, |mut conn| {
                let key = self.points_key.clone();
                async move {
                    let entries: RedisResult<Vec<(Vec<u8>, f64)>> =
                        conn.zrevrange_withscores(key, 0, -1).await;
                    entries
                }
            })
            .await?;

        raw.into_iter()
            .map(|(member, score)| validate_member(member, score))
            .collect()
    }
}

#[async_trait]
impl WinStore for RedisStore {
    async fn increment_wins(&self, user: &str, delta: i64) -> BoardResult<i64> {
        self.call(Command::Hincrby, |mut conn| {
            let key = self.wins_key.clone();
            let field = user.to_string();
            async move {
                let wins: RedisResult<i64> = conn.hincr(key, field, delta).await;
                wins
            }
        })
        .await
    }

    async fn wins(&self, user: &str) -> BoardResult<i64> {
        let wins = self
            .call(Command::Hget, |mut conn| {
                let key = self.wins_key.clone();
                let field = user.to_string();
                async move {
                    let wins: RedisResult<Option<i64>> = conn.hget(key, field).await;
                    wins
                }
            })
            .await?;
        Ok(wins.unwrap_or_default())
    }
}
