//! Job source and result store seams, with the Redis implementation.
//!
//! Jobs are popped from a list; results live under an expiring
//! `<prefix>:<inn>` JSON entry; an always-current hash under
//! `<latest_prefix>:<inn>` carries the latest observation regardless of
//! cache state.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::core::config::{CacheConfig, QueueConfig};
use crate::core::error::AppError;
use crate::parser::ParsedResult;

// ── Seams ────────────────────────────────────────────────────────────────────

/// Blocking job feed.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Pop one raw payload, waiting at most `timeout`. `None` on empty.
    async fn pop_job(&self, timeout: Duration) -> Result<Option<String>, AppError>;
}

/// Result persistence: expiring cache plus the always-current latest record.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn cache_get(&self, inn: &str) -> Result<Option<ParsedResult>, AppError>;
    async fn cache_put(&self, inn: &str, result: &ParsedResult) -> Result<(), AppError>;
    /// Last-writer-wins observability record; no expiry.
    async fn latest_put(&self, inn: &str, result: &ParsedResult) -> Result<(), AppError>;
}

// ── Redis implementation ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    queue: QueueConfig,
    cache: CacheConfig,
}

impl RedisStore {
    pub async fn connect(
        url: &str,
        queue: QueueConfig,
        cache: CacheConfig,
    ) -> Result<Self, AppError> {
        let client = redis::Client::open(url).map_err(store_err)?;
        let conn = ConnectionManager::new(client).await.map_err(store_err)?;
        Ok(Self { conn, queue, cache })
    }

    fn cache_key(&self, inn: &str) -> String {
        format!("{}:{}", self.cache.prefix, inn)
    }

    fn latest_key(&self, inn: &str) -> String {
        format!("{}:{}", self.cache.latest_prefix, inn)
    }
}

fn store_err(e: redis::RedisError) -> AppError {
    AppError::Store(e.to_string())
}

#[async_trait]
impl JobSource for RedisStore {
    async fn pop_job(&self, timeout: Duration) -> Result<Option<String>, AppError> {
        let mut conn = self.conn.clone();
        let popped: Option<(String, String)> = conn
            .blpop(&self.queue.key, timeout.as_secs_f64())
            .await
            .map_err(store_err)?;
        Ok(popped.map(|(_, payload)| payload))
    }
}

#[async_trait]
impl ResultStore for RedisStore {
    async fn cache_get(&self, inn: &str) -> Result<Option<ParsedResult>, AppError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(self.cache_key(inn)).await.map_err(store_err)?;
        match raw {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| AppError::Store(format!("corrupt cache entry for {inn}: {e}"))),
            None => Ok(None),
        }
    }

    async fn cache_put(&self, inn: &str, result: &ParsedResult) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(result)
            .map_err(|e| AppError::Store(format!("encode result for {inn}: {e}")))?;
        conn.set_ex(self.cache_key(inn), json, self.cache.ttl.as_secs())
            .await
            .map_err(store_err)
    }

    async fn latest_put(&self, inn: &str, result: &ParsedResult) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let fields = latest_fields(result);
        conn.hset_multiple(self.latest_key(inn), &fields)
            .await
            .map_err(store_err)
    }
}

/// Flatten a result into the hash fields of the latest record. Absent
/// optionals are written as empty strings so stale fields get overwritten.
fn latest_fields(result: &ParsedResult) -> Vec<(String, String)> {
    vec![
        ("inn".into(), result.inn.clone().unwrap_or_default()),
        ("risk".into(), result.risk.to_string()),
        ("risk_ru".into(), result.risk_ru.clone().unwrap_or_default()),
        ("risk_code".into(), result.risk_code.clone().unwrap_or_default()),
        ("reason".into(), result.reason.clone().unwrap_or_default()),
        (
            "checked_on".into(),
            result
                .checked_on
                .map(|d| d.to_string())
                .unwrap_or_default(),
        ),
        ("raw".into(), result.raw.clone()),
        ("updated_at".into(), Utc::now().timestamp().to_string()),
    ]
}
