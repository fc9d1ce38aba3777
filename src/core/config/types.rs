//! Public configuration types.
//!
//! These are the resolved, ready-to-use structs the worker consumes.
//! Raw TOML deserialization types live in `raw.rs`.

use std::time::Duration;

// ── Partner ──────────────────────────────────────────────────────────────────

/// Remote partner (the risk responder) configuration.
#[derive(Debug, Clone)]
pub struct PartnerConfig {
    /// Numeric chat id of the responder.
    pub chat_id: i64,
    /// Handshake command that primes the responder.
    pub handshake: String,
    /// Minimum interval between handshakes.
    pub handshake_cooldown: Duration,
}

// ── Collector ────────────────────────────────────────────────────────────────

/// Reply collection windows.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Maximum total wait before declaring no response.
    pub hard_timeout: Duration,
    /// Inbound silence after the last message that marks an answer complete.
    pub idle_window: Duration,
}

// ── Queue / cache ────────────────────────────────────────────────────────────

/// Job queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis list the jobs are popped from.
    pub key: String,
    /// Blocking-pop timeout — keeps the loop responsive to shutdown.
    pub pop_timeout: Duration,
}

/// Result cache and latest-record configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Key prefix for the expiring result cache.
    pub prefix: String,
    /// Key prefix for the always-current latest records.
    pub latest_prefix: String,
    /// Cache entry lifetime.
    pub ttl: Duration,
}

// ── Backoff / notify ─────────────────────────────────────────────────────────

/// Rate-limit backoff configuration.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Added on top of the transport's retry-after before resuming.
    pub grace: Duration,
}

/// Outbound notifier configuration.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Bot API base, e.g. `https://api.telegram.org`.
    pub api_base: String,
}

// ── Config (root) ────────────────────────────────────────────────────────────

/// Fully-resolved worker configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub worker_name: String,
    pub log_level: String,
    pub partner: PartnerConfig,
    pub collector: CollectorConfig,
    pub queue: QueueConfig,
    pub cache: CacheConfig,
    pub backoff: BackoffConfig,
    pub notify: NotifyConfig,
    /// From `REDIS_URL` — never sourced from TOML.
    pub redis_url: String,
    /// From `TELEGRAM_BOT_TOKEN` — never sourced from TOML.
    pub transport_token: Option<String>,
    /// From `BOT_TOKEN`, falling back to the transport token.
    pub notify_token: Option<String>,
}
