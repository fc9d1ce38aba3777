//! Raw TOML deserialization types.
//!
//! These structs mirror the TOML file shape and use `serde` defaults.
//! The `load` module converts them into the public `types` structs.

use serde::Deserialize;

// ── Top-level ────────────────────────────────────────────────────────────────

/// Raw TOML shape — serde target before resolution.
#[derive(Deserialize)]
pub(super) struct RawConfig {
    pub worker: RawWorker,
    #[serde(default)]
    pub partner: RawPartner,
    #[serde(default)]
    pub collector: RawCollector,
    #[serde(default)]
    pub queue: RawQueue,
    #[serde(default)]
    pub cache: RawCache,
    #[serde(default)]
    pub backoff: RawBackoff,
    #[serde(default)]
    pub notify: RawNotify,
}

#[derive(Deserialize)]
pub(super) struct RawWorker {
    pub name: String,
    pub log_level: String,
}

// ── Partner ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawPartner {
    /// 0 means "not configured" — the transport refuses to start on it.
    #[serde(default)]
    pub chat_id: i64,
    #[serde(default = "default_handshake")]
    pub handshake: String,
    #[serde(default = "default_handshake_cooldown_secs")]
    pub handshake_cooldown_secs: u64,
}

impl Default for RawPartner {
    fn default() -> Self {
        Self {
            chat_id: 0,
            handshake: default_handshake(),
            handshake_cooldown_secs: default_handshake_cooldown_secs(),
        }
    }
}

// ── Collector ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawCollector {
    #[serde(default = "default_hard_timeout_secs")]
    pub hard_timeout_secs: u64,
    #[serde(default = "default_idle_window_secs")]
    pub idle_window_secs: u64,
}

impl Default for RawCollector {
    fn default() -> Self {
        Self {
            hard_timeout_secs: default_hard_timeout_secs(),
            idle_window_secs: default_idle_window_secs(),
        }
    }
}

// ── Queue / cache ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawQueue {
    #[serde(default = "default_queue_key")]
    pub key: String,
    #[serde(default = "default_pop_timeout_secs")]
    pub pop_timeout_secs: u64,
}

impl Default for RawQueue {
    fn default() -> Self {
        Self {
            key: default_queue_key(),
            pop_timeout_secs: default_pop_timeout_secs(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawCache {
    #[serde(default = "default_cache_prefix")]
    pub prefix: String,
    #[serde(default = "default_latest_prefix")]
    pub latest_prefix: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for RawCache {
    fn default() -> Self {
        Self {
            prefix: default_cache_prefix(),
            latest_prefix: default_latest_prefix(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

// ── Backoff / notify ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawBackoff {
    #[serde(default = "default_backoff_grace_secs")]
    pub grace_secs: u64,
}

impl Default for RawBackoff {
    fn default() -> Self {
        Self {
            grace_secs: default_backoff_grace_secs(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawNotify {
    #[serde(default = "default_notify_api_base")]
    pub api_base: String,
}

impl Default for RawNotify {
    fn default() -> Self {
        Self {
            api_base: default_notify_api_base(),
        }
    }
}

// ── Default functions (used by serde) ────────────────────────────────────────

pub(super) fn default_handshake() -> String {
    "/start".to_string()
}
pub(super) fn default_handshake_cooldown_secs() -> u64 {
    20 * 60
}
pub(super) fn default_hard_timeout_secs() -> u64 {
    60
}
pub(super) fn default_idle_window_secs() -> u64 {
    5
}
pub(super) fn default_queue_key() -> String {
    "zsk:queue".to_string()
}
pub(super) fn default_pop_timeout_secs() -> u64 {
    5
}
pub(super) fn default_cache_prefix() -> String {
    "zsk:cache".to_string()
}
pub(super) fn default_latest_prefix() -> String {
    "zsk:latest".to_string()
}
pub(super) fn default_cache_ttl_secs() -> u64 {
    86_400
}
pub(super) fn default_backoff_grace_secs() -> u64 {
    5
}
pub(super) fn default_notify_api_base() -> String {
    "https://api.telegram.org".to_string()
}
pub(super) fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}
