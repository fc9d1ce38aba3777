//! Configuration loading with env-var overrides.
//!
//! Reads TOML files, supports `[meta] base = "..."` inheritance chains,
//! and applies `ZSK_LOG_LEVEL` / `ZSK_PARTNER_CHAT_ID` env overrides.
//! Secrets (`REDIS_URL`, `TELEGRAM_BOT_TOKEN`, `BOT_TOKEN`) come from the
//! environment only, never from TOML.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::core::error::AppError;

use super::raw::{self, RawConfig};
use super::types::*;

/// Deep-merge two TOML values.
/// Tables are merged recursively — the overlay only needs to specify keys that
/// differ from the base. For every other type (string, integer, array, …)
/// the overlay value replaces the base value wholesale.
fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_tbl), toml::Value::Table(overlay_tbl)) => {
            for (key, ov_val) in overlay_tbl {
                let merged = match base_tbl.remove(&key) {
                    Some(base_val) => merge_toml(base_val, ov_val),
                    None => ov_val,
                };
                base_tbl.insert(key, merged);
            }
            toml::Value::Table(base_tbl)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file, follow any `[meta] base = "..."` chain, and return the
/// fully merged `toml::Value`. `visited` carries canonicalized paths already
/// seen in this chain so circular references are caught early.
fn load_raw_merged(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<toml::Value, AppError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical) {
        return Err(AppError::Config(format!(
            "circular base reference detected at: {}",
            path.display()
        )));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let overlay_val: toml::Value = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    if let Some(base_str) = overlay_val
        .get("meta")
        .and_then(|m| m.get("base"))
        .and_then(|b| b.as_str())
    {
        let base_path = if Path::new(base_str).is_absolute() {
            PathBuf::from(base_str)
        } else {
            path.parent().unwrap_or(Path::new(".")).join(base_str)
        };
        let base_val = load_raw_merged(&base_path, visited)?;
        Ok(merge_toml(base_val, overlay_val))
    } else {
        Ok(overlay_val)
    }
}

/// Load config from the given path, or `config/default.toml`, then apply
/// env-var overrides. If no path is given and `config/default.toml` does not
/// exist, returns a hardcoded minimal default.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let log_level_override = env::var("ZSK_LOG_LEVEL").ok();
    let chat_id_override = env::var("ZSK_PARTNER_CHAT_ID")
        .ok()
        .map(|v| {
            v.parse::<i64>().map_err(|e| {
                AppError::Config(format!("ZSK_PARTNER_CHAT_ID is not a number: {e}"))
            })
        })
        .transpose()?;

    if let Some(path) = config_path {
        return load_from(Path::new(path), log_level_override.as_deref(), chat_id_override);
    }

    let default_path = Path::new("config/default.toml");
    if default_path.exists() {
        load_from(default_path, log_level_override.as_deref(), chat_id_override)
    } else {
        // Hardcoded minimal default
        Ok(Config {
            worker_name: "zsk-worker".to_string(),
            log_level: log_level_override.unwrap_or_else(|| "info".to_string()),
            partner: PartnerConfig {
                chat_id: chat_id_override.unwrap_or(0),
                handshake: raw::default_handshake(),
                handshake_cooldown: Duration::from_secs(raw::default_handshake_cooldown_secs()),
            },
            collector: CollectorConfig {
                hard_timeout: Duration::from_secs(raw::default_hard_timeout_secs()),
                idle_window: Duration::from_secs(raw::default_idle_window_secs()),
            },
            queue: QueueConfig {
                key: raw::default_queue_key(),
                pop_timeout: Duration::from_secs(raw::default_pop_timeout_secs()),
            },
            cache: CacheConfig {
                prefix: raw::default_cache_prefix(),
                latest_prefix: raw::default_latest_prefix(),
                ttl: Duration::from_secs(raw::default_cache_ttl_secs()),
            },
            backoff: BackoffConfig {
                grace: Duration::from_secs(raw::default_backoff_grace_secs()),
            },
            notify: NotifyConfig {
                api_base: raw::default_notify_api_base(),
            },
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| raw::default_redis_url()),
            transport_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            notify_token: env::var("BOT_TOKEN")
                .ok()
                .or_else(|| env::var("TELEGRAM_BOT_TOKEN").ok()),
        })
    }
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
/// Follows `[meta] base = "..."` inheritance chains before resolving.
pub fn load_from(
    path: &Path,
    log_level_override: Option<&str>,
    chat_id_override: Option<i64>,
) -> Result<Config, AppError> {
    let merged_val = load_raw_merged(path, &mut HashSet::new())?;

    let parsed: RawConfig = Deserialize::deserialize(merged_val).map_err(|e: toml::de::Error| {
        AppError::Config(format!("config error in {}: {e}", path.display()))
    })?;

    let log_level = log_level_override.unwrap_or(&parsed.worker.log_level).to_string();
    let chat_id = chat_id_override.unwrap_or(parsed.partner.chat_id);

    Ok(Config {
        worker_name: parsed.worker.name,
        log_level,
        partner: PartnerConfig {
            chat_id,
            handshake: parsed.partner.handshake,
            handshake_cooldown: Duration::from_secs(parsed.partner.handshake_cooldown_secs),
        },
        collector: CollectorConfig {
            hard_timeout: Duration::from_secs(parsed.collector.hard_timeout_secs),
            idle_window: Duration::from_secs(parsed.collector.idle_window_secs),
        },
        queue: QueueConfig {
            key: parsed.queue.key,
            pop_timeout: Duration::from_secs(parsed.queue.pop_timeout_secs),
        },
        cache: CacheConfig {
            prefix: parsed.cache.prefix,
            latest_prefix: parsed.cache.latest_prefix,
            ttl: Duration::from_secs(parsed.cache.ttl_secs),
        },
        backoff: BackoffConfig {
            grace: Duration::from_secs(parsed.backoff.grace_secs),
        },
        notify: NotifyConfig {
            api_base: parsed.notify.api_base,
        },
        redis_url: env::var("REDIS_URL").unwrap_or_else(|_| raw::default_redis_url()),
        transport_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
        notify_token: env::var("BOT_TOKEN")
            .ok()
            .or_else(|| env::var("TELEGRAM_BOT_TOKEN").ok()),
    })
}
