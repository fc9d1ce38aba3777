//! Outbound notifier — best-effort result relay to the caller.
//!
//! Deliberately independent of the chat transport: a plain Bot API
//! `sendMessage` POST, so a throttled or broken partner session cannot take
//! the notification path down with it. Failures are surfaced as errors here
//! and downgraded to warnings by the dispatch loop.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::core::error::AppError;

/// Outbound "send text to a caller" capability.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), AppError>;
}

// ── Bot API implementation ───────────────────────────────────────────────────

pub struct BotApiNotifier {
    http: reqwest::Client,
    endpoint: String,
}

impl BotApiNotifier {
    pub fn new(api_base: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/bot{token}/sendMessage", api_base.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl Notifier for BotApiNotifier {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), AppError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .map_err(|e| AppError::Notify(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AppError::Notify(format!(
                "sendMessage returned {}",
                resp.status()
            )));
        }
        debug!(chat_id, "notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_shape() {
        let n = BotApiNotifier::new("https://api.telegram.org/", "123:abc");
        assert_eq!(n.endpoint, "https://api.telegram.org/bot123:abc/sendMessage");
    }
}
