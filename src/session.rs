//! Conversation session — keeps the remote partner primed.
//!
//! The responder only answers after a `/start` style handshake. The session
//! owns the last-handshake timestamp and resends the handshake at most once
//! per cooldown window. A failed handshake never aborts the caller — the
//! query is attempted regardless, since the responder may still answer
//! without re-priming.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::core::config::PartnerConfig;
use crate::transport::ChatTransport;

/// Pause after a successful handshake so the responder can settle.
const SETTLE_DELAY: Duration = Duration::from_secs(1);

pub struct ConversationSession {
    handshake: String,
    cooldown: Duration,
    last_handshake: Mutex<Option<Instant>>,
}

impl ConversationSession {
    pub fn new(partner: &PartnerConfig) -> Self {
        Self {
            handshake: partner.handshake.clone(),
            cooldown: partner.handshake_cooldown,
            last_handshake: Mutex::new(None),
        }
    }

    /// Send the handshake if the cooldown has elapsed; otherwise no-op.
    ///
    /// The timestamp is updated only on a successful send, so a failed
    /// handshake is retried on the next call rather than waiting out a
    /// cooldown it never earned.
    pub async fn ensure_primed(&self, transport: &dyn ChatTransport) {
        let mut last = self.last_handshake.lock().await;
        let due = match *last {
            Some(at) => at.elapsed() > self.cooldown,
            None => true,
        };
        if !due {
            debug!("handshake cooldown active — skipping");
            return;
        }

        match transport.send_text(&self.handshake).await {
            Ok(()) => {
                *last = Some(Instant::now());
                drop(last);
                info!(handshake = %self.handshake, "partner primed");
                tokio::time::sleep(SETTLE_DELAY).await;
            }
            Err(e) => {
                warn!(error = %e, "handshake failed — querying anyway");
            }
        }
    }
}
