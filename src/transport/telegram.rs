//! Telegram chat transport — teloxide bot scoped to the partner chat.
//!
//! Outbound messages go to the configured partner chat id. A listener task
//! long-polls updates, filters them to that chat, and broadcasts the text to
//! whichever collection call is currently subscribed.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use teloxide::RequestError;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ChatTransport, InboundMessage};
use crate::core::error::AppError;

/// Broadcast depth — ample for the 1–3 messages one query produces.
const INBOUND_BUFFER: usize = 64;

// ── TelegramTransport ────────────────────────────────────────────────────────

pub struct TelegramTransport {
    bot: Bot,
    partner: ChatId,
    inbound: broadcast::Sender<InboundMessage>,
}

impl TelegramTransport {
    /// `partner_chat_id` must be a real chat id; 0 means unconfigured.
    pub fn new(bot: Bot, partner_chat_id: i64) -> Result<Self, AppError> {
        if partner_chat_id == 0 {
            return Err(AppError::Config(
                "partner.chat_id must be configured (or set ZSK_PARTNER_CHAT_ID)".into(),
            ));
        }
        let (inbound, _) = broadcast::channel(INBOUND_BUFFER);
        Ok(Self {
            bot,
            partner: ChatId(partner_chat_id),
            inbound,
        })
    }

    /// Spawn the long-polling listener. Runs until `shutdown` is cancelled.
    pub fn spawn_listener(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let bot = self.bot.clone();
        let partner = self.partner;
        let inbound = self.inbound.clone();

        tokio::spawn(async move {
            let handler = Update::filter_message().endpoint(move |msg: Message| {
                let inbound = inbound.clone();
                async move {
                    if msg.chat.id == partner {
                        if let Some(text) = msg.text() {
                            debug!(len = text.len(), "partner message received");
                            // No subscriber means no collection in flight — dropped.
                            let _ = inbound.send(InboundMessage {
                                text: text.to_string(),
                                received_at: Instant::now(),
                            });
                        }
                    }
                    respond(())
                }
            });

            let mut dispatcher = Dispatcher::builder(bot, handler).build();

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("shutdown signal received — closing telegram listener");
                }
                _ = dispatcher.dispatch() => {
                    warn!("telegram dispatcher exited unexpectedly");
                }
            }
        })
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, text: &str) -> Result<(), AppError> {
        self.bot
            .send_message(self.partner, text)
            .await
            .map(|_| ())
            .map_err(map_request_error)
    }

    fn subscribe(&self) -> broadcast::Receiver<InboundMessage> {
        self.inbound.subscribe()
    }
}

fn map_request_error(e: RequestError) -> AppError {
    match e {
        RequestError::RetryAfter(secs) => AppError::RateLimited {
            retry_after: secs.duration(),
        },
        other => AppError::Transport(other.to_string()),
    }
}
