//! Chat transport seam — the fixed conversational partner.
//!
//! The worker talks to exactly one remote party. Outbound is a plain text
//! message; inbound is a broadcast of the partner's messages that collection
//! calls subscribe to for the duration of one query.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::core::error::AppError;

pub mod telegram;

pub use telegram::TelegramTransport;

/// One inbound message from the partner.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub text: String,
    pub received_at: Instant,
}

/// Chat transport to the fixed remote partner.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send one outbound text message to the partner.
    ///
    /// A transport-wide throttle surfaces as [`AppError::RateLimited`].
    async fn send_text(&self, text: &str) -> Result<(), AppError>;

    /// Subscribe to the partner's inbound messages.
    ///
    /// The receiver is owned by the caller and scoped to one collection
    /// call; dropping it removes the subscription.
    fn subscribe(&self) -> broadcast::Receiver<InboundMessage>;
}
