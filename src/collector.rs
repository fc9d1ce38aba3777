//! Response collector — correlates inbound chat events with one outstanding
//! query.
//!
//! Each call owns its correlation context: the subscription receiver, the
//! query text, and a correlation id for the log trail. Completion is decided
//! by an idle window that resets on every arrival; a hard deadline bounds the
//! total wait. Subscriptions never outlive the call, so sequential queries
//! cannot see each other's messages.

use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::core::config::CollectorConfig;
use crate::core::error::AppError;
use crate::transport::{ChatTransport, InboundMessage};

// ── CollectedReply ───────────────────────────────────────────────────────────

/// Raw messages gathered during one collection window, in arrival order.
#[derive(Debug, Clone)]
pub struct CollectedReply {
    pub messages: Vec<InboundMessage>,
}

impl CollectedReply {
    /// Newline-joined text in arrival order — the rendering the parser sees.
    pub fn joined_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ── CollectContext ───────────────────────────────────────────────────────────

/// Owned per-call correlation context.
#[derive(Debug, Clone)]
pub struct CollectContext {
    /// Identifier being queried — also the outbound message text.
    pub inn: String,
    /// Ties the log lines of one collection together.
    pub correlation: Uuid,
    pub hard_timeout: Duration,
    pub idle_window: Duration,
}

impl CollectContext {
    pub fn new(inn: impl Into<String>, cfg: &CollectorConfig) -> Self {
        Self {
            inn: inn.into(),
            correlation: Uuid::new_v4(),
            hard_timeout: cfg.hard_timeout,
            idle_window: cfg.idle_window,
        }
    }
}

// ── collect ──────────────────────────────────────────────────────────────────

/// Send the query and gather the partner's answer.
///
/// Fails with [`AppError::NoResponse`] when the hard deadline elapses with
/// zero messages, and passes [`AppError::RateLimited`] through from the send.
/// When the hard deadline elapses with messages already in hand the
/// collection completes with them — the idle rule governs whenever at least
/// one message exists.
pub async fn collect(
    ctx: CollectContext,
    transport: &dyn ChatTransport,
) -> Result<CollectedReply, AppError> {
    // Subscribe before sending so an instant reply cannot be missed. The
    // receiver is dropped on every exit path below.
    let mut rx = transport.subscribe();

    transport.send_text(&ctx.inn).await?;
    let sent_at = Instant::now();
    debug!(inn = %ctx.inn, correlation = %ctx.correlation, "query sent");

    let hard_deadline = sent_at + ctx.hard_timeout;
    let mut messages: Vec<InboundMessage> = Vec::new();
    let mut last_arrival: Option<Instant> = None;

    loop {
        // The idle rule arms on the first arrival.
        let idle_at = last_arrival.map(|at| at + ctx.idle_window);
        let idle_expiry = async move {
            match idle_at {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;

            _ = sleep_until(hard_deadline) => {
                if messages.is_empty() {
                    warn!(inn = %ctx.inn, correlation = %ctx.correlation, "hard deadline with no response");
                    return Err(AppError::NoResponse);
                }
                break;
            }

            recv = rx.recv() => {
                match recv {
                    Ok(msg) => {
                        last_arrival = Some(Instant::now());
                        trace!(
                            inn = %ctx.inn,
                            correlation = %ctx.correlation,
                            n = messages.len() + 1,
                            "inbound message"
                        );
                        messages.push(msg);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // Arrival order of the retained tail is intact.
                        warn!(inn = %ctx.inn, skipped, "inbound subscription lagged");
                    }
                    Err(RecvError::Closed) => {
                        return Err(AppError::Transport("inbound channel closed".into()));
                    }
                }
            }

            _ = idle_expiry => {
                debug!(
                    inn = %ctx.inn,
                    correlation = %ctx.correlation,
                    n = messages.len(),
                    "idle window elapsed — answer complete"
                );
                break;
            }
        }
    }

    Ok(CollectedReply { messages })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::broadcast;

    /// Scripted partner: replies to each send after fixed per-message delays.
    struct MockPartner {
        inbound: broadcast::Sender<InboundMessage>,
        replies: Vec<(u64, &'static str)>,
        rate_limit: Option<Duration>,
        sent: Mutex<Vec<String>>,
    }

    impl MockPartner {
        fn new(replies: Vec<(u64, &'static str)>) -> Self {
            let (inbound, _) = broadcast::channel(16);
            Self {
                inbound,
                replies,
                rate_limit: None,
                sent: Mutex::new(Vec::new()),
            }
        }

        fn rate_limited(retry_after: Duration) -> Self {
            let mut p = Self::new(Vec::new());
            p.rate_limit = Some(retry_after);
            p
        }
    }

    #[async_trait]
    impl ChatTransport for MockPartner {
        async fn send_text(&self, text: &str) -> Result<(), AppError> {
            if let Some(retry_after) = self.rate_limit {
                return Err(AppError::RateLimited { retry_after });
            }
            self.sent.lock().unwrap().push(text.to_string());
            for (delay, reply) in self.replies.clone() {
                let tx = self.inbound.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    let _ = tx.send(InboundMessage {
                        text: reply.to_string(),
                        received_at: Instant::now(),
                    });
                });
            }
            Ok(())
        }

        fn subscribe(&self) -> broadcast::Receiver<InboundMessage> {
            self.inbound.subscribe()
        }
    }

    fn ctx(hard: u64, idle: u64) -> CollectContext {
        CollectContext {
            inn: "7712345678".into(),
            correlation: Uuid::new_v4(),
            hard_timeout: Duration::from_secs(hard),
            idle_window: Duration::from_secs(idle),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completes_after_idle_window() {
        // Messages at t=0 and t=2, then silence: completion at ≈ 2 + 5.
        let partner = MockPartner::new(vec![(0, "part one"), (2, "part two")]);
        let start = Instant::now();

        let reply = collect(ctx(60, 5), &partner).await.unwrap();

        let elapsed = start.elapsed();
        assert_eq!(reply.messages.len(), 2);
        assert_eq!(reply.joined_text(), "part one\npart two");
        assert!(
            elapsed >= Duration::from_secs(6) && elapsed <= Duration::from_secs(8),
            "expected ≈7s, got {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn single_message_completes_at_idle() {
        let partner = MockPartner::new(vec![(0, "done")]);
        let start = Instant::now();

        let reply = collect(ctx(60, 5), &partner).await.unwrap();

        assert_eq!(reply.messages.len(), 1);
        assert!(start.elapsed() < Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn no_response_at_hard_deadline() {
        let partner = MockPartner::new(Vec::new());
        let start = Instant::now();

        let err = collect(ctx(60, 5), &partner).await.unwrap_err();

        assert!(matches!(err, AppError::NoResponse));
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(61),
            "expected ≈60s, got {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_send_propagates() {
        let partner = MockPartner::rate_limited(Duration::from_secs(30));
        let start = Instant::now();

        let err = collect(ctx(60, 5), &partner).await.unwrap_err();

        match err {
            AppError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(30));
            }
            other => panic!("expected RateLimited, got {other}"),
        }
        // Failed before any waiting.
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(partner.sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hard_deadline_with_messages_completes() {
        // Partner keeps talking every 3s — the idle window (5s) never
        // elapses, so the hard deadline caps the total wait.
        let replies: Vec<(u64, &'static str)> = (0..25).map(|i| (i * 3, "more")).collect();
        let partner = MockPartner::new(replies);
        let start = Instant::now();

        let reply = collect(ctx(60, 5), &partner).await.unwrap();

        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(61),
            "expected ≈60s, got {elapsed:?}"
        );
        assert!(reply.messages.len() >= 15, "got {}", reply.messages.len());
    }

    #[tokio::test(start_paused = true)]
    async fn stray_messages_before_call_are_not_collected() {
        // A broadcast with no live subscription is dropped: the next call
        // must start from a clean slate.
        let partner = MockPartner::new(Vec::new());
        let _ = partner.inbound.send(InboundMessage {
            text: "stale".into(),
            received_at: Instant::now(),
        });

        let err = collect(ctx(60, 5), &partner).await.unwrap_err();
        assert!(matches!(err, AppError::NoResponse));
    }

    #[tokio::test(start_paused = true)]
    async fn sends_the_identifier_as_query() {
        let partner = MockPartner::new(vec![(0, "ok")]);
        collect(ctx(60, 5), &partner).await.unwrap();
        assert_eq!(*partner.sent.lock().unwrap(), vec!["7712345678".to_string()]);
    }
}
