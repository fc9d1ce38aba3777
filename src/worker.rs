//! Job dispatch loop — the single logical worker.
//!
//! Pops one job at a time, resolves it through the cache or a live query,
//! persists the outcome and relays it to the caller. Failures are reported
//! per job and never stop the loop; a transport-wide throttle pauses the
//! whole loop before the next pop.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::collector::{self, CollectContext};
use crate::core::config::Config;
use crate::core::error::AppError;
use crate::jobs::{self, Job};
use crate::notify::Notifier;
use crate::parser::{self, ParsedResult};
use crate::session::ConversationSession;
use crate::store::{JobSource, ResultStore};
use crate::transport::ChatTransport;

// ── Worker ───────────────────────────────────────────────────────────────────

pub struct Worker {
    transport: Arc<dyn ChatTransport>,
    jobs: Arc<dyn JobSource>,
    store: Arc<dyn ResultStore>,
    notifier: Option<Arc<dyn Notifier>>,
    session: ConversationSession,
    config: Config,
    shutdown: CancellationToken,
}

impl Worker {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        jobs: Arc<dyn JobSource>,
        store: Arc<dyn ResultStore>,
        notifier: Option<Arc<dyn Notifier>>,
        session: ConversationSession,
        config: Config,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            transport,
            jobs,
            store,
            notifier,
            session,
            config,
            shutdown,
        }
    }

    /// Run the dispatch loop until the shutdown token is cancelled.
    pub async fn run(self) -> Result<(), AppError> {
        info!(worker = %self.config.worker_name, "worker started");

        loop {
            let payload = tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    info!("shutdown signal received — stopping worker");
                    break;
                }

                popped = self.jobs.pop_job(self.config.queue.pop_timeout) => {
                    match popped {
                        Ok(Some(payload)) => payload,
                        // Empty pop — a no-op iteration, not an error.
                        Ok(None) => continue,
                        Err(e) => {
                            error!(error = %e, "job pop failed");
                            self.pause(Duration::from_secs(1)).await;
                            continue;
                        }
                    }
                }
            };

            let job = match jobs::decode(&payload) {
                Ok(job) => job,
                Err(e) => {
                    debug!(payload = %payload, error = %e, "dropping invalid job");
                    continue;
                }
            };

            match self.process(&job).await {
                Ok(()) => {}
                Err(AppError::RateLimited { retry_after }) => {
                    self.notify_best_effort(
                        job.chat_id,
                        &format!(
                            "Сервис перегружен, запрос по ИНН {} отброшен — повторите позже.",
                            job.inn
                        ),
                    )
                    .await;
                    let pause = retry_after + self.config.backoff.grace;
                    warn!(inn = %job.inn, ?retry_after, ?pause, "transport throttled — pausing the loop");
                    self.pause(pause).await;
                }
                Err(e) => {
                    warn!(inn = %job.inn, error = %e, "job failed");
                    self.notify_best_effort(
                        job.chat_id,
                        &format!("Не удалось получить ответ по ИНН {}.", job.inn),
                    )
                    .await;
                }
            }
        }

        Ok(())
    }

    /// Resolve one job end-to-end: cache path or live query path.
    async fn process(&self, job: &Job) -> Result<(), AppError> {
        if !job.force {
            if let Some(cached) = self.store.cache_get(&job.inn).await? {
                debug!(inn = %job.inn, "cache hit");
                self.store.latest_put(&job.inn, &cached).await?;
                if job.chat_id.is_some() {
                    self.notify_best_effort(job.chat_id, &render_notice(&cached)).await;
                }
                return Ok(());
            }
        }

        self.session.ensure_primed(self.transport.as_ref()).await;

        let ctx = CollectContext::new(job.inn.clone(), &self.config.collector);
        let reply = collector::collect(ctx, self.transport.as_ref()).await?;
        let parsed = parser::parse(&reply.joined_text());

        // The echoed identifier is authoritative for storage; the query inn
        // is the fallback.
        let key = parsed.inn.clone().unwrap_or_else(|| job.inn.clone());
        self.store.cache_put(&key, &parsed).await?;
        self.store.latest_put(&key, &parsed).await?;
        info!(inn = %key, risk = %parsed.risk, "result stored");

        if job.chat_id.is_some() {
            self.notify_best_effort(job.chat_id, &render_notice(&parsed)).await;
        }

        Ok(())
    }

    /// Relay text to the caller when both a notifier and a chat id exist.
    /// Never fails — notification problems are logged and swallowed.
    async fn notify_best_effort(&self, chat_id: Option<i64>, text: &str) {
        let (Some(notifier), Some(chat_id)) = (self.notifier.as_ref(), chat_id) else {
            return;
        };
        if let Err(e) = notifier.send(chat_id, text).await {
            warn!(chat_id, error = %e, "notification failed");
        }
    }

    /// Loop-wide pause that stays responsive to shutdown.
    async fn pause(&self, duration: Duration) {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
    }
}

// ── Notices ──────────────────────────────────────────────────────────────────

/// Human-readable notice relayed to the caller.
pub fn render_notice(result: &ParsedResult) -> String {
    let mut line = match (&result.inn, &result.risk_ru) {
        (Some(inn), Some(label)) => format!("ИНН {inn}: уровень риска — {label}"),
        (Some(inn), None) => format!("ИНН {inn}: уровень риска не определён"),
        (None, Some(label)) => format!("Уровень риска — {label}"),
        (None, None) => "Уровень риска не определён".to_string(),
    };
    if let Some(code) = &result.risk_code {
        line.push_str(&format!(" (код {code})"));
    }
    if let Some(reason) = &result.reason {
        line.push_str(&format!("\nПричина: {reason}"));
    }
    if let Some(date) = &result.checked_on {
        line.push_str(&format!("\nПо состоянию на {}", date.format("%d.%m.%Y")));
    }
    line
}
