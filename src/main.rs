//! zsk-worker — queue-driven risk-check worker entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Connect Redis (queue + cache + latest records)
//!   6. Build the Telegram transport and spawn its listener
//!   7. Spawn Ctrl-C → shutdown signal watcher
//!   8. Run the dispatch loop until shutdown

use std::sync::Arc;

use teloxide::Bot;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use zsk_worker::bootstrap::logger;
use zsk_worker::config;
use zsk_worker::error::AppError;
use zsk_worker::notify::{BotApiNotifier, Notifier};
use zsk_worker::session::ConversationSession;
use zsk_worker::store::RedisStore;
use zsk_worker::transport::TelegramTransport;
use zsk_worker::worker::Worker;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    let force_cli_level = args.log_level.is_some();
    logger::init(effective_log_level, force_cli_level)?;

    info!(
        worker = %config.worker_name,
        partner_chat_id = config.partner.chat_id,
        queue = %config.queue.key,
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    let transport_token = config
        .transport_token
        .clone()
        .ok_or_else(|| AppError::Config("TELEGRAM_BOT_TOKEN must be set".into()))?;

    // Shared shutdown token — Ctrl-C cancels it, all tasks watch it.
    let shutdown = CancellationToken::new();

    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    let transport = Arc::new(TelegramTransport::new(
        Bot::new(transport_token),
        config.partner.chat_id,
    )?);
    let listener = transport.spawn_listener(shutdown.clone());

    let store = Arc::new(
        RedisStore::connect(&config.redis_url, config.queue.clone(), config.cache.clone()).await?,
    );
    info!(redis = %config.redis_url, "store connected");

    let notifier: Option<Arc<dyn Notifier>> = config
        .notify_token
        .as_deref()
        .map(|token| Arc::new(BotApiNotifier::new(&config.notify.api_base, token)) as Arc<dyn Notifier>);
    if notifier.is_none() {
        warn!("no notifier token configured — results will not be relayed to callers");
    }

    let session = ConversationSession::new(&config.partner);

    let worker = Worker::new(
        transport.clone(),
        store.clone(),
        store,
        notifier,
        session,
        config,
        shutdown.clone(),
    );

    let result = worker.run().await;

    // Worker exited (shutdown or fatal) — stop the listener too.
    shutdown.cancel();
    listener.await.ok();

    result
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: zsk-worker [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    // Each -v raises verbosity one tier from the config default:
    //   -v      → warn   (suppress info noise, show warnings+errors only)
    //   -vv     → info   (normal operational output — the typical default)
    //   -vvv    → debug  (flow-level diagnostics: cache hits, drops)
    //   -vvvv+  → trace  (per-message dumps, very verbose)
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs {
        log_level,
        config_path,
    }
}
