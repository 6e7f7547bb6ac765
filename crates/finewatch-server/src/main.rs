mod config;

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use finewatch_db::Database;
use finewatch_monitor::PollLoop;
use finewatch_telegram::TelegramNotifier;
use finewatch_wb::WbClient;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "finewatch=info,finewatch_monitor=info,finewatch_db=info,finewatch_wb=info,finewatch_telegram=info"
                    .into()
            }),
        )
        .init();

    // Config
    let config = Config::from_env()?;
    config.log_summary();

    // Init database
    let db = Arc::new(
        Database::open(&config.db_path)
            .with_context(|| format!("opening database at {}", config.db_path.display()))?,
    );

    // Collaborators
    let source = Arc::new(WbClient::new(
        config.mode,
        &config.api_url,
        config.api_key.as_deref(),
        config.fetch_timeout,
    )?);
    let notifier = Arc::new(TelegramNotifier::new(config.telegram())?);

    let poller = Arc::new(PollLoop::new(db, source, notifier, config.poll()));

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    info!("Press Ctrl+C to stop");
    poller.run_checked(shutdown).await?;

    info!("Bot stopped");
    Ok(())
}

/// Cancel `token` on Ctrl+C or SIGTERM. The loop notices at its next
/// sleep boundary.
async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!(error = %e, "Could not install SIGTERM handler, Ctrl+C only");
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
    token.cancel();
}
