mod cli;
mod commands;

use clap::Parser;
use esync_config::fatal_config;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

/// Listens for SIGTERM/SIGINT and cancels `cancel` on the first one seen.
/// The sync loop reacts by taking one best-effort final checkpoint and
/// returning; this task never forces the process down itself.
fn install_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(term) => term,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to install SIGTERM handler");
                    let _ = ctrl_c.await;
                    cancel.cancel();
                    return;
                }
            };
            tokio::select! {
                _ = term.recv() => tracing::warn!("received SIGTERM, requesting cancellation"),
                _ = ctrl_c => tracing::warn!("received SIGINT, requesting cancellation"),
            }
            cancel.cancel();
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            tracing::warn!("received ctrl-c, requesting cancellation");
            cancel.cancel();
        }
    });
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = esync_config::AppConfig::from_env().unwrap_or_else(|e| fatal_config(e));

    let cancel = CancellationToken::new();
    install_signal_handler(cancel.clone());

    let result = match cli.command {
        Command::Serve => commands::serve(config).await,
        Command::Sync { uuid, drive_url, use_embed_v4 } => {
            commands::sync(config, uuid, drive_url, use_embed_v4, cancel.clone()).await
        }
    };

    if let Err(e) = result {
        tracing::error!(error = ?e, "esyncd exited with an error");
        std::process::exit(1);
    }

    if cancel.is_cancelled() {
        tracing::warn!("exiting after cancellation signal");
        std::process::exit(1);
    }
}
