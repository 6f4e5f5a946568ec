//! review-watch - relays homework review status changes to Telegram.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use notify::{Notifier, NotifyChannel, TelegramChannel};
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use review_watch::{Config, ReviewClient, StatusCatalog, Watcher};

/// Watch a homework review and message a Telegram chat when its status changes.
#[derive(Parser)]
#[command(name = "review-watch")]
#[command(version)]
struct Cli {
    /// Run a single poll cycle and exit (for CronJob use)
    #[arg(long)]
    once: bool,

    /// Log messages instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Initial cursor as a unix timestamp (defaults to now)
    #[arg(long)]
    from_date: Option<i64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Also append logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_tracing(cli: &Cli) -> Result<Option<WorkerGuard>> {
    let default_filter = if cli.verbose {
        "review_watch=debug,notify=debug,info"
    } else {
        "review_watch=info,notify=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (file_layer, guard) = match &cli.log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file path {} has no file name", path.display()))?;
            let dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    if cli.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let dotenv = dotenvy::dotenv();

    // Dropping the guard flushes buffered file logs.
    let _log_guard = init_tracing(&cli)?;

    if let Ok(path) = &dotenv {
        debug!(path = %path.display(), "Loaded environment file");
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Refusing to start without required configuration");
            return Err(e.into());
        }
    };

    let client = ReviewClient::new(&config.endpoint, &config.practicum_token)
        .context("Failed to create review API client")?;

    let notifier = if cli.dry_run {
        info!("Dry run: messages will be logged, not sent");
        Notifier::disabled()
    } else {
        let telegram: Arc<dyn NotifyChannel> = Arc::new(
            TelegramChannel::new(config.telegram_token.clone())
                .with_api_base(&config.telegram_api_url),
        );
        Notifier::with_channels(vec![telegram], config.telegram_chat_id.clone())
    };

    if !cli.dry_run && !notifier.has_channels() {
        warn!("No notification channel is enabled, status changes will only be logged");
    }

    let cursor = cli.from_date.unwrap_or_else(|| Utc::now().timestamp());

    info!(
        endpoint = %client.endpoint(),
        chat_id = %config.telegram_chat_id,
        cursor,
        "review-watch configured"
    );

    let mut watcher = Watcher::new(client, notifier, StatusCatalog::default(), cursor);

    if cli.once {
        let report = watcher.run_cycle().await?;
        info!(
            cursor = report.cursor,
            sent = report.sent,
            failures = report.failures.len(),
            "Single cycle finished"
        );
        return Ok(());
    }

    watcher.run().await;
    Ok(())
}
