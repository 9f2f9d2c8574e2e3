use anyhow::Context;
use clap::Parser;
use fantasy_rankings::api::{start_api_server, AppState, Presenter};
use fantasy_rankings::cli::{format_rankings, Cli, Commands};
use fantasy_rankings::config::{AppConfig, LoggingConfig};
use fantasy_rankings::error::{RankingsError, Result};
use fantasy_rankings::scrape::HttpFetcher;
use fantasy_rankings::services::{Aggregator, RefreshSchedule, Refresher, Scheduler};
use fantasy_rankings::SnapshotCache;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("config: {e}");
        }
        anyhow::bail!("invalid configuration ({} problems)", errors.len());
    }

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            init_logging(&config.logging);
            run_server(config, port).await.context("server failed")?;
        }
        Commands::Refresh => {
            init_logging_simple();
            run_single_refresh(config)
                .await
                .context("one-shot refresh failed")?;
        }
    }

    Ok(())
}

fn build_refresher(config: &AppConfig) -> Result<Arc<Refresher>> {
    let cache = Arc::new(SnapshotCache::from_config(&config.cache)?);
    let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
    let aggregator = Aggregator::new(config, fetcher)?;
    Ok(Arc::new(Refresher::new(aggregator, cache)))
}

async fn run_server(config: AppConfig, port: Option<u16>) -> Result<()> {
    let refresher = build_refresher(&config)?;

    match refresher.cache().restore_fallback() {
        Ok(true) => info!("Serving restored snapshot until the first refresh completes"),
        Ok(false) => {}
        Err(e) => warn!("Could not restore fallback snapshot: {}", e),
    }

    let schedule = RefreshSchedule::from_config(&config.schedule)?;
    let scheduler = Scheduler::new(Arc::clone(&refresher), schedule).spawn();

    let state = AppState::new(refresher, Presenter::new(&config.display)?);
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", config.server.host, port)
        .parse()
        .map_err(|e| RankingsError::InvalidConfig(format!("bad listen address: {e}")))?;

    let served = start_api_server(state, addr, shutdown_signal()).await;
    if let Err(e) = &served {
        error!("Server error: {}", e);
    }

    scheduler.stop().await;
    info!("Shutdown complete");
    served
}

async fn run_single_refresh(config: AppConfig) -> Result<()> {
    let refresher = build_refresher(&config)?;
    let snapshot = refresher.refresh().await?;
    print!("{}", format_rankings(&snapshot));
    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},fantasy_rankings=debug,tower_http=info",
            config.level
        ))
    });

    let log_dir = std::env::var("RANKINGS_LOG_DIR")
        .ok()
        .or_else(|| config.dir.clone());

    // rolling::daily panics if it cannot create its first file, so check writability first
    let file_layer = log_dir.and_then(|dir| {
        let probe = std::path::Path::new(&dir).join(".rankings_write_test");
        let writable = std::fs::create_dir_all(&dir).is_ok()
            && std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&probe)
                .is_ok();
        if !writable {
            eprintln!("Warning: log directory {dir} is not writable, file logging disabled");
            return None;
        }
        let _ = std::fs::remove_file(&probe);

        let file_appender = tracing_appender::rolling::daily(&dir, "fantasy-rankings.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // The guard flushes on drop; keep it for the life of the process
        Box::leak(Box::new(guard));

        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
    });

    let (json_layer, text_layer) = if config.json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            ),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .init();
}

fn init_logging_simple() {
    // Minimal logging for one-shot commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
