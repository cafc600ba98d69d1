use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pixel_tracker::{
    config::Config,
    observability::{TrackerStats, init_meter_provider},
    pixel::BeaconPixel,
    services::{
        DedupCache, DedupSweeper, OpenLog, SenderDirectory, TrackingService, notifier_from_config,
    },
    web::{AppState, WebServer},
};

#[derive(Parser)]
#[command(name = "pixel-tracker")]
#[command(version)]
#[command(about = "A web-beacon service that records email opens and notifies the sender")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.log_level == "trace" {
        format!("pixel_tracker={},tower_http=trace", cli.log_level)
    } else {
        format!("pixel_tracker={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pixel tracker v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }

    let _meter_provider = init_meter_provider()?;
    let stats = Arc::new(TrackerStats::from_global());

    let pixel = BeaconPixel::load_or_create(&config.storage.pixel_file).await?;
    info!("Beacon pixel ready: {}", config.storage.pixel_file.display());

    let dedup = Arc::new(DedupCache::new(
        config.tracking.dedup_window,
        config.tracking.max_cache_entries,
    ));
    let open_log = Arc::new(OpenLog::new(config.storage.open_log_file.clone()));
    let directory = SenderDirectory::new(config.storage.senders_file.clone());
    let notifier = notifier_from_config(&config.notifications);
    info!(
        "Open log: {}, sender directory: {}, notifier: {}",
        open_log.path().display(),
        directory.path().display(),
        notifier.name()
    );

    let tracker = TrackingService::new(
        Arc::clone(&dedup),
        Arc::clone(&open_log),
        directory,
        notifier,
        stats,
    );

    let state = AppState {
        tracker,
        open_log,
        pixel,
        log_tail_lines: config.tracking.log_tail_lines,
        request_timeout: config.web.request_timeout,
        start_time: chrono::Utc::now(),
    };

    let web_server = WebServer::new(&config, state)?;
    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );

    let (server_ready_tx, server_ready_rx) = tokio::sync::oneshot::channel();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = web_server.serve_with_signal(server_ready_tx).await {
            tracing::error!("Web server failed: {}", e);
        }
    });

    match server_ready_rx.await {
        Ok(Ok(())) => {
            info!("Web server is now listening, starting background services...");
        }
        Ok(Err(bind_error)) => {
            tracing::error!("Failed to bind web server: {}", bind_error);
            return Err(bind_error);
        }
        Err(_) => {
            tracing::error!("Web server task completed without signaling");
            return Err(anyhow::anyhow!("Web server failed to start"));
        }
    }

    let sweeper = DedupSweeper::new(dedup, config.tracking.sweep_interval);
    tokio::spawn(sweeper.start());

    info!("All services started successfully");

    server_handle.await?;

    Ok(())
}
