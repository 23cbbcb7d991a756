//! Tombola service binary
//!
//! Wires the raffle state machine to the in-process VRF oracle, the keeper
//! and fulfillment tasks, the round history store, and the HTTP API.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tombola::{
    api::{ApiServer, AppState},
    config::ConfigLoader,
    history::RoundStore,
    metrics::MetricsRegistry,
    service::{FulfillmentService, UpkeepService},
    EventBus, MemoryBank, Raffle, RaffleParams, RandomnessGateway, SystemClock, Treasury,
    VrfBeacon, VrfCoordinator,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tombola", about = "Automated, provably fair raffle service")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the API port
    #[arg(long)]
    port: Option<u16>,

    /// Override the data directory for round history
    #[arg(long)]
    data_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tombola=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();
    let mut loader = ConfigLoader::new();
    if let Some(path) = args.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(data_dir) = args.data_dir {
        config.storage.data_dir = data_dir;
    }

    info!(
        entrance_fee = config.raffle.entrance_fee,
        interval_secs = config.raffle.interval_secs,
        oracle = %config.oracle.endpoint,
        "starting tombola"
    );

    let beacon = VrfBeacon::new_random();
    info!("VRF public key: {}", beacon.public_key_hex());
    let (coordinator, request_rx) = VrfCoordinator::new(beacon);

    let bank = Arc::new(MemoryBank::new());
    let events = EventBus::new(256);
    let raffle = Arc::new(Raffle::new(
        RaffleParams {
            entrance_fee: config.raffle.entrance_fee,
            interval_secs: config.raffle.interval_secs,
            callback_gas_limit: config.oracle.callback_gas_limit,
            num_words: config.oracle.num_words,
        },
        Treasury::new(bank),
        Arc::new(SystemClock),
        coordinator.clone() as Arc<dyn RandomnessGateway>,
        events,
    ));

    let rounds = Arc::new(RoundStore::open(&config.storage.data_dir)?);
    let metrics = Arc::new(MetricsRegistry::new());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let keeper = UpkeepService::new(
        raffle.clone(),
        metrics.clone(),
        Duration::from_millis(config.automation.poll_interval_ms),
    );
    tokio::spawn(keeper.run(shutdown_rx.clone()));

    let fulfillment = FulfillmentService::new(
        coordinator.clone(),
        raffle.clone(),
        Some(rounds.clone()),
        metrics.clone(),
        Duration::from_millis(config.oracle.fulfillment_delay_ms),
    );
    tokio::spawn(fulfillment.run(request_rx, shutdown_rx.clone()));

    let state = Arc::new(AppState {
        raffle,
        coordinator,
        rounds: Some(rounds),
        metrics,
        version: env!("CARGO_PKG_VERSION").to_string(),
    });
    let server = ApiServer::new(config.api.clone(), state);
    let server_handle = tokio::spawn(server.run(shutdown_rx));

    shutdown_signal().await;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    let _ = server_handle.await;

    Ok(())
}

/// Wait for ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
