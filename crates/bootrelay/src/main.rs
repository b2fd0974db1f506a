//! bootrelay daemon
//!
//! Operator front end for a relay board wired to a PC's power and reset
//! switches. Serves an authenticated HTTP API, drives the relay through a
//! kameo actor and mirrors outcomes to an optional webhook.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use color_eyre::Result;
use eyre::WrapErr;
use kameo::actor::Spawn;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use bootrelay_core::{HostActor, HostActorArgs};

mod api;
mod auth;
mod config;
mod confirm;
mod factory;
mod ip;
mod notify;
mod router;
mod state;

use config::Config;
use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "bootrelay", about = "Remote power-control relay daemon")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bootrelay={}", config.daemon.log_level)));

    let console = tracing_subscriber::fmt::layer();

    match &config.daemon.log_file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .wrap_err_with(|| format!("failed to open log file {}", path.display()))?;
            let durable = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file));

            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(durable)
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .init();
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    config.validate().wrap_err("invalid configuration")?;

    init_tracing(&config)?;
    info!(host = %config.host.name, bind = %config.daemon.bind, "bootrelay starting");

    let (power, reset) = factory::build_relay_channels(&config)?;
    let connector = factory::build_connector(&config)?;
    let probe = factory::build_probe(&config);
    let selector = factory::build_selector(&config);
    let reporter = factory::build_reporter(&config);

    let boot_choices = selector.table().os_names();
    let cancel = Arc::new(AtomicBool::new(false));
    let (event_tx, event_rx) = broadcast::channel(64);

    notify::spawn_event_forwarder(event_rx, reporter);

    let host = HostActor::spawn(HostActorArgs {
        name: config.host.name.clone(),
        power,
        reset,
        probe,
        connector,
        selector,
        timing: config.pulse_timing(),
        poll: config.poll_policy(),
        cancel: cancel.clone(),
        event_tx,
    });

    let bind = config.daemon.bind.clone();
    let app_state = AppState::new(host, config, cancel, boot_choices);
    let app = router::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .wrap_err_with(|| format!("failed to bind {bind}"))?;
    info!(addr = %bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("bootrelay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}
