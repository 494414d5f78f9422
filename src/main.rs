//! Doorguard - physical access controller for a single door
//!
//! Runs on the door's site hardware: decides credential verifications
//! from the serial panel, drives the strike and buzzer, latches tamper,
//! and publishes records/alarms/status over MQTT.
//!
//! Module structure:
//! - `domain/` - Core business types (users, credentials, outcomes)
//! - `io/` - External interfaces (panel bus, MQTT, users file, audit log)
//! - `services/` - Business logic (controller, lockout, debounce)
//! - `infra/` - Infrastructure (Config, Metrics, Broker)

use clap::Parser;
use doorguard::infra::{Config, Metrics};
use doorguard::io::{
    create_egress_channel, start_command_listener, MqttPublisher, PanelMonitor, UsersStore,
};
use doorguard::services::{create_lock_channel, AccessController, UserRegistry};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Doorguard - door access controller
#[derive(Parser, Debug)]
#[command(name = "doorguard", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("doorguard starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    // Start embedded MQTT broker with config
    doorguard::infra::broker::start_embedded_broker(&config);

    info!(
        config_file = %config.config_file(),
        device_id = %config.device_id(),
        mqtt_host = %config.mqtt_host(),
        mqtt_port = %config.mqtt_port(),
        panel_device = %config.panel_device(),
        max_failed_attempts = %config.max_failed_attempts(),
        lockout_secs = %config.lockout_secs(),
        unlock_duration_ms = %config.unlock_duration_ms(),
        "config_loaded"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let metrics = Arc::new(Metrics::new());

    // Input channel into the controller (bounded for backpressure)
    let (event_tx, event_rx) = mpsc::channel(256);

    // Lock actuator command queue, written out on the panel bus
    let (panel_lock, lock_rx) = create_lock_channel(32);

    // Start the serial panel monitor
    let panel_monitor = PanelMonitor::new(&config, event_tx.clone(), lock_rx);
    let panel_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        panel_monitor.run(panel_shutdown).await;
    });

    // Start the MQTT command listener
    let command_config = config.clone();
    let command_tx = event_tx;
    let command_metrics = metrics.clone();
    let command_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        if let Err(e) =
            start_command_listener(&command_config, command_tx, command_metrics, command_shutdown)
                .await
        {
            tracing::error!(error = %e, "command listener error");
        }
    });

    // MQTT egress channel and publisher
    let (egress_sender, egress_rx) = create_egress_channel(256, config.device_id().to_string());
    let publisher = MqttPublisher::new(&config, egress_rx, egress_sender.clone());
    let publisher_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        publisher.run(publisher_shutdown).await;
    });

    // Periodic metrics summary (lock-free reads)
    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        interval.tick().await; // Skip the immediate first tick
        loop {
            interval.tick().await;
            metrics_clone.report();
        }
    });

    // Load the enrolled-user table
    let users_store = UsersStore::new(config.users_file());
    let registry = match users_store.load() {
        Ok(users) => {
            info!(users = users.len(), file = %config.users_file(), "users_loaded");
            UserRegistry::new(users)
        }
        Err(e) => {
            warn!(error = %e, file = %config.users_file(), "users_load_failed_starting_empty");
            UserRegistry::default()
        }
    };

    let mut controller = AccessController::new(
        config,
        registry,
        Arc::new(panel_lock),
        egress_sender.clone(),
        metrics,
    )
    .with_users_store(users_store);

    // Run the controller until Ctrl+C or the input channel closes
    tokio::select! {
        _ = controller.run(event_rx) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown_signal_received");
        }
    }

    // Queue the offline marker before stopping the publisher so the
    // drain pass flushes it
    if !egress_sender.send_liveness("offline") {
        warn!("offline_liveness_dropped");
    }
    let _ = shutdown_tx.send(true);
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    info!("doorguard shutdown complete");
    Ok(())
}
