//! ParkQR kiosk daemon - entry-display session lifecycle
//!
//! Keeps one registration session live on the entry display: creates a
//! session, renders its QR (as a registration URL handed to the backend's
//! QR service), polls for completion, shows a confirmation, and cycles to
//! the next session.
//!
//! Module structure:
//! - `domain/` - Core business types (sessions, tickets, plates)
//! - `io/` - Backend API client
//! - `services/` - Kiosk controller and registrant flow
//! - `infra/` - Infrastructure (Config, Metrics)

use clap::Parser;
use parkqr_kiosk::infra::{Config, Metrics};
use parkqr_kiosk::io::HttpBackend;
use parkqr_kiosk::services::kiosk::{DisplayState, KioskController};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// ParkQR kiosk - unattended entry-display controller
#[derive(Parser, Debug)]
#[command(name = "parkqr-kiosk", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for per-poll visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("parkqr-kiosk starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        api_base_url = %config.api_base_url(),
        public_origin = %config.public_origin(),
        poll_interval_ms = %config.poll_interval().as_millis(),
        confirm_dwell_ms = %config.confirm_dwell().as_millis(),
        "config_loaded"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let backend = Arc::new(HttpBackend::new(config.api_base_url(), config.api_timeout())?);
    let metrics = Arc::new(Metrics::new());

    let (controller, mut frame_rx, retry) =
        KioskController::new(backend, config.clone(), metrics.clone());

    // Render display frames to the log; the kiosk is unattended, so the
    // error state's retry affordance is wired to a timer instead of a
    // button.
    let error_retry = config.error_retry();
    tokio::spawn(async move {
        loop {
            {
                let frame = frame_rx.borrow_and_update().clone();
                match frame.state {
                    DisplayState::ShowingQr => {
                        info!(
                            state = frame.state.as_str(),
                            register_url = frame.register_url.as_deref().unwrap_or(""),
                            "display"
                        );
                    }
                    DisplayState::Confirming => {
                        if let Some(ticket) = &frame.completed {
                            info!(
                                state = frame.state.as_str(),
                                plate_number = %ticket.plate_number,
                                vehicle = %format!("{} {}", ticket.vehicle_type.icon(), ticket.vehicle_type.label()),
                                "display"
                            );
                        }
                    }
                    DisplayState::Error => {
                        error!(
                            state = frame.state.as_str(),
                            message = frame.message.as_deref().unwrap_or(""),
                            retry_in_ms = %error_retry.as_millis(),
                            "display"
                        );
                        tokio::time::sleep(error_retry).await;
                        retry.retry();
                    }
                    _ => {
                        info!(state = frame.state.as_str(), "display");
                    }
                }
            }
            if frame_rx.changed().await.is_err() {
                break;
            }
        }
    });

    // Periodic metrics reporter
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Handle shutdown on Ctrl+C
    let shutdown_signal = shutdown_tx;
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_signal.send(true);
    });

    // Run the controller until shutdown
    controller.run(shutdown_rx).await;

    metrics.report().log();
    info!("parkqr-kiosk shutdown complete");
    Ok(())
}
