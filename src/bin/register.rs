//! Registrant flow tester
//!
//! Exercises the registrant surface end to end against a live backend:
//! validates the scanned session, submits the plate and vehicle type, and
//! prints the resulting ticket.
//!
//! Usage:
//!   cargo run --bin register -- --api http://localhost:4000 \
//!       --url "http://localhost:3000/register?session=<token>" \
//!       --plate abc123 --vehicle car

use clap::Parser;
use parkqr_kiosk::domain::types::{session_token_from_url, VehicleType};
use parkqr_kiosk::infra::Metrics;
use parkqr_kiosk::io::HttpBackend;
use parkqr_kiosk::services::registrant::{RegistrantFlow, RegistrationForm, SessionValidation};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "register", about = "Complete a registration session from the command line")]
struct Args {
    /// Backend API base URL
    #[arg(long, default_value = "http://localhost:4000")]
    api: String,

    /// Scanned registration URL (the QR payload)
    #[arg(long, conflicts_with = "session")]
    url: Option<String>,

    /// Raw session token, as an alternative to --url
    #[arg(long)]
    session: Option<String>,

    /// Plate number (normalized to uppercase before submission)
    #[arg(long)]
    plate: String,

    /// Vehicle type (car|motorcycle|bicycle)
    #[arg(long)]
    vehicle: VehicleType,

    /// Request timeout in milliseconds
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,

    /// Write the ticket's QR data-URL to this file
    #[arg(long)]
    qr_out: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let token = match (&args.url, &args.session) {
        (Some(url), _) => session_token_from_url(url),
        (None, Some(token)) => Some(token.clone()),
        (None, None) => None,
    };

    let backend =
        Arc::new(HttpBackend::new(args.api.as_str(), Duration::from_millis(args.timeout_ms))?);
    let flow = RegistrantFlow::new(backend, Arc::new(Metrics::new()));

    let session = match flow.validate_session(token.as_deref()).await {
        SessionValidation::Valid(session) => session,
        SessionValidation::Invalid { message } => {
            eprintln!("session invalid: {message}");
            eprintln!("scan a new QR code at the entry display");
            std::process::exit(1);
        }
    };
    println!("session {} is valid, expires at {}", session.session_token, session.expires_at);

    let form = RegistrationForm {
        plate_number: args.plate.clone(),
        vehicle_type: Some(args.vehicle),
    };

    let registration = match flow.submit(&session.session_token, &form).await {
        Ok(registration) => registration,
        Err(e) => {
            eprintln!("registration failed: {e}");
            std::process::exit(1);
        }
    };

    let ticket = &registration.ticket;
    println!("registration successful");
    println!("  plate:      {}", ticket.plate_number);
    println!("  vehicle:    {} {}", ticket.vehicle_type.icon(), ticket.vehicle_type.label());
    println!("  entry time: {}", ticket.entry_timestamp.format("%Y-%m-%d %H:%M"));
    println!("  ticket id:  {}", ticket.id);

    match (&registration.qr_image, &args.qr_out) {
        (Some(qr), Some(path)) => {
            std::fs::write(path, qr)?;
            println!("  qr saved:   {path}");
        }
        (Some(_), None) => {
            println!("  keep your ticket QR, you will need it to exit");
        }
        (None, _) => {
            println!("  note: ticket QR could not be fetched, keep your ticket id");
        }
    }

    Ok(())
}
