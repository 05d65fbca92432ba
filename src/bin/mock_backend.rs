//! Mock ticketing backend
//!
//! Simulates the registration-session/ticket/QR API for local testing, so a
//! kiosk can run full cycles without the real backend.
//!
//! Endpoints:
//! - POST /registration-sessions            -> new PENDING session
//! - GET  /registration-sessions/{token}    -> session snapshot (lazy expiry)
//! - POST /registration-sessions/{token}/complete -> ticket, marks COMPLETED
//! - GET  /tickets/{id}                     -> ticket
//! - POST /qr/generate                      -> {"qrDataUrl": ...}
//! - GET  /qr/{token}/dataurl               -> {"qrDataUrl": ...}
//!
//! QR images are stubs: a data-URL wrapping the base64 of the content
//! itself, which is enough for clients that only carry the string around.
//!
//! With --auto-complete-secs N the mock plays the registrant too,
//! completing each pending session N seconds after creation.
//!
//! Usage:
//!   cargo run --bin mock_backend -- --port 4000 --auto-complete-secs 5

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::{Duration as ChronoDuration, Utc};
use clap::Parser;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use parkqr_kiosk::domain::types::{
    RegistrationSession, SessionStatus, Ticket, TicketStatus, VehicleType,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "mock_backend")]
#[command(about = "Mock ticketing backend for local kiosk simulation")]
struct Args {
    /// TCP port to listen on
    #[arg(short, long, default_value = "4000")]
    port: u16,

    /// Session lifetime in seconds
    #[arg(long, default_value = "300")]
    session_ttl_secs: u64,

    /// Complete pending sessions automatically after this many seconds
    /// (0 = disabled)
    #[arg(long, default_value = "0")]
    auto_complete_secs: u64,

    /// Plate used by the auto-completer
    #[arg(long, default_value = "ABC123")]
    plate: String,

    /// Vehicle type used by the auto-completer (car|motorcycle|bicycle)
    #[arg(long, default_value = "car")]
    vehicle: VehicleType,
}

#[derive(Deserialize)]
struct CompleteRequest {
    plate_number: String,
    vehicle_type: VehicleType,
}

#[derive(Deserialize)]
struct QrRequest {
    content: String,
}

enum CompleteError {
    NotFound,
    Conflict,
}

struct MockState {
    sessions: HashMap<String, RegistrationSession>,
    tickets: HashMap<String, Ticket>,
    session_ttl: ChronoDuration,
}

impl MockState {
    fn new(session_ttl_secs: u64) -> Self {
        Self {
            sessions: HashMap::new(),
            tickets: HashMap::new(),
            session_ttl: ChronoDuration::seconds(session_ttl_secs as i64),
        }
    }

    fn create_session(&mut self) -> RegistrationSession {
        let session = RegistrationSession {
            id: Uuid::now_v7().to_string(),
            session_token: Uuid::now_v7().simple().to_string(),
            status: SessionStatus::Pending,
            ticket_id: None,
            expires_at: Utc::now() + self.session_ttl,
        };
        self.sessions.insert(session.session_token.clone(), session.clone());
        session
    }

    /// Fetch a session, lazily flipping PENDING past expires_at to EXPIRED.
    fn get_session(&mut self, token: &str) -> Option<RegistrationSession> {
        let session = self.sessions.get_mut(token)?;
        if session.status == SessionStatus::Pending && Utc::now() > session.expires_at {
            session.status = SessionStatus::Expired;
        }
        Some(session.clone())
    }

    /// The single atomic status transition: PENDING -> COMPLETED + ticket.
    fn complete_session(
        &mut self,
        token: &str,
        plate_number: &str,
        vehicle_type: VehicleType,
    ) -> Result<Ticket, CompleteError> {
        // Apply lazy expiry before deciding
        let current = self.get_session(token).ok_or(CompleteError::NotFound)?;
        if current.status != SessionStatus::Pending {
            return Err(CompleteError::Conflict);
        }

        let ticket = Ticket {
            id: Uuid::now_v7().to_string(),
            qr_token: Uuid::now_v7().simple().to_string(),
            plate_number: plate_number.to_string(),
            vehicle_type,
            entry_timestamp: Utc::now(),
            status: TicketStatus::Active,
        };
        self.tickets.insert(ticket.id.clone(), ticket.clone());

        if let Some(session) = self.sessions.get_mut(token) {
            session.status = SessionStatus::Completed;
            session.ticket_id = Some(ticket.id.clone());
        }

        Ok(ticket)
    }

    /// Tokens of pending sessions older than `age`, for the auto-completer.
    fn pending_older_than(&self, age: ChronoDuration) -> Vec<String> {
        let now = Utc::now();
        self.sessions
            .values()
            .filter(|s| s.status == SessionStatus::Pending)
            .filter(|s| now - (s.expires_at - self.session_ttl) >= age)
            .map(|s| s.session_token.clone())
            .collect()
    }
}

type SharedState = Arc<Mutex<MockState>>;

fn qr_data_url(content: &str) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(content.as_bytes()))
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response should not fail")
}

fn json_error(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, serde_json::json!({ "message": message }))
}

fn json_ok<T: serde::Serialize>(value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_value(value) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(_) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "serialization failed"),
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: SharedState,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().trim_matches('/').to_string();
    let segments: Vec<&str> = path.split('/').collect();

    let response = match (&method, segments.as_slice()) {
        (&Method::POST, ["registration-sessions"]) => {
            let session = state.lock().create_session();
            println!("[MOCK] Session created: {}", session.session_token);
            json_ok(&session)
        }
        (&Method::GET, ["registration-sessions", token]) => {
            match state.lock().get_session(token) {
                Some(session) => json_ok(&session),
                None => json_error(StatusCode::NOT_FOUND, "session not found"),
            }
        }
        (&Method::POST, ["registration-sessions", token, "complete"]) => {
            let token = token.to_string();
            match read_json::<CompleteRequest>(req).await {
                Ok(body) => {
                    let result = state.lock().complete_session(
                        &token,
                        &body.plate_number,
                        body.vehicle_type,
                    );
                    match result {
                        Ok(ticket) => {
                            println!(
                                "[MOCK] Session {} completed: plate {} ({})",
                                token,
                                ticket.plate_number,
                                ticket.vehicle_type.label()
                            );
                            json_response(StatusCode::OK, serde_json::json!({ "ticket": ticket }))
                        }
                        Err(CompleteError::NotFound) => {
                            json_error(StatusCode::NOT_FOUND, "session not found")
                        }
                        Err(CompleteError::Conflict) => json_error(
                            StatusCode::CONFLICT,
                            "session already used or expired",
                        ),
                    }
                }
                Err(message) => json_error(StatusCode::BAD_REQUEST, &message),
            }
        }
        (&Method::GET, ["tickets", ticket_id]) => {
            match state.lock().tickets.get(*ticket_id).cloned() {
                Some(ticket) => json_ok(&ticket),
                None => json_error(StatusCode::NOT_FOUND, "ticket not found"),
            }
        }
        (&Method::POST, ["qr", "generate"]) => match read_json::<QrRequest>(req).await {
            Ok(body) => json_response(
                StatusCode::OK,
                serde_json::json!({ "qrDataUrl": qr_data_url(&body.content) }),
            ),
            Err(message) => json_error(StatusCode::BAD_REQUEST, &message),
        },
        (&Method::GET, ["qr", token, "dataurl"]) => json_response(
            StatusCode::OK,
            serde_json::json!({ "qrDataUrl": qr_data_url(token) }),
        ),
        _ => json_error(StatusCode::NOT_FOUND, "not found"),
    };

    Ok(response)
}

async fn read_json<T: serde::de::DeserializeOwned>(
    req: Request<hyper::body::Incoming>,
) -> Result<T, String> {
    let body = req
        .into_body()
        .collect()
        .await
        .map_err(|e| format!("failed to read body: {e}"))?
        .to_bytes();
    serde_json::from_slice(&body).map_err(|e| format!("invalid request body: {e}"))
}

/// Play the registrant: complete pending sessions once they reach the
/// configured age.
async fn run_auto_completer(state: SharedState, args: Arc<Args>) {
    let age = ChronoDuration::seconds(args.auto_complete_secs as i64);
    let mut tick = tokio::time::interval(Duration::from_millis(500));

    loop {
        tick.tick().await;

        let due = state.lock().pending_older_than(age);
        for token in due {
            let result = state.lock().complete_session(&token, &args.plate, args.vehicle);
            if result.is_ok() {
                println!("[MOCK] Auto-completed session {token} with plate {}", args.plate);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Arc::new(Args::parse());

    println!("[MOCK] ParkQR mock backend");
    println!("[MOCK] Port:            {}", args.port);
    println!("[MOCK] Session TTL:     {}s", args.session_ttl_secs);
    if args.auto_complete_secs > 0 {
        println!(
            "[MOCK] Auto-complete:   after {}s as {} ({})",
            args.auto_complete_secs,
            args.plate,
            args.vehicle.label()
        );
    } else {
        println!("[MOCK] Auto-complete:   disabled");
    }

    let state: SharedState = Arc::new(Mutex::new(MockState::new(args.session_ttl_secs)));

    if args.auto_complete_secs > 0 {
        let completer_state = state.clone();
        let completer_args = args.clone();
        tokio::spawn(async move {
            run_auto_completer(completer_state, completer_args).await;
        });
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr).await?;
    println!("[MOCK] Listening on {addr}");

    loop {
        let (stream, _peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let state = state.clone();
                async move { handle_request(req, state).await }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                eprintln!("[MOCK] HTTP error: {e}");
            }
        });
    }
}
