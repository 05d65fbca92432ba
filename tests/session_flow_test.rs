//! Integration tests for the registration session lifecycle
//!
//! Drives the kiosk controller and the registrant flow against a
//! scriptable in-memory backend, checking state ordering, polling
//! teardown, and the end-to-end kiosk/registrant handoff.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use parkqr_kiosk::domain::types::{
    RegistrationSession, SessionStatus, Ticket, TicketStatus, VehicleType,
};
use parkqr_kiosk::infra::{Config, Metrics};
use parkqr_kiosk::io::backend::{BackendError, HttpBackend, ParkingBackend};
use parkqr_kiosk::services::kiosk::{DisplayFrame, DisplayState, KioskController};
use parkqr_kiosk::services::registrant::{RegistrantFlow, RegistrationForm, SessionValidation};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::sync::watch;

#[derive(Default)]
struct MockInner {
    sessions: HashMap<String, RegistrationSession>,
    tickets: HashMap<String, Ticket>,
    next_session: u64,
    next_ticket: u64,
    session_ttl_secs: i64,
    poll_override: Option<RegistrationSession>,
    fail_create: bool,
    fail_get: bool,
    fail_qr_dataurl: bool,
    create_calls: u64,
    get_calls: HashMap<String, u64>,
    get_calls_total: u64,
    complete_calls: u64,
    ticket_calls: u64,
    qr_generate_calls: u64,
    qr_dataurl_calls: u64,
}

impl MockInner {
    fn total_calls(&self) -> u64 {
        self.create_calls
            + self.get_calls_total
            + self.complete_calls
            + self.ticket_calls
            + self.qr_generate_calls
            + self.qr_dataurl_calls
    }
}

/// Scriptable backend double with per-endpoint call counters.
#[derive(Default)]
struct MockBackend {
    inner: Mutex<MockInner>,
}

impl MockBackend {
    fn new() -> Arc<Self> {
        let backend = Self::default();
        backend.inner.lock().session_ttl_secs = 300;
        Arc::new(backend)
    }

    /// Lifetime of newly created sessions; negative values produce sessions
    /// that are already past their expires_at.
    fn set_session_ttl_secs(&self, secs: i64) {
        self.inner.lock().session_ttl_secs = secs;
    }

    /// Flip a session to EXPIRED as the backend's lazy expiry would.
    fn mark_expired(&self, token: &str) {
        let mut inner = self.inner.lock();
        if let Some(session) = inner.sessions.get_mut(token) {
            session.status = SessionStatus::Expired;
        }
    }

    /// Force every session fetch to return this snapshot, whatever token
    /// was asked for.
    fn set_poll_override(&self, session: Option<RegistrationSession>) {
        self.inner.lock().poll_override = session;
    }

    fn set_fail_create(&self, fail: bool) {
        self.inner.lock().fail_create = fail;
    }

    fn set_fail_get(&self, fail: bool) {
        self.inner.lock().fail_get = fail;
    }

    fn set_fail_qr_dataurl(&self, fail: bool) {
        self.inner.lock().fail_qr_dataurl = fail;
    }

    /// Seed a pending session without counting a create call.
    fn seed_session(&self, token: &str) {
        let mut inner = self.inner.lock();
        inner.sessions.insert(
            token.to_string(),
            RegistrationSession {
                id: format!("s-{token}"),
                session_token: token.to_string(),
                status: SessionStatus::Pending,
                ticket_id: None,
                expires_at: Utc::now() + ChronoDuration::minutes(5),
            },
        );
    }

    /// Flip a session to COMPLETED as the real backend would on completion.
    fn mark_completed(&self, token: &str, plate: &str, vehicle: VehicleType) {
        let mut inner = self.inner.lock();
        let ticket = Self::make_ticket(&mut inner, plate, vehicle);
        let ticket_id = ticket.id.clone();
        inner.tickets.insert(ticket_id.clone(), ticket);
        if let Some(session) = inner.sessions.get_mut(token) {
            session.status = SessionStatus::Completed;
            session.ticket_id = Some(ticket_id);
        }
    }

    fn make_ticket(inner: &mut MockInner, plate: &str, vehicle: VehicleType) -> Ticket {
        inner.next_ticket += 1;
        Ticket {
            id: format!("t{}", inner.next_ticket),
            qr_token: format!("qr{}", inner.next_ticket),
            plate_number: plate.to_string(),
            vehicle_type: vehicle,
            entry_timestamp: Utc::now(),
            status: TicketStatus::Active,
        }
    }

    fn get_calls_for(&self, token: &str) -> u64 {
        self.inner.lock().get_calls.get(token).copied().unwrap_or(0)
    }

    fn counts(&self) -> (u64, u64, u64, u64) {
        let inner = self.inner.lock();
        (inner.create_calls, inner.get_calls_total, inner.complete_calls, inner.ticket_calls)
    }

    fn total_calls(&self) -> u64 {
        self.inner.lock().total_calls()
    }
}

#[async_trait]
impl ParkingBackend for MockBackend {
    async fn create_registration_session(&self) -> Result<RegistrationSession, BackendError> {
        let mut inner = self.inner.lock();
        inner.create_calls += 1;
        if inner.fail_create {
            return Err(BackendError::UnexpectedStatus { status: 503 });
        }
        inner.next_session += 1;
        let session = RegistrationSession {
            id: format!("s{}", inner.next_session),
            session_token: format!("tok{}", inner.next_session),
            status: SessionStatus::Pending,
            ticket_id: None,
            expires_at: Utc::now() + ChronoDuration::seconds(inner.session_ttl_secs),
        };
        inner.sessions.insert(session.session_token.clone(), session.clone());
        Ok(session)
    }

    async fn get_registration_session(
        &self,
        token: &str,
    ) -> Result<RegistrationSession, BackendError> {
        let mut inner = self.inner.lock();
        inner.get_calls_total += 1;
        *inner.get_calls.entry(token.to_string()).or_insert(0) += 1;
        if inner.fail_get {
            return Err(BackendError::UnexpectedStatus { status: 502 });
        }
        if let Some(session) = &inner.poll_override {
            return Ok(session.clone());
        }
        inner
            .sessions
            .get(token)
            .cloned()
            .ok_or(BackendError::NotFound { resource: "registration session" })
    }

    async fn complete_registration_session(
        &self,
        token: &str,
        plate_number: &str,
        vehicle_type: VehicleType,
    ) -> Result<Ticket, BackendError> {
        let mut inner = self.inner.lock();
        inner.complete_calls += 1;
        let Some(session) = inner.sessions.get(token).cloned() else {
            return Err(BackendError::NotFound { resource: "registration session" });
        };
        if session.status != SessionStatus::Pending {
            return Err(BackendError::Domain {
                message: "session already used or expired".to_string(),
            });
        }
        let ticket = Self::make_ticket(&mut inner, plate_number, vehicle_type);
        let ticket_id = ticket.id.clone();
        inner.tickets.insert(ticket_id.clone(), ticket.clone());
        if let Some(session) = inner.sessions.get_mut(token) {
            session.status = SessionStatus::Completed;
            session.ticket_id = Some(ticket_id);
        }
        Ok(ticket)
    }

    async fn get_ticket(&self, ticket_id: &str) -> Result<Ticket, BackendError> {
        let mut inner = self.inner.lock();
        inner.ticket_calls += 1;
        inner
            .tickets
            .get(ticket_id)
            .cloned()
            .ok_or(BackendError::NotFound { resource: "ticket" })
    }

    async fn generate_qr(&self, content: &str) -> Result<String, BackendError> {
        let mut inner = self.inner.lock();
        inner.qr_generate_calls += 1;
        Ok(format!("qr:{content}"))
    }

    async fn get_qr_data_url(&self, qr_token: &str) -> Result<String, BackendError> {
        let mut inner = self.inner.lock();
        inner.qr_dataurl_calls += 1;
        if inner.fail_qr_dataurl {
            return Err(BackendError::UnexpectedStatus { status: 500 });
        }
        Ok(format!("qr:{qr_token}"))
    }
}

/// Config with millisecond-scale timings so lifecycle tests run quickly.
fn test_config() -> Config {
    test_config_with_grace(60)
}

fn test_config_with_grace(expiry_grace_secs: u64) -> Config {
    let mut temp_file = NamedTempFile::new().unwrap();
    let content = format!(
        r#"
[api]
base_url = "http://unused"

[kiosk]
public_origin = "https://host"
poll_interval_ms = 20
qr_reveal_delay_ms = 5
confirm_dwell_ms = 40
transition_delay_ms = 10
error_retry_ms = 1000
expiry_grace_secs = {expiry_grace_secs}
"#
    );
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    Config::from_file(temp_file.path()).unwrap()
}

/// Wait until the display frame satisfies a predicate.
async fn wait_for<F>(
    frame_rx: &mut watch::Receiver<DisplayFrame>,
    mut predicate: F,
) -> DisplayFrame
where
    F: FnMut(&DisplayFrame) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let frame = frame_rx.borrow_and_update();
                if predicate(&frame) {
                    return frame.clone();
                }
            }
            frame_rx.changed().await.expect("controller dropped the frame channel");
        }
    })
    .await
    .expect("timed out waiting for display state")
}

async fn wait_for_state(
    frame_rx: &mut watch::Receiver<DisplayFrame>,
    state: DisplayState,
) -> DisplayFrame {
    wait_for(frame_rx, |frame| frame.state == state).await
}

// --- Registrant validation properties ---

#[tokio::test]
async fn test_validate_missing_token_makes_no_backend_call() {
    let backend = MockBackend::new();
    let flow = RegistrantFlow::new(backend.clone(), Arc::new(Metrics::new()));

    let result = flow.validate_session(None).await;
    match result {
        SessionValidation::Invalid { message } => {
            assert_eq!(message, "no session token provided")
        }
        SessionValidation::Valid(_) => panic!("missing token must be invalid"),
    }
    assert_eq!(backend.total_calls(), 0);

    // Empty token counts as missing too
    let result = flow.validate_session(Some("")).await;
    assert!(!result.is_valid());
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn test_validate_pending_session_makes_exactly_one_call() {
    let backend = MockBackend::new();
    backend.seed_session("abc123");
    let flow = RegistrantFlow::new(backend.clone(), Arc::new(Metrics::new()));

    let result = flow.validate_session(Some("abc123")).await;
    assert!(result.is_valid());

    let (create, get, complete, ticket) = backend.counts();
    assert_eq!((create, get, complete, ticket), (0, 1, 0, 0));
}

#[tokio::test]
async fn test_validate_completed_session_is_already_used() {
    let backend = MockBackend::new();
    backend.seed_session("abc123");
    backend.mark_completed("abc123", "ABC123", VehicleType::Car);
    let flow = RegistrantFlow::new(backend.clone(), Arc::new(Metrics::new()));

    match flow.validate_session(Some("abc123")).await {
        SessionValidation::Invalid { message } => {
            assert_eq!(message, "session already used or expired")
        }
        SessionValidation::Valid(_) => panic!("completed session must be invalid"),
    }
}

#[tokio::test]
async fn test_validate_unknown_token_is_not_found() {
    let backend = MockBackend::new();
    let flow = RegistrantFlow::new(backend.clone(), Arc::new(Metrics::new()));

    match flow.validate_session(Some("nope")).await {
        SessionValidation::Invalid { message } => {
            assert_eq!(message, "session not found or expired")
        }
        SessionValidation::Valid(_) => panic!("unknown token must be invalid"),
    }
}

#[tokio::test]
async fn test_validate_transport_failure_reads_as_not_found() {
    // Bind and drop an ephemeral port to get a real connection-refused
    // transport error without touching the network
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let backend = Arc::new(
        HttpBackend::new(format!("http://127.0.0.1:{port}"), Duration::from_millis(500))
            .unwrap(),
    );
    let flow = RegistrantFlow::new(backend, Arc::new(Metrics::new()));

    match flow.validate_session(Some("abc123")).await {
        SessionValidation::Invalid { message } => {
            assert_eq!(message, "session not found or expired")
        }
        SessionValidation::Valid(_) => panic!("unreachable backend must be invalid"),
    }
}

// --- Registrant submission ---

#[tokio::test]
async fn test_submit_local_validation_never_reaches_network() {
    let backend = MockBackend::new();
    backend.seed_session("abc123");
    let metrics = Arc::new(Metrics::new());
    let flow = RegistrantFlow::new(backend.clone(), metrics.clone());

    // Malformed plate
    let form = RegistrationForm {
        plate_number: "ABC-123".to_string(),
        vehicle_type: Some(VehicleType::Car),
    };
    assert!(flow.submit("abc123", &form).await.is_err());

    // Missing vehicle type
    let form = RegistrationForm { plate_number: "ABC123".to_string(), vehicle_type: None };
    let err = flow.submit("abc123", &form).await.unwrap_err();
    assert_eq!(err.to_string(), "please complete all fields");

    assert_eq!(backend.total_calls(), 0);
    assert_eq!(metrics.report().registrations_rejected, 2);
}

#[tokio::test]
async fn test_submit_normalizes_plate_and_degrades_without_qr() {
    let backend = MockBackend::new();
    backend.seed_session("abc123");
    backend.set_fail_qr_dataurl(true);
    let flow = RegistrantFlow::new(backend.clone(), Arc::new(Metrics::new()));

    let form = RegistrationForm {
        plate_number: "xyz789a".to_string(),
        vehicle_type: Some(VehicleType::Motorcycle),
    };
    let registration = flow.submit("abc123", &form).await.unwrap();

    assert_eq!(registration.ticket.plate_number, "XYZ789A");
    assert_eq!(registration.ticket.vehicle_type, VehicleType::Motorcycle);
    // QR fetch failed; registration still succeeds without an image
    assert!(registration.qr_image.is_none());
}

#[tokio::test]
async fn test_submit_conflict_surfaces_backend_message() {
    let backend = MockBackend::new();
    backend.seed_session("abc123");
    backend.mark_completed("abc123", "ABC123", VehicleType::Car);
    let flow = RegistrantFlow::new(backend.clone(), Arc::new(Metrics::new()));

    let form = RegistrationForm {
        plate_number: "XYZ789A".to_string(),
        vehicle_type: Some(VehicleType::Motorcycle),
    };
    let err = flow.submit("abc123", &form).await.unwrap_err();
    assert_eq!(err.to_string(), "session already used or expired");
}

// --- Kiosk lifecycle ---

#[tokio::test]
async fn test_kiosk_end_to_end_cycle() {
    let backend = MockBackend::new();
    let metrics = Arc::new(Metrics::new());
    let (controller, mut frame_rx, _retry) =
        KioskController::new(backend.clone(), test_config(), metrics.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(controller.run(shutdown_rx));

    // Kiosk comes up showing the first session's QR
    let frame = wait_for_state(&mut frame_rx, DisplayState::ShowingQr).await;
    let first_url = frame.register_url.clone().unwrap();
    assert_eq!(first_url, "https://host/register?session=tok1");
    assert_eq!(frame.qr_image.as_deref(), Some("qr:https://host/register?session=tok1"));

    // Registrant scans the QR and completes the session
    let flow = RegistrantFlow::new(backend.clone(), Arc::new(Metrics::new()));
    let validation = flow.validate_session(Some("tok1")).await;
    assert!(validation.is_valid());
    let form = RegistrationForm {
        plate_number: "xyz789a".to_string(),
        vehicle_type: Some(VehicleType::Motorcycle),
    };
    let registration = flow.submit("tok1", &form).await.unwrap();
    assert_eq!(registration.ticket.plate_number, "XYZ789A");

    // Kiosk's poll loop observes completion and confirms
    let frame = wait_for_state(&mut frame_rx, DisplayState::Confirming).await;
    let completed = frame.completed.unwrap();
    assert_eq!(completed.plate_number, "XYZ789A");
    assert_eq!(completed.vehicle_type, VehicleType::Motorcycle);

    // Reaching Confirming required a QR on screen and at least one poll:
    // the machine cannot skip from loading straight to confirming
    assert!(backend.get_calls_for("tok1") >= 1);
    let polls_at_confirm = backend.get_calls_for("tok1");

    // After the dwell the kiosk cycles to a brand-new session token
    let frame = wait_for(&mut frame_rx, |frame| {
        frame.state == DisplayState::ShowingQr
            && frame.register_url.as_deref() != Some(first_url.as_str())
    })
    .await;
    assert_eq!(frame.register_url.as_deref(), Some("https://host/register?session=tok2"));

    // The old session was never polled again after confirmation
    assert_eq!(backend.get_calls_for("tok1"), polls_at_confirm);

    assert_eq!(metrics.report().sessions_completed, 1);
    assert!(metrics.report().sessions_created >= 2);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_kiosk_error_state_holds_until_retry() {
    let backend = MockBackend::new();
    backend.set_fail_create(true);
    let (controller, mut frame_rx, retry) =
        KioskController::new(backend.clone(), test_config(), Arc::new(Metrics::new()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(controller.run(shutdown_rx));

    let frame = wait_for_state(&mut frame_rx, DisplayState::Error).await;
    assert_eq!(frame.message.as_deref(), Some("could not create a registration session"));

    // Error state holds: no new create attempts while waiting for retry
    let creates_in_error = backend.counts().0;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.counts().0, creates_in_error);
    assert_eq!(frame_rx.borrow().state, DisplayState::Error);

    // Retry recovers into a fresh session
    backend.set_fail_create(false);
    assert!(retry.retry());
    wait_for_state(&mut frame_rx, DisplayState::ShowingQr).await;

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_kiosk_swallows_transient_poll_errors() {
    let backend = MockBackend::new();
    let metrics = Arc::new(Metrics::new());
    let (controller, mut frame_rx, _retry) =
        KioskController::new(backend.clone(), test_config(), metrics.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(controller.run(shutdown_rx));

    wait_for_state(&mut frame_rx, DisplayState::ShowingQr).await;
    backend.set_fail_get(true);

    // Several failing polls later the kiosk is still quietly showing the QR
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(frame_rx.borrow().state, DisplayState::ShowingQr);
    assert!(metrics.report().poll_errors >= 2);

    // Once the backend recovers, completion is observed as usual
    backend.set_fail_get(false);
    backend.mark_completed("tok1", "ABC123", VehicleType::Car);
    wait_for_state(&mut frame_rx, DisplayState::Confirming).await;

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_kiosk_abandons_expired_sessions_and_cycles_fresh() {
    let backend = MockBackend::new();
    // Sessions are born past expires_at, and no grace is given
    backend.set_session_ttl_secs(-60);
    let metrics = Arc::new(Metrics::new());
    let (controller, mut frame_rx, _retry) =
        KioskController::new(backend.clone(), test_config_with_grace(0), metrics.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(controller.run(shutdown_rx));

    // Each session is abandoned on its first poll tick and replaced with a
    // fresh one; the kiosk never stalls and never confirms
    let expired = metrics.clone();
    let frame = wait_for(&mut frame_rx, move |frame| {
        assert_ne!(frame.state, DisplayState::Confirming, "expired session must not confirm");
        frame.state == DisplayState::ShowingQr && expired.report().sessions_expired >= 2
    })
    .await;
    assert_ne!(frame.register_url.as_deref(), Some("https://host/register?session=tok1"));

    assert_eq!(metrics.report().sessions_completed, 0);

    // An abandoned session is never polled again
    let tok1_polls = backend.get_calls_for("tok1");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.get_calls_for("tok1"), tok1_polls);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_kiosk_cycles_when_backend_reports_expired() {
    let backend = MockBackend::new();
    let metrics = Arc::new(Metrics::new());
    let (controller, mut frame_rx, _retry) =
        KioskController::new(backend.clone(), test_config(), metrics.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(controller.run(shutdown_rx));

    wait_for_state(&mut frame_rx, DisplayState::ShowingQr).await;
    backend.mark_expired("tok1");

    // The next poll sees EXPIRED; the kiosk abandons the session and puts a
    // fresh QR on screen without ever confirming
    let frame = wait_for(&mut frame_rx, |frame| {
        assert_ne!(frame.state, DisplayState::Confirming, "expired session must not confirm");
        frame.state == DisplayState::ShowingQr
            && frame.register_url.as_deref() != Some("https://host/register?session=tok1")
    })
    .await;
    assert_eq!(frame.register_url.as_deref(), Some("https://host/register?session=tok2"));

    assert_eq!(metrics.report().sessions_expired, 1);
    assert_eq!(metrics.report().sessions_completed, 0);

    let tok1_polls = backend.get_calls_for("tok1");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.get_calls_for("tok1"), tok1_polls);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_kiosk_ignores_snapshot_for_other_session() {
    let backend = MockBackend::new();
    let (controller, mut frame_rx, _retry) =
        KioskController::new(backend.clone(), test_config(), Arc::new(Metrics::new()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(controller.run(shutdown_rx));

    wait_for_state(&mut frame_rx, DisplayState::ShowingQr).await;

    // A completed snapshot for some other token must never advance the
    // display, even though it reads as COMPLETED with a ticket
    backend.set_poll_override(Some(RegistrationSession {
        id: "s-other".to_string(),
        session_token: "other".to_string(),
        status: SessionStatus::Completed,
        ticket_id: Some("t-other".to_string()),
        expires_at: Utc::now() + ChronoDuration::minutes(5),
    }));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(frame_rx.borrow().state, DisplayState::ShowingQr);
    // The mismatched responses were received and dropped, not unrequested
    assert!(backend.get_calls_for("tok1") >= 2);

    // Matching responses advance the display as usual once the mismatch
    // clears
    backend.set_poll_override(None);
    backend.mark_completed("tok1", "ABC123", VehicleType::Car);
    let frame = wait_for_state(&mut frame_rx, DisplayState::Confirming).await;
    assert_eq!(frame.completed.unwrap().plate_number, "ABC123");

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_kiosk_shutdown_leaves_no_running_timers() {
    let backend = MockBackend::new();
    let (controller, mut frame_rx, _retry) =
        KioskController::new(backend.clone(), test_config(), Arc::new(Metrics::new()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(controller.run(shutdown_rx));

    // Shut down mid-showing_qr, while the poll loop is live
    wait_for_state(&mut frame_rx, DisplayState::ShowingQr).await;
    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();

    // No further backend traffic once the controller has stopped
    let calls_after_stop = backend.total_calls();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(backend.total_calls(), calls_after_stop);
}
