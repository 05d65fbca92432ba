//! Kiosk display controller
//!
//! Keeps exactly one registration session alive on screen, detects its
//! completion, and cycles to the next one, unattended and indefinitely.
//!
//! The controller owns the display state machine and publishes snapshots
//! through a watch channel; whatever renders the screen (the daemon logs
//! them) only ever observes frames. The status poll interval lives inside
//! the `ShowingQr` arm of the loop, so it is torn down the instant the
//! state advances and no timer survives shutdown.

use crate::domain::types::{register_url, CompletedTicket, RegistrationSession, SessionStatus};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::backend::{BackendError, ParkingBackend};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Display state machine. `Loading` requests a new session; `ShowingQr`
/// polls it; `Confirming` and `Transitioning` are timed dwell states;
/// `Error` holds until an explicit retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    Loading,
    ShowingQr,
    Confirming,
    Transitioning,
    Error,
}

impl DisplayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayState::Loading => "loading",
            DisplayState::ShowingQr => "showing_qr",
            DisplayState::Confirming => "confirming",
            DisplayState::Transitioning => "transitioning",
            DisplayState::Error => "error",
        }
    }
}

/// Snapshot of everything a display surface needs to render one state.
#[derive(Debug, Clone)]
pub struct DisplayFrame {
    pub state: DisplayState,
    pub register_url: Option<String>,
    pub qr_image: Option<String>,
    pub completed: Option<CompletedTicket>,
    pub message: Option<String>,
}

impl DisplayFrame {
    fn loading() -> Self {
        Self { state: DisplayState::Loading, register_url: None, qr_image: None, completed: None, message: None }
    }

    fn showing_qr(cycle: &SessionCycle) -> Self {
        Self {
            state: DisplayState::ShowingQr,
            register_url: Some(cycle.register_url.clone()),
            qr_image: Some(cycle.qr_image.clone()),
            completed: None,
            message: None,
        }
    }

    fn confirming(ticket: CompletedTicket) -> Self {
        Self {
            state: DisplayState::Confirming,
            register_url: None,
            qr_image: None,
            completed: Some(ticket),
            message: None,
        }
    }

    fn transitioning() -> Self {
        Self { state: DisplayState::Transitioning, register_url: None, qr_image: None, completed: None, message: None }
    }

    fn error(message: String) -> Self {
        Self {
            state: DisplayState::Error,
            register_url: None,
            qr_image: None,
            completed: None,
            message: Some(message),
        }
    }
}

/// Which step of the session pipeline failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStep {
    CreateSession,
    GenerateQr,
}

impl CycleStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStep::CreateSession => "create_session",
            CycleStep::GenerateQr => "generate_qr",
        }
    }
}

/// Tagged failure from the create-session -> URL -> QR pipeline.
#[derive(Debug)]
pub struct CycleError {
    pub step: CycleStep,
    pub source: BackendError,
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.step {
            CycleStep::CreateSession => write!(f, "could not create a registration session"),
            CycleStep::GenerateQr => write!(f, "could not generate the QR code"),
        }
    }
}

impl std::error::Error for CycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Result of one successful session pipeline run.
pub struct SessionCycle {
    pub session: RegistrationSession,
    pub register_url: String,
    pub qr_image: String,
}

/// Handle for nudging the controller out of its error state.
#[derive(Clone)]
pub struct RetryHandle {
    tx: mpsc::Sender<()>,
}

impl RetryHandle {
    /// Request a retry. Returns false if the controller is gone or a retry
    /// is already queued.
    pub fn retry(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }
}

pub struct KioskController<B> {
    backend: Arc<B>,
    config: Config,
    metrics: Arc<Metrics>,
    frame_tx: watch::Sender<DisplayFrame>,
    retry_rx: mpsc::Receiver<()>,
}

impl<B: ParkingBackend> KioskController<B> {
    pub fn new(
        backend: Arc<B>,
        config: Config,
        metrics: Arc<Metrics>,
    ) -> (Self, watch::Receiver<DisplayFrame>, RetryHandle) {
        let (frame_tx, frame_rx) = watch::channel(DisplayFrame::loading());
        let (retry_tx, retry_rx) = mpsc::channel(1);
        let controller = Self { backend, config, metrics, frame_tx, retry_rx };
        (controller, frame_rx, RetryHandle { tx: retry_tx })
    }

    /// Run the lifecycle loop until shutdown.
    ///
    /// Exactly one session is live at a time; each loop iteration is one
    /// full cycle and the previous session's polling has always been torn
    /// down before a new cycle starts.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("kiosk_started");

        loop {
            self.set_frame(DisplayFrame::loading());

            let cycle = match self.start_cycle().await {
                Ok(cycle) => cycle,
                Err(e) => {
                    self.metrics.record_cycle_failure();
                    error!(step = e.step.as_str(), error = %e.source, "session_cycle_failed");
                    self.set_frame(DisplayFrame::error(e.to_string()));
                    if !self.wait_for_retry(&mut shutdown).await {
                        break;
                    }
                    continue;
                }
            };

            // Short cosmetic delay before revealing the fresh QR
            if !self.pause(self.config.qr_reveal_delay(), &mut shutdown).await {
                break;
            }

            info!(
                session_token = %cycle.session.session_token,
                expires_at = %cycle.session.expires_at,
                "showing_qr"
            );
            self.set_frame(DisplayFrame::showing_qr(&cycle));

            let ticket = tokio::select! {
                ticket = self.poll_until_complete(&cycle.session) => ticket,
                _ = shutdown.changed() => break,
            };

            let Some(ticket) = ticket else {
                // Session aged out unclaimed; cycle to a fresh one instead
                // of stalling forever.
                self.metrics.record_session_expired();
                warn!(session_token = %cycle.session.session_token, "session_expired_unclaimed");
                continue;
            };

            self.metrics.record_session_completed();
            info!(
                session_token = %cycle.session.session_token,
                plate_number = %ticket.plate_number,
                vehicle_type = ticket.vehicle_type.label(),
                "session_completed"
            );

            self.set_frame(DisplayFrame::confirming(ticket));
            if !self.pause(self.config.confirm_dwell(), &mut shutdown).await {
                break;
            }

            self.set_frame(DisplayFrame::transitioning());
            if !self.pause(self.config.transition_delay(), &mut shutdown).await {
                break;
            }
        }

        info!("kiosk_stopped");
    }

    /// Sequential session pipeline: create session -> build URL -> render QR.
    /// A later step never runs once an earlier one has failed.
    async fn start_cycle(&self) -> Result<SessionCycle, CycleError> {
        let session = self
            .backend
            .create_registration_session()
            .await
            .map_err(|source| CycleError { step: CycleStep::CreateSession, source })?;
        self.metrics.record_session_created();

        let url = register_url(self.config.public_origin(), &session.session_token);
        let qr_image = self
            .backend
            .generate_qr(&url)
            .await
            .map_err(|source| CycleError { step: CycleStep::GenerateQr, source })?;

        debug!(session_token = %session.session_token, "session_cycle_ready");
        Ok(SessionCycle { session, register_url: url, qr_image })
    }

    /// Poll the live session at the configured cadence until it completes
    /// and its ticket resolves.
    ///
    /// Transient fetch failures are swallowed and polling continues; only a
    /// definitive `COMPLETED` status with a fetchable ticket returns
    /// `Some`. Returns `None` when the session passes its expiry grace
    /// unclaimed.
    async fn poll_until_complete(&self, session: &RegistrationSession) -> Option<CompletedTicket> {
        let mut poll = interval(self.config.poll_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Consume the interval's immediate first tick so the first request
        // goes out one full period after the QR appears.
        poll.tick().await;

        let grace = chrono::Duration::from_std(self.config.expiry_grace())
            .unwrap_or_else(|_| chrono::Duration::zero());
        let deadline = session.expires_at + grace;

        loop {
            poll.tick().await;

            if chrono::Utc::now() > deadline {
                return None;
            }

            let polled = match self.backend.get_registration_session(&session.session_token).await
            {
                Ok(polled) => polled,
                Err(e) => {
                    self.metrics.record_poll_error();
                    debug!(error = %e, "session_poll_error");
                    continue;
                }
            };
            self.metrics.record_poll();

            // A response for some other session must never advance the display
            if polled.session_token != session.session_token {
                continue;
            }

            if polled.status == SessionStatus::Expired {
                return None;
            }

            if !polled.is_complete() {
                continue;
            }
            let Some(ticket_id) = polled.ticket_id.as_deref() else {
                continue;
            };

            match self.backend.get_ticket(ticket_id).await {
                Ok(ticket) => return Some(CompletedTicket::from(&ticket)),
                Err(e) => {
                    // Completion stands; retry the ticket fetch next tick
                    warn!(ticket_id = %ticket_id, error = %e, "ticket_fetch_failed");
                    continue;
                }
            }
        }
    }

    /// Hold in the error state until a retry is requested. Returns false on
    /// shutdown.
    async fn wait_for_retry(&mut self, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            msg = self.retry_rx.recv() => {
                if msg.is_some() {
                    info!("kiosk_retry_requested");
                    true
                } else {
                    false
                }
            }
            _ = shutdown.changed() => false,
        }
    }

    /// Sleep for `duration`, returning false if shutdown fires first.
    async fn pause(&self, duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = shutdown.changed() => false,
        }
    }

    fn set_frame(&self, frame: DisplayFrame) {
        debug!(state = frame.state.as_str(), "display_state");
        self.frame_tx.send_replace(frame);
    }
}
