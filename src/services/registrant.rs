//! Registrant-side session validation and submission
//!
//! Runs on the registrant's own device after scanning the kiosk QR:
//! confirms the session token is still usable, then collects and submits
//! the vehicle-entry data. No polling; at most one call to validate and at
//! most two on submit (complete + best-effort ticket QR fetch).

use crate::domain::plate::{normalize_plate, PlateError};
use crate::domain::types::{RegistrationSession, SessionStatus, Ticket, VehicleType};
use crate::infra::metrics::Metrics;
use crate::io::backend::{BackendError, ParkingBackend};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of validating a scanned session token. Gates which UI is shown:
/// a form for `Valid`, a hard error for `Invalid`, never both.
#[derive(Debug)]
pub enum SessionValidation {
    Valid(RegistrationSession),
    Invalid { message: String },
}

impl SessionValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, SessionValidation::Valid(_))
    }
}

/// The form the registrant fills in.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub plate_number: String,
    pub vehicle_type: Option<VehicleType>,
}

/// Successful registration: the ticket, plus its QR rendering when the
/// best-effort fetch succeeded.
#[derive(Debug)]
pub struct Registration {
    pub ticket: Ticket,
    pub qr_image: Option<String>,
}

#[derive(Debug)]
pub enum RegistrationError {
    /// Local validation failure; never reached the network.
    Validation(String),
    /// The completion request failed; the form should be preserved.
    Backend(BackendError),
}

impl std::fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationError::Validation(message) => write!(f, "{message}"),
            RegistrationError::Backend(e) => write!(f, "{}", e.user_message()),
        }
    }
}

impl std::error::Error for RegistrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistrationError::Backend(e) => Some(e),
            RegistrationError::Validation(_) => None,
        }
    }
}

pub struct RegistrantFlow<B> {
    backend: Arc<B>,
    metrics: Arc<Metrics>,
}

impl<B: ParkingBackend> RegistrantFlow<B> {
    pub fn new(backend: Arc<B>, metrics: Arc<Metrics>) -> Self {
        Self { backend, metrics }
    }

    /// Check whether a scanned token still points at a usable session.
    ///
    /// A missing token short-circuits without any backend call; otherwise
    /// exactly one fetch decides the outcome.
    pub async fn validate_session(&self, token: Option<&str>) -> SessionValidation {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return SessionValidation::Invalid {
                message: "no session token provided".to_string(),
            };
        };

        match self.backend.get_registration_session(token).await {
            Ok(session) if session.status == SessionStatus::Pending => {
                debug!(session_token = %token, "session_valid");
                SessionValidation::Valid(session)
            }
            Ok(session) => {
                debug!(session_token = %token, status = session.status.as_str(), "session_not_pending");
                SessionValidation::Invalid {
                    message: "session already used or expired".to_string(),
                }
            }
            Err(e @ BackendError::Transport(_)) => {
                warn!(session_token = %token, error = %e, "session_check_failed");
                SessionValidation::Invalid {
                    message: "session not found or expired".to_string(),
                }
            }
            Err(e) => {
                debug!(session_token = %token, error = %e, "session_not_found");
                SessionValidation::Invalid {
                    message: "session not found or expired".to_string(),
                }
            }
        }
    }

    /// Validate the form locally, then complete the session.
    ///
    /// On success the ticket's own QR rendering is fetched best-effort; a
    /// failure there degrades to `qr_image = None` rather than failing the
    /// registration.
    pub async fn submit(
        &self,
        token: &str,
        form: &RegistrationForm,
    ) -> Result<Registration, RegistrationError> {
        let Some(vehicle_type) = form.vehicle_type else {
            self.metrics.record_registration_rejected();
            return Err(RegistrationError::Validation(
                "please complete all fields".to_string(),
            ));
        };

        let plate = normalize_plate(&form.plate_number).map_err(|e| {
            self.metrics.record_registration_rejected();
            match e {
                PlateError::Empty => {
                    RegistrationError::Validation("please complete all fields".to_string())
                }
                PlateError::Malformed => RegistrationError::Validation(e.to_string()),
            }
        })?;

        let ticket = self
            .backend
            .complete_registration_session(token, &plate, vehicle_type)
            .await
            .map_err(RegistrationError::Backend)?;

        self.metrics.record_registration_submitted();
        info!(
            session_token = %token,
            plate_number = %ticket.plate_number,
            vehicle_type = ticket.vehicle_type.label(),
            "registration_completed"
        );

        let qr_image = match self.backend.get_qr_data_url(&ticket.qr_token).await {
            Ok(data_url) => Some(data_url),
            Err(e) => {
                warn!(error = %e, "ticket_qr_fetch_failed");
                None
            }
        };

        Ok(Registration { ticket, qr_image })
    }
}
