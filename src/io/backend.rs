//! HTTP client for the ticketing backend API
//!
//! The backend is an external collaborator exposing REST/JSON endpoints for
//! registration sessions, tickets, and QR rendering. Both client surfaces
//! (kiosk and registrant) talk to it through the `ParkingBackend` trait so
//! tests can substitute a scriptable double.

use crate::domain::types::{RegistrationSession, Ticket, VehicleType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Error taxonomy for backend interaction.
///
/// `Domain` carries the backend-supplied user-displayable message (e.g.
/// "session already completed"); `NotFound` covers invalid or expired
/// tokens and unknown tickets.
#[derive(Debug)]
pub enum BackendError {
    Transport(reqwest::Error),
    NotFound { resource: &'static str },
    Domain { message: String },
    UnexpectedStatus { status: u16 },
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Transport(e) => write!(f, "transport error: {e}"),
            BackendError::NotFound { resource } => write!(f, "{resource} not found"),
            BackendError::Domain { message } => write!(f, "{message}"),
            BackendError::UnexpectedStatus { status } => {
                write!(f, "unexpected response status {status}")
            }
        }
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackendError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Transport(e)
    }
}

impl BackendError {
    /// Short message suitable for direct display.
    pub fn user_message(&self) -> String {
        match self {
            BackendError::Transport(_) => "could not reach the server".to_string(),
            BackendError::NotFound { resource } => format!("{resource} not found"),
            BackendError::Domain { message } => message.clone(),
            BackendError::UnexpectedStatus { .. } => "the request failed".to_string(),
        }
    }
}

/// The backend contract consumed by both client surfaces.
#[async_trait]
pub trait ParkingBackend: Send + Sync {
    async fn create_registration_session(&self) -> Result<RegistrationSession, BackendError>;

    async fn get_registration_session(
        &self,
        token: &str,
    ) -> Result<RegistrationSession, BackendError>;

    async fn complete_registration_session(
        &self,
        token: &str,
        plate_number: &str,
        vehicle_type: VehicleType,
    ) -> Result<Ticket, BackendError>;

    async fn get_ticket(&self, ticket_id: &str) -> Result<Ticket, BackendError>;

    /// Render arbitrary content as a QR image, returned as a data-URL.
    async fn generate_qr(&self, content: &str) -> Result<String, BackendError>;

    /// Fetch the QR rendering of an existing ticket token.
    async fn get_qr_data_url(&self, qr_token: &str) -> Result<String, BackendError>;
}

#[derive(Serialize)]
struct CompleteRequest<'a> {
    plate_number: &'a str,
    vehicle_type: VehicleType,
}

#[derive(Deserialize)]
struct CompleteResponse {
    ticket: Ticket,
}

#[derive(Serialize)]
struct QrRequest<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct QrResponse {
    #[serde(rename = "qrDataUrl")]
    qr_data_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// reqwest-backed implementation against the real REST API.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        // Single pooled client reused across all requests
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: base_url.into().trim_end_matches('/').to_string(), client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a non-success response to the error taxonomy, preserving the
    /// backend's own message when the body carries one.
    async fn error_from(
        response: reqwest::Response,
        resource: &'static str,
    ) -> BackendError {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return BackendError::NotFound { resource };
        }
        match response.json::<ErrorBody>().await {
            Ok(ErrorBody { message: Some(message) }) => BackendError::Domain { message },
            _ => BackendError::UnexpectedStatus { status: status.as_u16() },
        }
    }
}

#[async_trait]
impl ParkingBackend for HttpBackend {
    async fn create_registration_session(&self) -> Result<RegistrationSession, BackendError> {
        let response = self.client.post(self.url("/registration-sessions")).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response, "registration session").await);
        }
        let session: RegistrationSession = response.json().await?;
        debug!(session_token = %session.session_token, "session_created");
        Ok(session)
    }

    async fn get_registration_session(
        &self,
        token: &str,
    ) -> Result<RegistrationSession, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("/registration-sessions/{token}")))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response, "registration session").await);
        }
        Ok(response.json().await?)
    }

    async fn complete_registration_session(
        &self,
        token: &str,
        plate_number: &str,
        vehicle_type: VehicleType,
    ) -> Result<Ticket, BackendError> {
        let response = self
            .client
            .post(self.url(&format!("/registration-sessions/{token}/complete")))
            .json(&CompleteRequest { plate_number, vehicle_type })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response, "registration session").await);
        }
        let body: CompleteResponse = response.json().await?;
        Ok(body.ticket)
    }

    async fn get_ticket(&self, ticket_id: &str) -> Result<Ticket, BackendError> {
        let response = self.client.get(self.url(&format!("/tickets/{ticket_id}"))).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response, "ticket").await);
        }
        Ok(response.json().await?)
    }

    async fn generate_qr(&self, content: &str) -> Result<String, BackendError> {
        let response = self
            .client
            .post(self.url("/qr/generate"))
            .json(&QrRequest { content })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response, "qr").await);
        }
        let body: QrResponse = response.json().await?;
        Ok(body.qr_data_url)
    }

    async fn get_qr_data_url(&self, qr_token: &str) -> Result<String, BackendError> {
        let response =
            self.client.get(self.url(&format!("/qr/{qr_token}/dataurl"))).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response, "qr").await);
        }
        let body: QrResponse = response.json().await?;
        Ok(body.qr_data_url)
    }
}
