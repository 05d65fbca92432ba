//! Shared types for the registration session lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registration session lifecycle status as reported by the backend.
///
/// Only `Pending` and `Completed` drive client behavior; `Expired` and
/// unknown values are treated as terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Pending,
    Completed,
    Expired,
    #[serde(other)]
    Unknown,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "PENDING",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Expired => "EXPIRED",
            SessionStatus::Unknown => "UNKNOWN",
        }
    }
}

/// A short-lived backend record linking a kiosk-generated QR to a pending
/// vehicle-entry form.
///
/// The backend owns the authoritative record; clients only ever hold an
/// immutable snapshot fetched by token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationSession {
    pub id: String,
    pub session_token: String,
    pub status: SessionStatus,
    pub ticket_id: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl RegistrationSession {
    /// A session is complete once the backend reports `COMPLETED` together
    /// with the resulting ticket id. Status alone is not enough.
    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Completed && self.ticket_id.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Expired || now > self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleType {
    Car,
    Motorcycle,
    Bicycle,
}

impl VehicleType {
    pub fn label(&self) -> &'static str {
        match self {
            VehicleType::Car => "Car",
            VehicleType::Motorcycle => "Motorcycle",
            VehicleType::Bicycle => "Bicycle",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            VehicleType::Car => "🚗",
            VehicleType::Motorcycle => "🏍️",
            VehicleType::Bicycle => "🚲",
        }
    }
}

impl std::str::FromStr for VehicleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "car" => Ok(VehicleType::Car),
            "motorcycle" => Ok(VehicleType::Motorcycle),
            "bicycle" => Ok(VehicleType::Bicycle),
            other => Err(format!("unknown vehicle type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Active,
    Paid,
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// The slice of the backend's ticket record the registration clients consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub qr_token: String,
    pub plate_number: String,
    pub vehicle_type: VehicleType,
    pub entry_timestamp: DateTime<Utc>,
    pub status: TicketStatus,
}

/// Minimal projection the kiosk needs to render its confirmation screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTicket {
    pub plate_number: String,
    pub vehicle_type: VehicleType,
}

impl From<&Ticket> for CompletedTicket {
    fn from(ticket: &Ticket) -> Self {
        Self { plate_number: ticket.plate_number.clone(), vehicle_type: ticket.vehicle_type }
    }
}

/// Build the registration URL the kiosk encodes into its QR code.
///
/// Both surfaces must agree on this convention: a `/register` path with the
/// session token carried in the `session` query parameter.
pub fn register_url(public_origin: &str, session_token: &str) -> String {
    format!("{}/register?session={}", public_origin.trim_end_matches('/'), session_token)
}

/// Extract the session token back out of a scanned registration URL.
///
/// Accepts anything with a `session=` query parameter; returns `None` when
/// the parameter is absent or empty.
pub fn session_token_from_url(url: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "session")
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}
