//! Domain models - core business types for the registration lifecycle
//!
//! This module contains the canonical data types shared by both client
//! surfaces:
//! - `RegistrationSession` - the short-lived backend record behind each QR
//! - `SessionStatus` - the session's lifecycle enum
//! - `Ticket` / `CompletedTicket` - the parking ticket and the confirmation
//!   projection the kiosk renders
//! - `VehicleType` - vehicle classification
//! - plate number normalization and validation

pub mod plate;
pub mod types;
