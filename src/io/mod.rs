//! IO modules - external system interfaces
//!
//! - `backend` - HTTP client for the ticketing backend API (sessions,
//!   tickets, QR rendering)

pub mod backend;

// Re-export commonly used types
pub use backend::{BackendError, HttpBackend, ParkingBackend};
