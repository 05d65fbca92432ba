//! Services - business logic and state management
//!
//! - `kiosk` - Kiosk display controller (session lifecycle state machine)
//! - `registrant` - Registrant-side session validation and submission

pub mod kiosk;
pub mod registrant;

// Re-export commonly used types
pub use kiosk::{DisplayFrame, DisplayState, KioskController, RetryHandle};
pub use registrant::{RegistrantFlow, RegistrationForm, SessionValidation};
