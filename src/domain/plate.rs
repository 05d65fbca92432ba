//! Plate number normalization and validation
//!
//! Plates are normalized to uppercase before validation and submission, and
//! must be 6-10 ASCII alphanumeric characters. Local validation failures
//! never reach the network.

pub const PLATE_MIN_LEN: usize = 6;
pub const PLATE_MAX_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlateError {
    Empty,
    Malformed,
}

impl std::fmt::Display for PlateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlateError::Empty => write!(f, "plate number is required"),
            PlateError::Malformed => {
                write!(f, "invalid plate, must be {PLATE_MIN_LEN}-{PLATE_MAX_LEN} alphanumeric characters")
            }
        }
    }
}

impl std::error::Error for PlateError {}

/// Trim and uppercase a raw plate, then validate the result.
///
/// Idempotent: normalizing an already-normalized plate yields the same
/// string.
pub fn normalize_plate(raw: &str) -> Result<String, PlateError> {
    let plate = raw.trim().to_ascii_uppercase();

    if plate.is_empty() {
        return Err(PlateError::Empty);
    }

    let len_ok = (PLATE_MIN_LEN..=PLATE_MAX_LEN).contains(&plate.len());
    if !len_ok || !plate.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(PlateError::Malformed);
    }

    Ok(plate)
}
