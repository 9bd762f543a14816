//! Error taxonomy for the safety-decision path.
//!
//! Bad numeric parameters (negative depth, non-positive draft) indicate a
//! caller bug and fail fast. Degenerate geometry never errors; it degrades
//! to "no conflict" inside the geometry and registry code.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SafetyError {
    /// Malformed numeric input that indicates a caller bug.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An override request failed business-rule validation.
    #[error("override rejected: {}", reasons.join("; "))]
    OverrideRejected { reasons: Vec<String> },
}
