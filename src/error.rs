//! Error types for the solver and its configuration.

use thiserror::Error;

/// Contract violations detected at the solver boundary.
///
/// These indicate a caller bug (a malformed outcome or state), never an
/// expected runtime condition. A turn that fails is not an error; it is an
/// ordinary [`crate::types::Decision`] with [`crate::types::Action::NoAction`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    #[error("outcome describes {actual} dice but {expected} were rolled")]
    InvalidOutcome { expected: u8, actual: u32 },
    #[error("die face {face} is out of range (faces are 0..6)")]
    FaceOutOfRange { face: u8 },
    #[error("{requested} dice requested but tables only cover {max}")]
    TooManyDice { requested: u8, max: u8 },
    #[error("roll lists {dice} dice; at most 255 fit in a face-count vector")]
    RollTooLarge { dice: usize },
    #[error("chosen-faces mask {mask:#010b} has bits outside the 6 faces")]
    InvalidChosenMask { mask: u8 },
}

/// Rule-set and turn-context loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read rules file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
