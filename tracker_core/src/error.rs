//! Error types for the tracker_core library.

use chrono::NaiveDate;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for tracker_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input for a single field
    #[error("Invalid {field}: {value:?}")]
    Validation { field: String, value: String },

    /// Identifier that is not a positive integer
    #[error("Invalid habit ID format: {0:?}")]
    InvalidId(String),

    /// Referenced habit does not exist
    #[error("Habit with ID {0} not found")]
    HabitNotFound(u64),

    /// No active completion to remove for the given day
    #[error("No completions found for habit {habit_id} on {day}")]
    NotFound { habit_id: u64, day: NaiveDate },

    /// Daily target already reached
    #[error("Maximum completions ({max}) already reached for habit {habit_id} today")]
    LimitReached { habit_id: u64, max: u32 },

    /// State management error
    #[error("State error: {0}")]
    State(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// HTTP-style status class for presenting this error to a client
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation { .. } | Error::InvalidId(_) => 400,
            Error::HabitNotFound(_) => 404,
            Error::NotFound { .. } | Error::LimitReached { .. } => 409,
            _ => 500,
        }
    }
}
