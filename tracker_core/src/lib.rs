#![forbid(unsafe_code)]

//! Core domain model and business logic for the personal tracker.
//!
//! This crate provides:
//! - Domain types (logged sets, goals, habits, completions)
//! - Progression engine for workout goals
//! - Habit completion counting
//! - Persistence (workout WAL, CSV archive, tracker state)

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod progression;
pub mod habits;
pub mod wal;
pub mod csv_rollup;
pub mod history;
pub mod state;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use progression::{compute_goal, goal_from_columns, RepBand};
pub use habits::{completions_today, is_complete, record_completion, remove_completion};
pub use wal::{JsonlSink, LogSink};
pub use history::last_log_for;
pub use state::{parse_habit_id, TrackerState};
