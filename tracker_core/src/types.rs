//! Core domain types for the tracker.
//!
//! This module defines the fundamental types used throughout the system:
//! - Logged sets, exercise preferences and computed goals
//! - Workout logs persisted to the JSONL log
//! - Habits, their completion rows and the derived progress snapshot

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Weight increment used when an exercise has no usable preference
pub const DEFAULT_WEIGHT_INCREMENT: f64 = 5.0;

/// Habits targeting more than this many completions per day are never "complete"
pub const UNBOUNDED_COMPLETIONS_THRESHOLD: u32 = 100;

// ============================================================================
// Workout Types
// ============================================================================

/// Unit a set's weight was recorded in
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeightUnit {
    #[default]
    Lbs,
    Kg,
    Bodyweight,
    Assisted,
}

impl WeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightUnit::Lbs => "lbs",
            WeightUnit::Kg => "kg",
            WeightUnit::Bodyweight => "bodyweight",
            WeightUnit::Assisted => "assisted",
        }
    }
}

impl std::str::FromStr for WeightUnit {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "lbs" | "lb" => Ok(WeightUnit::Lbs),
            "kg" | "kgs" => Ok(WeightUnit::Kg),
            "bodyweight" | "bw" => Ok(WeightUnit::Bodyweight),
            "assisted" => Ok(WeightUnit::Assisted),
            other => Err(crate::Error::Validation {
                field: "unit".into(),
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One performed set: an immutable historical fact
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LoggedSet {
    pub weight: f64,
    pub reps: i32,
    #[serde(default)]
    pub unit: WeightUnit,
}

impl LoggedSet {
    pub fn new(weight: f64, reps: i32, unit: WeightUnit) -> Self {
        Self { weight, reps, unit }
    }
}

/// Per-exercise settings read by the progression engine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExercisePreference {
    pub exercise_id: String,
    #[serde(default = "default_weight_increment")]
    pub weight_increment: f64,
    #[serde(default)]
    pub weight_unit: WeightUnit,
}

fn default_weight_increment() -> f64 {
    DEFAULT_WEIGHT_INCREMENT
}

impl ExercisePreference {
    pub fn new(exercise_id: impl Into<String>) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            weight_increment: DEFAULT_WEIGHT_INCREMENT,
            weight_unit: WeightUnit::default(),
        }
    }

    /// Increment to apply, falling back to the default for unusable values
    pub fn effective_increment(&self) -> f64 {
        if self.weight_increment.is_finite() && self.weight_increment > 0.0 {
            self.weight_increment
        } else {
            DEFAULT_WEIGHT_INCREMENT
        }
    }
}

/// Recommended target for the next session, derived from one logged set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GoalSet {
    pub weight: f64,
    pub reps: i32,
    pub source_set_index: usize,
}

/// All sets performed for one exercise on one date
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExerciseLog {
    pub id: Uuid,
    pub exercise_id: String,
    pub performed_on: NaiveDate,
    pub sets: Vec<LoggedSet>,
    pub logged_at: DateTime<Utc>,
}

// ============================================================================
// Habit Types
// ============================================================================

/// A tracked habit with its daily target and lifetime counter
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Habit {
    pub id: u64,
    pub title: String,
    #[serde(default = "default_completions_per_day")]
    pub completions_per_day: u32,
    #[serde(default)]
    pub total_completions: u64,
    pub created_at: DateTime<Utc>,
}

fn default_completions_per_day() -> u32 {
    1
}

impl Habit {
    /// Whether the habit has a real daily target (see [`UNBOUNDED_COMPLETIONS_THRESHOLD`])
    pub fn is_bounded(&self) -> bool {
        self.completions_per_day <= UNBOUNDED_COMPLETIONS_THRESHOLD
    }
}

/// Soft-delete marker for a completion row
///
/// A row only ever moves from `Active` to `Deleted`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CompletionStatus {
    Active,
    Deleted { at: DateTime<Utc> },
}

/// One recorded completion of a habit
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HabitCompletion {
    pub id: u64,
    pub habit_id: u64,
    pub completion_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub status: CompletionStatus,
}

impl HabitCompletion {
    pub fn is_active(&self) -> bool {
        matches!(self.status, CompletionStatus::Active)
    }
}

/// Snapshot returned to callers after every habit operation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitProgress {
    pub habit_id: u64,
    pub completions_today: usize,
    pub total_completions: u64,
    pub level: u64,
    pub is_complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_unit_parsing() {
        assert_eq!("lbs".parse::<WeightUnit>().unwrap(), WeightUnit::Lbs);
        assert_eq!("KG".parse::<WeightUnit>().unwrap(), WeightUnit::Kg);
        assert_eq!("bw".parse::<WeightUnit>().unwrap(), WeightUnit::Bodyweight);
        assert!("stone".parse::<WeightUnit>().is_err());
    }

    #[test]
    fn test_effective_increment_falls_back() {
        let mut pref = ExercisePreference::new("squat");
        assert_eq!(pref.effective_increment(), 5.0);

        pref.weight_increment = 2.5;
        assert_eq!(pref.effective_increment(), 2.5);

        pref.weight_increment = 0.0;
        assert_eq!(pref.effective_increment(), DEFAULT_WEIGHT_INCREMENT);

        pref.weight_increment = f64::NAN;
        assert_eq!(pref.effective_increment(), DEFAULT_WEIGHT_INCREMENT);
    }

    #[test]
    fn test_completion_status_serialization() {
        let json = serde_json::to_string(&CompletionStatus::Active).unwrap();
        assert_eq!(json, r#"{"state":"active"}"#);

        let parsed: CompletionStatus =
            serde_json::from_str(r#"{"state":"deleted","at":"2024-03-01T10:00:00Z"}"#).unwrap();
        assert!(matches!(parsed, CompletionStatus::Deleted { .. }));
    }

    #[test]
    fn test_habit_progress_field_names() {
        let progress = HabitProgress {
            habit_id: 3,
            completions_today: 1,
            total_completions: 12,
            level: 12,
            is_complete: true,
        };
        let value = serde_json::to_value(&progress).unwrap();
        assert_eq!(value["completions_today"], 1);
        assert_eq!(value["total_completions"], 12);
        assert_eq!(value["level"], 12);
        assert_eq!(value["is_complete"], true);
    }
}
