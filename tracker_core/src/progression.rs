//! Progression logic for recommending the next workout targets.
//!
//! Every logged set is classified into a rep-range band and progressed on its
//! own:
//! - At or above the band ceiling: add weight, drop reps to the band floor
//! - Inside the band: add weight, keep reps
//! - Below the band: keep weight, add up to 2 reps toward the band floor

use crate::{Error, GoalSet, LoggedSet, Result, WeightUnit, DEFAULT_WEIGHT_INCREMENT};

/// Reps added per session to a set that is still below its band
const BELOW_BAND_REP_STEP: i32 = 2;

/// Target repetition interval used to choose between adding weight or reps
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepBand {
    Strength,
    Hypertrophy,
    Endurance,
}

impl RepBand {
    /// Classify a set by the reps it was performed for
    pub fn classify(reps: i32) -> Self {
        if reps <= 5 {
            RepBand::Strength
        } else if reps <= 12 {
            RepBand::Hypertrophy
        } else {
            RepBand::Endurance
        }
    }

    pub fn min(&self) -> i32 {
        match self {
            RepBand::Strength => 3,
            RepBand::Hypertrophy => 6,
            RepBand::Endurance => 15,
        }
    }

    pub fn max(&self) -> i32 {
        match self {
            RepBand::Strength => 5,
            RepBand::Hypertrophy => 12,
            RepBand::Endurance => 20,
        }
    }
}

/// Progress a single set into its goal for the next session
pub fn next_goal(set: &LoggedSet, weight_increment: f64, source_set_index: usize) -> GoalSet {
    let band = RepBand::classify(set.reps);

    let (mut weight, mut reps) = if set.reps >= band.max() {
        (set.weight + weight_increment, band.min())
    } else if set.reps >= band.min() {
        (set.weight + weight_increment, set.reps)
    } else {
        (
            set.weight,
            (set.reps + BELOW_BAND_REP_STEP).min(band.min()),
        )
    };

    if reps < 1 {
        reps = 1;
    }
    if weight < 0.0 {
        weight = set.weight;
    }

    tracing::debug!(
        "Set {}: {}x{} ({:?}) -> {}x{}",
        source_set_index + 1,
        set.weight,
        set.reps,
        band,
        weight,
        reps
    );

    GoalSet {
        weight,
        reps,
        source_set_index,
    }
}

/// Check that a set carries usable numbers: a finite, non-negative weight
pub fn validate_set(set: &LoggedSet) -> Result<()> {
    if !set.weight.is_finite() || set.weight < 0.0 {
        return Err(Error::Validation {
            field: "weight".into(),
            value: set.weight.to_string(),
        });
    }
    Ok(())
}

/// Increment actually applied: anything not finite and positive means the default
pub fn normalize_increment(weight_increment: f64) -> f64 {
    if weight_increment.is_finite() && weight_increment > 0.0 {
        weight_increment
    } else {
        tracing::warn!(
            "Weight increment {} is not positive, using {}",
            weight_increment,
            DEFAULT_WEIGHT_INCREMENT
        );
        DEFAULT_WEIGHT_INCREMENT
    }
}

/// Compute goals for every valid set of a previous performance
///
/// Returns `None` when there is no usable history. Invalid sets are skipped
/// and do not shift the `source_set_index` of the remaining ones. A
/// non-positive `weight_increment` falls back to the default of 5.
pub fn compute_goal(sets: &[LoggedSet], weight_increment: f64) -> Option<Vec<GoalSet>> {
    goals_for_indexed(
        sets.iter().cloned().map(Ok).enumerate(),
        weight_increment,
    )
}

/// Compute goals from the comma-separated columns a workout log is stored in
///
/// Columns are paired by position up to the shorter one, e.g.
/// `goal_from_columns("50,50,45", "15,12,15", WeightUnit::Lbs, 5.0)`.
pub fn goal_from_columns(
    weights: &str,
    reps: &str,
    unit: WeightUnit,
    weight_increment: f64,
) -> Option<Vec<GoalSet>> {
    goals_for_indexed(
        parse_set_columns(weights, reps, unit).into_iter().enumerate(),
        weight_increment,
    )
}

/// Parse weight/reps columns into one entry per position
pub fn parse_set_columns(weights: &str, reps: &str, unit: WeightUnit) -> Vec<Result<LoggedSet>> {
    if weights.trim().is_empty() || reps.trim().is_empty() {
        return Vec::new();
    }

    weights
        .split(',')
        .zip(reps.split(','))
        .map(|(w, r)| parse_set(w, r, unit))
        .collect()
}

fn parse_set(weight: &str, reps: &str, unit: WeightUnit) -> Result<LoggedSet> {
    let weight_value = weight
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|w| w.is_finite())
        .ok_or_else(|| Error::Validation {
            field: "weight".into(),
            value: weight.trim().to_string(),
        })?;

    let reps_value = reps.trim().parse::<i32>().map_err(|_| Error::Validation {
        field: "reps".into(),
        value: reps.trim().to_string(),
    })?;

    let set = LoggedSet::new(weight_value, reps_value, unit);
    validate_set(&set)?;
    Ok(set)
}

fn goals_for_indexed<I>(sets: I, weight_increment: f64) -> Option<Vec<GoalSet>>
where
    I: IntoIterator<Item = (usize, Result<LoggedSet>)>,
{
    let weight_increment = normalize_increment(weight_increment);

    let goals: Vec<GoalSet> = sets
        .into_iter()
        .map(|(index, set)| (index, set.and_then(|s| validate_set(&s).map(|_| s))))
        .filter_map(|(index, set)| match set {
            Ok(set) => Some(next_goal(&set, weight_increment, index)),
            Err(e) => {
                tracing::warn!("Skipping set {}: {}", index + 1, e);
                None
            }
        })
        .collect();

    if goals.is_empty() {
        tracing::debug!("No valid sets to base a goal on");
        return None;
    }

    Some(goals)
}
