//! Workout history lookup across the WAL and the CSV archive.
//!
//! The progression engine only needs the most recent log of an exercise, but
//! that log may live in either file depending on when the last rollup ran.

use crate::csv_rollup::CsvRow;
use crate::{Error, ExerciseLog, LoggedSet, Result};
use chrono::{DateTime, NaiveDate, Utc};
use csv::ReaderBuilder;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use uuid::Uuid;

/// Load every log of `exercise_id` from the WAL and the CSV archive
///
/// Logs are deduplicated by id and sorted newest first.
pub fn load_exercise_logs(
    wal_path: &Path,
    csv_path: &Path,
    exercise_id: &str,
) -> Result<Vec<ExerciseLog>> {
    let mut logs = Vec::new();
    let mut seen_ids = HashSet::new();

    for log in crate::wal::read_logs(wal_path)? {
        if log.exercise_id == exercise_id && seen_ids.insert(log.id) {
            logs.push(log);
        }
    }

    if csv_path.exists() {
        let mut csv_count = 0;
        for log in load_logs_from_csv(csv_path)? {
            if log.exercise_id == exercise_id && seen_ids.insert(log.id) {
                logs.push(log);
                csv_count += 1;
            }
        }
        tracing::debug!("Loaded {} archived logs for {}", csv_count, exercise_id);
    }

    logs.sort_by(|a, b| {
        (b.performed_on, b.logged_at).cmp(&(a.performed_on, a.logged_at))
    });

    Ok(logs)
}

/// Most recent log of an exercise, if it was ever performed
pub fn last_log_for(wal_path: &Path, csv_path: &Path, exercise_id: &str) -> Result<Option<ExerciseLog>> {
    let last = load_exercise_logs(wal_path, csv_path, exercise_id)?
        .into_iter()
        .next();

    match &last {
        Some(log) => tracing::info!(
            "Last {} log: {} ({} sets)",
            exercise_id,
            log.performed_on,
            log.sets.len()
        ),
        None => tracing::info!("No history for {}", exercise_id),
    }

    Ok(last)
}

/// Rebuild exercise logs from the per-set rows of the CSV archive
fn load_logs_from_csv(path: &Path) -> Result<Vec<ExerciseLog>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut grouped: BTreeMap<String, Vec<CsvRow>> = BTreeMap::new();
    for result in reader.deserialize::<CsvRow>() {
        match result {
            Ok(row) => grouped.entry(row.log_id.clone()).or_default().push(row),
            Err(e) => tracing::warn!("Failed to deserialize CSV row: {}", e),
        }
    }

    let mut logs = Vec::new();
    for (log_id, rows) in grouped {
        match log_from_rows(&log_id, rows) {
            Ok(log) => logs.push(log),
            Err(e) => tracing::warn!("Failed to rebuild archived log {}: {}", log_id, e),
        }
    }

    Ok(logs)
}

fn log_from_rows(log_id: &str, mut rows: Vec<CsvRow>) -> Result<ExerciseLog> {
    let id = Uuid::parse_str(log_id).map_err(|e| Error::Other(format!("Invalid UUID: {}", e)))?;

    rows.sort_by_key(|row| row.set_index);
    let first = rows
        .first()
        .ok_or_else(|| Error::Other(format!("No rows for log {}", log_id)))?;

    let performed_on = first
        .performed_on
        .parse::<NaiveDate>()
        .map_err(|e| Error::Other(format!("Invalid date: {}", e)))?;

    let logged_at = DateTime::parse_from_rfc3339(&first.logged_at)
        .map_err(|e| Error::Other(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc);

    let exercise_id = first.exercise_id.clone();
    let sets = rows
        .iter()
        .map(|row| LoggedSet::new(row.weight, row.reps, row.unit))
        .collect();

    Ok(ExerciseLog {
        id,
        exercise_id,
        performed_on,
        sets,
        logged_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::{JsonlSink, LogSink};
    use crate::WeightUnit;
    use chrono::Duration;

    fn create_test_log(exercise_id: &str, day: u32, reps: &[i32]) -> ExerciseLog {
        ExerciseLog {
            id: Uuid::new_v4(),
            exercise_id: exercise_id.into(),
            performed_on: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            sets: reps
                .iter()
                .map(|r| LoggedSet::new(50.0, *r, WeightUnit::Lbs))
                .collect(),
            logged_at: Utc::now() - Duration::days(30 - day as i64),
        }
    }

    #[test]
    fn test_last_log_from_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("workouts.wal");
        let csv_path = temp_dir.path().join("workouts.csv");

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&create_test_log("squat", 3, &[5, 5])).unwrap();
        sink.append(&create_test_log("squat", 1, &[8])).unwrap();
        sink.append(&create_test_log("bench", 4, &[10])).unwrap();

        let last = last_log_for(&wal_path, &csv_path, "squat").unwrap().unwrap();
        assert_eq!(last.performed_on, NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
        assert_eq!(last.sets.len(), 2);
    }

    #[test]
    fn test_no_history() {
        let temp_dir = tempfile::tempdir().unwrap();
        let last = last_log_for(
            &temp_dir.path().join("none.wal"),
            &temp_dir.path().join("none.csv"),
            "squat",
        )
        .unwrap();
        assert!(last.is_none());
    }

    #[test]
    fn test_archived_logs_are_rebuilt() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("workouts.wal");
        let csv_path = temp_dir.path().join("workouts.csv");

        let archived = create_test_log("hip_abduction", 2, &[15, 12, 15]);
        let archived_id = archived.id;

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&archived).unwrap();
        crate::csv_rollup::wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();

        let logs = load_exercise_logs(&wal_path, &csv_path, "hip_abduction").unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, archived_id);
        assert_eq!(
            logs[0].sets.iter().map(|s| s.reps).collect::<Vec<_>>(),
            vec![15, 12, 15]
        );
    }

    #[test]
    fn test_wal_and_archive_are_merged_newest_first() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("workouts.wal");
        let csv_path = temp_dir.path().join("workouts.csv");

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&create_test_log("squat", 1, &[8])).unwrap();
        crate::csv_rollup::wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();

        let mut sink = JsonlSink::new(&wal_path);
        let newest = create_test_log("squat", 5, &[10]);
        sink.append(&newest).unwrap();

        let logs = load_exercise_logs(&wal_path, &csv_path, "squat").unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].id, newest.id);
    }
}
