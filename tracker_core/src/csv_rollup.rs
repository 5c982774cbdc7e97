//! CSV rollup functionality for archiving the workout WAL.
//!
//! Each exercise log is flattened into one CSV row per set. The WAL is only
//! renamed after the CSV has been synced to disk.

use crate::{ExerciseLog, Result, WeightUnit};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the CSV archive (one per set)
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CsvRow {
    pub log_id: String,
    pub exercise_id: String,
    pub performed_on: String,
    pub logged_at: String,
    pub set_index: usize,
    pub weight: f64,
    pub reps: i32,
    pub unit: WeightUnit,
}

fn rows_for(log: &ExerciseLog) -> impl Iterator<Item = CsvRow> + '_ {
    log.sets.iter().enumerate().map(move |(index, set)| CsvRow {
        log_id: log.id.to_string(),
        exercise_id: log.exercise_id.clone(),
        performed_on: log.performed_on.to_string(),
        logged_at: log.logged_at.to_rfc3339(),
        set_index: index,
        weight: set.weight,
        reps: set.reps,
        unit: set.unit,
    })
}

/// Roll up WAL logs into CSV and archive the WAL atomically
///
/// This function:
/// 1. Reads all logs from the WAL
/// 2. Appends their sets to the CSV file (creates with headers if needed)
/// 3. Syncs the CSV to disk
/// 4. Renames the WAL to .processed
/// 5. Returns the number of logs processed
pub fn wal_to_csv_and_archive(wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let logs = crate::wal::read_logs(wal_path)?;

    if logs.is_empty() {
        tracing::info!("No logs in WAL to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for log in &logs {
        for row in rows_for(log) {
            writer.serialize(row)?;
        }
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Wrote {} logs to CSV", logs.len());

    let processed_path = wal_path.with_extension("wal.processed");
    std::fs::rename(wal_path, &processed_path)?;

    tracing::info!("Archived WAL to {:?}", processed_path);

    Ok(logs.len())
}

/// Clean up old processed WAL files
///
/// This removes all .wal.processed files in the given directory.
pub fn cleanup_processed_wals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed WAL: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed WAL files", count);
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::LogSink;
    use crate::LoggedSet;
    use chrono::{NaiveDate, Utc};
    use std::fs::File;
    use uuid::Uuid;

    fn create_test_log(exercise_id: &str, sets: usize) -> ExerciseLog {
        ExerciseLog {
            id: Uuid::new_v4(),
            exercise_id: exercise_id.into(),
            performed_on: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            sets: (0..sets)
                .map(|i| LoggedSet::new(100.0 + i as f64, 8, WeightUnit::Kg))
                .collect(),
            logged_at: Utc::now(),
        }
    }

    #[test]
    fn test_wal_to_csv_creates_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("workouts.wal");
        let csv_path = temp_dir.path().join("workouts.csv");

        let mut sink = crate::wal::JsonlSink::new(&wal_path);
        for i in 0..3 {
            sink.append(&create_test_log(&format!("exercise_{}", i), 2)).unwrap();
        }

        let count = wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();
        assert_eq!(count, 3);

        assert!(csv_path.exists());
        assert!(!wal_path.exists());
        assert!(wal_path.with_extension("wal.processed").exists());

        // One row per set
        let reader = csv::Reader::from_path(&csv_path).unwrap();
        assert_eq!(reader.into_records().count(), 6);
    }

    #[test]
    fn test_wal_to_csv_appends() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("workouts.wal");
        let csv_path = temp_dir.path().join("workouts.csv");

        let mut sink = crate::wal::JsonlSink::new(&wal_path);
        sink.append(&create_test_log("squat", 1)).unwrap();
        assert_eq!(wal_to_csv_and_archive(&wal_path, &csv_path).unwrap(), 1);

        let mut sink = crate::wal::JsonlSink::new(&wal_path);
        sink.append(&create_test_log("bench", 1)).unwrap();
        assert_eq!(wal_to_csv_and_archive(&wal_path, &csv_path).unwrap(), 1);

        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        let rows: Vec<CsvRow> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].exercise_id, "bench");
        assert_eq!(rows[1].unit, WeightUnit::Kg);
    }

    #[test]
    fn test_empty_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("empty.wal");
        let csv_path = temp_dir.path().join("workouts.csv");

        File::create(&wal_path).unwrap();

        assert_eq!(wal_to_csv_and_archive(&wal_path, &csv_path).unwrap(), 0);
        assert!(!csv_path.exists());
    }

    #[test]
    fn test_cleanup_processed_wals() {
        let temp_dir = tempfile::tempdir().unwrap();

        File::create(temp_dir.path().join("w1.wal.processed")).unwrap();
        File::create(temp_dir.path().join("w2.wal.processed")).unwrap();
        File::create(temp_dir.path().join("keep.wal")).unwrap();

        assert_eq!(cleanup_processed_wals(temp_dir.path()).unwrap(), 2);

        assert!(!temp_dir.path().join("w1.wal.processed").exists());
        assert!(!temp_dir.path().join("w2.wal.processed").exists());
        assert!(temp_dir.path().join("keep.wal").exists());
    }
}
