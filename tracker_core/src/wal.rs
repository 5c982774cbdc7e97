//! Write-Ahead Log (WAL) for workout logs.
//!
//! Each exercise log is one JSON line. A record is written with a single
//! `write_all` while the file is exclusively locked, so concurrent writers
//! never interleave inside a line.

use crate::{ExerciseLog, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Sink trait for persisting exercise logs
pub trait LogSink {
    fn append(&mut self, log: &ExerciseLog) -> Result<()>;
}

/// JSONL-based log sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    /// Create a new JSONL sink for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl LogSink for JsonlSink {
    fn append(&mut self, log: &ExerciseLog) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut record = serde_json::to_vec(log)?;
        record.push(b'\n');

        file.lock_exclusive()?;
        let written = (&file).write_all(&record).and_then(|_| file.sync_data());
        file.unlock()?;
        written?;

        tracing::debug!("Appended log {} ({}) to WAL", log.id, log.exercise_id);
        Ok(())
    }
}

/// Read all exercise logs from a WAL file, oldest first
///
/// Lines that fail to parse (e.g. a torn write) are skipped.
pub fn read_logs(path: &Path) -> Result<Vec<ExerciseLog>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    file.lock_shared()?;
    let parsed = parse_lines(BufReader::new(&file));
    file.unlock()?;
    let (logs, skipped) = parsed?;

    if skipped > 0 {
        tracing::warn!("Skipped {} unreadable lines in {:?}", skipped, path);
    }
    tracing::debug!("Read {} logs from WAL", logs.len());
    Ok(logs)
}

fn parse_lines(reader: impl BufRead) -> Result<(Vec<ExerciseLog>, usize)> {
    let mut logs = Vec::new();
    let mut skipped = 0;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<ExerciseLog>(&line) {
            Ok(log) => logs.push(log),
            Err(e) => {
                tracing::debug!("WAL line {}: {}", index + 1, e);
                skipped += 1;
            }
        }
    }

    Ok((logs, skipped))
}
