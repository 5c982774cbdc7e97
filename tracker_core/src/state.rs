//! Tracker state persistence.
//!
//! Habits, their completion rows and per-exercise preferences live in one
//! JSON file. Writers hold an exclusive `fs2` lock on a sibling
//! `<state>.lock` file for the whole load-modify-save cycle, and the state
//! file itself is only ever replaced by an atomic rename, so readers never
//! need a lock. This module also hosts the caller-side habit operations that
//! look rows up, apply policy and write the counter's results back.

use crate::habits;
use crate::{Error, ExercisePreference, Habit, HabitCompletion, HabitProgress, Result};
use chrono::{DateTime, NaiveDate, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Everything the tracker persists besides the workout log
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackerState {
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub completions: Vec<HabitCompletion>,
    #[serde(default)]
    pub preferences: HashMap<String, ExercisePreference>,
    #[serde(default = "first_habit_id")]
    pub next_habit_id: u64,
}

fn first_habit_id() -> u64 {
    1
}

impl Default for TrackerState {
    fn default() -> Self {
        Self {
            habits: Vec::new(),
            completions: Vec::new(),
            preferences: HashMap::new(),
            next_habit_id: first_habit_id(),
        }
    }
}

/// Parse a habit id supplied by a user
pub fn parse_habit_id(text: &str) -> Result<u64> {
    match text.trim().parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(Error::InvalidId(text.to_string())),
    }
}

/// Path of the lock file guarding writes to `path`
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Exclusive writer lock, released on drop
struct WriterLock {
    file: File,
}

impl WriterLock {
    fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(lock_path(path))?;
        file.lock_exclusive()?;

        tracing::trace!("Acquired writer lock for {:?}", path);
        Ok(Self { file })
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Read and parse the state file; `None` when it does not exist yet
fn read_state_file(path: &Path) -> Result<Option<TrackerState>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_str::<TrackerState>(&contents)
        .map(Some)
        .map_err(|e| Error::State(format!("state file {:?} is corrupt: {}", path, e)))
}

impl TrackerState {
    /// Load state for reading
    ///
    /// A missing file yields the default state. An unreadable or corrupt file
    /// also yields the default state (with a warning); it is never written
    /// back, since [`TrackerState::update`] refuses to run on it.
    pub fn load(path: &Path) -> Result<Self> {
        match read_state_file(path) {
            Ok(Some(state)) => {
                tracing::debug!("Loaded tracker state from {:?}", path);
                Ok(state)
            }
            Ok(None) => {
                tracing::info!("No state file found, using default state");
                Ok(Self::default())
            }
            Err(e) => {
                tracing::warn!("{}. Showing empty state.", e);
                Ok(Self::default())
            }
        }
    }

    /// Save state, taking the writer lock
    pub fn save(&self, path: &Path) -> Result<()> {
        let _lock = WriterLock::acquire(path)?;
        self.write_atomic(path)
    }

    /// Write to a temp file in the same directory, sync it and rename it over
    /// `path`. Callers must hold the writer lock.
    fn write_atomic(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::State(format!("state path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer(&mut writer, self)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved tracker state to {:?}", path);
        Ok(())
    }

    /// Load state, modify it, and save it back under the writer lock
    ///
    /// Concurrent updates are serialized, so none of them is lost. Nothing is
    /// written when `f` fails, and a corrupt state file is reported as
    /// [`Error::State`] instead of being overwritten.
    pub fn update<F, T>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&mut TrackerState) -> Result<T>,
    {
        let _lock = WriterLock::acquire(path)?;

        let mut state = read_state_file(path)?.unwrap_or_default();
        let value = f(&mut state)?;
        state.write_atomic(path)?;
        Ok(value)
    }

    // ------------------------------------------------------------------------
    // Habits
    // ------------------------------------------------------------------------

    pub fn habit(&self, id: u64) -> Result<&Habit> {
        self.habits
            .iter()
            .find(|h| h.id == id)
            .ok_or(Error::HabitNotFound(id))
    }

    fn habit_index(&self, id: u64) -> Result<usize> {
        self.habits
            .iter()
            .position(|h| h.id == id)
            .ok_or(Error::HabitNotFound(id))
    }

    fn completions_of(&self, habit_id: u64) -> Vec<HabitCompletion> {
        self.completions
            .iter()
            .filter(|c| c.habit_id == habit_id)
            .cloned()
            .collect()
    }

    /// Create a habit; a per-day target below 1 becomes 1
    pub fn add_habit(
        &mut self,
        title: &str,
        completions_per_day: u32,
        now: DateTime<Utc>,
    ) -> Result<Habit> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::Validation {
                field: "title".into(),
                value: title.to_string(),
            });
        }

        let habit = Habit {
            id: self.next_habit_id,
            title: title.to_string(),
            completions_per_day: completions_per_day.max(1),
            total_completions: 0,
            created_at: now,
        };
        self.next_habit_id += 1;
        self.habits.push(habit.clone());

        tracing::info!("Created habit {} ({:?})", habit.id, habit.title);
        Ok(habit)
    }

    /// Delete a habit together with its completion rows
    pub fn delete_habit(&mut self, id: u64) -> Result<Habit> {
        let index = self.habit_index(id)?;
        let habit = self.habits.remove(index);
        self.completions.retain(|c| c.habit_id != id);

        tracing::info!("Deleted habit {} ({:?})", habit.id, habit.title);
        Ok(habit)
    }

    pub fn habit_progress(&self, id: u64, today: NaiveDate) -> Result<HabitProgress> {
        let habit = self.habit(id)?;
        let count = habits::completions_today(habit, &self.completions, today);
        Ok(habits::progress(habit, count))
    }

    /// Record a completion, rejecting it once a bounded habit met its target
    /// when `enforce_limit` is set
    pub fn complete_habit(
        &mut self,
        id: u64,
        today: NaiveDate,
        now: DateTime<Utc>,
        enforce_limit: bool,
    ) -> Result<HabitProgress> {
        let index = self.habit_index(id)?;
        let habit = &self.habits[index];
        let rows = self.completions_of(id);

        if enforce_limit && habit.is_bounded() {
            let count = habits::completions_today(habit, &rows, today);
            if count >= habit.completions_per_day as usize {
                return Err(Error::LimitReached {
                    habit_id: id,
                    max: habit.completions_per_day,
                });
            }
        }

        // Ids are unique across all habits, not just this one
        let next_id = self.completions.iter().map(|c| c.id).max().unwrap_or(0);
        let mut recorded = habits::record_completion(habit, &rows, today, now);
        recorded.completion.id = recorded.completion.id.max(next_id + 1);

        self.completions.push(recorded.completion);
        self.habits[index] = recorded.habit;

        tracing::info!(
            "Habit {} completed ({} today, {} total)",
            id,
            recorded.completions_today,
            self.habits[index].total_completions
        );
        Ok(habits::progress(&self.habits[index], recorded.completions_today))
    }

    /// Soft-delete today's latest completion
    pub fn uncomplete_habit(
        &mut self,
        id: u64,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<HabitProgress> {
        let index = self.habit_index(id)?;
        let rows = self.completions_of(id);
        let removed = habits::remove_completion(&self.habits[index], &rows, today, now)?;

        if let Some(row) = self.completions.iter_mut().find(|c| c.id == removed.removed.id) {
            *row = removed.removed;
        }
        self.habits[index] = removed.habit;

        tracing::info!(
            "Habit {} completion removed ({} today, {} total)",
            id,
            removed.completions_today,
            self.habits[index].total_completions
        );
        Ok(habits::progress(&self.habits[index], removed.completions_today))
    }

    // ------------------------------------------------------------------------
    // Exercise preferences
    // ------------------------------------------------------------------------

    /// Stored preference, or a default one for exercises never configured
    pub fn preference(&self, exercise_id: &str) -> ExercisePreference {
        self.preferences
            .get(exercise_id)
            .cloned()
            .unwrap_or_else(|| ExercisePreference::new(exercise_id))
    }

    pub fn set_weight_increment(&mut self, exercise_id: &str, increment: f64) -> Result<ExercisePreference> {
        if !increment.is_finite() || increment <= 0.0 {
            return Err(Error::Validation {
                field: "weight_increment".into(),
                value: increment.to_string(),
            });
        }

        let pref = self
            .preferences
            .entry(exercise_id.to_string())
            .or_insert_with(|| ExercisePreference::new(exercise_id));
        pref.weight_increment = increment;

        tracing::info!("Weight increment for {} set to {}", exercise_id, increment);
        Ok(pref.clone())
    }
}
