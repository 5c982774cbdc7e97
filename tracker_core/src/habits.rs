//! Habit completion counting.
//!
//! Completions are counted per calendar day. Removing a completion marks the
//! most recent active row for the day as deleted rather than dropping it, and
//! the lifetime total never goes below zero.

use crate::{CompletionStatus, Error, Habit, HabitCompletion, HabitProgress, Result};
use chrono::{DateTime, NaiveDate, Utc};

/// Result of recording a completion
#[derive(Clone, Debug)]
pub struct CompletionRecorded {
    pub completion: HabitCompletion,
    pub habit: Habit,
    pub completions_today: usize,
}

/// Result of removing a completion
#[derive(Clone, Debug)]
pub struct CompletionRemoved {
    pub removed: HabitCompletion,
    pub habit: Habit,
    pub completions_today: usize,
}

/// Count active completions of `habit` dated `today`
pub fn completions_today(habit: &Habit, completions: &[HabitCompletion], today: NaiveDate) -> usize {
    completions
        .iter()
        .filter(|c| c.habit_id == habit.id && c.completion_date == today && c.is_active())
        .count()
}

/// Whether the daily target is met
///
/// Habits above the unbounded threshold are never complete.
pub fn is_complete(habit: &Habit, completions_today: usize) -> bool {
    if !habit.is_bounded() {
        return false;
    }
    completions_today >= habit.completions_per_day as usize
}

/// Record a new completion for `today`
///
/// The lifetime total is incremented unconditionally; daily caps are applied
/// by the caller before getting here. The new row id is one above the highest
/// supplied id.
pub fn record_completion(
    habit: &Habit,
    completions: &[HabitCompletion],
    today: NaiveDate,
    now: DateTime<Utc>,
) -> CompletionRecorded {
    let next_id = completions.iter().map(|c| c.id).max().unwrap_or(0) + 1;

    let completion = HabitCompletion {
        id: next_id,
        habit_id: habit.id,
        completion_date: today,
        created_at: now,
        status: CompletionStatus::Active,
    };

    let mut updated = habit.clone();
    updated.total_completions = updated.total_completions.saturating_add(1);

    let count = completions_today(habit, completions, today) + 1;

    tracing::debug!(
        "Recorded completion {} for habit {} on {} ({} today, {} total)",
        completion.id,
        habit.id,
        today,
        count,
        updated.total_completions
    );

    CompletionRecorded {
        completion,
        habit: updated,
        completions_today: count,
    }
}

/// Soft-delete the latest active completion for `today`
///
/// Fails with [`Error::NotFound`] when there is nothing to remove for the day.
pub fn remove_completion(
    habit: &Habit,
    completions: &[HabitCompletion],
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<CompletionRemoved> {
    let latest = completions
        .iter()
        .filter(|c| c.habit_id == habit.id && c.completion_date == today && c.is_active())
        .max_by_key(|c| c.id)
        .ok_or(Error::NotFound {
            habit_id: habit.id,
            day: today,
        })?;

    let mut removed = latest.clone();
    removed.status = CompletionStatus::Deleted { at: now };

    let mut updated = habit.clone();
    updated.total_completions = updated.total_completions.saturating_sub(1);

    let count = completions_today(habit, completions, today) - 1;

    tracing::debug!(
        "Removed completion {} for habit {} on {} ({} today, {} total)",
        removed.id,
        habit.id,
        today,
        count,
        updated.total_completions
    );

    Ok(CompletionRemoved {
        removed,
        habit: updated,
        completions_today: count,
    })
}

/// Build the snapshot returned to callers
pub fn progress(habit: &Habit, completions_today: usize) -> HabitProgress {
    HabitProgress {
        habit_id: habit.id,
        completions_today,
        total_completions: habit.total_completions,
        level: habit.total_completions,
        is_complete: is_complete(habit, completions_today),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn habit(per_day: u32, total: u64) -> Habit {
        Habit {
            id: 1,
            title: "Drink water".into(),
            completions_per_day: per_day,
            total_completions: total,
            created_at: at(0),
        }
    }

    fn completion(id: u64, habit_id: u64, date: NaiveDate) -> HabitCompletion {
        HabitCompletion {
            id,
            habit_id,
            completion_date: date,
            created_at: at(1),
            status: CompletionStatus::Active,
        }
    }

    /// Apply a removal to the row list the way a store would
    fn apply_removal(rows: &mut [HabitCompletion], removed: &HabitCompletion) {
        if let Some(row) = rows.iter_mut().find(|c| c.id == removed.id) {
            *row = removed.clone();
        }
    }

    #[test]
    fn test_completions_today_ignores_other_days_habits_and_deleted() {
        let h = habit(3, 0);
        let mut rows = vec![
            completion(1, 1, day(1)),
            completion(2, 1, day(1)),
            completion(3, 1, day(2)),
            completion(4, 2, day(1)),
        ];
        rows[1].status = CompletionStatus::Deleted { at: at(5) };

        assert_eq!(completions_today(&h, &rows, day(1)), 1);
        assert_eq!(completions_today(&h, &rows, day(2)), 1);
        assert_eq!(completions_today(&h, &rows, day(3)), 0);
    }

    #[test]
    fn test_record_completion() {
        let h = habit(2, 4);
        let rows = vec![completion(7, 1, day(1))];

        let recorded = record_completion(&h, &rows, day(1), at(9));

        assert_eq!(recorded.completion.id, 8);
        assert_eq!(recorded.completion.completion_date, day(1));
        assert!(recorded.completion.is_active());
        assert_eq!(recorded.habit.total_completions, 5);
        assert_eq!(recorded.completions_today, 2);
        assert_eq!(h.total_completions, 4);
    }

    #[test]
    fn test_record_has_no_cap() {
        let h = habit(1, 0);
        let mut rows = Vec::new();
        let mut current = h.clone();

        for _ in 0..3 {
            let recorded = record_completion(&current, &rows, day(1), at(9));
            rows.push(recorded.completion);
            current = recorded.habit;
        }

        assert_eq!(current.total_completions, 3);
        assert_eq!(completions_today(&current, &rows, day(1)), 3);
    }

    #[test]
    fn test_remove_picks_latest() {
        let h = habit(3, 2);
        let rows = vec![completion(4, 1, day(1)), completion(9, 1, day(1))];

        let removed = remove_completion(&h, &rows, day(1), at(10)).unwrap();

        assert_eq!(removed.removed.id, 9);
        assert_eq!(removed.removed.status, CompletionStatus::Deleted { at: at(10) });
        assert_eq!(removed.habit.total_completions, 1);
        assert_eq!(removed.completions_today, 1);
    }

    #[test]
    fn test_remove_twice_with_single_completion() {
        let h = habit(1, 1);
        let mut rows = vec![completion(1, 1, day(1))];

        let first = remove_completion(&h, &rows, day(1), at(10)).unwrap();
        assert_eq!(first.habit.total_completions, 0);
        apply_removal(&mut rows, &first.removed);

        let second = remove_completion(&first.habit, &rows, day(1), at(11));
        match second {
            Err(Error::NotFound { habit_id, day: d }) => {
                assert_eq!(habit_id, 1);
                assert_eq!(d, day(1));
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
        assert_eq!(first.habit.total_completions, 0);
    }

    #[test]
    fn test_remove_other_day_is_not_found() {
        let h = habit(1, 1);
        let rows = vec![completion(1, 1, day(1))];

        assert!(matches!(
            remove_completion(&h, &rows, day(2), at(10)),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_total_floor_at_zero() {
        // Inconsistent bookkeeping: rows exist but the total is already 0
        let h = habit(5, 0);
        let mut rows = vec![completion(1, 1, day(1)), completion(2, 1, day(1))];
        let mut current = h;

        for _ in 0..2 {
            let removed = remove_completion(&current, &rows, day(1), at(10)).unwrap();
            apply_removal(&mut rows, &removed.removed);
            current = removed.habit;
            assert_eq!(current.total_completions, 0);
        }
    }

    #[test]
    fn test_is_complete() {
        assert!(!is_complete(&habit(2, 0), 1));
        assert!(is_complete(&habit(2, 0), 2));
        assert!(is_complete(&habit(2, 0), 3));
        assert!(is_complete(&habit(100, 0), 100));
    }

    #[test]
    fn test_high_completion_sentinel() {
        let h = habit(999, 0);
        for count in [0, 1, 100, 999, 5000] {
            assert!(!is_complete(&h, count));
        }
        assert!(!is_complete(&habit(101, 0), 101));
    }

    #[test]
    fn test_progress_snapshot() {
        let p = progress(&habit(1, 12), 1);
        assert_eq!(p.completions_today, 1);
        assert_eq!(p.total_completions, 12);
        assert_eq!(p.level, 12);
        assert!(p.is_complete);
    }
}
