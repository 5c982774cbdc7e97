use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracker_core::csv_rollup::{cleanup_processed_wals, wal_to_csv_and_archive};
use tracker_core::progression::{normalize_increment, parse_set_columns};
use tracker_core::*;

#[derive(Parser)]
#[command(name = "trk")]
#[command(about = "Personal workout and habit tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log the sets performed for an exercise and show the next goal
    Log {
        /// Exercise identifier (e.g. hip_abduction)
        exercise: String,

        /// Comma-separated weights, one per set
        #[arg(long)]
        weights: String,

        /// Comma-separated reps, one per set
        #[arg(long)]
        reps: String,

        #[arg(long, default_value = "lbs")]
        unit: WeightUnit,

        /// Date performed (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show the goal for the next session
    Goal {
        /// Exercise to look up in the workout history
        #[arg(required_unless_present = "weights")]
        exercise: Option<String>,

        /// Ad hoc previous weights instead of history
        #[arg(long, requires = "reps")]
        weights: Option<String>,

        /// Ad hoc previous reps instead of history
        #[arg(long, requires = "weights")]
        reps: Option<String>,

        #[arg(long)]
        unit: Option<WeightUnit>,

        /// Override the weight increment (non-positive values use the default)
        #[arg(long, allow_negative_numbers = true)]
        increment: Option<f64>,
    },

    /// Set the weight increment used for an exercise
    Increment {
        exercise: String,
        value: f64,
    },

    /// Manage habits
    Habit {
        #[command(subcommand)]
        command: HabitCommands,
    },

    /// Roll up the workout WAL to CSV
    Rollup {
        /// Clean up processed WAL files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

#[derive(Subcommand)]
enum HabitCommands {
    /// Create a habit
    Add {
        title: String,

        /// Completions needed per day (above 100 means no daily target)
        #[arg(long, default_value_t = 1)]
        per_day: u32,
    },

    /// List habits with today's progress
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Record a completion for today
    Done {
        id: String,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Remove today's latest completion
    Undo {
        id: String,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Delete a habit and its completions
    Remove { id: String },
}

/// Files under the data directory
struct Paths {
    state: PathBuf,
    wal_dir: PathBuf,
    wal: PathBuf,
    csv: PathBuf,
}

impl Paths {
    fn new(data_dir: &Path) -> Self {
        let wal_dir = data_dir.join("wal");
        Self {
            state: data_dir.join("state.json"),
            wal: wal_dir.join("workouts.wal"),
            wal_dir,
            csv: data_dir.join("workouts.csv"),
        }
    }
}

fn main() -> ExitCode {
    tracker_core::logging::init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error [{}]: {}", e.status_code(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let paths = Paths::new(&data_dir);
    tracing::debug!("Using data directory {:?}", data_dir);

    match cli.command {
        Commands::Log {
            exercise,
            weights,
            reps,
            unit,
            date,
        } => cmd_log(&paths, &config, &exercise, &weights, &reps, unit, date),
        Commands::Goal {
            exercise,
            weights,
            reps,
            unit,
            increment,
        } => cmd_goal(&paths, &config, exercise, weights, reps, unit, increment),
        Commands::Increment { exercise, value } => cmd_increment(&paths, &exercise, value),
        Commands::Habit { command } => cmd_habit(&paths, &config, command, cli.json),
        Commands::Rollup { cleanup } => cmd_rollup(&paths, cleanup),
    }
}

fn today_or(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Local::now().date_naive())
}

fn increment_for(state: &TrackerState, config: &Config, exercise: &str) -> f64 {
    state
        .preferences
        .get(exercise)
        .map(|p| p.effective_increment())
        .unwrap_or(config.progression.default_weight_increment)
}

fn cmd_log(
    paths: &Paths,
    config: &Config,
    exercise: &str,
    weights: &str,
    reps: &str,
    unit: WeightUnit,
    date: Option<NaiveDate>,
) -> Result<()> {
    let weight_count = weights.split(',').count();
    let rep_count = reps.split(',').count();
    if weight_count != rep_count {
        return Err(Error::Validation {
            field: "reps".into(),
            value: format!("{} weights but {} reps", weight_count, rep_count),
        });
    }

    let sets = parse_set_columns(weights, reps, unit)
        .into_iter()
        .collect::<Result<Vec<_>>>()?;
    if sets.is_empty() {
        return Err(Error::Validation {
            field: "weights".into(),
            value: weights.to_string(),
        });
    }

    let log = ExerciseLog {
        id: uuid::Uuid::new_v4(),
        exercise_id: exercise.to_string(),
        performed_on: today_or(date),
        sets,
        logged_at: Utc::now(),
    };

    let mut sink = JsonlSink::new(&paths.wal);
    sink.append(&log)?;
    println!("✓ Logged {} sets of {} on {}", log.sets.len(), exercise, log.performed_on);

    let state = TrackerState::load(&paths.state)?;
    let increment = increment_for(&state, config, exercise);
    display_goal(exercise, compute_goal(&log.sets, increment), unit, increment);

    Ok(())
}

fn cmd_goal(
    paths: &Paths,
    config: &Config,
    exercise: Option<String>,
    weights: Option<String>,
    reps: Option<String>,
    unit: Option<WeightUnit>,
    increment: Option<f64>,
) -> Result<()> {
    let state = TrackerState::load(&paths.state)?;
    let label = exercise.clone().unwrap_or_else(|| "ad hoc sets".to_string());
    let increment = normalize_increment(match (increment, &exercise) {
        (Some(value), _) => value,
        (None, Some(exercise)) => increment_for(&state, config, exercise),
        (None, None) => config.progression.default_weight_increment,
    });

    if let (Some(weights), Some(reps)) = (weights, reps) {
        let unit = unit.unwrap_or_default();
        display_goal(
            &label,
            goal_from_columns(&weights, &reps, unit, increment),
            unit,
            increment,
        );
        return Ok(());
    }

    let exercise = exercise.ok_or_else(|| Error::Validation {
        field: "exercise".into(),
        value: String::new(),
    })?;

    match last_log_for(&paths.wal, &paths.csv, &exercise)? {
        Some(log) => {
            let unit = unit
                .or_else(|| log.sets.first().map(|s| s.unit))
                .unwrap_or_default();
            println!(
                "Last session ({}): {}",
                log.performed_on,
                log.sets
                    .iter()
                    .map(|s| format!("{}x{}", s.weight, s.reps))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            display_goal(&exercise, compute_goal(&log.sets, increment), unit, increment);
        }
        None => display_goal(&exercise, None, unit.unwrap_or_default(), increment),
    }

    Ok(())
}

fn display_goal(label: &str, goals: Option<Vec<GoalSet>>, unit: WeightUnit, increment: f64) {
    let Some(goals) = goals else {
        println!("No previous data for {} - log a session first.", label);
        return;
    };

    println!("Next goal for {} (increment {} {}):", label, increment, unit);
    for goal in goals {
        println!(
            "  Set {}: {} {} x {} reps",
            goal.source_set_index + 1,
            goal.weight,
            unit,
            goal.reps
        );
    }
}

fn cmd_increment(paths: &Paths, exercise: &str, value: f64) -> Result<()> {
    let pref = TrackerState::update(&paths.state, |state| {
        state.set_weight_increment(exercise, value)
    })?;

    println!(
        "✓ Weight increment for {} set to {}",
        pref.exercise_id, pref.weight_increment
    );
    Ok(())
}

fn cmd_habit(paths: &Paths, config: &Config, command: HabitCommands, json: bool) -> Result<()> {
    match command {
        HabitCommands::Add { title, per_day } => {
            let habit = TrackerState::update(&paths.state, |state| {
                state.add_habit(&title, per_day, Utc::now())
            })?;
            if json {
                println!("{}", serde_json::to_string(&habit)?);
            } else {
                println!("✓ Created habit {}: {}", habit.id, habit.title);
            }
        }

        HabitCommands::List { date } => {
            let today = today_or(date);
            let state = TrackerState::load(&paths.state)?;
            let progress = state
                .habits
                .iter()
                .map(|h| state.habit_progress(h.id, today))
                .collect::<Result<Vec<_>>>()?;

            if json {
                println!("{}", serde_json::to_string(&progress)?);
            } else if state.habits.is_empty() {
                println!("No habits yet.");
            } else {
                for (habit, p) in state.habits.iter().zip(&progress) {
                    display_habit(habit, p);
                }
            }
        }

        HabitCommands::Done { id, date } => {
            let id = parse_habit_id(&id)?;
            let today = today_or(date);
            let progress = TrackerState::update(&paths.state, |state| {
                state.complete_habit(id, today, Utc::now(), config.habits.enforce_daily_limit)
            })?;
            print_progress(paths, &progress, json)?;
        }

        HabitCommands::Undo { id, date } => {
            let id = parse_habit_id(&id)?;
            let today = today_or(date);
            let progress = TrackerState::update(&paths.state, |state| {
                state.uncomplete_habit(id, today, Utc::now())
            })?;
            print_progress(paths, &progress, json)?;
        }

        HabitCommands::Remove { id } => {
            let id = parse_habit_id(&id)?;
            let habit = TrackerState::update(&paths.state, |state| state.delete_habit(id))?;
            println!("✓ Deleted habit {}: {}", habit.id, habit.title);
        }
    }

    Ok(())
}

fn print_progress(paths: &Paths, progress: &HabitProgress, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(progress)?);
        return Ok(());
    }

    let state = TrackerState::load(&paths.state)?;
    let habit = state.habit(progress.habit_id)?;
    display_habit(habit, progress);
    Ok(())
}

fn display_habit(habit: &Habit, progress: &HabitProgress) {
    let target = if habit.is_bounded() {
        format!("{}/{}", progress.completions_today, habit.completions_per_day)
    } else {
        format!("{} today", progress.completions_today)
    };
    let mark = if progress.is_complete { "✓" } else { " " };

    println!(
        "[{}] {:>3}  {:<30} {:>10}  level {}",
        mark, habit.id, habit.title, target, progress.level
    );
}

fn cmd_rollup(paths: &Paths, cleanup: bool) -> Result<()> {
    if !paths.wal.exists() {
        println!("No WAL file found - nothing to roll up.");
        return Ok(());
    }

    let count = wal_to_csv_and_archive(&paths.wal, &paths.csv)?;

    println!("✓ Rolled up {} logs to CSV", count);
    println!("  CSV: {}", paths.csv.display());

    if cleanup {
        let cleaned = cleanup_processed_wals(&paths.wal_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed WAL files", cleaned);
        }
    }

    Ok(())
}
