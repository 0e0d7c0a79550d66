//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Seed helpers for users, catalog entries and logged sessions
//! - Mock data factories for the pure engine functions
//! - Helper assertions

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;

use crate::classifier::RuleTable;
use crate::config::EngineConfig;
use crate::db::AppState;
use crate::history::{PerformedExercise, SessionRecord};
use crate::models::{
  format_timestamp, Equipment, Exercise, ExerciseCategory, ExerciseSet, MuscleGroup, RecommendationTier,
  SessionStatus, WorkoutSession,
};

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  // Run migrations
  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Create a file-backed SQLite database for tests that need several live
/// connections, e.g. concurrent writers. Each call gets its own file under
/// the temp dir; remove it with `teardown_file_test_db`.
pub async fn setup_file_test_db(max_connections: u32) -> (SqlitePool, PathBuf) {
  let nanos = std::time::SystemTime::now()
    .duration_since(std::time::UNIX_EPOCH)
    .map(|d| d.as_nanos())
    .unwrap_or_default();
  let path = std::env::temp_dir().join(format!("lift-coach-test-{}-{}.db", std::process::id(), nanos));

  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(max_connections)
    .connect(&format!("sqlite://{}?mode=rwc", path.display()))
    .await
    .expect("Failed to create file database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  (pool, path)
}

/// Close a file-backed test pool and delete its files
pub async fn teardown_file_test_db(pool: SqlitePool, path: PathBuf) {
  pool.close().await;
  for suffix in ["", "-wal", "-shm", "-journal"] {
    let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
  }
}

/// App state over a fresh test database with default tunables and no LLM
pub async fn setup_test_state() -> AppState {
  AppState {
    db: setup_test_db().await,
    config: EngineConfig::default(),
    rules: RuleTable::default(),
    llm: None,
  }
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Insert a user and return its id
pub async fn seed_user(
  pool: &SqlitePool,
  experience_level: &str,
  body_weight: Option<f64>,
  weekly_workout_days: Option<i64>,
) -> i64 {
  sqlx::query(
    r#"
    INSERT INTO users (name, experience_level, gender, body_weight, weekly_workout_days)
    VALUES (?1, ?2, 'male', ?3, ?4)
    "#,
  )
  .bind("Test Lifter")
  .bind(experience_level)
  .bind(body_weight)
  .bind(weekly_workout_days)
  .execute(pool)
  .await
  .expect("Failed to seed user")
  .last_insert_rowid()
}

/// Insert one catalog entry. `muscle_groups` is the stored comma-separated list.
pub async fn seed_exercise(
  pool: &SqlitePool,
  name: &str,
  category: &str,
  muscle_groups: &str,
  equipment: Option<&str>,
  tier: &str,
) -> i64 {
  sqlx::query(
    r#"
    INSERT INTO exercises (name, category, muscle_groups, equipment, recommendation_tier)
    VALUES (?1, ?2, ?3, ?4, ?5)
    "#,
  )
  .bind(name)
  .bind(category)
  .bind(muscle_groups)
  .bind(equipment)
  .bind(tier)
  .execute(pool)
  .await
  .expect("Failed to seed exercise")
  .last_insert_rowid()
}

/// Ids of the standard test catalog
#[derive(Debug, Clone, Copy)]
pub struct SeededExercises {
  pub back_squat: i64,
  pub bench_press: i64,
  pub barbell_row: i64,
  pub overhead_press: i64,
  pub romanian_deadlift: i64,
  pub lat_pulldown: i64,
  pub barbell_curl: i64,
  pub plank: i64,
}

/// Seed a small catalog with one exercise per major movement
pub async fn seed_exercises(pool: &SqlitePool) -> SeededExercises {
  SeededExercises {
    back_squat: seed_exercise(pool, "Back Squat", "legs", "quadriceps,glutes,hamstrings", Some("barbell"), "essential").await,
    bench_press: seed_exercise(pool, "Barbell Bench Press", "chest", "chest,triceps,shoulders", Some("barbell"), "essential").await,
    barbell_row: seed_exercise(pool, "Barbell Row", "back", "back,lats,biceps", Some("barbell"), "essential").await,
    overhead_press: seed_exercise(pool, "Overhead Press", "shoulders", "shoulders,triceps", Some("barbell"), "standard").await,
    romanian_deadlift: seed_exercise(pool, "Romanian Deadlift", "legs", "hamstrings,glutes", Some("barbell"), "standard").await,
    lat_pulldown: seed_exercise(pool, "Lat Pulldown", "back", "lats,biceps", Some("cable"), "standard").await,
    barbell_curl: seed_exercise(pool, "Barbell Curl", "arms", "biceps", Some("barbell"), "standard").await,
    plank: seed_exercise(pool, "Plank", "core", "abs,core", Some("bodyweight"), "standard").await,
  }
}

/// Insert a completed session with three completed sets per exercise
pub async fn seed_completed_session(
  pool: &SqlitePool,
  user_id: i64,
  start_time: DateTime<Utc>,
  program_day: Option<i64>,
  program_cycle: Option<i64>,
  exercises: &[(i64, f64, i64)],
) -> i64 {
  let total_volume: f64 = exercises.iter().map(|(_, w, r)| w * *r as f64 * 3.0).sum();
  let end_time = start_time + Duration::minutes(60);

  let session_id = sqlx::query(
    r#"
    INSERT INTO workout_sessions (
      user_id, start_time, end_time, status, program_day, program_cycle,
      total_volume, duration_minutes
    )
    VALUES (?1, ?2, ?3, 'completed', ?4, ?5, ?6, 60)
    "#,
  )
  .bind(user_id)
  .bind(format_timestamp(&start_time))
  .bind(format_timestamp(&end_time))
  .bind(program_day)
  .bind(program_cycle)
  .bind(total_volume)
  .execute(pool)
  .await
  .expect("Failed to seed session")
  .last_insert_rowid();

  for (idx, (exercise_id, weight, reps)) in exercises.iter().enumerate() {
    let workout_exercise_id = sqlx::query(
      r#"
      INSERT INTO workout_exercises (session_id, exercise_id, order_in_session, total_volume)
      VALUES (?1, ?2, ?3, ?4)
      "#,
    )
    .bind(session_id)
    .bind(*exercise_id)
    .bind(idx as i64 + 1)
    .bind(weight * *reps as f64 * 3.0)
    .execute(pool)
    .await
    .expect("Failed to seed workout exercise")
    .last_insert_rowid();

    for set_number in 1..=3 {
      sqlx::query(
        r#"
        INSERT INTO exercise_sets (workout_exercise_id, set_number, weight, reps, completed, completed_at)
        VALUES (?1, ?2, ?3, ?4, 1, ?5)
        "#,
      )
      .bind(workout_exercise_id)
      .bind(set_number)
      .bind(*weight)
      .bind(*reps)
      .bind(format_timestamp(&start_time))
      .execute(pool)
      .await
      .expect("Failed to seed set");
    }
  }

  session_id
}

pub async fn seed_personal_record(
  pool: &SqlitePool,
  user_id: i64,
  exercise_id: i64,
  weight: f64,
  date: DateTime<Utc>,
) -> i64 {
  sqlx::query("INSERT INTO personal_records (user_id, exercise_id, weight, reps, date) VALUES (?1, ?2, ?3, 1, ?4)")
    .bind(user_id)
    .bind(exercise_id)
    .bind(weight)
    .bind(format_timestamp(&date))
    .execute(pool)
    .await
    .expect("Failed to seed personal record")
    .last_insert_rowid()
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// Create a catalog entry for pure-function tests
pub fn mock_exercise(
  id: i64,
  name: &str,
  category: ExerciseCategory,
  muscle_groups: &[MuscleGroup],
  equipment: Option<Equipment>,
) -> Exercise {
  Exercise {
    id,
    name: name.to_string(),
    category,
    muscle_groups: muscle_groups.to_vec(),
    equipment,
    difficulty: 50,
    popularity: 50,
    is_basic_exercise: false,
    recommendation_tier: RecommendationTier::Standard,
  }
}

/// Create a session N days ago with three completed sets per
/// `(exercise_id, weight, reps)` entry. `program` is `(day, cycle)`.
pub fn mock_session_record(
  id: i64,
  days_ago: i64,
  status: SessionStatus,
  program: Option<(i64, i64)>,
  exercises: &[(i64, f64, i64)],
) -> SessionRecord {
  let start_time = datetime_days_ago(days_ago);

  let performed: Vec<PerformedExercise> = exercises
    .iter()
    .enumerate()
    .map(|(idx, (exercise_id, weight, reps))| {
      let workout_exercise_id = id * 100 + idx as i64;
      PerformedExercise {
        workout_exercise_id,
        exercise_id: *exercise_id,
        order_in_session: idx as i64 + 1,
        sets: (1..=3)
          .map(|n| ExerciseSet {
            id: workout_exercise_id * 10 + n,
            workout_exercise_id,
            set_number: n,
            weight: *weight,
            reps: *reps,
            rpe: None,
            completed: true,
            completed_at: Some(start_time),
          })
          .collect(),
      }
    })
    .collect();

  let total_volume = performed
    .iter()
    .flat_map(|p| p.sets.iter())
    .map(|s| s.volume())
    .sum();

  SessionRecord {
    session: WorkoutSession {
      id,
      user_id: 1,
      start_time,
      end_time: Some(start_time + Duration::minutes(60)),
      status,
      workout_type: None,
      program_day: program.map(|(day, _)| day),
      program_cycle: program.map(|(_, cycle)| cycle),
      total_volume,
      duration_minutes: Some(60),
    },
    exercises: performed,
  }
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// Create a DateTime N days ago from now
pub fn datetime_days_ago(days: i64) -> DateTime<Utc> {
  Utc::now() - Duration::days(days)
}

/// Create a DateTime representing now
pub fn datetime_now() -> DateTime<Utc> {
  Utc::now()
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    // Verify key tables exist
    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('users', 'exercises', 'workout_sessions', 'exercise_sets', 'personal_records')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 5, "Expected 5 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_session_inserts_three_sets_per_exercise() {
    let pool = setup_test_db().await;
    let user_id = seed_user(&pool, "novice", None, None).await;
    let ids = seed_exercises(&pool).await;

    seed_completed_session(
      &pool,
      user_id,
      datetime_days_ago(1),
      None,
      None,
      &[(ids.bench_press, 60.0, 8), (ids.barbell_row, 50.0, 10)],
    )
    .await;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exercise_sets")
      .fetch_one(&pool)
      .await
      .expect("Failed to count sets");
    assert_eq!(count, 6);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_mock_session_volume_matches_sets() {
    let record = mock_session_record(4, 2, SessionStatus::Completed, Some((2, 1)), &[(1, 100.0, 5)]);

    assert_eq!(record.exercises[0].sets.len(), 3);
    assert_approx_eq!(record.session.total_volume, 1500.0, 1e-9);
    assert_eq!(record.session.program_day, Some(2));
  }

  #[test]
  fn test_datetime_helpers_produce_correct_dates() {
    let now = datetime_now();
    let past = datetime_days_ago(7);

    let diff = now - past;
    // Allow for slight timing differences (6-8 days is acceptable)
    assert!(diff.num_days() >= 6 && diff.num_days() <= 8,
            "Expected ~7 days difference, got {}", diff.num_days());
  }
}
