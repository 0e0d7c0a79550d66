//! Training history snapshot
//!
//! A request reads the user's profile, sessions, sets, records and recovery
//! rows once. Every engine below works on this snapshot and never touches the
//! database itself, so identical snapshots always give identical answers.
//!
//! Malformed rows (unparsable timestamps, unknown muscle groups) are logged
//! and skipped rather than failing the whole request.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqliteExecutor, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::coaching::CoachingStyle;
use crate::error::EngineError;
use crate::models::{
  parse_timestamp, Equipment, Exercise, ExerciseCategory, ExerciseSet, MuscleGroup, MuscleRecovery,
  PersonalRecord, ProgramType, RecommendationTier, SessionStatus, UserProfile, WorkoutSession,
};

/// ---------------------------------------------------------------------------
/// Snapshot Types
/// ---------------------------------------------------------------------------

/// One exercise performed (or planned) within a session, with its sets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformedExercise {
  pub workout_exercise_id: i64,
  pub exercise_id: i64,
  pub order_in_session: i64,
  pub sets: Vec<ExerciseSet>,
}

impl PerformedExercise {
  pub fn completed_sets(&self) -> impl Iterator<Item = &ExerciseSet> {
    self.sets.iter().filter(|s| s.completed)
  }

  pub fn top_set_weight(&self) -> Option<f64> {
    self
      .completed_sets()
      .map(|s| s.weight)
      .filter(|w| w.is_finite())
      .fold(None, |acc: Option<f64>, w| Some(acc.map_or(w, |a| a.max(w))))
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
  pub session: WorkoutSession,
  pub exercises: Vec<PerformedExercise>,
}

impl SessionRecord {
  pub fn start_time(&self) -> DateTime<Utc> {
    self.session.start_time
  }

  pub fn is_completed(&self) -> bool {
    self.session.status == SessionStatus::Completed
  }

  pub fn is_active_work(&self) -> bool {
    self.session.status.is_active_work()
  }

  pub fn contains_exercise(&self, exercise_id: i64) -> bool {
    self.exercises.iter().any(|e| e.exercise_id == exercise_id)
  }
}

/// Everything the engines need to know about one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingHistory {
  pub profile: UserProfile,
  /// Most recent first
  pub sessions: Vec<SessionRecord>,
  pub personal_records: Vec<PersonalRecord>,
  pub recovery: Vec<MuscleRecovery>,
}

impl TrainingHistory {
  /// Empty history for a profile, used for cold starts and in tests
  pub fn empty(profile: UserProfile) -> Self {
    Self {
      profile,
      sessions: Vec::new(),
      personal_records: Vec::new(),
      recovery: Vec::new(),
    }
  }

  pub fn user_id(&self) -> i64 {
    self.profile.user_id
  }

  /// Sort sessions most recent first. Loaders call this; builders in tests may too.
  pub fn sort_sessions(&mut self) {
    self
      .sessions
      .sort_by(|a, b| b.start_time().cmp(&a.start_time()).then(b.session.id.cmp(&a.session.id)));
  }

  pub fn session_list(&self) -> Vec<WorkoutSession> {
    self.sessions.iter().map(|r| r.session.clone()).collect()
  }

  /// Completed sessions, most recent first
  pub fn completed(&self) -> impl Iterator<Item = &SessionRecord> {
    self.sessions.iter().filter(|r| r.is_completed())
  }

  pub fn completed_since(&self, since: DateTime<Utc>) -> impl Iterator<Item = &SessionRecord> {
    self.completed().filter(move |r| r.start_time() >= since)
  }

  /// Best personal record for an exercise (max weight)
  pub fn best_record(&self, exercise_id: i64) -> Option<&PersonalRecord> {
    self
      .personal_records
      .iter()
      .filter(|pr| pr.exercise_id == exercise_id && pr.weight.is_finite())
      .max_by(|a, b| a.weight.total_cmp(&b.weight))
  }

  /// How often each exercise appeared in active sessions since `since`
  pub fn exercise_counts_since(&self, since: DateTime<Utc>) -> HashMap<i64, usize> {
    let mut counts = HashMap::new();
    for record in self.sessions.iter().filter(|r| r.is_active_work() && r.start_time() >= since) {
      for exercise in &record.exercises {
        *counts.entry(exercise.exercise_id).or_insert(0) += 1;
      }
    }
    counts
  }

  /// Most recent completed session containing the exercise
  pub fn last_session_with(&self, exercise_id: i64) -> Option<&SessionRecord> {
    self.completed().find(|r| r.contains_exercise(exercise_id))
  }

  /// Completed sets of one exercise since `since`, paired with their session
  /// start, most recent session first
  pub fn exercise_sets_since(
    &self,
    exercise_id: i64,
    since: DateTime<Utc>,
  ) -> Vec<(DateTime<Utc>, &ExerciseSet)> {
    let mut out = Vec::new();
    for record in self.completed_since(since) {
      for performed in record.exercises.iter().filter(|e| e.exercise_id == exercise_id) {
        let mut sets: Vec<&ExerciseSet> = performed.completed_sets().collect();
        sets.sort_by(|a, b| b.set_number.cmp(&a.set_number));
        out.extend(sets.into_iter().map(|s| (record.start_time(), s)));
      }
    }
    out
  }

  /// Active sessions started within the last `hours`
  pub fn sessions_within_hours(&self, now: DateTime<Utc>, hours: i64) -> impl Iterator<Item = &SessionRecord> {
    let since = now - Duration::hours(hours);
    self
      .sessions
      .iter()
      .filter(move |r| r.is_active_work() && r.start_time() >= since && r.start_time() <= now)
  }
}

/// ---------------------------------------------------------------------------
/// Loading
/// ---------------------------------------------------------------------------

/// Load the full snapshot for a user
pub async fn load_history(pool: &SqlitePool, user_id: i64) -> Result<TrainingHistory, EngineError> {
  let profile = load_profile(pool, user_id).await?;
  let sessions = load_sessions(pool, user_id).await?;
  let personal_records = load_personal_records(pool, user_id).await?;
  let recovery = load_recovery(pool, user_id).await?;

  debug!(
    user_id,
    sessions = sessions.len(),
    records = personal_records.len(),
    "Loaded training history"
  );

  let mut history = TrainingHistory {
    profile,
    sessions,
    personal_records,
    recovery,
  };
  history.sort_sessions();
  Ok(history)
}

fn parse_or_default<T: std::str::FromStr<Err = String> + Default>(value: Option<String>, field: &str, user_id: i64) -> T {
  match value {
    Some(raw) => raw.parse().unwrap_or_else(|e: String| {
      warn!(user_id, field, error = %e, "Unparsable profile field, using default");
      T::default()
    }),
    None => T::default(),
  }
}

pub async fn load_profile(pool: &SqlitePool, user_id: i64) -> Result<UserProfile, EngineError> {
  let row = sqlx::query(
    r#"
    SELECT id, experience_level, gender, body_weight, weekly_workout_days,
           workout_split, available_equipment, coaching_style
    FROM users
    WHERE id = ?1
    "#,
  )
  .bind(user_id)
  .fetch_optional(pool)
  .await?
  .ok_or_else(|| EngineError::not_found("user", user_id))?;

  let split: Option<String> = row.get("workout_split");
  let workout_split = split.and_then(|s| match s.parse::<ProgramType>() {
    Ok(p) => Some(p),
    Err(e) => {
      warn!(user_id, error = %e, "Unparsable workout split, ignoring");
      None
    }
  });

  let style: Option<String> = row.get("coaching_style");
  let coaching_style = style.and_then(|s| match s.parse::<CoachingStyle>() {
    Ok(c) => Some(c),
    Err(e) => {
      warn!(user_id, error = %e, "Unparsable coaching style, ignoring");
      None
    }
  });

  let equipment: Option<String> = row.get("available_equipment");
  let available_equipment = parse_list::<Equipment>(equipment.as_deref().unwrap_or(""), "equipment", user_id);

  Ok(UserProfile {
    user_id,
    experience_level: parse_or_default(row.get("experience_level"), "experience_level", user_id),
    gender: parse_or_default(row.get("gender"), "gender", user_id),
    body_weight: row.get::<Option<f64>, _>("body_weight").filter(|w| w.is_finite() && *w > 0.0),
    weekly_workout_days: row.get::<Option<i64>, _>("weekly_workout_days").filter(|d| (1..=7).contains(d)),
    workout_split,
    available_equipment,
    coaching_style,
  })
}

/// Parse a comma-separated list, skipping entries that do not parse
fn parse_list<T: std::str::FromStr<Err = String>>(raw: &str, kind: &str, owner: i64) -> Vec<T> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .filter_map(|s| match s.parse() {
      Ok(v) => Some(v),
      Err(e) => {
        warn!(owner, kind, value = s, error = %e, "Skipping unparsable entry");
        None
      }
    })
    .collect()
}

fn session_from_row(row: &SqliteRow) -> Option<WorkoutSession> {
  let id: i64 = row.get("id");
  let start_raw: String = row.get("start_time");
  let start_time = match parse_timestamp(&start_raw) {
    Some(t) => t,
    None => {
      warn!(session_id = id, start_time = %start_raw, "Skipping session with malformed start time");
      return None;
    }
  };
  let status_raw: String = row.get("status");
  let status = match status_raw.parse::<SessionStatus>() {
    Ok(s) => s,
    Err(e) => {
      warn!(session_id = id, error = %e, "Skipping session with unknown status");
      return None;
    }
  };

  Some(WorkoutSession {
    id,
    user_id: row.get("user_id"),
    start_time,
    end_time: row.get::<Option<String>, _>("end_time").and_then(|s| parse_timestamp(&s)),
    status,
    workout_type: row.get::<Option<String>, _>("workout_type").and_then(|s| s.parse().ok()),
    program_day: row.get("program_day"),
    program_cycle: row.get("program_cycle"),
    total_volume: row.get("total_volume"),
    duration_minutes: row.get("duration_minutes"),
  })
}

/// Accepts a pool or an open transaction (`&mut *tx`).
pub async fn load_session<'e, E>(executor: E, session_id: i64) -> Result<WorkoutSession, EngineError>
where
  E: SqliteExecutor<'e>,
{
  let row = sqlx::query(
    r#"
    SELECT id, user_id, start_time, end_time, status, workout_type,
           program_day, program_cycle, total_volume, duration_minutes
    FROM workout_sessions
    WHERE id = ?1
    "#,
  )
  .bind(session_id)
  .fetch_optional(executor)
  .await?
  .ok_or_else(|| EngineError::not_found("session", session_id))?;

  session_from_row(&row)
    .ok_or_else(|| EngineError::Database(format!("session {} has malformed columns", session_id)))
}

/// A user's sessions without their exercises, newest first.
///
/// Session start reads through its write transaction so the program position
/// is derived from the same rows it abandons.
pub async fn load_session_list<'e, E>(executor: E, user_id: i64) -> Result<Vec<WorkoutSession>, EngineError>
where
  E: SqliteExecutor<'e>,
{
  let rows = sqlx::query(
    r#"
    SELECT id, user_id, start_time, end_time, status, workout_type,
           program_day, program_cycle, total_volume, duration_minutes
    FROM workout_sessions
    WHERE user_id = ?1
    ORDER BY start_time DESC, id DESC
    "#,
  )
  .bind(user_id)
  .fetch_all(executor)
  .await?;

  Ok(rows.iter().filter_map(session_from_row).collect())
}

async fn load_sessions(pool: &SqlitePool, user_id: i64) -> Result<Vec<SessionRecord>, EngineError> {
  let session_rows = sqlx::query(
    r#"
    SELECT id, user_id, start_time, end_time, status, workout_type,
           program_day, program_cycle, total_volume, duration_minutes
    FROM workout_sessions
    WHERE user_id = ?1
    ORDER BY start_time DESC, id DESC
    "#,
  )
  .bind(user_id)
  .fetch_all(pool)
  .await?;

  let exercise_rows = sqlx::query(
    r#"
    SELECT we.id, we.session_id, we.exercise_id, we.order_in_session
    FROM workout_exercises we
    JOIN workout_sessions s ON s.id = we.session_id
    WHERE s.user_id = ?1
    ORDER BY we.session_id, we.order_in_session
    "#,
  )
  .bind(user_id)
  .fetch_all(pool)
  .await?;

  let set_rows = sqlx::query(
    r#"
    SELECT es.id, es.workout_exercise_id, es.set_number, es.weight, es.reps,
           es.rpe, es.completed, es.completed_at
    FROM exercise_sets es
    JOIN workout_exercises we ON we.id = es.workout_exercise_id
    JOIN workout_sessions s ON s.id = we.session_id
    WHERE s.user_id = ?1
    ORDER BY es.workout_exercise_id, es.set_number
    "#,
  )
  .bind(user_id)
  .fetch_all(pool)
  .await?;

  let mut sets_by_exercise: HashMap<i64, Vec<ExerciseSet>> = HashMap::new();
  for row in &set_rows {
    let set = ExerciseSet {
      id: row.get("id"),
      workout_exercise_id: row.get("workout_exercise_id"),
      set_number: row.get("set_number"),
      weight: row.get("weight"),
      reps: row.get("reps"),
      rpe: row.get("rpe"),
      completed: row.get::<i64, _>("completed") != 0,
      completed_at: row.get::<Option<String>, _>("completed_at").and_then(|s| parse_timestamp(&s)),
    };
    sets_by_exercise.entry(set.workout_exercise_id).or_default().push(set);
  }

  let mut exercises_by_session: HashMap<i64, Vec<PerformedExercise>> = HashMap::new();
  for row in &exercise_rows {
    let workout_exercise_id: i64 = row.get("id");
    exercises_by_session
      .entry(row.get("session_id"))
      .or_default()
      .push(PerformedExercise {
        workout_exercise_id,
        exercise_id: row.get("exercise_id"),
        order_in_session: row.get("order_in_session"),
        sets: sets_by_exercise.remove(&workout_exercise_id).unwrap_or_default(),
      });
  }

  Ok(
    session_rows
      .iter()
      .filter_map(session_from_row)
      .map(|session| {
        let exercises = exercises_by_session.remove(&session.id).unwrap_or_default();
        SessionRecord { session, exercises }
      })
      .collect(),
  )
}

async fn load_personal_records(pool: &SqlitePool, user_id: i64) -> Result<Vec<PersonalRecord>, EngineError> {
  let rows = sqlx::query(
    r#"
    SELECT id, user_id, exercise_id, weight, reps, date
    FROM personal_records
    WHERE user_id = ?1
    ORDER BY date DESC
    "#,
  )
  .bind(user_id)
  .fetch_all(pool)
  .await?;

  Ok(
    rows
      .iter()
      .filter_map(|row| {
        let id: i64 = row.get("id");
        let date_raw: String = row.get("date");
        let Some(date) = parse_timestamp(&date_raw) else {
          warn!(record_id = id, "Skipping personal record with malformed date");
          return None;
        };
        Some(PersonalRecord {
          id,
          user_id: row.get("user_id"),
          exercise_id: row.get("exercise_id"),
          weight: row.get("weight"),
          reps: row.get("reps"),
          date,
        })
      })
      .collect(),
  )
}

async fn load_recovery(pool: &SqlitePool, user_id: i64) -> Result<Vec<MuscleRecovery>, EngineError> {
  let rows = sqlx::query(
    r#"
    SELECT user_id, muscle_group, last_worked, recovery_percentage, soreness
    FROM muscle_recovery
    WHERE user_id = ?1
    "#,
  )
  .bind(user_id)
  .fetch_all(pool)
  .await?;

  Ok(
    rows
      .iter()
      .filter_map(|row| {
        let muscle_group: String = row.get("muscle_group");
        let last_raw: String = row.get("last_worked");
        let Some(last_worked) = parse_timestamp(&last_raw) else {
          warn!(user_id, muscle_group = %muscle_group, "Skipping recovery row with malformed timestamp");
          return None;
        };
        let recovery_percentage: f64 = row.get("recovery_percentage");
        if !recovery_percentage.is_finite() {
          warn!(user_id, muscle_group = %muscle_group, "Skipping recovery row with invalid percentage");
          return None;
        }
        Some(MuscleRecovery {
          user_id: row.get("user_id"),
          muscle_group,
          last_worked,
          recovery_percentage: recovery_percentage.clamp(0.0, 100.0),
          soreness: row.get("soreness"),
        })
      })
      .collect(),
  )
}

/// ---------------------------------------------------------------------------
/// Exercise Catalog
/// ---------------------------------------------------------------------------

fn exercise_from_row(row: &SqliteRow) -> Exercise {
  let id: i64 = row.get("id");
  let name: String = row.get("name");
  let category_raw: String = row.get("category");
  let category = category_raw.parse::<ExerciseCategory>().unwrap_or_else(|e| {
    warn!(exercise_id = id, error = %e, "Unknown category, using other");
    ExerciseCategory::Other
  });
  let tier = row
    .get::<String, _>("recommendation_tier")
    .parse::<RecommendationTier>()
    .unwrap_or_else(|e| {
      warn!(exercise_id = id, error = %e, "Unknown recommendation tier, treating as specialized");
      RecommendationTier::Specialized
    });
  let muscles: String = row.get("muscle_groups");

  Exercise {
    id,
    name,
    category,
    muscle_groups: parse_list::<MuscleGroup>(&muscles, "muscle_group", id),
    equipment: row.get::<Option<String>, _>("equipment").and_then(|s| s.parse().ok()),
    difficulty: row.get("difficulty"),
    popularity: row.get("popularity"),
    is_basic_exercise: row.get::<i64, _>("is_basic_exercise") != 0,
    recommendation_tier: tier,
  }
}

pub async fn load_catalog(pool: &SqlitePool) -> Result<Vec<Exercise>, EngineError> {
  let rows = sqlx::query(
    r#"
    SELECT id, name, category, muscle_groups, equipment, difficulty,
           popularity, is_basic_exercise, recommendation_tier
    FROM exercises
    ORDER BY id
    "#,
  )
  .fetch_all(pool)
  .await?;

  Ok(rows.iter().map(exercise_from_row).collect())
}

pub async fn load_exercise<'e, E>(executor: E, exercise_id: i64) -> Result<Exercise, EngineError>
where
  E: SqliteExecutor<'e>,
{
  let row = sqlx::query(
    r#"
    SELECT id, name, category, muscle_groups, equipment, difficulty,
           popularity, is_basic_exercise, recommendation_tier
    FROM exercises
    WHERE id = ?1
    "#,
  )
  .bind(exercise_id)
  .fetch_optional(executor)
  .await?
  .ok_or_else(|| EngineError::not_found("exercise", exercise_id))?;

  Ok(exercise_from_row(&row))
}

/// Catalog indexed by id
pub fn index_catalog(catalog: &[Exercise]) -> HashMap<i64, &Exercise> {
  catalog.iter().map(|e| (e.id, e)).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::ExperienceLevel;
  use crate::test_utils::*;

  #[tokio::test]
  async fn test_load_history_missing_user_is_not_found() {
    let pool = setup_test_db().await;

    let err = load_history(&pool, 99).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_load_history_orders_sessions_and_attaches_sets() {
    // Arrange
    let pool = setup_test_db().await;
    let user_id = seed_user(&pool, "intermediate", Some(80.0), Some(3)).await;
    let ids = seed_exercises(&pool).await;
    let older = seed_completed_session(&pool, user_id, datetime_days_ago(5), Some(1), Some(1), &[(ids.back_squat, 100.0, 5)]).await;
    let newer = seed_completed_session(&pool, user_id, datetime_days_ago(2), Some(2), Some(1), &[(ids.bench_press, 60.0, 8)]).await;

    // Act
    let history = load_history(&pool, user_id).await.unwrap();

    // Assert
    assert_eq!(history.profile.experience_level, ExperienceLevel::Intermediate);
    assert_eq!(history.sessions.len(), 2);
    assert_eq!(history.sessions[0].session.id, newer);
    assert_eq!(history.sessions[1].session.id, older);
    let squat = &history.sessions[1].exercises[0];
    assert_eq!(squat.exercise_id, ids.back_squat);
    assert_eq!(squat.sets.len(), 3);
    assert_eq!(squat.top_set_weight(), Some(100.0));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_catalog_skips_unknown_muscle_groups() {
    let pool = setup_test_db().await;
    let id = seed_exercise(&pool, "Weird Press", "chest", "chest,wings,triceps", Some("machine"), "standard").await;

    let exercise = load_exercise(&pool, id).await.unwrap();
    assert_eq!(exercise.muscle_groups, vec![MuscleGroup::Chest, MuscleGroup::Triceps]);
    assert_eq!(exercise.equipment, Some(Equipment::Machine));

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_best_record_is_max_weight() {
    let pool = setup_test_db().await;
    let user_id = seed_user(&pool, "beginner", None, None).await;
    let ids = seed_exercises(&pool).await;
    seed_personal_record(&pool, user_id, ids.bench_press, 80.0, datetime_days_ago(30)).await;
    seed_personal_record(&pool, user_id, ids.bench_press, 90.0, datetime_days_ago(10)).await;
    seed_personal_record(&pool, user_id, ids.bench_press, 85.0, datetime_days_ago(1)).await;

    let history = load_history(&pool, user_id).await.unwrap();
    assert_eq!(history.best_record(ids.bench_press).map(|r| r.weight), Some(90.0));
    assert!(history.best_record(ids.back_squat).is_none());

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_exercise_counts_ignore_cancelled_sessions() {
    let mut history = TrainingHistory::empty(UserProfile::default_for(1));
    history.sessions.push(mock_session_record(1, 3, SessionStatus::Completed, None, &[(10, 50.0, 8)]));
    history.sessions.push(mock_session_record(2, 5, SessionStatus::Cancelled, None, &[(10, 50.0, 8)]));
    history.sessions.push(mock_session_record(3, 40, SessionStatus::Completed, None, &[(10, 50.0, 8)]));
    history.sort_sessions();

    let counts = history.exercise_counts_since(datetime_days_ago(28));
    assert_eq!(counts.get(&10), Some(&1));
  }
}
