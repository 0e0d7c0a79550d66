//! Workout session lifecycle
//!
//! A session is started with a planned exercise list, sets are logged while
//! it is in progress, and completion rolls up volume, personal records and
//! muscle recovery in one transaction. Only in-progress sessions accept
//! changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

use crate::config::SelectorConfig;
use crate::error::EngineError;
use crate::history::{load_exercise, load_profile, load_session, load_session_list};
use crate::models::{
  format_timestamp, ExerciseCategory, ExerciseSet, MuscleGroup, PersonalRecord, SessionStatus, WorkoutExercise,
  WorkoutSession, WorkoutType,
};
use crate::position::{
  describe_sequence, next_program_position, workout_type_for, workout_type_sequence, ProgramPosition,
};
use crate::recovery::mark_muscle_worked;
use crate::selector::select_program;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartedSession {
  pub session: WorkoutSession,
  pub position: ProgramPosition,
  pub workout_type: WorkoutType,
  /// Sessions that were still in progress and got abandoned
  pub abandoned_session_ids: Vec<i64>,
  pub planned: Vec<WorkoutExercise>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedSet {
  pub set: ExerciseSet,
  pub is_personal_record: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedSession {
  pub session: WorkoutSession,
  pub new_records: Vec<PersonalRecord>,
  pub muscles_worked: Vec<String>,
}

fn require_in_progress(session: &WorkoutSession, action: &str) -> Result<(), EngineError> {
  if session.status != SessionStatus::InProgress {
    return Err(EngineError::InvalidState(format!(
      "cannot {} session {} with status {}",
      action, session.id, session.status
    )));
  }
  Ok(())
}

/// Every lifecycle write runs under SQLite's write lock from its first
/// statement, so status checks made inside the transaction still hold at commit.
async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, EngineError> {
  Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
  (end - start).num_minutes().max(0)
}

/// Muscle group tracked for a whole exercise category, if the category names one.
/// Arms has no group of its own; its exercises carry biceps, triceps or forearms.
fn category_muscle(category: ExerciseCategory) -> Option<MuscleGroup> {
  match category {
    ExerciseCategory::Chest => Some(MuscleGroup::Chest),
    ExerciseCategory::Back => Some(MuscleGroup::Back),
    ExerciseCategory::Legs => Some(MuscleGroup::Legs),
    ExerciseCategory::Shoulders => Some(MuscleGroup::Shoulders),
    ExerciseCategory::Core => Some(MuscleGroup::Core),
    ExerciseCategory::Arms | ExerciseCategory::Cardio | ExerciseCategory::FullBody | ExerciseCategory::Other => None,
  }
}

async fn append_workout_exercise(
  conn: &mut SqliteConnection,
  session_id: i64,
  exercise_id: i64,
  order_in_session: i64,
) -> Result<WorkoutExercise, EngineError> {
  let result = sqlx::query(
    "INSERT INTO workout_exercises (session_id, exercise_id, order_in_session, total_volume) VALUES (?1, ?2, ?3, 0)",
  )
  .bind(session_id)
  .bind(exercise_id)
  .bind(order_in_session)
  .execute(conn)
  .await?;

  Ok(WorkoutExercise {
    id: result.last_insert_rowid(),
    session_id,
    exercise_id,
    order_in_session,
    total_volume: 0.0,
  })
}

/// ---------------------------------------------------------------------------
/// Start
/// ---------------------------------------------------------------------------

/// Open a new session for a user at the next program position.
///
/// Any session the user left in progress is abandoned first. Abandoned
/// sessions do not count toward the program position, so the new session
/// takes over the slot the abandoned one held.
///
/// Concurrent starts for one user run one after the other: the later start
/// abandons the earlier one, and the user never holds two open sessions.
pub async fn start_session(
  pool: &SqlitePool,
  user_id: i64,
  planned_exercise_ids: &[i64],
  now: DateTime<Utc>,
  config: &SelectorConfig,
) -> Result<StartedSession, EngineError> {
  let profile = load_profile(pool, user_id).await?;

  let mut tx = begin_write(pool).await?;

  let mut sessions = load_session_list(&mut *tx, user_id).await?;
  let stale: Vec<(i64, DateTime<Utc>)> = sessions
    .iter()
    .filter(|s| s.status == SessionStatus::InProgress)
    .map(|s| (s.id, s.start_time))
    .collect();
  for session in sessions.iter_mut().filter(|s| s.status == SessionStatus::InProgress) {
    session.status = SessionStatus::Abandoned;
  }

  let program = match profile.workout_split {
    Some(program) => program,
    None => select_program(&profile, &sessions, now, config).program_type,
  };
  let sequence = workout_type_sequence(program);
  let position = next_program_position(&sessions, now, sequence.len() as i64);
  let workout_type = workout_type_for(&position, &sequence);

  for (id, start_time) in &stale {
    sqlx::query(
      "UPDATE workout_sessions SET status = ?1, end_time = ?2, duration_minutes = ?3 WHERE id = ?4 AND status = ?5",
    )
    .bind(SessionStatus::Abandoned.to_string())
    .bind(format_timestamp(&now))
    .bind(minutes_between(*start_time, now))
    .bind(*id)
    .bind(SessionStatus::InProgress.to_string())
    .execute(&mut *tx)
    .await?;
  }

  let result = sqlx::query(
    r#"
    INSERT INTO workout_sessions (user_id, start_time, status, workout_type, program_day, program_cycle, total_volume)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)
    "#,
  )
  .bind(user_id)
  .bind(format_timestamp(&now))
  .bind(SessionStatus::InProgress.to_string())
  .bind(workout_type.to_string())
  .bind(position.day)
  .bind(position.cycle)
  .execute(&mut *tx)
  .await?;
  let session_id = result.last_insert_rowid();

  let mut planned = Vec::with_capacity(planned_exercise_ids.len());
  for (idx, exercise_id) in planned_exercise_ids.iter().enumerate() {
    let exists = sqlx::query("SELECT id FROM exercises WHERE id = ?1")
      .bind(*exercise_id)
      .fetch_optional(&mut *tx)
      .await?;
    if exists.is_none() {
      // Dropping the transaction rolls back the abandon and the insert
      return Err(EngineError::not_found("exercise", *exercise_id));
    }
    planned.push(append_workout_exercise(&mut *tx, session_id, *exercise_id, idx as i64 + 1).await?);
  }

  tx.commit().await?;

  let abandoned_session_ids: Vec<i64> = stale.iter().map(|(id, _)| *id).collect();
  info!(
    user_id,
    session_id,
    program = %program,
    sequence = %describe_sequence(&sequence),
    day = position.day,
    cycle = position.cycle,
    abandoned = abandoned_session_ids.len(),
    "Started session"
  );

  Ok(StartedSession {
    session: WorkoutSession {
      id: session_id,
      user_id,
      start_time: now,
      end_time: None,
      status: SessionStatus::InProgress,
      workout_type: Some(workout_type),
      program_day: Some(position.day),
      program_cycle: Some(position.cycle),
      total_volume: 0.0,
      duration_minutes: None,
    },
    position,
    workout_type,
    abandoned_session_ids,
    planned,
  })
}

/// ---------------------------------------------------------------------------
/// Sets
/// ---------------------------------------------------------------------------

/// Append a completed set to an in-progress session.
///
/// An exercise that was not planned is appended to the end of the session.
pub async fn record_set(
  pool: &SqlitePool,
  session_id: i64,
  exercise_id: i64,
  weight: f64,
  reps: i64,
  rpe: Option<f64>,
  now: DateTime<Utc>,
) -> Result<RecordedSet, EngineError> {
  if !weight.is_finite() || weight < 0.0 {
    return Err(EngineError::InvalidState(format!("weight must be non-negative, got {}", weight)));
  }
  if reps <= 0 {
    return Err(EngineError::InvalidState(format!("reps must be positive, got {}", reps)));
  }
  if let Some(rpe) = rpe {
    if !(1.0..=10.0).contains(&rpe) {
      return Err(EngineError::InvalidState(format!("rpe must be between 1 and 10, got {}", rpe)));
    }
  }

  let mut tx = begin_write(pool).await?;

  let session = load_session(&mut *tx, session_id).await?;
  require_in_progress(&session, "log a set in")?;
  load_exercise(&mut *tx, exercise_id).await?;

  let existing = sqlx::query(
    "SELECT id FROM workout_exercises WHERE session_id = ?1 AND exercise_id = ?2 ORDER BY order_in_session LIMIT 1",
  )
  .bind(session_id)
  .bind(exercise_id)
  .fetch_optional(&mut *tx)
  .await?;

  let workout_exercise_id = match existing {
    Some(row) => row.get::<i64, _>("id"),
    None => {
      let next_order: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(order_in_session), 0) + 1 FROM workout_exercises WHERE session_id = ?1",
      )
      .bind(session_id)
      .fetch_one(&mut *tx)
      .await?;
      append_workout_exercise(&mut *tx, session_id, exercise_id, next_order).await?.id
    }
  };

  let set_number: i64 =
    sqlx::query_scalar("SELECT COUNT(*) + 1 FROM exercise_sets WHERE workout_exercise_id = ?1")
      .bind(workout_exercise_id)
      .fetch_one(&mut *tx)
      .await?;

  let result = sqlx::query(
    r#"
    INSERT INTO exercise_sets (workout_exercise_id, set_number, weight, reps, rpe, completed, completed_at)
    VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
    "#,
  )
  .bind(workout_exercise_id)
  .bind(set_number)
  .bind(weight)
  .bind(reps)
  .bind(rpe)
  .bind(format_timestamp(&now))
  .execute(&mut *tx)
  .await?;

  let best: Option<f64> =
    sqlx::query_scalar("SELECT MAX(weight) FROM personal_records WHERE user_id = ?1 AND exercise_id = ?2")
      .bind(session.user_id)
      .bind(exercise_id)
      .fetch_one(&mut *tx)
      .await?;

  tx.commit().await?;

  let is_personal_record = weight > 0.0 && best.map_or(true, |best| weight > best);
  debug!(session_id, exercise_id, set_number, is_personal_record, "Recorded set");

  Ok(RecordedSet {
    set: ExerciseSet {
      id: result.last_insert_rowid(),
      workout_exercise_id,
      set_number,
      weight,
      reps,
      rpe,
      completed: true,
      completed_at: Some(now),
    },
    is_personal_record,
  })
}

/// ---------------------------------------------------------------------------
/// Completion
/// ---------------------------------------------------------------------------

/// Finish an in-progress session.
///
/// `duration_minutes` defaults to the time elapsed since the session started.
pub async fn complete_session(
  pool: &SqlitePool,
  session_id: i64,
  duration_minutes: Option<i64>,
  now: DateTime<Utc>,
) -> Result<CompletedSession, EngineError> {
  let mut tx = begin_write(pool).await?;

  let session = load_session(&mut *tx, session_id).await?;
  require_in_progress(&session, "complete")?;
  let user_id = session.user_id;

  let exercise_ids: Vec<i64> =
    sqlx::query_scalar("SELECT DISTINCT exercise_id FROM workout_exercises WHERE session_id = ?1")
      .bind(session_id)
      .fetch_all(&mut *tx)
      .await?;

  let mut muscles: BTreeSet<MuscleGroup> = BTreeSet::new();
  for exercise_id in &exercise_ids {
    let exercise = load_exercise(&mut *tx, *exercise_id).await?;
    muscles.extend(exercise.muscle_groups.iter().copied());
    muscles.extend(category_muscle(exercise.category));
  }

  // Heaviest completed set per exercise, ties broken by reps
  let set_rows = sqlx::query(
    r#"
    SELECT we.exercise_id, es.weight, es.reps
    FROM exercise_sets es
    JOIN workout_exercises we ON we.id = es.workout_exercise_id
    WHERE we.session_id = ?1 AND es.completed = 1
    ORDER BY we.exercise_id, es.weight DESC, es.reps DESC
    "#,
  )
  .bind(session_id)
  .fetch_all(&mut *tx)
  .await?;

  let mut best_sets: HashMap<i64, (f64, i64)> = HashMap::new();
  for row in &set_rows {
    let exercise_id: i64 = row.get("exercise_id");
    best_sets
      .entry(exercise_id)
      .or_insert_with(|| (row.get("weight"), row.get("reps")));
  }

  sqlx::query(
    r#"
    UPDATE workout_exercises
    SET total_volume = (
      SELECT COALESCE(SUM(es.weight * es.reps), 0)
      FROM exercise_sets es
      WHERE es.workout_exercise_id = workout_exercises.id AND es.completed = 1
    )
    WHERE session_id = ?1
    "#,
  )
  .bind(session_id)
  .execute(&mut *tx)
  .await?;

  let total_volume: f64 =
    sqlx::query_scalar("SELECT COALESCE(SUM(total_volume), 0.0) FROM workout_exercises WHERE session_id = ?1")
      .bind(session_id)
      .fetch_one(&mut *tx)
      .await?;

  let duration = duration_minutes.unwrap_or_else(|| minutes_between(session.start_time, now));
  let closed = sqlx::query(
    r#"
    UPDATE workout_sessions
    SET status = ?1, end_time = ?2, duration_minutes = ?3, total_volume = ?4
    WHERE id = ?5 AND status = ?6
    "#,
  )
  .bind(SessionStatus::Completed.to_string())
  .bind(format_timestamp(&now))
  .bind(duration)
  .bind(total_volume)
  .bind(session_id)
  .bind(SessionStatus::InProgress.to_string())
  .execute(&mut *tx)
  .await?;
  if closed.rows_affected() == 0 {
    return Err(EngineError::InvalidState(format!("session {} is no longer in progress", session_id)));
  }

  let mut new_records = Vec::new();
  let mut ordered: Vec<(i64, (f64, i64))> = best_sets.into_iter().collect();
  ordered.sort_by_key(|(exercise_id, _)| *exercise_id);
  for (exercise_id, (weight, reps)) in ordered {
    if weight <= 0.0 {
      continue;
    }
    let best: Option<f64> =
      sqlx::query_scalar("SELECT MAX(weight) FROM personal_records WHERE user_id = ?1 AND exercise_id = ?2")
        .bind(user_id)
        .bind(exercise_id)
        .fetch_one(&mut *tx)
        .await?;
    if best.is_some_and(|best| weight <= best) {
      continue;
    }

    let result = sqlx::query(
      "INSERT INTO personal_records (user_id, exercise_id, weight, reps, date) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(user_id)
    .bind(exercise_id)
    .bind(weight)
    .bind(reps)
    .bind(format_timestamp(&now))
    .execute(&mut *tx)
    .await?;

    new_records.push(PersonalRecord {
      id: result.last_insert_rowid(),
      user_id,
      exercise_id,
      weight,
      reps,
      date: now,
    });
  }

  for muscle in &muscles {
    mark_muscle_worked(&mut *tx, user_id, &muscle.to_string(), now).await?;
  }

  tx.commit().await?;

  if exercise_ids.is_empty() {
    warn!(user_id, session_id, "Completed a session with no exercises");
  }
  info!(
    user_id,
    session_id,
    total_volume,
    records = new_records.len(),
    muscles = muscles.len(),
    "Completed session"
  );

  Ok(CompletedSession {
    session: load_session(pool, session_id).await?,
    new_records,
    muscles_worked: muscles.iter().map(|m| m.to_string()).collect(),
  })
}

/// ---------------------------------------------------------------------------
/// Cancel / Delete
/// ---------------------------------------------------------------------------

pub async fn cancel_session(
  pool: &SqlitePool,
  session_id: i64,
  now: DateTime<Utc>,
) -> Result<WorkoutSession, EngineError> {
  let mut tx = begin_write(pool).await?;

  let session = load_session(&mut *tx, session_id).await?;
  require_in_progress(&session, "cancel")?;

  let result = sqlx::query(
    "UPDATE workout_sessions SET status = ?1, end_time = ?2, duration_minutes = ?3 WHERE id = ?4 AND status = ?5",
  )
  .bind(SessionStatus::Cancelled.to_string())
  .bind(format_timestamp(&now))
  .bind(minutes_between(session.start_time, now))
  .bind(session_id)
  .bind(SessionStatus::InProgress.to_string())
  .execute(&mut *tx)
  .await?;
  if result.rows_affected() == 0 {
    return Err(EngineError::InvalidState(format!("session {} is no longer in progress", session_id)));
  }

  tx.commit().await?;

  info!(user_id = session.user_id, session_id, "Cancelled session");
  load_session(pool, session_id).await
}

/// Remove a session with its exercises and sets. Personal records already
/// earned are kept.
pub async fn delete_session(pool: &SqlitePool, session_id: i64) -> Result<(), EngineError> {
  let mut tx = pool.begin().await?;

  sqlx::query(
    r#"
    DELETE FROM exercise_sets
    WHERE workout_exercise_id IN (SELECT id FROM workout_exercises WHERE session_id = ?1)
    "#,
  )
  .bind(session_id)
  .execute(&mut *tx)
  .await?;

  sqlx::query("DELETE FROM workout_exercises WHERE session_id = ?1")
    .bind(session_id)
    .execute(&mut *tx)
    .await?;

  let result = sqlx::query("DELETE FROM workout_sessions WHERE id = ?1")
    .bind(session_id)
    .execute(&mut *tx)
    .await?;

  if result.rows_affected() == 0 {
    return Err(EngineError::not_found("session", session_id));
  }

  tx.commit().await?;
  info!(session_id, "Deleted session");
  Ok(())
}
