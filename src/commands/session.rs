//! Commands for the workout session lifecycle

use chrono::Utc;

use crate::db::AppState;
use crate::error::EngineError;
use crate::models::WorkoutSession;
use crate::session::{self, CompletedSession, RecordedSet, StartedSession};

/// Start a session at the user's next program position
pub async fn start_session(
  state: &AppState,
  user_id: i64,
  planned_exercise_ids: Vec<i64>,
) -> Result<StartedSession, EngineError> {
  session::start_session(
    &state.db,
    user_id,
    &planned_exercise_ids,
    Utc::now(),
    &state.config.selector,
  )
  .await
}

/// Log one set, reporting whether it beats the user's best
pub async fn record_set(
  state: &AppState,
  session_id: i64,
  exercise_id: i64,
  weight: f64,
  reps: i64,
  rpe: Option<f64>,
) -> Result<RecordedSet, EngineError> {
  session::record_set(&state.db, session_id, exercise_id, weight, reps, rpe, Utc::now()).await
}

pub async fn complete_session(
  state: &AppState,
  session_id: i64,
  duration_minutes: Option<i64>,
) -> Result<CompletedSession, EngineError> {
  session::complete_session(&state.db, session_id, duration_minutes, Utc::now()).await
}

pub async fn cancel_session(state: &AppState, session_id: i64) -> Result<WorkoutSession, EngineError> {
  session::cancel_session(&state.db, session_id, Utc::now()).await
}

pub async fn delete_session(state: &AppState, session_id: i64) -> Result<(), EngineError> {
  session::delete_session(&state.db, session_id).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::commands::get_next_program_position;
  use crate::models::SessionStatus;
  use crate::test_utils::*;

  #[tokio::test]
  async fn test_full_session_moves_program_forward_next_day() {
    // Arrange
    let state = setup_test_state().await;
    let user_id = seed_user(&state.db, "intermediate", Some(80.0), Some(3)).await;
    let ids = seed_exercises(&state.db).await;
    seed_completed_session(&state.db, user_id, datetime_days_ago(2), Some(1), Some(1), &[(ids.bench_press, 70.0, 8)]).await;

    // Act
    let started = start_session(&state, user_id, vec![ids.barbell_row]).await.unwrap();
    record_set(&state, started.session.id, ids.barbell_row, 60.0, 10, Some(7.5)).await.unwrap();
    let completed = complete_session(&state, started.session.id, None).await.unwrap();

    // Assert
    assert_eq!(started.position.day, 2);
    assert_eq!(completed.session.status, SessionStatus::Completed);

    // Same day: the position stays on the session already started today
    let position = get_next_program_position(&state, user_id, 3).await.unwrap();
    assert_eq!(position.day, 2);
    assert_eq!(position.cycle, 1);

    teardown_test_db(state.db).await;
  }

  #[tokio::test]
  async fn test_cancel_unknown_session() {
    let state = setup_test_state().await;

    let err = cancel_session(&state, 77).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    teardown_test_db(state.db).await;
  }
}
