use chrono::Utc;

use crate::db::AppState;
use crate::error::EngineError;
use crate::history::{load_exercise, load_history};
use crate::prescription::{self, LoadPrescription};

/// Working weight, sets, reps and rest for one exercise
pub async fn suggested_weight(
  state: &AppState,
  user_id: i64,
  exercise_id: i64,
) -> Result<LoadPrescription, EngineError> {
  let history = load_history(&state.db, user_id).await?;
  let exercise = load_exercise(&state.db, exercise_id).await?;
  Ok(prescription::suggested_weight(
    &history,
    &exercise,
    Utc::now(),
    &state.config.prescription,
  ))
}
