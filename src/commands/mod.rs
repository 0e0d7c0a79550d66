//! Async entry points over `AppState`
//!
//! Each command loads what it needs from the store, calls the pure engine
//! functions with the current time, and returns owned results.

pub mod coaching;
pub mod prescription;
pub mod progression;
pub mod recommendation;
pub mod session;

use chrono::Utc;

use crate::db::AppState;
use crate::error::EngineError;
use crate::history::load_history;
use crate::position::{next_program_position, ProgramPosition};
use crate::selector::{self, ProgramRecommendation};

/// Next (day, cycle) for a program of `program_length` days
pub async fn get_next_program_position(
  state: &AppState,
  user_id: i64,
  program_length: i64,
) -> Result<ProgramPosition, EngineError> {
  let history = load_history(&state.db, user_id).await?;
  Ok(next_program_position(&history.session_list(), Utc::now(), program_length))
}

/// Split program suited to the user's experience and schedule
pub async fn select_program(state: &AppState, user_id: i64) -> Result<ProgramRecommendation, EngineError> {
  let history = load_history(&state.db, user_id).await?;
  Ok(selector::select_program(
    &history.profile,
    &history.session_list(),
    Utc::now(),
    &state.config.selector,
  ))
}
