//! Commands for periodization analysis

use chrono::Utc;

use crate::db::AppState;
use crate::error::EngineError;
use crate::history::{load_catalog, load_history};
use crate::progression::{
  self, ProgramSuggestion, ProgressionAnalysis, RecoveryAnalysis, TransitionCheck, VolumeOptimization,
};

/// Cycle, consistency, volume and readiness analysis for the current program
pub async fn analyze_progression(state: &AppState, user_id: i64) -> Result<ProgressionAnalysis, EngineError> {
  let history = load_history(&state.db, user_id).await?;
  let catalog = load_catalog(&state.db).await?;
  Ok(progression::analyze_progression(
    &history,
    &catalog,
    Utc::now(),
    &state.config.progression,
  ))
}

/// Volume adjustment from recent trend and effort
pub async fn optimize_volume(state: &AppState, user_id: i64) -> Result<VolumeOptimization, EngineError> {
  let history = load_history(&state.db, user_id).await?;
  let catalog = load_catalog(&state.db).await?;
  Ok(progression::optimize_volume(&history, &catalog, &state.config.progression))
}

/// Per-muscle readiness and deload check
pub async fn analyze_recovery(state: &AppState, user_id: i64) -> Result<RecoveryAnalysis, EngineError> {
  let history = load_history(&state.db, user_id).await?;
  let catalog = load_catalog(&state.db).await?;
  Ok(progression::analyze_recovery(
    &history,
    &catalog,
    Utc::now(),
    &state.config.progression,
  ))
}

/// Whether the user should move on from the current program
pub async fn check_program_transition(state: &AppState, user_id: i64) -> Result<TransitionCheck, EngineError> {
  let history = load_history(&state.db, user_id).await?;
  Ok(progression::check_program_transition(
    &history,
    Utc::now(),
    &state.config.progression,
  ))
}

/// Candidate next programs for the user's current split
pub async fn get_program_suggestions(state: &AppState, user_id: i64) -> Result<Vec<ProgramSuggestion>, EngineError> {
  let history = load_history(&state.db, user_id).await?;
  Ok(progression::program_suggestions(history.profile.program_type()))
}
