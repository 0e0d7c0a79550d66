use chrono::Utc;

use crate::db::AppState;
use crate::error::EngineError;
use crate::filter::{recommend, FilterContext, RecommendationFilters};
use crate::history::{load_catalog, load_history};
use crate::models::Exercise;
use crate::recovery::refresh_muscle_recovery;

/// Ordered exercise list for a user's next workout.
///
/// Stored recovery rows are refreshed first so the recovery stage sees
/// current percentages.
pub async fn get_recommended_exercises(
  state: &AppState,
  user_id: i64,
  filters: RecommendationFilters,
  limit: usize,
) -> Result<Vec<Exercise>, EngineError> {
  let now = Utc::now();
  refresh_muscle_recovery(&state.db, user_id, now).await?;

  let history = load_history(&state.db, user_id).await?;
  let catalog = load_catalog(&state.db).await?;
  let context = FilterContext::from_history(&history, &catalog, now, &state.config.filter);

  Ok(recommend(&catalog, &filters, &context, &state.rules, &state.config.filter, limit))
}
