use chrono::Utc;
use serde_json::json;

use crate::coaching::{self, CoachingMoment};
use crate::db::AppState;
use crate::error::EngineError;
use crate::history::load_history;

/// Coaching message in the user's chosen style.
///
/// The context handed to the generator carries only stored facts: experience,
/// split, and the most recent completed session.
pub async fn coaching_message(
  state: &AppState,
  user_id: i64,
  moment: CoachingMoment,
) -> Result<String, EngineError> {
  let history = load_history(&state.db, user_id).await?;
  let style = history.profile.coaching_style.unwrap_or_default();
  let now = Utc::now();

  let last = history.completed().next();
  let context = json!({
    "experience_level": history.profile.experience_level,
    "workout_split": history.profile.workout_split,
    "last_workout_type": last.and_then(|r| r.session.workout_type),
    "last_total_volume": last.map(|r| r.session.total_volume),
    "days_since_last_workout": last.map(|r| (now - r.start_time()).num_days()),
  });

  Ok(coaching::coaching_message(style, moment, &context.to_string(), state.llm.as_ref()).await)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::coaching::{template, CoachingStyle};
  use crate::test_utils::*;

  #[tokio::test]
  async fn test_message_uses_profile_style() {
    // Arrange
    let state = setup_test_state().await;
    let user_id = seed_user(&state.db, "novice", None, Some(3)).await;
    sqlx::query("UPDATE users SET coaching_style = 'game_master' WHERE id = ?1")
      .bind(user_id)
      .execute(&state.db)
      .await
      .unwrap();

    // Act
    let msg = coaching_message(&state, user_id, CoachingMoment::WorkoutComplete).await.unwrap();

    // Assert
    assert_eq!(msg, template(CoachingStyle::GameMaster, CoachingMoment::WorkoutComplete));

    teardown_test_db(state.db).await;
  }

  #[tokio::test]
  async fn test_message_defaults_to_spartan() {
    let state = setup_test_state().await;
    let user_id = seed_user(&state.db, "beginner", None, None).await;

    let msg = coaching_message(&state, user_id, CoachingMoment::RestDay).await.unwrap();
    assert_eq!(msg, template(CoachingStyle::Spartan, CoachingMoment::RestDay));

    teardown_test_db(state.db).await;
  }
}
