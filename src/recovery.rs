//! Muscle recovery model
//!
//! Stored recovery rows are reset to 0% when a session completes and are
//! refreshed from elapsed time and soreness before they are read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::models::{format_timestamp, parse_timestamp};

/// Soreness recorded for every muscle touched by a completed session
pub const POST_SESSION_SORENESS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryLabel {
  FullyRecovered,
  Ready,
  LightTraining,
  Recovering,
  RestNeeded,
}

impl RecoveryLabel {
  pub fn from_percentage(pct: f64) -> Self {
    if pct >= 100.0 {
      Self::FullyRecovered
    } else if pct >= 80.0 {
      Self::Ready
    } else if pct >= 60.0 {
      Self::LightTraining
    } else if pct >= 40.0 {
      Self::Recovering
    } else {
      Self::RestNeeded
    }
  }
}

impl std::fmt::Display for RecoveryLabel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::FullyRecovered => write!(f, "fully_recovered"),
      Self::Ready => write!(f, "ready"),
      Self::LightTraining => write!(f, "light_training"),
      Self::Recovering => write!(f, "recovering"),
      Self::RestNeeded => write!(f, "rest_needed"),
    }
  }
}

/// Recovery percentage after `hours` of rest: fast for the first day, then
/// slowing until full recovery at 72h. Soreness scales it down 5% per point.
pub fn estimate_recovery(hours: i64, soreness: i64) -> f64 {
  let hours = hours.max(0) as f64;
  let base = if hours < 24.0 {
    hours * 2.0
  } else if hours < 48.0 {
    50.0 + (hours - 24.0) * 1.5
  } else if hours < 72.0 {
    85.0 + (hours - 48.0) * 0.5
  } else {
    100.0
  };
  let soreness_factor = 1.0 - soreness.clamp(0, 20) as f64 * 0.05;
  (base * soreness_factor).clamp(0.0, 100.0)
}

/// Hours until 100%, with recovery slowing by 4h per soreness point
pub fn estimated_hours_to_full(pct: f64, soreness: i64) -> i64 {
  if pct >= 100.0 {
    return 0;
  }
  let rate = 100.0 / (48.0 + soreness.max(0) as f64 * 4.0);
  ((100.0 - pct.max(0.0)) / rate) as i64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuscleRecoveryStatus {
  pub muscle_group: String,
  pub recovery_percentage: f64,
  pub last_worked: DateTime<Utc>,
  pub estimated_hours_to_full: i64,
  pub label: RecoveryLabel,
}

/// Recompute every stored recovery row for a user from elapsed time
pub async fn refresh_muscle_recovery(
  pool: &SqlitePool,
  user_id: i64,
  now: DateTime<Utc>,
) -> Result<Vec<MuscleRecoveryStatus>, EngineError> {
  let rows = sqlx::query(
    r#"
    SELECT id, muscle_group, last_worked, soreness
    FROM muscle_recovery
    WHERE user_id = ?1
    ORDER BY muscle_group
    "#,
  )
  .bind(user_id)
  .fetch_all(pool)
  .await?;

  let mut statuses = Vec::with_capacity(rows.len());
  for row in rows {
    let id: i64 = row.get("id");
    let muscle_group: String = row.get("muscle_group");
    let last_raw: String = row.get("last_worked");
    let Some(last_worked) = parse_timestamp(&last_raw) else {
      warn!(user_id, muscle_group = %muscle_group, "Skipping recovery row with malformed timestamp");
      continue;
    };
    let soreness: i64 = row.get("soreness");

    let hours = (now - last_worked).num_hours();
    let pct = estimate_recovery(hours, soreness);

    sqlx::query("UPDATE muscle_recovery SET recovery_percentage = ?1, updated_at = ?2 WHERE id = ?3")
      .bind(pct)
      .bind(format_timestamp(&now))
      .bind(id)
      .execute(pool)
      .await?;

    statuses.push(MuscleRecoveryStatus {
      muscle_group,
      recovery_percentage: pct,
      last_worked,
      estimated_hours_to_full: estimated_hours_to_full(pct, soreness),
      label: RecoveryLabel::from_percentage(pct),
    });
  }

  debug!(user_id, muscles = statuses.len(), "Refreshed muscle recovery");
  Ok(statuses)
}

/// Reset a muscle to 0% after it was trained
pub async fn mark_muscle_worked(
  conn: &mut SqliteConnection,
  user_id: i64,
  muscle_group: &str,
  now: DateTime<Utc>,
) -> Result<(), EngineError> {
  let ts = format_timestamp(&now);
  sqlx::query(
    r#"
    INSERT INTO muscle_recovery (user_id, muscle_group, last_worked, recovery_percentage, soreness, updated_at)
    VALUES (?1, ?2, ?3, 0, ?4, ?3)
    ON CONFLICT(user_id, muscle_group) DO UPDATE SET
      last_worked = excluded.last_worked,
      recovery_percentage = 0,
      soreness = excluded.soreness,
      updated_at = excluded.updated_at
    "#,
  )
  .bind(user_id)
  .bind(muscle_group)
  .bind(&ts)
  .bind(POST_SESSION_SORENESS)
  .execute(conn)
  .await?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::assert_approx_eq;
  use crate::test_utils::*;
  use chrono::Duration;

  #[test]
  fn test_estimate_recovery_curve() {
    assert_approx_eq!(estimate_recovery(0, 0), 0.0, 1e-9);
    assert_approx_eq!(estimate_recovery(12, 0), 24.0, 1e-9);
    assert_approx_eq!(estimate_recovery(30, 0), 59.0, 1e-9);
    assert_approx_eq!(estimate_recovery(60, 0), 91.0, 1e-9);
    assert_approx_eq!(estimate_recovery(72, 0), 100.0, 1e-9);
    assert_approx_eq!(estimate_recovery(-5, 0), 0.0, 1e-9);
  }

  #[test]
  fn test_soreness_slows_recovery() {
    assert_approx_eq!(estimate_recovery(30, 3), 59.0 * 0.85, 1e-9);
    assert_approx_eq!(estimate_recovery(100, 2), 90.0, 1e-9);
  }

  #[test]
  fn test_labels() {
    assert_eq!(RecoveryLabel::from_percentage(100.0), RecoveryLabel::FullyRecovered);
    assert_eq!(RecoveryLabel::from_percentage(85.0), RecoveryLabel::Ready);
    assert_eq!(RecoveryLabel::from_percentage(60.0), RecoveryLabel::LightTraining);
    assert_eq!(RecoveryLabel::from_percentage(45.0), RecoveryLabel::Recovering);
    assert_eq!(RecoveryLabel::from_percentage(10.0), RecoveryLabel::RestNeeded);
  }

  #[test]
  fn test_hours_to_full() {
    assert_eq!(estimated_hours_to_full(100.0, 0), 0);
    assert_eq!(estimated_hours_to_full(50.0, 0), 24);
    assert_eq!(estimated_hours_to_full(0.0, 3), 60);
  }

  #[tokio::test]
  async fn test_mark_then_refresh() {
    // Arrange
    let pool = setup_test_db().await;
    let user_id = seed_user(&pool, "beginner", None, None).await;
    let worked_at = datetime_days_ago(1) - Duration::hours(6);
    {
      let mut conn = pool.acquire().await.unwrap();
      mark_muscle_worked(&mut *conn, user_id, "chest", worked_at).await.unwrap();
    }

    // Act
    let statuses = refresh_muscle_recovery(&pool, user_id, chrono::Utc::now()).await.unwrap();

    // Assert: 30h with soreness 3
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].muscle_group, "chest");
    assert_approx_eq!(statuses[0].recovery_percentage, 59.0 * 0.85, 0.01);
    assert_eq!(statuses[0].label, RecoveryLabel::Recovering);

    let stored: f64 = sqlx::query_scalar("SELECT recovery_percentage FROM muscle_recovery WHERE user_id = ?1")
      .bind(user_id)
      .fetch_one(&pool)
      .await
      .unwrap();
    assert_approx_eq!(stored, statuses[0].recovery_percentage, 1e-9);

    teardown_test_db(pool).await;
  }
}
