use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::normalize_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
  InProgress,
  Completed,
  Cancelled,
  Abandoned,
}

impl SessionStatus {
  /// Completed or in progress: sessions that represent work actually done
  pub fn is_active_work(&self) -> bool {
    matches!(self, Self::InProgress | Self::Completed)
  }
}

impl std::fmt::Display for SessionStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::InProgress => write!(f, "in_progress"),
      Self::Completed => write!(f, "completed"),
      Self::Cancelled => write!(f, "cancelled"),
      Self::Abandoned => write!(f, "abandoned"),
    }
  }
}

impl std::str::FromStr for SessionStatus {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match normalize_key(s).as_str() {
      "in_progress" => Ok(Self::InProgress),
      "completed" => Ok(Self::Completed),
      "cancelled" => Ok(Self::Cancelled),
      "abandoned" => Ok(Self::Abandoned),
      _ => Err(format!("Unknown session status: {}", s)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutType {
  Push,
  Pull,
  Legs,
  Upper,
  Lower,
  FullBody,
  Chest,
  Back,
  Shoulders,
  Arms,
  Abs,
  Cardio,
}

impl std::fmt::Display for WorkoutType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      Self::Push => "push",
      Self::Pull => "pull",
      Self::Legs => "legs",
      Self::Upper => "upper",
      Self::Lower => "lower",
      Self::FullBody => "full_body",
      Self::Chest => "chest",
      Self::Back => "back",
      Self::Shoulders => "shoulders",
      Self::Arms => "arms",
      Self::Abs => "abs",
      Self::Cardio => "cardio",
    };
    write!(f, "{}", name)
  }
}

impl std::str::FromStr for WorkoutType {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match normalize_key(s).as_str() {
      "push" => Ok(Self::Push),
      "pull" => Ok(Self::Pull),
      "legs" => Ok(Self::Legs),
      "upper" => Ok(Self::Upper),
      "lower" => Ok(Self::Lower),
      "full_body" => Ok(Self::FullBody),
      "chest" => Ok(Self::Chest),
      "back" => Ok(Self::Back),
      "shoulders" => Ok(Self::Shoulders),
      "arms" => Ok(Self::Arms),
      "abs" => Ok(Self::Abs),
      "cardio" => Ok(Self::Cardio),
      _ => Err(format!("Unknown workout type: {}", s)),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSession {
  pub id: i64,
  pub user_id: i64,
  pub start_time: DateTime<Utc>,
  pub end_time: Option<DateTime<Utc>>,
  pub status: SessionStatus,
  pub workout_type: Option<WorkoutType>,
  pub program_day: Option<i64>,
  pub program_cycle: Option<i64>,
  pub total_volume: f64,
  pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutExercise {
  pub id: i64,
  pub session_id: i64,
  pub exercise_id: i64,
  pub order_in_session: i64,
  pub total_volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseSet {
  pub id: i64,
  pub workout_exercise_id: i64,
  pub set_number: i64,
  pub weight: f64,
  pub reps: i64,
  pub rpe: Option<f64>,
  pub completed: bool,
  pub completed_at: Option<DateTime<Utc>>,
}

impl ExerciseSet {
  pub fn volume(&self) -> f64 {
    self.weight * self.reps as f64
  }
}

/// Best record for a (user, exercise) pair is the row with max(weight)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalRecord {
  pub id: i64,
  pub user_id: i64,
  pub exercise_id: i64,
  pub weight: f64,
  pub reps: i64,
  pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuscleRecovery {
  pub user_id: i64,
  /// Free-form label as stored, may not parse as a known muscle group
  pub muscle_group: String,
  pub last_worked: DateTime<Utc>,
  pub recovery_percentage: f64,
  pub soreness: i64,
}
