pub mod exercise;
pub mod profile;
pub mod session;

pub use exercise::{Equipment, Exercise, ExerciseCategory, MuscleGroup, RecommendationTier};
pub use profile::{ExperienceLevel, Gender, ProgramType, UserProfile};
pub use session::{
  ExerciseSet, MuscleRecovery, PersonalRecord, SessionStatus, WorkoutExercise, WorkoutSession,
  WorkoutType,
};

use chrono::{DateTime, Datelike, Duration, NaiveDate, SecondsFormat, Utc};

/// Canonical form for enum keys stored as text: `"Full Body"` -> `"full_body"`
pub(crate) fn normalize_key(s: &str) -> String {
  s.trim().to_lowercase().replace([' ', '-'], "_")
}

/// Fixed-width RFC 3339 so stored timestamps compare correctly as text
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .ok()
}

/// Monday of the training week containing `dt`
pub fn week_start(dt: DateTime<Utc>) -> NaiveDate {
  let date = dt.date_naive();
  date - Duration::days(date.weekday().num_days_from_monday() as i64)
}
