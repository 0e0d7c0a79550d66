//! Split program selection
//!
//! A fixed decision table over experience, weekly training days and schedule
//! regularity. Branches are evaluated in order and the first match wins.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::SelectorConfig;
use crate::models::{week_start, ExperienceLevel, ProgramType, UserProfile, WorkoutSession, WorkoutType};
use crate::position::workout_type_sequence;

/// Most recent sessions looked at when estimating schedule habits
const HABIT_LOOKBACK: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramRecommendation {
  pub program_type: ProgramType,
  pub sequence: Vec<WorkoutType>,
  pub reason: String,
  /// 0.0 to 1.0
  pub confidence: f64,
  pub weekly_days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulePattern {
  pub is_irregular: bool,
  /// 1 / (1 + std-dev of day gaps)
  pub consistency: f64,
}

fn recent_work(sessions: &[WorkoutSession], since: DateTime<Utc>) -> Vec<&WorkoutSession> {
  let mut recent: Vec<&WorkoutSession> = sessions
    .iter()
    .filter(|s| s.status.is_active_work())
    .collect();
  recent.sort_by(|a, b| b.start_time.cmp(&a.start_time));
  recent.truncate(HABIT_LOOKBACK);
  recent.retain(|s| s.start_time >= since);
  recent
}

/// Rounded average sessions per training week (Monday start) over the
/// trailing window, clamped to 1..=7
pub fn estimate_weekly_days(sessions: &[WorkoutSession], now: DateTime<Utc>, config: &SelectorConfig) -> i64 {
  let since = now - Duration::weeks(config.estimate_window_weeks);
  let recent = recent_work(sessions, since);
  if recent.is_empty() {
    return config.default_weekly_days;
  }

  let mut per_week: HashMap<NaiveDate, usize> = HashMap::new();
  for session in &recent {
    *per_week.entry(week_start(session.start_time)).or_insert(0) += 1;
  }

  let average = per_week.values().sum::<usize>() as f64 / per_week.len() as f64;
  (average.round() as i64).clamp(1, 7)
}

/// Irregular when there are too few recent sessions or the day gaps vary widely
pub fn analyze_schedule(sessions: &[WorkoutSession], now: DateTime<Utc>, config: &SelectorConfig) -> SchedulePattern {
  let since = now - Duration::days(config.regularity_window_days);
  let mut recent = recent_work(sessions, since);
  if recent.len() < config.min_sessions_for_regularity {
    return SchedulePattern {
      is_irregular: true,
      consistency: 0.0,
    };
  }

  recent.sort_by_key(|s| s.start_time);
  let gaps: Vec<f64> = recent
    .windows(2)
    .map(|pair| (pair[1].start_time - pair[0].start_time).num_days() as f64)
    .collect();
  if gaps.is_empty() {
    return SchedulePattern {
      is_irregular: false,
      consistency: 1.0,
    };
  }

  let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
  let variance = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / gaps.len() as f64;
  let std_dev = variance.sqrt();

  SchedulePattern {
    is_irregular: std_dev > config.irregular_gap_std_dev,
    consistency: if std_dev > 0.0 { 1.0 / (1.0 + std_dev) } else { 1.0 },
  }
}

fn recommend(program_type: ProgramType, weekly_days: i64, confidence: f64, reason: String) -> ProgramRecommendation {
  ProgramRecommendation {
    program_type,
    sequence: workout_type_sequence(program_type),
    reason,
    confidence,
    weekly_days,
  }
}

pub fn select_program(
  profile: &UserProfile,
  sessions: &[WorkoutSession],
  now: DateTime<Utc>,
  config: &SelectorConfig,
) -> ProgramRecommendation {
  let weekly_days = profile
    .weekly_workout_days
    .unwrap_or_else(|| estimate_weekly_days(sessions, now, config));
  let experience = profile.experience_level;

  if experience == ExperienceLevel::Beginner {
    return recommend(
      ProgramType::FullBody,
      weekly_days,
      0.9,
      "Full body training builds base strength and movement patterns for beginners".to_string(),
    );
  }

  if (2..=3).contains(&weekly_days) {
    return if experience >= ExperienceLevel::Intermediate {
      recommend(
        ProgramType::Ppl,
        weekly_days,
        0.85,
        format!("A push/pull/legs split uses {} days a week efficiently", weekly_days),
      )
    } else {
      recommend(
        ProgramType::FullBody,
        weekly_days,
        0.8,
        format!("Full body sessions {} days a week develop every muscle evenly", weekly_days),
      )
    };
  }

  if weekly_days == 4 {
    return recommend(
      ProgramType::UpperLower,
      weekly_days,
      0.9,
      "An upper/lower split balances recovery and volume at 4 days a week".to_string(),
    );
  }

  if weekly_days >= 5 && experience == ExperienceLevel::Advanced {
    return recommend(
      ProgramType::BroSplit,
      weekly_days,
      0.85,
      format!("A 5-day body part split focuses each muscle at {} days a week", weekly_days),
    );
  }

  if weekly_days >= 5 && experience == ExperienceLevel::Intermediate {
    return recommend(
      ProgramType::Ppl,
      weekly_days,
      0.8,
      format!("Repeating push/pull/legs at {} days a week keeps volume high", weekly_days),
    );
  }

  if analyze_schedule(sessions, now, config).is_irregular {
    return recommend(
      ProgramType::FullBody,
      weekly_days,
      0.7,
      "Full body sessions adapt best to an irregular schedule".to_string(),
    );
  }

  recommend(
    ProgramType::Ppl,
    weekly_days,
    0.75,
    "A standard push/pull/legs program for balanced development".to_string(),
  )
}
