//! Load prescription
//!
//! Suggests weight, sets, reps and rest for one exercise. The weight starts
//! from the last performance (or a body-weight estimate), is scaled by the
//! recent performance trend and recovery state, then clamped into the
//! intensity band of the current mesocycle phase. Two ceilings always hold:
//! at most 5% above the last weight and at most 10% above the personal record.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::classifier::normalize_name;
use crate::coaching::exercise_tip;
use crate::config::{PhaseSettings, PrescriptionConfig, MIN_QUARTILE_POINTS};
use crate::history::TrainingHistory;
use crate::models::{week_start, Exercise, UserProfile};

/// Days assumed since the last session when an exercise was never performed
const NEVER_PERFORMED_DAYS: i64 = 7;

/// ---------------------------------------------------------------------------
/// Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingPhase {
  Accumulation,
  Intensification,
  Realization,
  Deload,
}

impl TrainingPhase {
  pub fn settings<'a>(&self, config: &'a PrescriptionConfig) -> &'a PhaseSettings {
    match self {
      Self::Accumulation => &config.phases.accumulation,
      Self::Intensification => &config.phases.intensification,
      Self::Realization => &config.phases.realization,
      Self::Deload => &config.phases.deload,
    }
  }
}

impl std::fmt::Display for TrainingPhase {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Accumulation => write!(f, "accumulation"),
      Self::Intensification => write!(f, "intensification"),
      Self::Realization => write!(f, "realization"),
      Self::Deload => write!(f, "deload"),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTrend {
  ReadyToProgress,
  Improving,
  Maintaining,
  Declining,
  NeedsDeload,
  TechniqueFocus,
  NewExercise,
}

impl PerformanceTrend {
  fn multiplier(&self, config: &PrescriptionConfig) -> f64 {
    let m = &config.trend_multipliers;
    match self {
      Self::ReadyToProgress => m.ready_to_progress,
      Self::Improving => m.improving,
      Self::Maintaining => m.maintaining,
      Self::Declining => m.declining,
      Self::NeedsDeload => m.needs_deload,
      Self::TechniqueFocus => m.technique_focus,
      Self::NewExercise => m.new_exercise,
    }
  }
}

impl std::fmt::Display for PerformanceTrend {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::ReadyToProgress => write!(f, "ready_to_progress"),
      Self::Improving => write!(f, "improving"),
      Self::Maintaining => write!(f, "maintaining"),
      Self::Declining => write!(f, "declining"),
      Self::NeedsDeload => write!(f, "needs_deload"),
      Self::TechniqueFocus => write!(f, "technique_focus"),
      Self::NewExercise => write!(f, "new_exercise"),
    }
  }
}

/// Readiness to train one exercise again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseRecovery {
  Optimal,
  WellRecovered,
  UnderRecovered,
  Overreaching,
  Detrained,
}

impl ExerciseRecovery {
  fn multiplier(&self, config: &PrescriptionConfig) -> f64 {
    let m = &config.recovery_multipliers;
    match self {
      Self::Optimal => m.optimal,
      Self::WellRecovered => m.well_recovered,
      Self::UnderRecovered => m.under_recovered,
      Self::Overreaching => m.overreaching,
      Self::Detrained => m.detrained,
    }
  }
}

impl std::fmt::Display for ExerciseRecovery {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Optimal => write!(f, "optimal"),
      Self::WellRecovered => write!(f, "well_recovered"),
      Self::UnderRecovered => write!(f, "under_recovered"),
      Self::Overreaching => write!(f, "overreaching"),
      Self::Detrained => write!(f, "detrained"),
    }
  }
}

/// One completed working set of the exercise
#[derive(Debug, Clone, PartialEq)]
pub struct PerformancePoint {
  pub weight: f64,
  pub reps: i64,
  /// Sets logged for the exercise in that session
  pub sets: usize,
  pub rpe: Option<f64>,
  pub performed_at: DateTime<Utc>,
}

impl PerformancePoint {
  fn volume(&self) -> f64 {
    self.weight * self.reps as f64 * self.sets as f64
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAnalysis {
  pub trend: PerformanceTrend,
  pub average_rpe: f64,
  /// 1 - (max - min) / mean of the recent weights
  pub consistency: f64,
  /// Newest two vs oldest two volumes, relative to the mean volume
  pub volume_trend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadPrescription {
  pub exercise_id: i64,
  pub weight: f64,
  pub sets: u32,
  pub reps: String,
  pub rest_seconds: u32,
  pub rationale: String,
  pub phase: TrainingPhase,
  pub recovery: ExerciseRecovery,
  pub trend: PerformanceTrend,
  /// Weight as a share of the personal record, when one is known
  pub intensity_percent: Option<i64>,
  pub focus: String,
  pub coaching_tip: String,
}

/// ---------------------------------------------------------------------------
/// Base Weight
/// ---------------------------------------------------------------------------

/// Body-weight ratio from the first keyword entry the name matches, else
/// the category coefficient
pub fn strength_coefficient(exercise: &Exercise, config: &PrescriptionConfig) -> f64 {
  let name = normalize_name(&exercise.name);
  config
    .keyword_coefficients
    .iter()
    .find(|entry| !entry.keywords.is_empty() && entry.keywords.iter().all(|kw| name.contains(kw.as_str())))
    .map(|entry| entry.coefficient)
    .unwrap_or_else(|| config.category_coefficients.for_category(exercise.category))
}

/// Starting weight for someone who has never logged the exercise
pub fn base_weight(profile: &UserProfile, exercise: &Exercise, config: &PrescriptionConfig) -> f64 {
  let body_weight = profile
    .body_weight
    .filter(|w| w.is_finite() && *w > 0.0)
    .unwrap_or(config.default_body_weight);

  body_weight
    * strength_coefficient(exercise, config)
    * config.gender.multiplier(profile.gender, exercise.category)
    * config.experience.for_level(profile.experience_level)
}

/// ---------------------------------------------------------------------------
/// Recent Performance
/// ---------------------------------------------------------------------------

/// Completed sets with reps from completed sessions in the window, newest first
pub fn recent_points(
  history: &TrainingHistory,
  exercise_id: i64,
  now: DateTime<Utc>,
  config: &PrescriptionConfig,
) -> Vec<PerformancePoint> {
  let since = now - Duration::days(config.history_days);
  let mut points = Vec::new();

  for record in history.completed_since(since) {
    for performed in record.exercises.iter().filter(|e| e.exercise_id == exercise_id) {
      let mut sets: Vec<_> = performed
        .completed_sets()
        .filter(|s| s.reps > 0 && s.weight.is_finite())
        .collect();
      sets.sort_by(|a, b| b.set_number.cmp(&a.set_number));
      let logged = performed.sets.len();
      points.extend(sets.into_iter().map(|s| PerformancePoint {
        weight: s.weight,
        reps: s.reps,
        sets: logged,
        rpe: s.rpe,
        performed_at: record.start_time(),
      }));
    }
  }

  points
}

/// Drop points outside the interquartile fences on weight
pub fn fence_outliers(points: Vec<PerformancePoint>, config: &PrescriptionConfig) -> Vec<PerformancePoint> {
  if points.len() < config.min_points_for_outliers.max(MIN_QUARTILE_POINTS) {
    return points;
  }

  let mut weights: Vec<f64> = points.iter().map(|p| p.weight).collect();
  weights.sort_by(|a, b| a.total_cmp(b));
  let q1 = weights[(weights.len() as f64 * 0.25) as usize];
  let q3 = weights[((weights.len() as f64 * 0.75) as usize).min(weights.len() - 1)];
  let iqr = q3 - q1;
  let lower = q1 - config.iqr_factor * iqr;
  let upper = q3 + config.iqr_factor * iqr;

  points
    .into_iter()
    .filter(|p| p.weight >= lower && p.weight <= upper)
    .collect()
}

/// RPE implied by average reps when none was logged
pub fn estimate_rpe_from_reps(average_reps: f64, config: &PrescriptionConfig) -> f64 {
  config
    .reps_to_rpe
    .iter()
    .find(|entry| average_reps <= entry.max_reps)
    .map(|entry| entry.rpe)
    .unwrap_or(config.high_rep_rpe)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
  let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
  (count > 0).then(|| sum / count as f64)
}

pub fn analyze_performance(points: &[PerformancePoint], config: &PrescriptionConfig) -> PerformanceAnalysis {
  if points.is_empty() {
    return PerformanceAnalysis {
      trend: PerformanceTrend::NewExercise,
      average_rpe: config.default_rpe,
      consistency: 0.0,
      volume_trend: 0.0,
    };
  }

  let recent = &points[..points.len().min(config.recent_rpe_sets.max(1))];
  let average_rpe = mean(recent.iter().filter_map(|p| p.rpe).filter(|r| r.is_finite()))
    .unwrap_or_else(|| {
      let reps = mean(recent.iter().map(|p| p.reps as f64)).unwrap_or(0.0);
      estimate_rpe_from_reps(reps, config)
    });

  let consistency = if points.len() > 1 {
    let max = points.iter().map(|p| p.weight).fold(f64::MIN, f64::max);
    let min = points.iter().map(|p| p.weight).fold(f64::MAX, f64::min);
    match mean(points.iter().map(|p| p.weight)) {
      Some(avg) if avg > 0.0 => 1.0 - (max - min) / avg,
      _ => 1.0,
    }
  } else {
    1.0
  };

  let volumes: Vec<f64> = points.iter().map(|p| p.volume()).collect();
  let volume_trend = if volumes.len() > 2 {
    let newest = mean(volumes[..2].iter().copied());
    let oldest = mean(volumes[volumes.len() - 2..].iter().copied());
    match (newest, oldest, mean(volumes.iter().copied())) {
      (Some(n), Some(o), Some(avg)) if avg > 0.0 => (n - o) / avg,
      _ => 0.0,
    }
  } else {
    0.0
  };

  let trend = if average_rpe < 6.0 && volume_trend > 0.0 {
    PerformanceTrend::ReadyToProgress
  } else if average_rpe > 8.5 {
    PerformanceTrend::NeedsDeload
  } else if consistency < 0.7 {
    PerformanceTrend::TechniqueFocus
  } else if volume_trend < -0.2 {
    PerformanceTrend::Declining
  } else if volume_trend > 0.1 {
    PerformanceTrend::Improving
  } else {
    PerformanceTrend::Maintaining
  };

  PerformanceAnalysis {
    trend,
    average_rpe,
    consistency,
    volume_trend,
  }
}

/// ---------------------------------------------------------------------------
/// Recovery and Phase
/// ---------------------------------------------------------------------------

pub fn assess_recovery(
  history: &TrainingHistory,
  exercise: &Exercise,
  now: DateTime<Utc>,
  config: &PrescriptionConfig,
) -> ExerciseRecovery {
  let days_since = history
    .last_session_with(exercise.id)
    .map(|r| (now - r.start_time()).num_days())
    .unwrap_or(NEVER_PERFORMED_DAYS);
  let window = config.recovery_windows.for_category(exercise.category);
  let weekly_sessions = history
    .sessions
    .iter()
    .filter(|r| r.is_active_work() && r.start_time() > now - Duration::days(7))
    .count();

  if days_since < window.min_days {
    ExerciseRecovery::UnderRecovered
  } else if days_since > window.max_days * 2 {
    ExerciseRecovery::Detrained
  } else if weekly_sessions > config.overreaching_sessions_per_week {
    ExerciseRecovery::Overreaching
  } else if days_since <= window.max_days {
    ExerciseRecovery::Optimal
  } else {
    ExerciseRecovery::WellRecovered
  }
}

/// Mesocycle phase from the calendar of completed training weeks
pub fn training_phase(
  history: &TrainingHistory,
  points: &[PerformancePoint],
  now: DateTime<Utc>,
  config: &PrescriptionConfig,
) -> TrainingPhase {
  let days_since_last = points
    .first()
    .map(|p| (now - p.performed_at).num_days())
    .unwrap_or(0);
  if days_since_last >= config.detraining_days {
    return TrainingPhase::Deload;
  }

  let current_week = week_start(now);
  let oldest_week = current_week - Duration::weeks(config.mesocycle_weeks.max(1) - 1);
  let completed_weeks: Vec<NaiveDate> = history.completed().map(|r| week_start(r.start_time())).collect();

  let recent_sessions = completed_weeks
    .iter()
    .filter(|w| **w >= oldest_week && **w <= current_week)
    .count();
  let recent_average = recent_sessions as f64 / config.mesocycle_weeks.max(1) as f64;
  if recent_average >= config.chronic_load_sessions_per_week {
    return TrainingPhase::Deload;
  }

  let distinct_weeks = completed_weeks.into_iter().collect::<HashSet<_>>().len() as i64;
  match distinct_weeks % 4 {
    0 => TrainingPhase::Accumulation,
    1 => TrainingPhase::Intensification,
    2 => TrainingPhase::Realization,
    _ => TrainingPhase::Deload,
  }
}

/// ---------------------------------------------------------------------------
/// Rounding
/// ---------------------------------------------------------------------------

/// Nearest plate increment, stepping down when rounding up would cross the ceiling
pub fn round_to_plate(weight: f64, ceiling: Option<f64>, config: &PrescriptionConfig) -> f64 {
  let step = config.plate_increment;
  let rounded = (weight / step).round() * step;

  match ceiling {
    Some(limit) if rounded > limit + 1e-9 => {
      let floored = (limit / step).floor() * step;
      if floored >= config.min_plate {
        floored
      } else {
        weight
      }
    }
    _ => rounded.max(config.min_plate),
  }
}

/// ---------------------------------------------------------------------------
/// Prescription
/// ---------------------------------------------------------------------------

fn focus_for(analysis: &PerformanceAnalysis, phase: TrainingPhase) -> &'static str {
  if analysis.trend == PerformanceTrend::TechniqueFocus {
    "Focus on form and technique."
  } else if phase == TrainingPhase::Deload {
    "Go light and focus on recovery."
  } else if phase == TrainingPhase::Realization {
    "Lift with maximum focus."
  } else if analysis.average_rpe > 8.0 {
    "Rest fully between sets."
  } else {
    "Control the tempo on every rep."
  }
}

fn rationale_for(phase: TrainingPhase, recovery: ExerciseRecovery) -> String {
  let phase_text = match phase {
    TrainingPhase::Accumulation => "Volume week",
    TrainingPhase::Intensification => "Intensity week",
    TrainingPhase::Realization => "Peak week",
    TrainingPhase::Deload => "Recovery week",
  };
  let recovery_text = match recovery {
    ExerciseRecovery::Optimal => "recovery is optimal.",
    ExerciseRecovery::UnderRecovered => "more recovery is needed.",
    ExerciseRecovery::Overreaching => "watch for overtraining.",
    ExerciseRecovery::Detrained => "building intensity back up gradually.",
    ExerciseRecovery::WellRecovered => "training at a steady intensity.",
  };
  format!("{}: {}", phase_text, recovery_text)
}

pub fn suggested_weight(
  history: &TrainingHistory,
  exercise: &Exercise,
  now: DateTime<Utc>,
  config: &PrescriptionConfig,
) -> LoadPrescription {
  let base = base_weight(&history.profile, exercise, config);
  let points = fence_outliers(recent_points(history, exercise.id, now, config), config);
  let analysis = analyze_performance(&points, config);
  let recovery = assess_recovery(history, exercise, now, config);
  let phase = training_phase(history, &points, now, config);
  let settings = phase.settings(config);
  let record = history.best_record(exercise.id).filter(|pr| pr.weight > 0.0);

  let last_weight = points
    .iter()
    .take_while(|p| p.performed_at == points[0].performed_at)
    .map(|p| p.weight)
    .fold(None, |acc: Option<f64>, w| Some(acc.map_or(w, |a| a.max(w))));

  let (weight, intensity_percent) = if last_weight.is_none() && record.is_none() {
    // Nothing to anchor on: the body-weight estimate stands alone
    (round_to_plate(base.max(config.min_plate), None, config), None)
  } else {
    let last = last_weight.filter(|w| *w > 0.0).unwrap_or(base);
    let pr = record
      .map(|r| r.weight)
      .or_else(|| Some(last * config.missing_pr_ratio).filter(|w| *w > 0.0))
      .or_else(|| Some(base).filter(|w| *w > 0.0))
      .unwrap_or(10.0);

    let mut target = if last > 0.0 {
      last * analysis.trend.multiplier(config) * recovery.multiplier(config)
    } else {
      pr * 0.7
    };
    if !target.is_finite() {
      target = pr * settings.band.min_ratio;
    }

    target = target.clamp(pr * settings.band.min_ratio, pr * settings.band.max_ratio);
    let weekly_cap = (last > 0.0).then(|| last * config.max_weekly_increase);
    if let Some(cap) = weekly_cap {
      target = target.min(cap);
    }
    target = target.max(config.min_plate);
    let pr_cap = pr * config.pr_cap;
    target = target.min(pr_cap);

    let ceiling = weekly_cap.map_or(pr_cap, |cap| cap.min(pr_cap));
    let weight = round_to_plate(target, Some(ceiling), config);
    (weight, Some((weight / pr * 100.0).round() as i64))
  };

  let focus = focus_for(&analysis, phase);

  debug!(
    user_id = history.user_id(),
    exercise_id = exercise.id,
    base,
    weight,
    phase = %phase,
    trend = %analysis.trend,
    recovery = %recovery,
    "Prescribed load"
  );

  LoadPrescription {
    exercise_id: exercise.id,
    weight,
    sets: settings.volume.sets,
    reps: settings.volume.reps.clone(),
    rest_seconds: settings.volume.rest_seconds,
    rationale: rationale_for(phase, recovery),
    phase,
    recovery,
    trend: analysis.trend,
    intensity_percent,
    focus: focus.to_string(),
    coaching_tip: exercise_tip(&exercise.name, focus),
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
