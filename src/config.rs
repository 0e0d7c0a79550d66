//! Engine configuration
//!
//! Every empirical constant the engine uses lives here: recovery windows,
//! MEV/MAV set counts, body-weight coefficients, periodization bands. None of
//! them are domain truths, so all of them can be overridden from a JSON file
//! (`LIFT_COACH_CONFIG`). Missing fields keep their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::classifier::{normalize_name, RuleTable};
use crate::models::{ExerciseCategory, ExperienceLevel, Gender, MuscleGroup};

pub const CONFIG_PATH_ENV: &str = "LIFT_COACH_CONFIG";
pub const RULES_PATH_ENV: &str = "LIFT_COACH_RULES";
pub const DATABASE_URL_ENV: &str = "LIFT_COACH_DATABASE_URL";
const DEFAULT_DATABASE_URL: &str = "sqlite://lift-coach.db?mode=rwc";

/// Fewest performance points that give distinct quartiles
pub const MIN_QUARTILE_POINTS: usize = 4;

/// ---------------------------------------------------------------------------
/// Errors
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ConfigError {
  #[error("Failed to read configuration: {0}")]
  Io(String),

  #[error("Failed to parse configuration: {0}")]
  Parse(String),

  #[error("Invalid configuration: {0}")]
  Invalid(String),
}

/// ---------------------------------------------------------------------------
/// Engine Configuration
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub filter: FilterConfig,
  pub selector: SelectorConfig,
  pub progression: ProgressionConfig,
  pub prescription: PrescriptionConfig,
}

impl EngineConfig {
  /// Defaults, overridden by the JSON file named in `LIFT_COACH_CONFIG`
  pub fn from_env() -> Result<Self, ConfigError> {
    let config = match std::env::var(CONFIG_PATH_ENV) {
      Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
      _ => Self::default(),
    };
    config.validate()?;
    Ok(config)
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
      .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    Self::from_json(&json)
  }

  pub fn from_json(json: &str) -> Result<Self, ConfigError> {
    let mut config: EngineConfig =
      serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.prescription.normalize_keywords();
    config.filter.compound_keywords = config
      .filter
      .compound_keywords
      .iter()
      .map(|kw| normalize_name(kw))
      .collect();
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    let p = &self.prescription;

    if p.plate_increment <= 0.0 || !p.plate_increment.is_finite() {
      return Err(ConfigError::Invalid("plate_increment must be positive".to_string()));
    }
    if p.min_points_for_outliers < MIN_QUARTILE_POINTS {
      return Err(ConfigError::Invalid(format!(
        "min_points_for_outliers must be at least {}",
        MIN_QUARTILE_POINTS
      )));
    }
    if p.min_plate < 0.0 {
      return Err(ConfigError::Invalid("min_plate must not be negative".to_string()));
    }
    if p.max_weekly_increase < 1.0 || p.pr_cap < 1.0 {
      return Err(ConfigError::Invalid(
        "max_weekly_increase and pr_cap are ratios of at least 1.0".to_string(),
      ));
    }
    for (name, band) in p.phases.bands() {
      if band.min_ratio > band.max_ratio || band.min_ratio <= 0.0 {
        return Err(ConfigError::Invalid(format!("{} band is inverted or empty", name)));
      }
    }
    for window in p.recovery_windows.all() {
      if window.min_days > window.max_days {
        return Err(ConfigError::Invalid("recovery window min_days exceeds max_days".to_string()));
      }
    }
    if self.progression.mev_sets > self.progression.mav_sets {
      return Err(ConfigError::Invalid("mev_sets must not exceed mav_sets".to_string()));
    }
    if self.filter.recovery_threshold_percent < 0.0 || self.filter.recovery_threshold_percent > 100.0 {
      return Err(ConfigError::Invalid("recovery_threshold_percent must be within 0..=100".to_string()));
    }
    Ok(())
  }
}

/// Classifier rules: the built-in table unless `LIFT_COACH_RULES` names a file
pub fn rules_from_env() -> Result<RuleTable, ConfigError> {
  match std::env::var(RULES_PATH_ENV) {
    Ok(path) if !path.trim().is_empty() => RuleTable::from_file(path.trim()),
    _ => Ok(RuleTable::default()),
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
  pub url: String,
  pub max_connections: u32,
}

impl DatabaseConfig {
  pub fn from_env() -> Self {
    let url = std::env::var(DATABASE_URL_ENV)
      .ok()
      .filter(|u| !u.trim().is_empty())
      .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
    Self { url, max_connections: 5 }
  }
}

/// ---------------------------------------------------------------------------
/// Filter Pipeline
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarietyRatio {
  pub familiar: usize,
  pub new: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VarietyRatios {
  pub beginner: VarietyRatio,
  pub intermediate: VarietyRatio,
  pub advanced: VarietyRatio,
}

impl Default for VarietyRatios {
  fn default() -> Self {
    Self {
      beginner: VarietyRatio { familiar: 8, new: 2 },
      intermediate: VarietyRatio { familiar: 6, new: 4 },
      advanced: VarietyRatio { familiar: 4, new: 6 },
    }
  }
}

impl VarietyRatios {
  /// Unknown experience blends like an intermediate
  pub fn for_level(&self, level: Option<ExperienceLevel>) -> VarietyRatio {
    match level {
      Some(ExperienceLevel::Beginner) | Some(ExperienceLevel::Novice) => self.beginner,
      Some(ExperienceLevel::Advanced) | Some(ExperienceLevel::Expert) => self.advanced,
      _ => self.intermediate,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
  /// Below this many candidates the recovery stage is skipped
  pub min_candidates: usize,
  pub recovery_threshold_percent: f64,
  pub recent_work_hours: i64,
  pub familiar_window_days: i64,
  pub familiar_min_count: usize,
  pub variety: VarietyRatios,
  pub compound_keywords: Vec<String>,
}

impl Default for FilterConfig {
  fn default() -> Self {
    Self {
      min_candidates: 6,
      recovery_threshold_percent: 30.0,
      recent_work_hours: 24,
      familiar_window_days: 28,
      familiar_min_count: 2,
      variety: VarietyRatios::default(),
      compound_keywords: ["press", "squat", "deadlift", "row", "pull up", "pullup", "chin up", "dip", "lunge"]
        .iter()
        .map(|s| s.to_string())
        .collect(),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Program Selector
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
  pub default_weekly_days: i64,
  pub estimate_window_weeks: i64,
  pub regularity_window_days: i64,
  pub min_sessions_for_regularity: usize,
  /// Std-dev of day gaps above which the schedule counts as irregular
  pub irregular_gap_std_dev: f64,
}

impl Default for SelectorConfig {
  fn default() -> Self {
    Self {
      default_weekly_days: 3,
      estimate_window_weeks: 4,
      regularity_window_days: 14,
      min_sessions_for_regularity: 3,
      irregular_gap_std_dev: 2.0,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Progression Analyzer
/// ---------------------------------------------------------------------------

/// Hours a muscle needs before it is trained again
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryHours {
  pub legs: f64,
  pub back: f64,
  pub chest: f64,
  pub shoulders: f64,
  pub arms: f64,
  pub calves: f64,
  pub default: f64,
}

impl Default for RecoveryHours {
  fn default() -> Self {
    Self {
      legs: 72.0,
      back: 72.0,
      chest: 48.0,
      shoulders: 48.0,
      arms: 24.0,
      calves: 24.0,
      default: 48.0,
    }
  }
}

impl RecoveryHours {
  pub fn hours_for(&self, muscle: MuscleGroup) -> f64 {
    match muscle {
      MuscleGroup::Legs | MuscleGroup::Quadriceps | MuscleGroup::Hamstrings | MuscleGroup::Glutes => self.legs,
      MuscleGroup::Back | MuscleGroup::Lats => self.back,
      MuscleGroup::Chest => self.chest,
      MuscleGroup::Shoulders => self.shoulders,
      MuscleGroup::Biceps | MuscleGroup::Triceps | MuscleGroup::Forearms => self.arms,
      MuscleGroup::Calves => self.calves,
      _ => self.default,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
  pub session_window: usize,
  pub min_completed_cycles: i64,
  pub min_consistency_percent: f64,
  pub min_volume_increase_percent: f64,
  pub volume_window: usize,
  pub strength_window: usize,
  pub max_strength_gain_percent: f64,
  pub consistency_weeks: i64,
  /// Minimum effective weekly sets per muscle
  pub mev_sets: i64,
  /// Maximum adaptive weekly sets per muscle
  pub mav_sets: i64,
  pub overreaching_sessions_per_week: usize,
  pub moderate_sessions_per_week: usize,
  pub deload_sessions_two_weeks: usize,
  pub plateau_readings: usize,
  pub plateau_tolerance: f64,
  pub recovery_hours: RecoveryHours,
  pub ready_muscle_count: usize,
  pub volume_session_window: usize,
  pub default_rpe: f64,
  pub transition_weeks: i64,
  pub goal_transition_percent: i64,
}

impl Default for ProgressionConfig {
  fn default() -> Self {
    Self {
      session_window: 20,
      min_completed_cycles: 2,
      min_consistency_percent: 80.0,
      min_volume_increase_percent: 10.0,
      volume_window: 5,
      strength_window: 3,
      max_strength_gain_percent: 50.0,
      consistency_weeks: 4,
      mev_sets: 10,
      mav_sets: 20,
      overreaching_sessions_per_week: 5,
      moderate_sessions_per_week: 3,
      deload_sessions_two_weeks: 8,
      plateau_readings: 3,
      plateau_tolerance: 2.5,
      recovery_hours: RecoveryHours::default(),
      ready_muscle_count: 3,
      volume_session_window: 10,
      default_rpe: 7.0,
      transition_weeks: 6,
      goal_transition_percent: 90,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Load Prescription
/// ---------------------------------------------------------------------------

/// Body-weight ratio for exercises whose name contains every keyword.
/// Entries are checked in order, so specific variants precede generic ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordCoefficient {
  pub keywords: Vec<String>,
  pub coefficient: f64,
}

fn kc(keywords: &[&str], coefficient: f64) -> KeywordCoefficient {
  KeywordCoefficient {
    keywords: keywords.iter().map(|k| k.to_string()).collect(),
    coefficient,
  }
}

pub fn default_keyword_coefficients() -> Vec<KeywordCoefficient> {
  vec![
    // Chest
    kc(&["bench press", "barbell"], 0.75),
    kc(&["bench press", "dumbbell"], 0.3),
    kc(&["bench press", "incline"], 0.65),
    kc(&["bench press", "decline"], 0.85),
    kc(&["bench press"], 0.7),
    kc(&["fly", "cable"], 0.25),
    kc(&["fly", "dumbbell"], 0.2),
    kc(&["fly"], 0.22),
    kc(&["chest press"], 0.7),
    kc(&["cable crossover"], 0.3),
    kc(&["push up"], 0.0),
    kc(&["pushup"], 0.0),
    kc(&["dip"], 0.0),
    // Back
    kc(&["deadlift", "romanian"], 0.8),
    kc(&["deadlift", "stiff"], 0.75),
    kc(&["deadlift"], 1.2),
    kc(&["barbell row"], 0.6),
    kc(&["dumbbell row"], 0.35),
    kc(&["seated row"], 0.65),
    kc(&["lat pulldown"], 0.6),
    kc(&["pull up"], 0.0),
    kc(&["pullup"], 0.0),
    kc(&["face pull"], 0.2),
    // Legs
    kc(&["squat", "front"], 0.7),
    kc(&["squat", "bulgarian"], 0.4),
    kc(&["squat", "goblet"], 0.5),
    kc(&["squat"], 0.9),
    kc(&["leg press"], 1.8),
    kc(&["lunge"], 0.4),
    kc(&["leg extension"], 0.5),
    kc(&["leg curl"], 0.4),
    kc(&["calf raise"], 0.8),
    // Shoulders
    kc(&["shoulder press", "barbell"], 0.5),
    kc(&["shoulder press", "dumbbell"], 0.22),
    kc(&["shoulder press"], 0.45),
    kc(&["lateral raise"], 0.1),
    kc(&["side raise"], 0.1),
    kc(&["front raise"], 0.12),
    kc(&["rear delt"], 0.08),
    kc(&["upright row"], 0.4),
    kc(&["shrug"], 0.6),
    // Arms
    kc(&["barbell curl"], 0.35),
    kc(&["dumbbell curl"], 0.15),
    kc(&["hammer curl"], 0.17),
    kc(&["preacher curl"], 0.3),
    kc(&["cable curl"], 0.3),
    kc(&["tricep", "extension"], 0.35),
    kc(&["tricep", "pushdown"], 0.4),
    kc(&["tricep", "kickback"], 0.1),
    kc(&["tricep"], 0.3),
    // Core
    kc(&["plank"], 0.0),
    kc(&["crunch"], 0.0),
    kc(&["leg raise"], 0.0),
    kc(&["woodchop"], 0.15),
  ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryCoefficients {
  pub chest: f64,
  pub back: f64,
  pub legs: f64,
  pub shoulders: f64,
  pub arms: f64,
  pub core: f64,
  pub other: f64,
}

impl Default for CategoryCoefficients {
  fn default() -> Self {
    Self {
      chest: 0.5,
      back: 0.6,
      legs: 0.7,
      shoulders: 0.35,
      arms: 0.25,
      core: 0.0,
      other: 0.4,
    }
  }
}

impl CategoryCoefficients {
  pub fn for_category(&self, category: ExerciseCategory) -> f64 {
    match category {
      ExerciseCategory::Chest => self.chest,
      ExerciseCategory::Back => self.back,
      ExerciseCategory::Legs => self.legs,
      ExerciseCategory::Shoulders => self.shoulders,
      ExerciseCategory::Arms => self.arms,
      ExerciseCategory::Core => self.core,
      _ => self.other,
    }
  }
}

/// Multipliers applied for female lifters, by category. Other genders use 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenderCoefficients {
  pub female_upper_body: f64,
  pub female_legs: f64,
  pub female_other: f64,
}

impl Default for GenderCoefficients {
  fn default() -> Self {
    Self {
      female_upper_body: 0.7,
      female_legs: 0.85,
      female_other: 0.75,
    }
  }
}

impl GenderCoefficients {
  pub fn multiplier(&self, gender: Gender, category: ExerciseCategory) -> f64 {
    match gender {
      Gender::Female => match category {
        ExerciseCategory::Chest | ExerciseCategory::Shoulders | ExerciseCategory::Arms => self.female_upper_body,
        ExerciseCategory::Legs => self.female_legs,
        _ => self.female_other,
      },
      _ => 1.0,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceCoefficients {
  pub beginner: f64,
  pub novice: f64,
  pub intermediate: f64,
  pub advanced: f64,
  pub expert: f64,
}

impl Default for ExperienceCoefficients {
  fn default() -> Self {
    Self {
      beginner: 0.5,
      novice: 0.6,
      intermediate: 0.75,
      advanced: 1.0,
      expert: 0.6,
    }
  }
}

impl ExperienceCoefficients {
  pub fn for_level(&self, level: ExperienceLevel) -> f64 {
    match level {
      ExperienceLevel::Beginner => self.beginner,
      ExperienceLevel::Novice => self.novice,
      ExperienceLevel::Intermediate => self.intermediate,
      ExperienceLevel::Advanced => self.advanced,
      ExperienceLevel::Expert => self.expert,
    }
  }
}

/// Share of the personal record a phase trains at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensityBand {
  pub min_ratio: f64,
  pub max_ratio: f64,
}

/// Sets, rep range and rest for a phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseVolume {
  pub sets: u32,
  pub reps: String,
  pub rest_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseSettings {
  pub band: IntensityBand,
  pub volume: PhaseVolume,
}

fn phase(min_ratio: f64, max_ratio: f64, sets: u32, reps: &str, rest_seconds: u32) -> PhaseSettings {
  PhaseSettings {
    band: IntensityBand { min_ratio, max_ratio },
    volume: PhaseVolume {
      sets,
      reps: reps.to_string(),
      rest_seconds,
    },
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseTable {
  pub accumulation: PhaseSettings,
  pub intensification: PhaseSettings,
  pub realization: PhaseSettings,
  pub deload: PhaseSettings,
}

impl Default for PhaseTable {
  fn default() -> Self {
    Self {
      accumulation: phase(0.65, 0.75, 4, "10-12", 90),
      intensification: phase(0.75, 0.85, 4, "6-8", 120),
      realization: phase(0.85, 0.95, 3, "3-5", 180),
      deload: phase(0.50, 0.60, 3, "12-15", 60),
    }
  }
}

impl PhaseTable {
  fn bands(&self) -> [(&'static str, IntensityBand); 4] {
    [
      ("accumulation", self.accumulation.band),
      ("intensification", self.intensification.band),
      ("realization", self.realization.band),
      ("deload", self.deload.band),
    ]
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoveryWindow {
  pub min_days: i64,
  pub max_days: i64,
}

/// Optimal days between sessions of the same exercise, by category
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryWindows {
  pub legs: RecoveryWindow,
  pub back_chest: RecoveryWindow,
  pub other: RecoveryWindow,
}

impl Default for RecoveryWindows {
  fn default() -> Self {
    Self {
      legs: RecoveryWindow { min_days: 3, max_days: 4 },
      back_chest: RecoveryWindow { min_days: 2, max_days: 3 },
      other: RecoveryWindow { min_days: 1, max_days: 2 },
    }
  }
}

impl RecoveryWindows {
  pub fn for_category(&self, category: ExerciseCategory) -> RecoveryWindow {
    match category {
      ExerciseCategory::Legs => self.legs,
      ExerciseCategory::Back | ExerciseCategory::Chest => self.back_chest,
      _ => self.other,
    }
  }

  fn all(&self) -> [RecoveryWindow; 3] {
    [self.legs, self.back_chest, self.other]
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendMultipliers {
  pub ready_to_progress: f64,
  pub improving: f64,
  pub maintaining: f64,
  pub declining: f64,
  pub needs_deload: f64,
  pub technique_focus: f64,
  pub new_exercise: f64,
}

impl Default for TrendMultipliers {
  fn default() -> Self {
    Self {
      ready_to_progress: 1.05,
      improving: 1.025,
      maintaining: 1.0,
      declining: 0.95,
      needs_deload: 0.8,
      technique_focus: 0.9,
      new_exercise: 1.0,
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryMultipliers {
  pub optimal: f64,
  pub well_recovered: f64,
  pub under_recovered: f64,
  pub overreaching: f64,
  pub detrained: f64,
}

impl Default for RecoveryMultipliers {
  fn default() -> Self {
    Self {
      optimal: 1.0,
      well_recovered: 1.02,
      under_recovered: 0.9,
      overreaching: 0.8,
      detrained: 0.85,
    }
  }
}

/// Upper rep bound mapped to an estimated RPE
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepsToRpe {
  pub max_reps: f64,
  pub rpe: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrescriptionConfig {
  pub history_days: i64,
  pub default_body_weight: f64,
  pub keyword_coefficients: Vec<KeywordCoefficient>,
  pub category_coefficients: CategoryCoefficients,
  pub gender: GenderCoefficients,
  pub experience: ExperienceCoefficients,
  pub phases: PhaseTable,
  pub recovery_windows: RecoveryWindows,
  pub trend_multipliers: TrendMultipliers,
  pub recovery_multipliers: RecoveryMultipliers,
  pub reps_to_rpe: Vec<RepsToRpe>,
  pub high_rep_rpe: f64,
  pub default_rpe: f64,
  pub recent_rpe_sets: usize,
  pub iqr_factor: f64,
  pub min_points_for_outliers: usize,
  /// Stand-in PR as a multiple of the last weight when none is recorded
  pub missing_pr_ratio: f64,
  pub max_weekly_increase: f64,
  pub pr_cap: f64,
  pub min_plate: f64,
  pub plate_increment: f64,
  pub detraining_days: i64,
  pub chronic_load_sessions_per_week: f64,
  pub overreaching_sessions_per_week: usize,
  pub mesocycle_weeks: i64,
}

impl Default for PrescriptionConfig {
  fn default() -> Self {
    Self {
      history_days: 28,
      default_body_weight: 70.0,
      keyword_coefficients: default_keyword_coefficients(),
      category_coefficients: CategoryCoefficients::default(),
      gender: GenderCoefficients::default(),
      experience: ExperienceCoefficients::default(),
      phases: PhaseTable::default(),
      recovery_windows: RecoveryWindows::default(),
      trend_multipliers: TrendMultipliers::default(),
      recovery_multipliers: RecoveryMultipliers::default(),
      reps_to_rpe: vec![
        RepsToRpe { max_reps: 3.0, rpe: 9.0 },
        RepsToRpe { max_reps: 5.0, rpe: 8.5 },
        RepsToRpe { max_reps: 8.0, rpe: 8.0 },
        RepsToRpe { max_reps: 10.0, rpe: 7.5 },
        RepsToRpe { max_reps: 12.0, rpe: 7.0 },
      ],
      high_rep_rpe: 6.5,
      default_rpe: 7.0,
      recent_rpe_sets: 3,
      iqr_factor: 1.5,
      min_points_for_outliers: 4,
      missing_pr_ratio: 1.2,
      max_weekly_increase: 1.05,
      pr_cap: 1.10,
      min_plate: 2.5,
      plate_increment: 2.5,
      detraining_days: 14,
      chronic_load_sessions_per_week: 5.0,
      overreaching_sessions_per_week: 6,
      mesocycle_weeks: 4,
    }
  }
}

impl PrescriptionConfig {
  fn normalize_keywords(&mut self) {
    for entry in &mut self.keyword_coefficients {
      for kw in entry.keywords.iter_mut() {
        *kw = normalize_name(kw);
      }
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  fn test_defaults_are_valid() {
    assert!(EngineConfig::default().validate().is_ok());
  }

  #[test]
  fn test_partial_json_keeps_defaults() {
    let json = r#"{ "filter": { "min_candidates": 4 }, "progression": { "mev_sets": 8 } }"#;
    let config = EngineConfig::from_json(json).unwrap();

    assert_eq!(config.filter.min_candidates, 4);
    assert_eq!(config.filter.recovery_threshold_percent, 30.0);
    assert_eq!(config.progression.mev_sets, 8);
    assert_eq!(config.progression.mav_sets, 20);
    assert_eq!(config.prescription.plate_increment, 2.5);
  }

  #[test]
  fn test_inverted_band_rejected() {
    let json = r#"{
      "prescription": {
        "phases": {
          "deload": {
            "band": { "min_ratio": 0.7, "max_ratio": 0.5 },
            "volume": { "sets": 3, "reps": "12-15", "rest_seconds": 60 }
          }
        }
      }
    }"#;
    let err = EngineConfig::from_json(json).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
  }

  #[test]
  fn test_zero_plate_increment_rejected() {
    let json = r#"{ "prescription": { "plate_increment": 0.0 } }"#;
    assert!(EngineConfig::from_json(json).is_err());
  }

  #[test]
  fn test_outlier_minimum_below_quartiles_rejected() {
    let json = r#"{ "prescription": { "min_points_for_outliers": 0 } }"#;
    let err = EngineConfig::from_json(json).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("min_points_for_outliers")));

    let json = r#"{ "prescription": { "min_points_for_outliers": 6 } }"#;
    assert_eq!(EngineConfig::from_json(json).unwrap().prescription.min_points_for_outliers, 6);
  }

  #[test]
  fn test_malformed_json_is_parse_error() {
    let err = EngineConfig::from_json("{ not json").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
  }

  #[test]
  fn test_recovery_hours_by_muscle() {
    let hours = RecoveryHours::default();
    assert_eq!(hours.hours_for(MuscleGroup::Quadriceps), 72.0);
    assert_eq!(hours.hours_for(MuscleGroup::Lats), 72.0);
    assert_eq!(hours.hours_for(MuscleGroup::Chest), 48.0);
    assert_eq!(hours.hours_for(MuscleGroup::Biceps), 24.0);
    assert_eq!(hours.hours_for(MuscleGroup::Calves), 24.0);
    assert_eq!(hours.hours_for(MuscleGroup::Abs), 48.0);
  }

  #[test]
  fn test_variety_ratio_by_level() {
    let ratios = VarietyRatios::default();
    assert_eq!(ratios.for_level(Some(ExperienceLevel::Novice)).familiar, 8);
    assert_eq!(ratios.for_level(Some(ExperienceLevel::Expert)).new, 6);
    assert_eq!(ratios.for_level(None), VarietyRatio { familiar: 6, new: 4 });
  }

  #[test]
  fn test_gender_multiplier() {
    let g = GenderCoefficients::default();
    assert_eq!(g.multiplier(Gender::Male, ExerciseCategory::Chest), 1.0);
    assert_eq!(g.multiplier(Gender::Female, ExerciseCategory::Arms), 0.7);
    assert_eq!(g.multiplier(Gender::Female, ExerciseCategory::Legs), 0.85);
    assert_eq!(g.multiplier(Gender::Female, ExerciseCategory::Core), 0.75);
  }

  #[test]
  #[serial]
  fn test_from_env_without_file_uses_defaults() {
    temp_env::with_var_unset(CONFIG_PATH_ENV, || {
      let config = EngineConfig::from_env().unwrap();
      assert_eq!(config.selector.default_weekly_days, 3);
    });
  }

  #[test]
  #[serial]
  fn test_from_env_reads_file() {
    let path = std::env::temp_dir().join("lift_coach_config_test.json");
    std::fs::write(&path, r#"{ "selector": { "default_weekly_days": 4 } }"#).unwrap();

    temp_env::with_var(CONFIG_PATH_ENV, Some(path.to_str().unwrap()), || {
      let config = EngineConfig::from_env().unwrap();
      assert_eq!(config.selector.default_weekly_days, 4);
    });

    std::fs::remove_file(&path).ok();
  }

  #[test]
  #[serial]
  fn test_from_env_missing_file_is_io_error() {
    temp_env::with_var(CONFIG_PATH_ENV, Some("/nonexistent/lift-coach.json"), || {
      let err = EngineConfig::from_env().unwrap_err();
      assert!(matches!(err, ConfigError::Io(_)));
    });
  }

  #[test]
  #[serial]
  fn test_database_url_default_and_override() {
    temp_env::with_var_unset(DATABASE_URL_ENV, || {
      assert_eq!(DatabaseConfig::from_env().url, DEFAULT_DATABASE_URL);
    });
    temp_env::with_var(DATABASE_URL_ENV, Some("sqlite::memory:"), || {
      assert_eq!(DatabaseConfig::from_env().url, "sqlite::memory:");
    });
  }

  #[test]
  #[serial]
  fn test_rules_from_env_defaults() {
    temp_env::with_var_unset(RULES_PATH_ENV, || {
      let rules = rules_from_env().unwrap();
      assert_eq!(rules, RuleTable::default());
    });
  }
}
