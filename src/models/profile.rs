use serde::{Deserialize, Serialize};

use super::exercise::Equipment;
use super::normalize_key;
use crate::coaching::CoachingStyle;

/// Training experience, ordered from least to most experienced
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum ExperienceLevel {
  #[default]
  Beginner,
  Novice,
  Intermediate,
  Advanced,
  Expert,
}

impl std::fmt::Display for ExperienceLevel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Beginner => write!(f, "beginner"),
      Self::Novice => write!(f, "novice"),
      Self::Intermediate => write!(f, "intermediate"),
      Self::Advanced => write!(f, "advanced"),
      Self::Expert => write!(f, "expert"),
    }
  }
}

impl std::str::FromStr for ExperienceLevel {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match normalize_key(s).as_str() {
      "beginner" => Ok(Self::Beginner),
      "novice" => Ok(Self::Novice),
      "intermediate" => Ok(Self::Intermediate),
      "advanced" => Ok(Self::Advanced),
      "expert" => Ok(Self::Expert),
      _ => Err(format!("Unknown experience level: {}", s)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum Gender {
  #[default]
  Male,
  Female,
  Other,
}

impl std::fmt::Display for Gender {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Male => write!(f, "male"),
      Self::Female => write!(f, "female"),
      Self::Other => write!(f, "other"),
    }
  }
}

impl std::str::FromStr for Gender {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match normalize_key(s).as_str() {
      "male" | "m" => Ok(Self::Male),
      "female" | "f" => Ok(Self::Female),
      "other" => Ok(Self::Other),
      _ => Err(format!("Unknown gender: {}", s)),
    }
  }
}

/// Split program families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramType {
  Ppl,
  UpperLower,
  FullBody,
  BroSplit,
}

impl std::fmt::Display for ProgramType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Ppl => write!(f, "ppl"),
      Self::UpperLower => write!(f, "upper_lower"),
      Self::FullBody => write!(f, "full_body"),
      Self::BroSplit => write!(f, "bro_split"),
    }
  }
}

impl std::str::FromStr for ProgramType {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match normalize_key(s).as_str() {
      "ppl" | "push_pull_legs" => Ok(Self::Ppl),
      "upper_lower" => Ok(Self::UpperLower),
      "full_body" => Ok(Self::FullBody),
      "bro_split" => Ok(Self::BroSplit),
      _ => Err(format!("Unknown program type: {}", s)),
    }
  }
}

/// User profile merged with user settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
  pub user_id: i64,
  pub experience_level: ExperienceLevel,
  pub gender: Gender,
  pub body_weight: Option<f64>,
  /// Explicit weekly target; estimated from history when absent
  pub weekly_workout_days: Option<i64>,
  pub workout_split: Option<ProgramType>,
  pub available_equipment: Vec<Equipment>,
  pub coaching_style: Option<CoachingStyle>,
}

impl UserProfile {
  /// Conservative profile used when a user has no stored settings
  pub fn default_for(user_id: i64) -> Self {
    Self {
      user_id,
      experience_level: ExperienceLevel::Beginner,
      gender: Gender::Male,
      body_weight: None,
      weekly_workout_days: None,
      workout_split: None,
      available_equipment: Vec::new(),
      coaching_style: None,
    }
  }

  pub fn program_type(&self) -> ProgramType {
    self.workout_split.unwrap_or(ProgramType::Ppl)
  }

  pub fn target_weekly_days(&self) -> i64 {
    self.weekly_workout_days.unwrap_or(3)
  }
}
