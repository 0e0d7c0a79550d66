use serde::{Deserialize, Serialize};

use super::normalize_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseCategory {
  Chest,
  Back,
  Legs,
  Shoulders,
  Arms,
  Core,
  Cardio,
  FullBody,
  Other,
}

impl ExerciseCategory {
  /// Ordering weight used when sequencing a workout (big muscles first)
  pub fn priority(&self) -> u8 {
    match self {
      Self::Legs => 1,
      Self::Back => 2,
      Self::Chest => 3,
      Self::Shoulders => 4,
      Self::Arms => 5,
      Self::Core => 6,
      _ => 7,
    }
  }
}

impl std::fmt::Display for ExerciseCategory {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Chest => write!(f, "chest"),
      Self::Back => write!(f, "back"),
      Self::Legs => write!(f, "legs"),
      Self::Shoulders => write!(f, "shoulders"),
      Self::Arms => write!(f, "arms"),
      Self::Core => write!(f, "core"),
      Self::Cardio => write!(f, "cardio"),
      Self::FullBody => write!(f, "full_body"),
      Self::Other => write!(f, "other"),
    }
  }
}

impl std::str::FromStr for ExerciseCategory {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match normalize_key(s).as_str() {
      "chest" => Ok(Self::Chest),
      "back" => Ok(Self::Back),
      "legs" => Ok(Self::Legs),
      "shoulders" => Ok(Self::Shoulders),
      "arms" => Ok(Self::Arms),
      "core" => Ok(Self::Core),
      "cardio" => Ok(Self::Cardio),
      "full_body" => Ok(Self::FullBody),
      "other" => Ok(Self::Other),
      _ => Err(format!("Unknown exercise category: {}", s)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Equipment {
  Barbell,
  Dumbbell,
  Machine,
  Cable,
  Bodyweight,
  ResistanceBand,
  Kettlebell,
  Other,
}

impl std::fmt::Display for Equipment {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Barbell => write!(f, "barbell"),
      Self::Dumbbell => write!(f, "dumbbell"),
      Self::Machine => write!(f, "machine"),
      Self::Cable => write!(f, "cable"),
      Self::Bodyweight => write!(f, "bodyweight"),
      Self::ResistanceBand => write!(f, "resistance_band"),
      Self::Kettlebell => write!(f, "kettlebell"),
      Self::Other => write!(f, "other"),
    }
  }
}

impl std::str::FromStr for Equipment {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match normalize_key(s).as_str() {
      "barbell" => Ok(Self::Barbell),
      "dumbbell" => Ok(Self::Dumbbell),
      "machine" => Ok(Self::Machine),
      "cable" => Ok(Self::Cable),
      "bodyweight" | "body_weight" => Ok(Self::Bodyweight),
      "resistance_band" | "band" => Ok(Self::ResistanceBand),
      "kettlebell" => Ok(Self::Kettlebell),
      "other" => Ok(Self::Other),
      _ => Err(format!("Unknown equipment: {}", s)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
  Chest,
  Back,
  Shoulders,
  Biceps,
  Triceps,
  Legs,
  Core,
  Abs,
  Glutes,
  Calves,
  Forearms,
  Neck,
  Quadriceps,
  Hamstrings,
  Lats,
  Traps,
}

impl MuscleGroup {
  pub const ALL: [MuscleGroup; 16] = [
    Self::Chest,
    Self::Back,
    Self::Shoulders,
    Self::Biceps,
    Self::Triceps,
    Self::Legs,
    Self::Core,
    Self::Abs,
    Self::Glutes,
    Self::Calves,
    Self::Forearms,
    Self::Neck,
    Self::Quadriceps,
    Self::Hamstrings,
    Self::Lats,
    Self::Traps,
  ];
}

impl std::fmt::Display for MuscleGroup {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      Self::Chest => "chest",
      Self::Back => "back",
      Self::Shoulders => "shoulders",
      Self::Biceps => "biceps",
      Self::Triceps => "triceps",
      Self::Legs => "legs",
      Self::Core => "core",
      Self::Abs => "abs",
      Self::Glutes => "glutes",
      Self::Calves => "calves",
      Self::Forearms => "forearms",
      Self::Neck => "neck",
      Self::Quadriceps => "quadriceps",
      Self::Hamstrings => "hamstrings",
      Self::Lats => "lats",
      Self::Traps => "traps",
    };
    write!(f, "{}", name)
  }
}

impl std::str::FromStr for MuscleGroup {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match normalize_key(s).as_str() {
      "chest" => Ok(Self::Chest),
      "back" => Ok(Self::Back),
      "shoulders" | "shoulder" | "delts" => Ok(Self::Shoulders),
      "biceps" => Ok(Self::Biceps),
      "triceps" => Ok(Self::Triceps),
      "legs" => Ok(Self::Legs),
      "core" => Ok(Self::Core),
      "abs" => Ok(Self::Abs),
      "glutes" => Ok(Self::Glutes),
      "calves" => Ok(Self::Calves),
      "forearms" => Ok(Self::Forearms),
      "neck" => Ok(Self::Neck),
      "quadriceps" | "quads" => Ok(Self::Quadriceps),
      "hamstrings" => Ok(Self::Hamstrings),
      "lats" => Ok(Self::Lats),
      "traps" => Ok(Self::Traps),
      _ => Err(format!("Unknown muscle group: {}", s)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationTier {
  Essential,
  Standard,
  Advanced,
  Specialized,
}

impl RecommendationTier {
  /// Only these tiers are offered as everyday recommendations
  pub fn is_recommendable(&self) -> bool {
    matches!(self, Self::Essential | Self::Standard)
  }
}

impl std::fmt::Display for RecommendationTier {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Essential => write!(f, "essential"),
      Self::Standard => write!(f, "standard"),
      Self::Advanced => write!(f, "advanced"),
      Self::Specialized => write!(f, "specialized"),
    }
  }
}

impl std::str::FromStr for RecommendationTier {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match normalize_key(s).as_str() {
      "essential" => Ok(Self::Essential),
      "standard" => Ok(Self::Standard),
      "advanced" => Ok(Self::Advanced),
      "specialized" => Ok(Self::Specialized),
      _ => Err(format!("Unknown recommendation tier: {}", s)),
    }
  }
}

/// Catalog entry. Immutable reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
  pub id: i64,
  pub name: String,
  pub category: ExerciseCategory,
  /// Ordered, the first entry is the primary muscle
  pub muscle_groups: Vec<MuscleGroup>,
  pub equipment: Option<Equipment>,
  pub difficulty: i64,
  pub popularity: i64,
  pub is_basic_exercise: bool,
  pub recommendation_tier: RecommendationTier,
}

impl Exercise {
  pub fn primary_muscle(&self) -> Option<MuscleGroup> {
    self.muscle_groups.first().copied()
  }
}
