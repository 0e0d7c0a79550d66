//! Movement Pattern Classifier
//!
//! Maps an exercise name onto a canonical movement pattern so a single
//! session never contains two variations of the same movement
//! (e.g. back squat and front squat).
//!
//! Classification walks an ordered rule table top to bottom and the first
//! matching rule wins. Order carries meaning:
//! - hip-hinge keywords come before anything that could catch "squat"
//! - squat exclusions (lunge, split squat, leg press, hack squat, jump) are
//!   handled before the bare "squat" rule
//! - compound checks ("incline" + "barbell") come before single keywords
//!
//! The table is plain data (serde), so it can be reordered or extended from a
//! JSON file without touching code.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::ConfigError;
use crate::models::Exercise;

// ---------------------------------------------------------------------------
/// Movement Patterns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementPattern {
  // Lower body
  Squat,
  Lunge,
  HipHinge,
  LegPress,
  LegCurl,
  LegExtension,
  GluteFocused,
  Calf,

  // Push
  HorizontalPressBarbell,
  HorizontalPressDumbbell,
  HorizontalPressMachine,
  InclinePressBarbell,
  InclinePressDumbbell,
  DeclinePress,
  VerticalPressBarbell,
  VerticalPressDumbbell,
  VerticalPressMachine,
  Dips,
  Pushup,
  Fly,

  // Pull
  PullupChinup,
  LatPulldown,
  BarbellRow,
  DumbbellRow,
  CableRow,
  InvertedRow,
  Deadlift,

  // Shoulders
  LateralRaise,
  FrontRaise,
  RearDelt,
  FacePull,
  UprightRow,
  Shrug,

  // Arms
  BicepCurlBarbell,
  BicepCurlDumbbell,
  BicepCurlCable,
  TricepOverhead,
  TricepLying,
  TricepPushdown,

  // Core
  Crunch,
  LegRaise,
  Plank,
  Rotation,
  Rollout,

  // Olympic lifts
  Clean,
  Snatch,

  // Everything else
  CompoundComplex,
  Carry,
  Cardio,
  Plyometric,
  Stretching,
  Other,
}

impl std::fmt::Display for MovementPattern {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    // serde already owns the canonical snake_case spelling
    match serde_json::to_value(self) {
      Ok(serde_json::Value::String(s)) => write!(f, "{}", s),
      _ => write!(f, "{:?}", self),
    }
  }
}

// ---------------------------------------------------------------------------
/// Rules
// ---------------------------------------------------------------------------

/// A single keyword rule.
///
/// Keywords match at the start of a word in the normalized name, so "row"
/// matches "rows" and "rowing" but not "narrow". A rule matches when every
/// `all_of` keyword is present, at least one `any_of` keyword is present (if
/// any are listed) and no `none_of` keyword is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRule {
  pub pattern: MovementPattern,
  #[serde(default)]
  pub all_of: Vec<String>,
  #[serde(default)]
  pub any_of: Vec<String>,
  #[serde(default)]
  pub none_of: Vec<String>,
}

impl PatternRule {
  pub fn new(pattern: MovementPattern, all_of: &[&str], any_of: &[&str], none_of: &[&str]) -> Self {
    let owned = |words: &[&str]| -> Vec<String> { words.iter().map(|w| normalize_name(w)).collect() };
    Self {
      pattern,
      all_of: owned(all_of),
      any_of: owned(any_of),
      none_of: owned(none_of),
    }
  }

  /// `padded_name` must come from `pad`
  fn matches_padded(&self, padded_name: &str) -> bool {
    if self.all_of.is_empty() && self.any_of.is_empty() {
      return false;
    }

    let has = |kw: &String| padded_name.contains(&format!(" {}", kw));

    self.all_of.iter().all(has)
      && (self.any_of.is_empty() || self.any_of.iter().any(has))
      && !self.none_of.iter().any(has)
  }

  pub fn matches(&self, name: &str) -> bool {
    self.matches_padded(&pad(&normalize_name(name)))
  }
}

/// Lowercase, treat `-`, `_`, `/` and `'` as separators, collapse whitespace
pub fn normalize_name(name: &str) -> String {
  let lowered: String = name
    .to_lowercase()
    .chars()
    .map(|c| match c {
      '-' | '_' | '/' | '(' | ')' | ',' => ' ',
      '\'' => '\0',
      other => other,
    })
    .filter(|c| *c != '\0')
    .collect();

  lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn pad(normalized: &str) -> String {
  format!(" {} ", normalized)
}

// ---------------------------------------------------------------------------
/// Rule Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
  pub rules: Vec<PatternRule>,
}

impl Default for RuleTable {
  fn default() -> Self {
    use MovementPattern::*;
    let r = PatternRule::new;

    let squat_exclusions = ["lunge", "split", "bulgarian", "sissy", "hack", "leg press", "jump"];

    let rules = vec![
      // Lower body
      r(
        HipHinge,
        &[],
        &["romanian", "rdl", "stiff leg", "good morning", "back extension", "hyperextension", "single leg deadlift"],
        &[],
      ),
      r(Lunge, &[], &["lunge", "split squat", "bulgarian", "curtsy"], &[]),
      r(LegPress, &[], &["leg press", "legpress", "hack squat"], &[]),
      r(Squat, &[], &["squat"], &squat_exclusions),
      r(LegCurl, &[], &["leg curl", "hamstring curl", "nordic"], &[]),
      r(LegExtension, &[], &["leg extension"], &[]),
      r(GluteFocused, &[], &["hip thrust", "glute bridge", "glute drive", "glute ham"], &[]),
      r(Calf, &[], &["calf", "calves"], &[]),
      // Push
      r(Dips, &[], &["dip"], &["deficit"]),
      r(Pushup, &[], &["push up", "pushup", "press up"], &[]),
      r(Fly, &[], &["fly", "flye", "pec deck", "butterfly", "crossover"], &["deadlift", "reverse", "rear"]),
      r(InclinePressBarbell, &["incline", "barbell"], &[], &["curl", "row"]),
      r(InclinePressBarbell, &[], &["incline bench press"], &["dumbbell", "machine"]),
      r(InclinePressDumbbell, &["incline", "dumbbell", "press"], &[], &[]),
      r(DeclinePress, &["decline", "press"], &[], &[]),
      r(
        VerticalPressBarbell,
        &[],
        &["military press", "overhead press", "barbell shoulder press", "push press", "push jerk"],
        &["dumbbell"],
      ),
      r(VerticalPressDumbbell, &["dumbbell"], &["shoulder press", "overhead press"], &[]),
      r(VerticalPressDumbbell, &[], &["arnold press", "seated dumbbell press", "standing dumbbell press"], &[]),
      r(VerticalPressMachine, &[], &["shoulder press machine", "machine shoulder press"], &[]),
      r(VerticalPressMachine, &["smith", "shoulder"], &[], &[]),
      r(HorizontalPressBarbell, &["barbell", "bench"], &[], &["incline", "decline"]),
      r(HorizontalPressBarbell, &["barbell"], &["floor press", "board press"], &[]),
      r(HorizontalPressBarbell, &[], &["bench press"], &["dumbbell", "machine", "incline", "decline"]),
      r(HorizontalPressDumbbell, &["dumbbell", "press"], &[], &["incline", "decline", "shoulder", "overhead"]),
      r(HorizontalPressMachine, &[], &["chest press", "hammer strength chest"], &[]),
      // Pull
      r(PullupChinup, &[], &["pull up", "pullup", "chin up", "chinup"], &["machine"]),
      r(LatPulldown, &[], &["pulldown", "pull down"], &[]),
      r(BarbellRow, &["barbell", "row"], &[], &["upright"]),
      r(BarbellRow, &[], &["pendlay", "t bar row"], &[]),
      r(DumbbellRow, &["dumbbell", "row"], &[], &["upright"]),
      r(CableRow, &["cable", "row"], &[], &["upright"]),
      r(CableRow, &[], &["seated row", "row machine", "machine row"], &[]),
      r(InvertedRow, &[], &["inverted row"], &[]),
      r(Deadlift, &[], &["deadlift"], &[]),
      // Shoulders
      r(LateralRaise, &[], &["lateral raise", "side raise", "side lateral"], &[]),
      r(FrontRaise, &[], &["front raise"], &[]),
      r(RearDelt, &[], &["rear delt", "reverse fly", "reverse pec deck"], &[]),
      r(FacePull, &[], &["face pull"], &[]),
      r(UprightRow, &[], &["upright row"], &[]),
      r(Shrug, &[], &["shrug"], &[]),
      // Arms
      r(BicepCurlBarbell, &["barbell", "curl"], &[], &[]),
      r(BicepCurlBarbell, &[], &["ez bar curl"], &[]),
      r(BicepCurlDumbbell, &["dumbbell", "curl"], &[], &[]),
      r(BicepCurlDumbbell, &[], &["hammer curl", "concentration curl"], &[]),
      r(BicepCurlCable, &["cable", "curl"], &[], &[]),
      r(TricepOverhead, &["tricep"], &["overhead", "extension"], &["skull", "lying"]),
      r(TricepLying, &[], &["skull crusher", "skullcrusher"], &[]),
      r(TricepLying, &["lying", "extension"], &[], &[]),
      r(TricepPushdown, &[], &["pushdown", "push down", "kickback"], &[]),
      // Core
      r(Crunch, &[], &["crunch", "sit up", "situp"], &[]),
      r(LegRaise, &[], &["leg raise", "knee raise"], &[]),
      r(Plank, &[], &["plank"], &[]),
      r(Rotation, &[], &["russian twist", "woodchop", "wood chop", "rotation"], &[]),
      r(Rollout, &[], &["rollout", "roll out", "ab wheel"], &[]),
      // Olympic lifts
      r(Clean, &[], &["clean"], &["machine"]),
      r(Snatch, &[], &["snatch"], &[]),
      // Everything else
      r(CompoundComplex, &[], &["thruster", "complex", "man maker", "devil press"], &[]),
      r(Carry, &[], &["carry", "farmer"], &[]),
      r(
        Cardio,
        &[],
        &["rowing machine", "rower", "bike", "cycling", "treadmill", "running", "erg", "jump rope", "elliptical"],
        &[],
      ),
      r(Plyometric, &[], &["jump", "plyometric", "burpee"], &[]),
      r(Stretching, &[], &["stretch", "mobility", "foam roll"], &[]),
    ];

    Self { rules }
  }
}

impl RuleTable {
  pub fn from_json(json: &str) -> Result<Self, ConfigError> {
    let mut table: RuleTable =
      serde_json::from_str(json).map_err(|e| ConfigError::Parse(format!("rule table: {}", e)))?;
    table.normalize();
    table.validate()?;
    Ok(table)
  }

  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
      .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
    Self::from_json(&json)
  }

  pub fn to_json(&self) -> String {
    serde_json::to_string_pretty(self).unwrap_or_default()
  }

  /// Keywords from files may carry any casing or separators
  fn normalize(&mut self) {
    for rule in &mut self.rules {
      for list in [&mut rule.all_of, &mut rule.any_of, &mut rule.none_of] {
        for kw in list.iter_mut() {
          *kw = normalize_name(kw);
        }
      }
    }
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    for (idx, rule) in self.rules.iter().enumerate() {
      if rule.all_of.is_empty() && rule.any_of.is_empty() {
        return Err(ConfigError::Invalid(format!(
          "rule {} ({}) has no positive keywords",
          idx, rule.pattern
        )));
      }
      let blank = rule
        .all_of
        .iter()
        .chain(&rule.any_of)
        .chain(&rule.none_of)
        .any(|kw| kw.is_empty());
      if blank {
        return Err(ConfigError::Invalid(format!("rule {} ({}) has an empty keyword", idx, rule.pattern)));
      }
    }
    Ok(())
  }

  /// Index and rule of the first match, for auditing a classification
  pub fn first_match(&self, name: &str) -> Option<(usize, &PatternRule)> {
    let padded = pad(&normalize_name(name));
    self
      .rules
      .iter()
      .enumerate()
      .find(|(_, rule)| rule.matches_padded(&padded))
  }

  pub fn classify_name(&self, name: &str) -> MovementPattern {
    self
      .first_match(name)
      .map(|(_, rule)| rule.pattern)
      .unwrap_or(MovementPattern::Other)
  }

  pub fn classify(&self, exercise: &Exercise) -> MovementPattern {
    self.classify_name(&exercise.name)
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use MovementPattern::*;

  fn classify(name: &str) -> MovementPattern {
    RuleTable::default().classify_name(name)
  }

  #[test]
  fn test_squat_variants_share_pattern() {
    assert_eq!(classify("Back Squat"), Squat);
    assert_eq!(classify("Front Squat"), Squat);
    assert_eq!(classify("Goblet Squat"), Squat);
  }

  #[test]
  fn test_squat_exclusions_win_over_bare_squat() {
    assert_eq!(classify("Bulgarian Split Squat"), Lunge);
    assert_eq!(classify("Hack Squat"), LegPress);
    assert_eq!(classify("Jump Squat"), Plyometric);
    assert_eq!(classify("Sissy Squat"), Other);
  }

  #[test]
  fn test_hip_hinge_before_squat_and_deadlift() {
    assert_eq!(classify("Romanian Deadlift"), HipHinge);
    assert_eq!(classify("Stiff-Leg Deadlift"), HipHinge);
    assert_eq!(classify("Squat Stance Good Morning"), HipHinge);
    assert_eq!(classify("Conventional Deadlift"), Deadlift);
  }

  #[test]
  fn test_incline_compound_checks() {
    assert_eq!(classify("Incline Barbell Bench Press"), InclinePressBarbell);
    assert_eq!(classify("Incline Dumbbell Press"), InclinePressDumbbell);
    assert_eq!(classify("Incline Dumbbell Fly"), Fly);
    assert_eq!(classify("Decline Bench Press"), DeclinePress);
  }

  #[test]
  fn test_horizontal_and_vertical_press() {
    assert_eq!(classify("Barbell Bench Press"), HorizontalPressBarbell);
    assert_eq!(classify("Bench Press"), HorizontalPressBarbell);
    assert_eq!(classify("Dumbbell Bench Press"), HorizontalPressDumbbell);
    assert_eq!(classify("Machine Chest Press"), HorizontalPressMachine);
    assert_eq!(classify("Overhead Press"), VerticalPressBarbell);
    assert_eq!(classify("Dumbbell Shoulder Press"), VerticalPressDumbbell);
    assert_eq!(classify("Arnold Press"), VerticalPressDumbbell);
    assert_eq!(classify("Smith Machine Shoulder Press"), VerticalPressMachine);
  }

  #[test]
  fn test_pull_patterns() {
    assert_eq!(classify("Pull-Up"), PullupChinup);
    assert_eq!(classify("Chin-Up"), PullupChinup);
    assert_eq!(classify("Lat Pulldown"), LatPulldown);
    assert_eq!(classify("Bent Over Barbell Row"), BarbellRow);
    assert_eq!(classify("One Arm Dumbbell Row"), DumbbellRow);
    assert_eq!(classify("Seated Cable Row"), CableRow);
    assert_eq!(classify("Face Pull"), FacePull);
  }

  #[test]
  fn test_word_boundary_matching() {
    // "row" must not match inside "narrow"
    assert_eq!(classify("Narrow Grip Barbell Bench Press"), HorizontalPressBarbell);
    // "rowing" is cardio, not a row pattern
    assert_eq!(classify("Rowing Machine"), Cardio);
    assert_eq!(classify("Farmer's Walk"), Carry);
  }

  #[test]
  fn test_arm_and_leg_curls_do_not_collide() {
    assert_eq!(classify("Lying Leg Curl"), LegCurl);
    assert_eq!(classify("EZ-Bar Curl"), BicepCurlBarbell);
    assert_eq!(classify("Hammer Curl"), BicepCurlDumbbell);
    assert_eq!(classify("Cable Curl"), BicepCurlCable);
  }

  #[test]
  fn test_tricep_patterns() {
    assert_eq!(classify("Overhead Tricep Extension"), TricepOverhead);
    assert_eq!(classify("Skull Crusher"), TricepLying);
    assert_eq!(classify("Lying Triceps Extension"), TricepLying);
    assert_eq!(classify("Tricep Pushdown"), TricepPushdown);
  }

  #[test]
  fn test_rear_delt_is_not_chest_fly() {
    assert_eq!(classify("Reverse Fly"), RearDelt);
    assert_eq!(classify("Cable Crossover"), Fly);
  }

  #[test]
  fn test_unknown_names_fall_back_to_other() {
    assert_eq!(classify(""), Other);
    assert_eq!(classify("Mystery Movement"), Other);
    assert_eq!(classify("!!!"), Other);
  }

  #[test]
  fn test_classification_is_deterministic() {
    let table = RuleTable::default();
    for name in ["Back Squat", "Deadlift", "Plank", "Burpee", "Treadmill Run"] {
      assert_eq!(table.classify_name(name), table.classify_name(name));
    }
  }

  #[test]
  fn test_first_match_reports_rule_index() {
    let table = RuleTable::default();
    let (idx, rule) = table.first_match("Back Squat").unwrap();

    assert_eq!(rule.pattern, Squat);
    // Everything before it must not match
    assert!(table.rules[..idx].iter().all(|r| !r.matches("Back Squat")));
  }

  #[test]
  fn test_rule_table_json_roundtrip() {
    let table = RuleTable::default();
    let parsed = RuleTable::from_json(&table.to_json()).unwrap();
    assert_eq!(parsed, table);
  }

  #[test]
  fn test_reordering_rules_changes_outcome() {
    let json = r#"{
      "rules": [
        { "pattern": "plyometric", "any_of": ["Jump"] },
        { "pattern": "squat", "any_of": ["squat"] }
      ]
    }"#;
    let table = RuleTable::from_json(json).unwrap();

    assert_eq!(table.classify_name("Jump Squat"), Plyometric);
    assert_eq!(table.classify_name("Back Squat"), Squat);
    assert_eq!(table.classify_name("Plank"), Other);
  }

  #[test]
  fn test_rule_without_keywords_rejected() {
    let json = r#"{ "rules": [ { "pattern": "squat", "none_of": ["jump"] } ] }"#;
    let err = RuleTable::from_json(json).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
  }

  #[test]
  fn test_pattern_display_is_snake_case() {
    assert_eq!(HorizontalPressBarbell.to_string(), "horizontal_press_barbell");
    assert_eq!(Other.to_string(), "other");
  }
}
