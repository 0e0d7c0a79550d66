//! Exercise recommendation pipeline
//!
//! Fixed ordered stages, each a pure list -> list transform:
//! tier, recovery, equipment, target muscle, pattern de-duplication,
//! variety balancing, priority ordering. The recovery stage has a safety
//! floor: when it would leave too few candidates it is skipped entirely.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::classifier::{normalize_name, MovementPattern, RuleTable};
use crate::config::FilterConfig;
use crate::history::{index_catalog, TrainingHistory};
use crate::models::{Equipment, Exercise, ExperienceLevel, MuscleGroup};

/// Optional request filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationFilters {
  pub target_muscle: Option<String>,
  pub equipment: Option<String>,
}

/// Per-user inputs to the pipeline, derived from a history snapshot
#[derive(Debug, Clone, Default)]
pub struct FilterContext {
  pub experience: Option<ExperienceLevel>,
  /// Primary muscles that should rest today
  pub avoid_muscles: HashSet<MuscleGroup>,
  /// Exercise id -> appearances in the familiarity window
  pub exercise_counts: HashMap<i64, usize>,
}

impl FilterContext {
  pub fn from_history(
    history: &TrainingHistory,
    catalog: &[Exercise],
    now: DateTime<Utc>,
    config: &FilterConfig,
  ) -> Self {
    let by_id = index_catalog(catalog);
    let mut avoid_muscles = HashSet::new();

    for record in history.sessions_within_hours(now, config.recent_work_hours) {
      for performed in &record.exercises {
        if let Some(exercise) = by_id.get(&performed.exercise_id) {
          avoid_muscles.extend(exercise.muscle_groups.iter().copied());
        }
      }
    }

    for row in history
      .recovery
      .iter()
      .filter(|r| r.recovery_percentage < config.recovery_threshold_percent)
    {
      match row.muscle_group.parse::<MuscleGroup>() {
        Ok(muscle) => {
          avoid_muscles.insert(muscle);
        }
        Err(e) => warn!(user_id = history.user_id(), error = %e, "Skipping recovery row"),
      }
    }

    Self {
      experience: Some(history.profile.experience_level),
      avoid_muscles,
      exercise_counts: history.exercise_counts_since(now - Duration::days(config.familiar_window_days)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Pipeline
/// ---------------------------------------------------------------------------

pub fn recommend(
  catalog: &[Exercise],
  filters: &RecommendationFilters,
  context: &FilterContext,
  rules: &RuleTable,
  config: &FilterConfig,
  limit: usize,
) -> Vec<Exercise> {
  let candidates = filter_by_tier(catalog.to_vec());
  let candidates = filter_by_recovery(candidates, &context.avoid_muscles, config.min_candidates);
  let candidates = filter_by_equipment(candidates, filters.equipment.as_deref());
  let candidates = filter_by_target_muscle(candidates, filters.target_muscle.as_deref());
  let candidates = remove_duplicate_patterns(candidates, rules);
  let candidates = balance_variety(candidates, context, config, limit);
  let mut ordered = order_by_priority(candidates, config);
  ordered.truncate(limit);

  info!(count = ordered.len(), limit, "Recommended exercises");
  ordered
}

/// Keep only tiers offered as everyday recommendations
pub fn filter_by_tier(exercises: Vec<Exercise>) -> Vec<Exercise> {
  let filtered: Vec<Exercise> = exercises
    .into_iter()
    .filter(|e| e.recommendation_tier.is_recommendable())
    .collect();
  debug!(stage = "tier", remaining = filtered.len());
  filtered
}

/// Drop exercises whose primary muscle needs rest, unless fewer than
/// `min_candidates` would remain
pub fn filter_by_recovery(
  exercises: Vec<Exercise>,
  avoid: &HashSet<MuscleGroup>,
  min_candidates: usize,
) -> Vec<Exercise> {
  if avoid.is_empty() {
    return exercises;
  }

  let filtered: Vec<Exercise> = exercises
    .iter()
    .filter(|e| e.primary_muscle().map_or(true, |m| !avoid.contains(&m)))
    .cloned()
    .collect();

  if filtered.len() >= min_candidates {
    debug!(stage = "recovery", remaining = filtered.len(), avoided = avoid.len());
    filtered
  } else {
    warn!(
      stage = "recovery",
      remaining = filtered.len(),
      min_candidates,
      "Skipping recovery filter, too few exercises would remain"
    );
    exercises
  }
}

pub fn filter_by_equipment(exercises: Vec<Exercise>, equipment: Option<&str>) -> Vec<Exercise> {
  let Some(raw) = equipment else {
    return exercises;
  };
  let wanted = match raw.parse::<Equipment>() {
    Ok(e) => e,
    Err(e) => {
      warn!(stage = "equipment", error = %e, "Ignoring unknown equipment filter");
      return exercises;
    }
  };

  let filtered: Vec<Exercise> = exercises
    .into_iter()
    .filter(|e| e.equipment == Some(wanted))
    .collect();
  debug!(stage = "equipment", remaining = filtered.len(), equipment = %wanted);
  filtered
}

/// Muscle groups covered by a target name. Empty means no filtering.
pub fn target_muscle_groups(target: &str) -> Vec<MuscleGroup> {
  use MuscleGroup::*;
  match normalize_name(target).replace(' ', "_").as_str() {
    "legs" | "lower" => vec![Quadriceps, Hamstrings, Glutes, Calves],
    "upper" => vec![Chest, Back, Lats, Shoulders, Biceps, Triceps],
    "chest" => vec![Chest],
    "back" => vec![Back, Lats],
    "shoulders" => vec![Shoulders],
    "arms" => vec![Biceps, Triceps, Forearms],
    "core" => vec![Abs, Core],
    _ => Vec::new(),
  }
}

pub fn filter_by_target_muscle(exercises: Vec<Exercise>, target: Option<&str>) -> Vec<Exercise> {
  let Some(target) = target else {
    return exercises;
  };
  let groups = target_muscle_groups(target);
  if groups.is_empty() {
    return exercises;
  }

  let filtered: Vec<Exercise> = exercises
    .into_iter()
    .filter(|e| e.muscle_groups.iter().any(|m| groups.contains(m)))
    .collect();
  debug!(stage = "target_muscle", remaining = filtered.len(), target);
  filtered
}

/// One exercise per movement pattern: easiest, then most popular, then basic.
/// Groups keep the order in which their pattern first appeared.
pub fn remove_duplicate_patterns(exercises: Vec<Exercise>, rules: &RuleTable) -> Vec<Exercise> {
  let mut order: Vec<MovementPattern> = Vec::new();
  let mut best: HashMap<MovementPattern, Exercise> = HashMap::new();

  for exercise in exercises {
    let pattern = rules.classify(&exercise);
    let replace = match best.get(&pattern) {
      None => {
        order.push(pattern);
        true
      }
      Some(current) => {
        let better = (exercise.difficulty, -exercise.popularity, !exercise.is_basic_exercise)
          < (current.difficulty, -current.popularity, !current.is_basic_exercise);
        if better {
          debug!(pattern = %pattern, kept = %exercise.name, dropped = %current.name, "Duplicate pattern");
        }
        better
      }
    };
    if replace {
      best.insert(pattern, exercise);
    }
  }

  let deduped: Vec<Exercise> = order.into_iter().filter_map(|p| best.remove(&p)).collect();
  debug!(stage = "patterns", remaining = deduped.len());
  deduped
}

/// Blend familiar and new exercises at the experience-dependent ratio.
///
/// A blend shorter than `limit` is topped up with the remaining candidates in
/// their incoming order.
pub fn balance_variety(
  exercises: Vec<Exercise>,
  context: &FilterContext,
  config: &FilterConfig,
  limit: usize,
) -> Vec<Exercise> {
  let ratio = config.variety.for_level(context.experience);
  let count = |e: &Exercise| context.exercise_counts.get(&e.id).copied().unwrap_or(0);

  let mut familiar: Vec<&Exercise> = exercises
    .iter()
    .filter(|e| count(e) >= config.familiar_min_count)
    .collect();
  familiar.sort_by_key(|e| std::cmp::Reverse(count(e)));

  let mut fresh: Vec<&Exercise> = exercises.iter().filter(|e| count(e) == 0).collect();
  fresh.sort_by(|a, b| {
    b.is_basic_exercise
      .cmp(&a.is_basic_exercise)
      .then(b.popularity.cmp(&a.popularity))
      .then(a.difficulty.cmp(&b.difficulty))
  });

  let mut seen = HashSet::new();
  let mut blended: Vec<Exercise> = familiar
    .into_iter()
    .take(ratio.familiar)
    .chain(fresh.into_iter().take(ratio.new))
    .filter(|e| seen.insert(e.id))
    .cloned()
    .collect();

  if blended.is_empty() {
    return exercises;
  }

  let picked = blended.len();
  for exercise in &exercises {
    if blended.len() >= limit {
      break;
    }
    if seen.insert(exercise.id) {
      blended.push(exercise.clone());
    }
  }
  debug!(stage = "variety", picked, remaining = blended.len());
  blended
}

pub fn is_compound(exercise: &Exercise, config: &FilterConfig) -> bool {
  if exercise.muscle_groups.len() >= 2 {
    return true;
  }
  let name = format!(" {} ", normalize_name(&exercise.name));
  config
    .compound_keywords
    .iter()
    .any(|kw| name.contains(&format!(" {}", kw)))
}

/// Big muscles first, compound before isolation. Stable.
pub fn order_by_priority(mut exercises: Vec<Exercise>, config: &FilterConfig) -> Vec<Exercise> {
  exercises.sort_by_key(|e| (e.category.priority(), !is_compound(e, config)));
  exercises
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{ExerciseCategory, MuscleRecovery, RecommendationTier, SessionStatus, UserProfile};
  use crate::test_utils::{datetime_days_ago, datetime_now, mock_exercise, mock_session_record};

  fn catalog() -> Vec<Exercise> {
    vec![
      mock_exercise(1, "Barbell Bench Press", ExerciseCategory::Chest, &[MuscleGroup::Chest, MuscleGroup::Triceps], Some(Equipment::Barbell)),
      mock_exercise(2, "Incline Dumbbell Press", ExerciseCategory::Chest, &[MuscleGroup::Chest], Some(Equipment::Dumbbell)),
      mock_exercise(3, "Barbell Row", ExerciseCategory::Back, &[MuscleGroup::Back, MuscleGroup::Lats], Some(Equipment::Barbell)),
      mock_exercise(4, "Lat Pulldown", ExerciseCategory::Back, &[MuscleGroup::Lats], Some(Equipment::Cable)),
      mock_exercise(5, "Back Squat", ExerciseCategory::Legs, &[MuscleGroup::Quadriceps, MuscleGroup::Glutes], Some(Equipment::Barbell)),
      mock_exercise(6, "Romanian Deadlift", ExerciseCategory::Legs, &[MuscleGroup::Hamstrings], Some(Equipment::Barbell)),
      mock_exercise(7, "Overhead Press", ExerciseCategory::Shoulders, &[MuscleGroup::Shoulders], Some(Equipment::Barbell)),
      mock_exercise(8, "Lateral Raise", ExerciseCategory::Shoulders, &[MuscleGroup::Shoulders], Some(Equipment::Dumbbell)),
      mock_exercise(9, "Barbell Curl", ExerciseCategory::Arms, &[MuscleGroup::Biceps], Some(Equipment::Barbell)),
      mock_exercise(10, "Plank", ExerciseCategory::Core, &[MuscleGroup::Abs], Some(Equipment::Bodyweight)),
    ]
  }

  fn context(avoid: &[MuscleGroup]) -> FilterContext {
    FilterContext {
      experience: Some(ExperienceLevel::Intermediate),
      avoid_muscles: avoid.iter().copied().collect(),
      exercise_counts: HashMap::new(),
    }
  }

  fn recovery_row(muscle_group: &str, recovery_percentage: f64) -> MuscleRecovery {
    MuscleRecovery {
      user_id: 1,
      muscle_group: muscle_group.to_string(),
      last_worked: datetime_days_ago(1),
      recovery_percentage,
      soreness: 0,
    }
  }

  #[test]
  fn test_context_avoids_muscles_worked_in_last_day() {
    // Arrange
    let mut history = TrainingHistory::empty(UserProfile::default_for(1));
    history.sessions = vec![
      mock_session_record(1, 0, SessionStatus::Completed, None, &[(1, 80.0, 5)]),
      mock_session_record(2, 3, SessionStatus::Completed, None, &[(5, 100.0, 5)]),
    ];
    history.sort_sessions();

    // Act
    let ctx = FilterContext::from_history(&history, &catalog(), datetime_now(), &FilterConfig::default());

    // Assert
    let expected: HashSet<_> = [MuscleGroup::Chest, MuscleGroup::Triceps].into_iter().collect();
    assert_eq!(ctx.avoid_muscles, expected);
    assert_eq!(ctx.experience, Some(ExperienceLevel::Beginner));
    assert_eq!(ctx.exercise_counts.get(&5), Some(&1));
  }

  #[test]
  fn test_context_uses_stored_recovery_below_threshold() {
    // Arrange
    let mut history = TrainingHistory::empty(UserProfile::default_for(1));
    history.recovery = vec![
      recovery_row("back", 25.0),
      recovery_row("chest", 80.0),
      recovery_row("Hamstrings", 29.9),
      recovery_row("shoulders", 30.0),
    ];

    // Act
    let ctx = FilterContext::from_history(&history, &catalog(), datetime_now(), &FilterConfig::default());

    // Assert
    let expected: HashSet<_> = [MuscleGroup::Back, MuscleGroup::Hamstrings].into_iter().collect();
    assert_eq!(ctx.avoid_muscles, expected);

    // Back at 25% drops the row while enough candidates remain
    let filtered = filter_by_recovery(catalog(), &ctx.avoid_muscles, FilterConfig::default().min_candidates);
    assert!(filtered.iter().all(|e| e.id != 3 && e.id != 6));
    assert!(filtered.iter().any(|e| e.id == 4));
  }

  #[test]
  fn test_context_skips_unknown_recovery_labels() {
    let mut history = TrainingHistory::empty(UserProfile::default_for(1));
    history.recovery = vec![recovery_row("wings", 0.0), recovery_row("back", 10.0)];

    let ctx = FilterContext::from_history(&history, &catalog(), datetime_now(), &FilterConfig::default());

    assert_eq!(ctx.avoid_muscles.len(), 1);
    assert!(ctx.avoid_muscles.contains(&MuscleGroup::Back));
  }

  #[test]
  fn test_tier_filter_drops_specialized() {
    let mut exercises = catalog();
    exercises[0].recommendation_tier = RecommendationTier::Specialized;
    exercises[1].recommendation_tier = RecommendationTier::Essential;

    let filtered = filter_by_tier(exercises);
    assert_eq!(filtered.len(), 9);
    assert!(filtered.iter().all(|e| e.id != 1));
  }

  #[test]
  fn test_recovery_filter_excludes_back_when_enough_remain() {
    let avoid: HashSet<_> = [MuscleGroup::Back].into_iter().collect();

    let filtered = filter_by_recovery(catalog(), &avoid, 6);
    assert_eq!(filtered.len(), 9);
    assert!(filtered.iter().all(|e| e.id != 3));
    // Lat pulldown's primary muscle is lats, so it stays
    assert!(filtered.iter().any(|e| e.id == 4));
  }

  #[test]
  fn test_recovery_filter_skipped_below_floor() {
    let small: Vec<Exercise> = catalog().into_iter().filter(|e| [1, 3, 4, 5, 6, 7].contains(&e.id)).collect();
    let avoid: HashSet<_> = [MuscleGroup::Back].into_iter().collect();

    // Removing the row would leave 5, below the floor of 6
    let filtered = filter_by_recovery(small.clone(), &avoid, 6);
    assert_eq!(filtered, small);
  }

  #[test]
  fn test_unknown_equipment_is_ignored() {
    assert_eq!(filter_by_equipment(catalog(), Some("hover board")).len(), 10);

    let dumbbell = filter_by_equipment(catalog(), Some("dumbbell"));
    assert_eq!(dumbbell.iter().map(|e| e.id).collect::<Vec<_>>(), vec![2, 8]);
  }

  #[test]
  fn test_target_muscle_taxonomy() {
    let legs = filter_by_target_muscle(catalog(), Some("legs"));
    assert_eq!(legs.iter().map(|e| e.id).collect::<Vec<_>>(), vec![5, 6]);

    let back = filter_by_target_muscle(catalog(), Some("Back"));
    assert_eq!(back.iter().map(|e| e.id).collect::<Vec<_>>(), vec![3, 4]);

    assert_eq!(filter_by_target_muscle(catalog(), Some("full_body")).len(), 10);
  }

  #[test]
  fn test_duplicate_patterns_keep_easiest() {
    let mut exercises = vec![
      mock_exercise(1, "Barbell Bench Press", ExerciseCategory::Chest, &[MuscleGroup::Chest], Some(Equipment::Barbell)),
      mock_exercise(2, "Close Grip Barbell Bench Press", ExerciseCategory::Chest, &[MuscleGroup::Chest], Some(Equipment::Barbell)),
      mock_exercise(3, "Lateral Raise", ExerciseCategory::Shoulders, &[MuscleGroup::Shoulders], None),
    ];
    exercises[0].difficulty = 60;
    exercises[1].difficulty = 40;

    let rules = RuleTable::default();
    let deduped = remove_duplicate_patterns(exercises, &rules);

    assert_eq!(deduped.iter().map(|e| e.id).collect::<Vec<_>>(), vec![2, 3]);
  }

  #[test]
  fn test_duplicate_tie_breaks_popularity_then_basic() {
    let mut exercises = vec![
      mock_exercise(1, "Dumbbell Curl", ExerciseCategory::Arms, &[MuscleGroup::Biceps], None),
      mock_exercise(2, "Alternating Dumbbell Curl", ExerciseCategory::Arms, &[MuscleGroup::Biceps], None),
      mock_exercise(3, "Seated Dumbbell Curl", ExerciseCategory::Arms, &[MuscleGroup::Biceps], None),
    ];
    exercises[1].popularity = 90;
    exercises[2].popularity = 90;
    exercises[2].is_basic_exercise = true;

    let deduped = remove_duplicate_patterns(exercises, &RuleTable::default());
    assert_eq!(deduped.len(), 1);
    assert_eq!(deduped[0].id, 3);
  }

  #[test]
  fn test_variety_blend_by_experience() {
    let exercises = catalog();
    let mut ctx = context(&[]);
    ctx.experience = Some(ExperienceLevel::Advanced);
    // 1..=5 are familiar, 6 was seen once, the rest are new
    for id in 1..=5 {
      ctx.exercise_counts.insert(id, 2 + id as usize);
    }
    ctx.exercise_counts.insert(6, 1);

    let blended = balance_variety(exercises, &ctx, &FilterConfig::default(), 8);
    let ids: Vec<i64> = blended.iter().map(|e| e.id).collect();

    // 4 familiar by count desc, then every new one (7..=10)
    assert_eq!(&ids[..4], &[5, 4, 3, 2]);
    assert_eq!(ids.len(), 8);
    assert!(!ids.contains(&6));
  }

  #[test]
  fn test_variety_empty_blend_keeps_input() {
    let exercises = catalog();
    let mut ctx = context(&[]);
    for e in &exercises {
      ctx.exercise_counts.insert(e.id, 1);
    }

    let blended = balance_variety(exercises.clone(), &ctx, &FilterConfig::default(), 6);
    assert_eq!(blended, exercises);
  }

  #[test]
  fn test_variety_tops_up_short_blend() {
    let exercises = catalog();
    let mut ctx = context(&[]);
    ctx.experience = Some(ExperienceLevel::Beginner);
    // Seen once: neither familiar nor new
    for id in 1..=3 {
      ctx.exercise_counts.insert(id, 1);
    }

    // Beginners take 2 new; the rest of the slots come from the remaining candidates
    let blended = balance_variety(exercises.clone(), &ctx, &FilterConfig::default(), 6);
    let ids: Vec<i64> = blended.iter().map(|e| e.id).collect();
    assert_eq!(ids.len(), 6);
    assert!(ids[..2].iter().all(|id| *id >= 4));
    assert!([1, 2, 3].iter().all(|id| ids.contains(id)));
    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), 6);

    // Never more than the input
    assert_eq!(balance_variety(exercises, &ctx, &FilterConfig::default(), 50).len(), 10);
  }

  #[test]
  fn test_recommend_without_history_fills_limit() {
    let rules = RuleTable::default();
    let config = FilterConfig::default();
    let catalog = catalog();
    let ctx = FilterContext {
      experience: Some(ExperienceLevel::Beginner),
      ..FilterContext::default()
    };

    let result = recommend(&catalog, &RecommendationFilters::default(), &ctx, &rules, &config, 5);
    assert_eq!(result.len(), 5);
  }

  #[test]
  fn test_priority_orders_categories_then_compound() {
    let config = FilterConfig::default();
    let ordered = order_by_priority(catalog(), &config);
    let ids: Vec<i64> = ordered.iter().map(|e| e.id).collect();

    // Legs (squat, rdl), back (row, pulldown), chest, shoulders (press before raise), arms, core
    assert_eq!(ids, vec![5, 6, 3, 4, 1, 2, 7, 8, 9, 10]);
  }

  #[test]
  fn test_compound_detection() {
    let config = FilterConfig::default();
    let exercises = catalog();
    assert!(is_compound(&exercises[0], &config));
    assert!(is_compound(&exercises[6], &config)); // Overhead Press
    assert!(!is_compound(&exercises[7], &config)); // Lateral Raise
    assert!(!is_compound(&exercises[8], &config)); // Barbell Curl
  }

  #[test]
  fn test_recommend_respects_limit_and_unique_patterns() {
    let rules = RuleTable::default();
    let config = FilterConfig::default();
    let catalog = catalog();

    let result = recommend(&catalog, &RecommendationFilters::default(), &context(&[]), &rules, &config, 5);

    assert!(result.len() <= 5);
    assert!(result.iter().all(|e| catalog.contains(e)));
    let patterns: HashSet<_> = result.iter().map(|e| rules.classify(e)).collect();
    assert_eq!(patterns.len(), result.len());
  }

  #[test]
  fn test_recommend_is_idempotent() {
    let rules = RuleTable::default();
    let config = FilterConfig::default();
    let ctx = context(&[MuscleGroup::Chest]);
    let filters = RecommendationFilters {
      target_muscle: Some("upper".to_string()),
      equipment: None,
    };

    let first = recommend(&catalog(), &filters, &ctx, &rules, &config, 10);
    let second = recommend(&catalog(), &filters, &ctx, &rules, &config, 10);
    assert_eq!(first, second);
  }
}
