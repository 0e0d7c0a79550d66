//! Program Progression Analyzer
//!
//! Reads the recent completed-session history and answers three questions:
//! - is the user ready to move up the split ladder (3-day PPL -> 4-day
//!   upper/lower -> 5-day body part split)?
//! - how should weekly volume change given the effort being reported?
//! - which muscles are recovered, and is a deload week due?
//!
//! Every calculation is a pure function of the history snapshot and `now`.
//! Missing data never errors: it produces conservative defaults.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::config::ProgressionConfig;
use crate::history::{index_catalog, SessionRecord, TrainingHistory};
use crate::models::{week_start, Exercise, MuscleGroup, ProgramType};

/// Sessions inspected when deciding on a program transition
const TRANSITION_SESSION_WINDOW: usize = 30;

/// Weekly days assumed when the profile has no explicit target
const DEFAULT_WEEKLY_DAYS: i64 = 3;

// ---------------------------------------------------------------------------
/// Recovery Status: session density over the last week
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum RecoveryStatus {
    #[default]
    WellRecovered,
    Moderate,
    Overreaching,
}

impl std::fmt::Display for RecoveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WellRecovered => write!(f, "well_recovered"),
            Self::Moderate => write!(f, "moderate"),
            Self::Overreaching => write!(f, "overreaching"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeTrend {
    Increasing,
    Stable,
    Decreasing,
}

impl std::fmt::Display for VolumeTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Increasing => write!(f, "increasing"),
            Self::Stable => write!(f, "stable"),
            Self::Decreasing => write!(f, "decreasing"),
        }
    }
}

// ---------------------------------------------------------------------------
/// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Mean session volume, recent block vs the block before it
    pub volume_increase_percent: i64,
    /// Mean top-set weight, recent sessions vs the oldest in the window
    pub strength_gain_percent: i64,
    pub average_workout_minutes: i64,
    pub total_workouts: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionRecommendation {
    pub new_program: ProgramType,
    pub new_days_per_week: i64,
    pub reason: String,
    pub expected_benefits: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuscleVolume {
    pub muscle_group: MuscleGroup,
    pub sets: i64,
    pub mev_reached: bool,
    pub mav_exceeded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MuscleReadiness {
    pub muscle_group: MuscleGroup,
    pub hours_since_worked: i64,
    pub target_hours: i64,
    pub recovery_percent: f64,
    pub ready: bool,
    pub recommended_rest_hours: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionAnalysis {
    pub current_program: ProgramType,
    pub current_days_per_week: i64,
    pub current_cycle: i64,
    pub completed_cycles: i64,
    /// Share of the weekly target hit over the last 4 weeks, 0 to 100
    pub consistency_rate: f64,
    pub recovery_status: RecoveryStatus,
    pub metrics: PerformanceMetrics,
    /// Completed sets per muscle over the last 7 days
    pub weekly_muscle_volume: Vec<MuscleVolume>,
    pub muscle_recovery: Vec<MuscleReadiness>,
    pub plateau_detected: bool,
    pub needs_deload: bool,
    pub ready_for_progression: bool,
    pub recommendation: Option<ProgressionRecommendation>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeSnapshot {
    pub total_volume: f64,
    pub total_sets: i64,
    pub total_reps: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeOptimization {
    pub current: VolumeSnapshot,
    pub recommended: VolumeSnapshot,
    pub trend: VolumeTrend,
    pub average_rpe: f64,
    pub multiplier: f64,
    pub muscle_volume: Vec<MuscleVolume>,
    /// Every trained muscle reached the minimum effective volume
    pub mev_reached: bool,
    /// Some muscle went past the maximum adaptive volume
    pub mav_exceeded: bool,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryAnalysis {
    pub muscles: Vec<MuscleReadiness>,
    pub overall_recovery_score: i64,
    pub needs_deload: bool,
    pub deload_reason: Option<String>,
    pub next_workout_muscles: Vec<MuscleGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSuggestion {
    pub name: String,
    pub program_type: Option<ProgramType>,
    pub days_per_week: i64,
    pub description: String,
    pub benefits: Vec<String>,
    pub difficulty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionCheck {
    pub should_transition: bool,
    pub weeks_on_program: i64,
    pub plateau_detected: bool,
    pub goal_achievement_percent: i64,
    pub reason: String,
    pub suggestions: Vec<ProgramSuggestion>,
}

// ---------------------------------------------------------------------------
/// Helpers
// ---------------------------------------------------------------------------

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Percent change from `older` to `recent`, 0 when there is no usable base
fn percent_change(recent: Option<f64>, older: Option<f64>) -> f64 {
    match (recent, older) {
        (Some(r), Some(o)) if o > 0.0 && r.is_finite() => (r - o) / o * 100.0,
        _ => 0.0,
    }
}

/// Most recent completed sessions, newest first
fn recent_completed(history: &TrainingHistory, limit: usize) -> Vec<&SessionRecord> {
    history.completed().take(limit).collect()
}

fn count_since(sessions: &[&SessionRecord], since: DateTime<Utc>) -> usize {
    sessions.iter().filter(|s| s.start_time() > since).count()
}

fn target_weekly_days(history: &TrainingHistory) -> i64 {
    history
        .profile
        .weekly_workout_days
        .filter(|d| *d > 0)
        .unwrap_or(DEFAULT_WEEKLY_DAYS)
}

/// Completed sets per muscle group across `sessions`
fn muscle_set_counts(
    sessions: &[&SessionRecord],
    catalog: &HashMap<i64, &Exercise>,
) -> BTreeMap<MuscleGroup, i64> {
    let mut counts = BTreeMap::new();
    for session in sessions {
        for performed in &session.exercises {
            let Some(exercise) = catalog.get(&performed.exercise_id) else {
                continue;
            };
            let sets = performed.completed_sets().count() as i64;
            if sets == 0 {
                continue;
            }
            for muscle in &exercise.muscle_groups {
                *counts.entry(*muscle).or_insert(0) += sets;
            }
        }
    }
    counts
}

fn to_muscle_volumes(counts: &BTreeMap<MuscleGroup, i64>, config: &ProgressionConfig) -> Vec<MuscleVolume> {
    counts
        .iter()
        .map(|(muscle, sets)| MuscleVolume {
            muscle_group: *muscle,
            sets: *sets,
            mev_reached: *sets >= config.mev_sets,
            mav_exceeded: *sets > config.mav_sets,
        })
        .collect()
}

// ---------------------------------------------------------------------------
/// Cycle, Consistency and Recovery Status
// ---------------------------------------------------------------------------

/// Day-number wrap-arounds in chronological order, at least `current - 1`
pub fn completed_cycles(sessions: &[&SessionRecord]) -> i64 {
    let mut tagged: Vec<&SessionRecord> = sessions
        .iter()
        .copied()
        .filter(|s| s.session.program_day.is_some())
        .collect();
    if tagged.is_empty() {
        return 0;
    }
    tagged.sort_by_key(|s| s.start_time());

    let mut wraps = 0;
    let mut last_day = 0;
    for session in &tagged {
        let day = session.session.program_day.unwrap_or(0);
        if day < last_day {
            wraps += 1;
        }
        last_day = day;
    }

    let current_cycle = tagged
        .last()
        .and_then(|s| s.session.program_cycle)
        .unwrap_or(1);
    wraps.max(current_cycle - 1)
}

/// min(100, sessions in the window / (target x weeks) x 100)
pub fn consistency_rate(
    sessions: &[&SessionRecord],
    target_days: i64,
    now: DateTime<Utc>,
    config: &ProgressionConfig,
) -> f64 {
    let expected = (target_days.max(1) * config.consistency_weeks.max(1)) as f64;
    let actual = count_since(sessions, now - Duration::weeks(config.consistency_weeks)) as f64;
    (actual / expected * 100.0).min(100.0)
}

pub fn recovery_status(sessions: &[&SessionRecord], now: DateTime<Utc>, config: &ProgressionConfig) -> RecoveryStatus {
    let last_week = count_since(sessions, now - Duration::days(7));
    if last_week >= config.overreaching_sessions_per_week {
        RecoveryStatus::Overreaching
    } else if last_week >= config.moderate_sessions_per_week {
        RecoveryStatus::Moderate
    } else {
        RecoveryStatus::WellRecovered
    }
}

/// Deload is due after too many sessions in the trailing two weeks
pub fn needs_deload(sessions: &[&SessionRecord], now: DateTime<Utc>, config: &ProgressionConfig) -> bool {
    count_since(sessions, now - Duration::weeks(2)) >= config.deload_sessions_two_weeks
}

// ---------------------------------------------------------------------------
/// Performance Metrics
// ---------------------------------------------------------------------------

pub fn performance_metrics(sessions: &[&SessionRecord], config: &ProgressionConfig) -> PerformanceMetrics {
    if sessions.len() < 2 {
        return PerformanceMetrics {
            total_workouts: sessions.len(),
            ..PerformanceMetrics::default()
        };
    }

    let volumes: Vec<f64> = sessions.iter().map(|s| s.session.total_volume).collect();
    let window = config.volume_window.max(1);
    let recent_volume = mean(&volumes[..volumes.len().min(window)]);
    let older_volume = volumes
        .get(window..volumes.len().min(window * 2))
        .and_then(mean);
    let volume_increase = percent_change(recent_volume, older_volume);

    let durations: Vec<f64> = sessions
        .iter()
        .filter_map(|s| s.session.duration_minutes)
        .map(|m| m as f64)
        .collect();

    PerformanceMetrics {
        volume_increase_percent: volume_increase.round() as i64,
        strength_gain_percent: strength_gain(sessions, config),
        average_workout_minutes: mean(&durations).map(|m| m.round() as i64).unwrap_or(0),
        total_workouts: sessions.len(),
    }
}

/// Mean top-set weight of the newest sessions vs the oldest, clamped
fn strength_gain(sessions: &[&SessionRecord], config: &ProgressionConfig) -> i64 {
    let window = config.strength_window.max(1).min(sessions.len());
    let top_sets = |block: &[&SessionRecord]| -> Vec<f64> {
        block
            .iter()
            .flat_map(|s| s.exercises.iter().filter_map(|e| e.top_set_weight()))
            .collect()
    };

    let recent = top_sets(&sessions[..window]);
    let older = top_sets(&sessions[sessions.len() - window..]);
    let gain = percent_change(mean(&recent), mean(&older));

    gain.clamp(0.0, config.max_strength_gain_percent).round() as i64
}

// ---------------------------------------------------------------------------
/// Plateau Detection
// ---------------------------------------------------------------------------

/// Heaviest completed set per training week, newest week first
pub fn weekly_max_weights(sessions: &[&SessionRecord]) -> Vec<(NaiveDate, f64)> {
    let mut weeks: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for session in sessions {
        let Some(top) = session
            .exercises
            .iter()
            .filter_map(|e| e.top_set_weight())
            .reduce(f64::max)
        else {
            continue;
        };
        let entry = weeks.entry(week_start(session.start_time())).or_insert(top);
        *entry = entry.max(top);
    }
    weeks.into_iter().rev().collect()
}

/// Plateau: the most recent weekly max-weight readings each differ from the
/// previous one by less than the tolerance
pub fn detect_plateau(sessions: &[&SessionRecord], config: &ProgressionConfig) -> bool {
    let readings = weekly_max_weights(sessions);
    let needed = config.plateau_readings.max(2);
    if readings.len() < needed {
        return false;
    }

    readings[..needed]
        .windows(2)
        .all(|pair| (pair[0].1 - pair[1].1).abs() < config.plateau_tolerance)
}

// ---------------------------------------------------------------------------
/// Muscle Readiness
// ---------------------------------------------------------------------------

/// Hours since each trained muscle was last worked against its recovery target
pub fn muscle_readiness(
    sessions: &[&SessionRecord],
    catalog: &HashMap<i64, &Exercise>,
    now: DateTime<Utc>,
    config: &ProgressionConfig,
) -> Vec<MuscleReadiness> {
    let mut last_worked: BTreeMap<MuscleGroup, DateTime<Utc>> = BTreeMap::new();
    for session in sessions {
        for performed in &session.exercises {
            let Some(exercise) = catalog.get(&performed.exercise_id) else {
                continue;
            };
            for muscle in &exercise.muscle_groups {
                let entry = last_worked.entry(*muscle).or_insert(session.start_time());
                if session.start_time() > *entry {
                    *entry = session.start_time();
                }
            }
        }
    }

    last_worked
        .into_iter()
        .map(|(muscle, worked)| {
            let hours = (now - worked).num_hours().max(0);
            let target = config.recovery_hours.hours_for(muscle).max(1.0);
            MuscleReadiness {
                muscle_group: muscle,
                hours_since_worked: hours,
                target_hours: target.ceil() as i64,
                recovery_percent: (hours as f64 / target * 100.0).min(100.0),
                ready: hours as f64 >= target,
                recommended_rest_hours: (target - hours as f64).max(0.0).ceil() as i64,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
/// Progression Readiness
// ---------------------------------------------------------------------------

/// Next rung of the split ladder, if the current program has one
pub fn next_program(program: ProgramType, days_per_week: i64) -> Option<ProgressionRecommendation> {
    match (program, days_per_week) {
        (ProgramType::Ppl, 3) => Some(ProgressionRecommendation {
            new_program: ProgramType::UpperLower,
            new_days_per_week: 4,
            reason: "Consistent 3-day push/pull/legs training: ready for a 4-day upper/lower split".to_string(),
            expected_benefits: vec![
                "More weekly volume".to_string(),
                "More focused muscle training".to_string(),
                "Optimized recovery".to_string(),
            ],
        }),
        (ProgramType::UpperLower, 4) => Some(ProgressionRecommendation {
            new_program: ProgramType::BroSplit,
            new_days_per_week: 5,
            reason: "Upper/lower split mastered: ready for a 5-day body part split".to_string(),
            expected_benefits: vec![
                "Specialized per-muscle training".to_string(),
                "Maximum volume capacity".to_string(),
                "Detailed muscle development".to_string(),
            ],
        }),
        _ => None,
    }
}

pub fn analyze_progression(
    history: &TrainingHistory,
    catalog: &[Exercise],
    now: DateTime<Utc>,
    config: &ProgressionConfig,
) -> ProgressionAnalysis {
    let current_program = history.profile.workout_split.unwrap_or(ProgramType::Ppl);
    let current_days = target_weekly_days(history);
    let sessions = recent_completed(history, config.session_window);
    let index = index_catalog(catalog);

    let current_cycle = sessions
        .iter()
        .find_map(|s| s.session.program_cycle)
        .unwrap_or(1);
    let cycles = completed_cycles(&sessions);
    let consistency = consistency_rate(&sessions, current_days, now, config);
    let status = recovery_status(&sessions, now, config);
    let metrics = performance_metrics(&sessions, config);

    let last_week: Vec<&SessionRecord> = sessions
        .iter()
        .copied()
        .filter(|s| s.start_time() > now - Duration::days(7))
        .collect();
    let weekly_muscle_volume = to_muscle_volumes(&muscle_set_counts(&last_week, &index), config);

    let ready = cycles >= config.min_completed_cycles
        && consistency >= config.min_consistency_percent
        && metrics.volume_increase_percent as f64 >= config.min_volume_increase_percent
        && status != RecoveryStatus::Overreaching;

    let recommendation = if ready {
        next_program(current_program, current_days)
    } else {
        None
    };

    tracing::debug!(
        user_id = history.user_id(),
        sessions = sessions.len(),
        cycles,
        consistency,
        ready,
        "Analyzed progression"
    );

    ProgressionAnalysis {
        current_program,
        current_days_per_week: current_days,
        current_cycle,
        completed_cycles: cycles,
        consistency_rate: consistency,
        recovery_status: status,
        metrics,
        weekly_muscle_volume,
        muscle_recovery: muscle_readiness(&sessions, &index, now, config),
        plateau_detected: detect_plateau(&sessions, config),
        needs_deload: needs_deload(&sessions, now, config),
        ready_for_progression: ready,
        recommendation,
    }
}

// ---------------------------------------------------------------------------
/// Volume Optimization
// ---------------------------------------------------------------------------

/// Compare the mean volume of the two newest sessions with the two before
fn volume_trend(sessions: &[&SessionRecord]) -> VolumeTrend {
    if sessions.len() < 4 {
        return VolumeTrend::Stable;
    }
    let volumes: Vec<f64> = sessions.iter().map(|s| s.session.total_volume).collect();
    let change = percent_change(mean(&volumes[..2]), mean(&volumes[2..4]));
    if change > 10.0 {
        VolumeTrend::Increasing
    } else if change < -10.0 {
        VolumeTrend::Decreasing
    } else {
        VolumeTrend::Stable
    }
}

fn volume_multiplier(average_rpe: f64, trend: VolumeTrend) -> f64 {
    if average_rpe < 6.0 && trend == VolumeTrend::Stable {
        1.2
    } else if average_rpe < 7.0 && trend == VolumeTrend::Increasing {
        1.1
    } else if average_rpe > 8.5 {
        0.9
    } else {
        1.0
    }
}

pub fn optimize_volume(
    history: &TrainingHistory,
    catalog: &[Exercise],
    config: &ProgressionConfig,
) -> VolumeOptimization {
    let sessions = recent_completed(history, config.volume_session_window);
    let index = index_catalog(catalog);

    if sessions.is_empty() {
        return VolumeOptimization {
            current: VolumeSnapshot::default(),
            recommended: VolumeSnapshot::default(),
            trend: VolumeTrend::Stable,
            average_rpe: config.default_rpe,
            multiplier: 1.0,
            muscle_volume: Vec::new(),
            mev_reached: false,
            mav_exceeded: false,
            reason: "Not enough completed sessions to adjust volume yet".to_string(),
        };
    }

    let mut current = VolumeSnapshot::default();
    let mut rpes = Vec::new();
    for session in &sessions {
        current.total_volume += session.session.total_volume;
        for performed in &session.exercises {
            for set in performed.completed_sets() {
                current.total_sets += 1;
                current.total_reps += set.reps;
                if let Some(rpe) = set.rpe.filter(|r| r.is_finite()) {
                    rpes.push(rpe);
                }
            }
        }
    }

    let trend = volume_trend(&sessions);
    let average_rpe = mean(&rpes).unwrap_or(config.default_rpe);
    let multiplier = volume_multiplier(average_rpe, trend);

    let recommended = VolumeSnapshot {
        total_volume: current.total_volume * multiplier,
        total_sets: (current.total_sets as f64 * multiplier).round() as i64,
        total_reps: (current.total_reps as f64 * multiplier).round() as i64,
    };

    let muscle_volume = to_muscle_volumes(&muscle_set_counts(&sessions, &index), config);
    let mev_reached = !muscle_volume.is_empty() && muscle_volume.iter().all(|m| m.mev_reached);
    let mav_exceeded = muscle_volume.iter().any(|m| m.mav_exceeded);

    let percent = ((multiplier - 1.0).abs() * 100.0).round() as i64;
    let reason = if multiplier > 1.0 {
        format!(
            "Average RPE {:.1} leaves room for more work: increase volume by {}%",
            average_rpe, percent
        )
    } else if multiplier < 1.0 {
        format!(
            "Average RPE {:.1} is high: reduce volume by {}% to recover",
            average_rpe, percent
        )
    } else {
        "Current volume matches your effort level: keep it".to_string()
    };

    VolumeOptimization {
        current,
        recommended,
        trend,
        average_rpe,
        multiplier,
        muscle_volume,
        mev_reached,
        mav_exceeded,
        reason,
    }
}

// ---------------------------------------------------------------------------
/// Recovery Analysis
// ---------------------------------------------------------------------------

pub fn analyze_recovery(
    history: &TrainingHistory,
    catalog: &[Exercise],
    now: DateTime<Utc>,
    config: &ProgressionConfig,
) -> RecoveryAnalysis {
    let sessions = recent_completed(history, config.session_window);
    let index = index_catalog(catalog);
    let muscles = muscle_readiness(&sessions, &index, now, config);

    let scores: Vec<f64> = muscles.iter().map(|m| m.recovery_percent).collect();
    let overall = mean(&scores).map(|m| m.round() as i64).unwrap_or(100);

    let deload = needs_deload(&sessions, now, config);
    let deload_reason = deload.then(|| {
        format!(
            "{} sessions in the last 2 weeks built up fatigue. Take a recovery week at about 50% intensity.",
            count_since(&sessions, now - Duration::weeks(2))
        )
    });

    let mut ready: Vec<&MuscleReadiness> = muscles.iter().filter(|m| m.ready).collect();
    ready.sort_by(|a, b| {
        b.recovery_percent
            .total_cmp(&a.recovery_percent)
            .then(a.muscle_group.cmp(&b.muscle_group))
    });
    let next_workout_muscles = ready
        .into_iter()
        .take(config.ready_muscle_count)
        .map(|m| m.muscle_group)
        .collect();

    RecoveryAnalysis {
        muscles,
        overall_recovery_score: overall,
        needs_deload: deload,
        deload_reason,
        next_workout_muscles,
    }
}

// ---------------------------------------------------------------------------
/// Program Transition
// ---------------------------------------------------------------------------

/// Start of the current program run: the latest day 1 of cycle 1, else the
/// oldest session in the window
fn program_start(sessions: &[&SessionRecord]) -> Option<DateTime<Utc>> {
    sessions
        .iter()
        .filter(|s| s.session.program_cycle == Some(1) && s.session.program_day == Some(1))
        .map(|s| s.start_time())
        .max()
        .or_else(|| sessions.iter().map(|s| s.start_time()).min())
}

/// Mean of consistency progress and volume progress, 0 to 100
fn goal_achievement(sessions: &[&SessionRecord], target_days: i64, now: DateTime<Utc>) -> i64 {
    if sessions.is_empty() {
        return 0;
    }

    let recent: Vec<&SessionRecord> = sessions
        .iter()
        .copied()
        .filter(|s| s.start_time() > now - Duration::weeks(4))
        .collect();
    let per_week = recent.len() as f64 / 4.0;
    let consistency = (per_week / target_days.max(1) as f64 * 100.0).min(100.0);

    let recent_volume: Vec<f64> = recent.iter().take(5).map(|s| s.session.total_volume).collect();
    let older_volume: Vec<f64> = sessions
        .iter()
        .skip(10)
        .take(5)
        .map(|s| s.session.total_volume)
        .collect();
    let volume = percent_change(mean(&recent_volume), mean(&older_volume)).clamp(0.0, 100.0);

    ((consistency + volume) / 2.0).round() as i64
}

fn suggestion(
    name: &str,
    program_type: Option<ProgramType>,
    days_per_week: i64,
    description: &str,
    benefits: &[&str],
    difficulty: &str,
) -> ProgramSuggestion {
    ProgramSuggestion {
        name: name.to_string(),
        program_type,
        days_per_week,
        description: description.to_string(),
        benefits: benefits.iter().map(|b| b.to_string()).collect(),
        difficulty: difficulty.to_string(),
    }
}

pub fn program_suggestions(current: ProgramType) -> Vec<ProgramSuggestion> {
    match current {
        ProgramType::Ppl => vec![
            suggestion(
                "Upper/Lower Split",
                Some(ProgramType::UpperLower),
                4,
                "Upper and lower body days for better muscle recovery",
                &["Balanced development", "Ample recovery time"],
                "intermediate",
            ),
            suggestion(
                "PPLUL",
                None,
                5,
                "Push/pull/legs followed by an upper and a lower day",
                &["Higher frequency", "Varied stimulus"],
                "upper intermediate",
            ),
        ],
        ProgramType::UpperLower => vec![
            suggestion(
                "5-Day Bro Split",
                Some(ProgramType::BroSplit),
                5,
                "One focused session per muscle group",
                &["Maximum volume", "Detailed development"],
                "advanced",
            ),
            suggestion(
                "PPL x2",
                Some(ProgramType::Ppl),
                6,
                "Push/pull/legs twice a week",
                &["High frequency", "Faster growth"],
                "advanced",
            ),
        ],
        _ => vec![suggestion(
            "PPL",
            Some(ProgramType::Ppl),
            3,
            "The basic push/pull/legs split",
            &["Balanced program", "Ample recovery"],
            "beginner to intermediate",
        )],
    }
}

pub fn check_program_transition(
    history: &TrainingHistory,
    now: DateTime<Utc>,
    config: &ProgressionConfig,
) -> TransitionCheck {
    let sessions = recent_completed(history, TRANSITION_SESSION_WINDOW);
    let current = history.profile.workout_split.unwrap_or(ProgramType::Ppl);

    let weeks = program_start(&sessions)
        .map(|start| (now - start).num_weeks().max(0))
        .unwrap_or(0);
    let plateau = detect_plateau(&sessions, config);
    let goal = goal_achievement(&sessions, target_weekly_days(history), now);

    let should_transition =
        weeks >= config.transition_weeks || plateau || goal >= config.goal_transition_percent;

    let reason = if plateau {
        "No strength progress for 3 weeks: a new stimulus is needed".to_string()
    } else if weeks >= config.transition_weeks {
        format!("{} weeks on the same program: time for a change", weeks)
    } else if goal >= config.goal_transition_percent {
        "Close to the current goal: set a new one".to_string()
    } else {
        "Keep the current program".to_string()
    };

    TransitionCheck {
        should_transition,
        weeks_on_program: weeks,
        plateau_detected: plateau,
        goal_achievement_percent: goal,
        reason,
        suggestions: if should_transition {
            program_suggestions(current)
        } else {
            Vec::new()
        },
    }
}
