//! Program position tracker
//!
//! The (day, cycle) position inside a split program is never stored. It is
//! recomputed from session history on every call, so a stored pointer can
//! never drift away from the work that was actually logged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ProgramType, SessionStatus, WorkoutSession, WorkoutType};

/// Sessions considered when looking for the last tagged program day
const POSITION_LOOKBACK: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramPosition {
  pub day: i64,
  pub cycle: i64,
  pub is_new_cycle: bool,
}

impl ProgramPosition {
  pub const START: ProgramPosition = ProgramPosition {
    day: 1,
    cycle: 1,
    is_new_cycle: true,
  };
}

fn counts_for_position(status: SessionStatus) -> bool {
  matches!(
    status,
    SessionStatus::Completed | SessionStatus::InProgress | SessionStatus::Cancelled
  )
}

/// Next (day, cycle) for a program of `program_length` days.
///
/// - A tagged session already started today is returned unchanged, so
///   re-entering the flow on the same day never advances the program twice.
/// - With no tagged session, the program starts at day 1 of cycle 1.
/// - Otherwise the last tagged day advances by one, wrapping to day 1 of the
///   next cycle after the final day.
///
/// "Today" is the UTC calendar date of `now`.
pub fn next_program_position(
  sessions: &[WorkoutSession],
  now: DateTime<Utc>,
  program_length: i64,
) -> ProgramPosition {
  let program_length = program_length.max(1);
  let today = now.date_naive();

  let mut recent: Vec<&WorkoutSession> = sessions
    .iter()
    .filter(|s| counts_for_position(s.status) && s.start_time <= now)
    .collect();
  recent.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.id.cmp(&a.id)));
  recent.truncate(POSITION_LOOKBACK);

  if let Some(todays) = recent
    .iter()
    .find(|s| s.start_time.date_naive() == today && s.program_day.is_some())
  {
    return ProgramPosition {
      day: todays.program_day.unwrap_or(1),
      cycle: todays.program_cycle.unwrap_or(1),
      is_new_cycle: false,
    };
  }

  let Some(last) = recent
    .iter()
    .find(|s| s.start_time.date_naive() != today && s.program_day.is_some())
  else {
    return ProgramPosition::START;
  };

  let last_day = last.program_day.unwrap_or(0);
  let last_cycle = last.program_cycle.unwrap_or(1);

  if last_day >= program_length {
    ProgramPosition {
      day: 1,
      cycle: last_cycle + 1,
      is_new_cycle: true,
    }
  } else {
    ProgramPosition {
      day: last_day.max(0) + 1,
      cycle: last_cycle,
      is_new_cycle: false,
    }
  }
}

/// Workout order for a split program
pub fn workout_type_sequence(program: ProgramType) -> Vec<WorkoutType> {
  match program {
    ProgramType::Ppl => vec![WorkoutType::Push, WorkoutType::Pull, WorkoutType::Legs],
    ProgramType::UpperLower => vec![
      WorkoutType::Upper,
      WorkoutType::Lower,
      WorkoutType::Upper,
      WorkoutType::Lower,
    ],
    ProgramType::FullBody => vec![WorkoutType::FullBody; 3],
    ProgramType::BroSplit => vec![
      WorkoutType::Chest,
      WorkoutType::Back,
      WorkoutType::Shoulders,
      WorkoutType::Arms,
      WorkoutType::Legs,
    ],
  }
}

/// Workout type for a position, full body when the day falls outside the sequence
pub fn workout_type_for(position: &ProgramPosition, sequence: &[WorkoutType]) -> WorkoutType {
  usize::try_from(position.day - 1)
    .ok()
    .and_then(|idx| sequence.get(idx))
    .copied()
    .unwrap_or(WorkoutType::FullBody)
}

pub fn describe_sequence(sequence: &[WorkoutType]) -> String {
  sequence
    .iter()
    .map(|t| t.to_string())
    .collect::<Vec<_>>()
    .join(" -> ")
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, TimeZone};

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 12, 18, 0, 0).unwrap()
  }

  fn session(id: i64, days_ago: i64, status: SessionStatus, day: Option<i64>, cycle: Option<i64>) -> WorkoutSession {
    WorkoutSession {
      id,
      user_id: 1,
      start_time: now() - Duration::days(days_ago) - Duration::hours(1),
      end_time: None,
      status,
      workout_type: None,
      program_day: day,
      program_cycle: cycle,
      total_volume: 0.0,
      duration_minutes: None,
    }
  }

  #[test]
  fn test_cold_start() {
    assert_eq!(next_program_position(&[], now(), 3), ProgramPosition::START);

    let untagged = vec![session(1, 2, SessionStatus::Completed, None, None)];
    assert_eq!(next_program_position(&untagged, now(), 3), ProgramPosition::START);
  }

  #[test]
  fn test_advances_within_cycle() {
    let sessions = vec![
      session(1, 3, SessionStatus::Completed, Some(1), Some(2)),
      session(2, 1, SessionStatus::Completed, Some(2), Some(2)),
    ];

    let pos = next_program_position(&sessions, now(), 3);
    assert_eq!(pos, ProgramPosition { day: 3, cycle: 2, is_new_cycle: false });
  }

  #[test]
  fn test_wraps_to_next_cycle_after_final_day() {
    let sessions = vec![session(1, 1, SessionStatus::Completed, Some(3), Some(1))];

    let pos = next_program_position(&sessions, now(), 3);
    assert_eq!(pos, ProgramPosition { day: 1, cycle: 2, is_new_cycle: true });
  }

  #[test]
  fn test_same_day_is_idempotent() {
    let mut sessions = vec![session(1, 1, SessionStatus::Completed, Some(1), Some(1))];
    let first = next_program_position(&sessions, now(), 3);

    // The session started for that position today
    sessions.push(session(2, 0, SessionStatus::InProgress, Some(first.day), Some(first.cycle)));

    let second = next_program_position(&sessions, now(), 3);
    let third = next_program_position(&sessions, now(), 3);
    assert_eq!(second.day, first.day);
    assert_eq!(second.cycle, first.cycle);
    assert!(!second.is_new_cycle);
    assert_eq!(second, third);
  }

  #[test]
  fn test_abandoned_sessions_are_ignored() {
    let sessions = vec![
      session(1, 3, SessionStatus::Completed, Some(1), Some(1)),
      session(2, 1, SessionStatus::Abandoned, Some(2), Some(1)),
    ];

    let pos = next_program_position(&sessions, now(), 3);
    assert_eq!(pos.day, 2);
  }

  #[test]
  fn test_missing_cycle_defaults_to_one() {
    let sessions = vec![session(1, 1, SessionStatus::Completed, Some(2), None)];

    let pos = next_program_position(&sessions, now(), 4);
    assert_eq!(pos, ProgramPosition { day: 3, cycle: 1, is_new_cycle: false });
  }

  #[test]
  fn test_shorter_program_wraps_stale_day() {
    // Switching from a 5-day split to a 3-day one
    let sessions = vec![session(1, 1, SessionStatus::Completed, Some(4), Some(2))];

    let pos = next_program_position(&sessions, now(), 3);
    assert_eq!(pos, ProgramPosition { day: 1, cycle: 3, is_new_cycle: true });
  }

  #[test]
  fn test_sequences_and_lookup() {
    let ppl = workout_type_sequence(ProgramType::Ppl);
    assert_eq!(ppl, vec![WorkoutType::Push, WorkoutType::Pull, WorkoutType::Legs]);
    assert_eq!(workout_type_sequence(ProgramType::BroSplit).len(), 5);

    let pos = ProgramPosition { day: 2, cycle: 1, is_new_cycle: false };
    assert_eq!(workout_type_for(&pos, &ppl), WorkoutType::Pull);

    let out_of_range = ProgramPosition { day: 7, cycle: 1, is_new_cycle: false };
    assert_eq!(workout_type_for(&out_of_range, &ppl), WorkoutType::FullBody);

    assert_eq!(describe_sequence(&ppl), "push -> pull -> legs");
  }
}
