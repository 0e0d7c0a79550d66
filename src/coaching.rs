//! Coaching text
//!
//! Every message has a deterministic template keyed by coaching style. An
//! optional LLM client can produce richer text; any failure or timeout falls
//! back to the template so callers always get a message.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::llm::LlmClient;
use crate::models::normalize_key;

/// Upper bound on a single LLM round trip before the template is used
pub const LLM_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum CoachingStyle {
  #[default]
  Spartan,
  Burnout,
  GameMaster,
  Influencer,
  HipHop,
  RetiredTeacher,
  OfficeMaster,
  LaKorean,
  BusanVeteran,
  Soldier,
}

impl CoachingStyle {
  pub const ALL: [CoachingStyle; 10] = [
    Self::Spartan,
    Self::Burnout,
    Self::GameMaster,
    Self::Influencer,
    Self::HipHop,
    Self::RetiredTeacher,
    Self::OfficeMaster,
    Self::LaKorean,
    Self::BusanVeteran,
    Self::Soldier,
  ];

  /// One-line persona handed to the LLM as part of the system prompt
  pub fn persona(&self) -> &'static str {
    match self {
      Self::Spartan => "a drill-sergeant trainer who pushes hard and accepts no excuses",
      Self::Burnout => "a tired third-year trainer who has heard every excuse and answers with dry honesty",
      Self::GameMaster => "a gamer trainer who turns every workout into an RPG quest with XP and level ups",
      Self::Influencer => "an upbeat wellness influencer who loves pilates, yoga and good vibes",
      Self::HipHop => "a hip-hop trainer who talks in rhymes and punchlines",
      Self::RetiredTeacher => "a retired PE teacher who tells stories about the old days while coaching",
      Self::OfficeMaster => "a middle manager who understands office life and after-work dinners",
      Self::LaKorean => "a high-energy trainer from LA who mixes in American gym slang",
      Self::BusanVeteran => "a former athlete from Busan who delivers blunt, rough-edged facts",
      Self::Soldier => "an eager but clumsy new private who still talks like he is in the army",
    }
  }
}

impl std::fmt::Display for CoachingStyle {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Spartan => write!(f, "spartan"),
      Self::Burnout => write!(f, "burnout"),
      Self::GameMaster => write!(f, "game_master"),
      Self::Influencer => write!(f, "influencer"),
      Self::HipHop => write!(f, "hip_hop"),
      Self::RetiredTeacher => write!(f, "retired_teacher"),
      Self::OfficeMaster => write!(f, "office_master"),
      Self::LaKorean => write!(f, "la_korean"),
      Self::BusanVeteran => write!(f, "busan_veteran"),
      Self::Soldier => write!(f, "soldier"),
    }
  }
}

impl std::str::FromStr for CoachingStyle {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match normalize_key(s).as_str() {
      "spartan" => Ok(Self::Spartan),
      "burnout" => Ok(Self::Burnout),
      "game_master" => Ok(Self::GameMaster),
      "influencer" => Ok(Self::Influencer),
      "hip_hop" => Ok(Self::HipHop),
      "retired_teacher" => Ok(Self::RetiredTeacher),
      "office_master" => Ok(Self::OfficeMaster),
      "la_korean" => Ok(Self::LaKorean),
      "busan_veteran" => Ok(Self::BusanVeteran),
      "soldier" => Ok(Self::Soldier),
      _ => Err(format!("Unknown coaching style: {}", s)),
    }
  }
}

/// When a message is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoachingMoment {
  WorkoutReminder,
  WorkoutComplete,
  RestDay,
}

impl std::fmt::Display for CoachingMoment {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::WorkoutReminder => write!(f, "workout_reminder"),
      Self::WorkoutComplete => write!(f, "workout_complete"),
      Self::RestDay => write!(f, "rest_day"),
    }
  }
}

impl std::str::FromStr for CoachingMoment {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match normalize_key(s).as_str() {
      "workout_reminder" | "reminder" => Ok(Self::WorkoutReminder),
      "workout_complete" | "complete" => Ok(Self::WorkoutComplete),
      "rest_day" | "rest" => Ok(Self::RestDay),
      _ => Err(format!("Unknown coaching moment: {}", s)),
    }
  }
}

/// ---------------------------------------------------------------------------
/// Templates
/// ---------------------------------------------------------------------------

pub fn template(style: CoachingStyle, moment: CoachingMoment) -> &'static str {
  use CoachingMoment::*;
  use CoachingStyle::*;

  match (style, moment) {
    (Spartan, WorkoutReminder) => "Training time. No excuses. Get in there and break yesterday's limits!",
    (Spartan, WorkoutComplete) => "Battle won. Refuel with protein and be ready for the next fight!",
    (Spartan, RestDay) => "Rest is part of the war. Eat, sleep, and come back stronger.",

    (Burnout, WorkoutReminder) => "Workout time. I know you have a reason not to go. Go anyway.",
    (Burnout, WorkoutComplete) => "You actually finished. Honestly, that beats most people I train.",
    (Burnout, RestDay) => "Rest day. Resting is allowed. Skipping tomorrow is not.",

    (GameMaster, WorkoutReminder) => "New quest unlocked: today's workout. Party up and collect that XP!",
    (GameMaster, WorkoutComplete) => "Quest complete! Strength +1. Save your progress with a good meal.",
    (GameMaster, RestDay) => "Rest at the inn today. HP and MP restore overnight.",

    (Influencer, WorkoutReminder) => "Time to move and feel amazing. Your body will thank you!",
    (Influencer, WorkoutComplete) => "Beautiful session! Stretch, hydrate and enjoy that glow.",
    (Influencer, RestDay) => "Self-care day. A little mobility and a lot of good sleep.",

    (HipHop, WorkoutReminder) => "Yo, the bar is calling, no stalling, time to keep balling.",
    (HipHop, WorkoutComplete) => "Set after set, no regret, that's the best session yet.",
    (HipHop, RestDay) => "Rest day flow, let the muscles grow, take it slow.",

    (RetiredTeacher, WorkoutReminder) => "Back in my day we trained in the rain. You have a gym. Let's go.",
    (RetiredTeacher, WorkoutComplete) => "Good work. Reminds me of my best students. Eat well tonight.",
    (RetiredTeacher, RestDay) => "Even champions rested. Take a walk and get to bed early.",

    (OfficeMaster, WorkoutReminder) => "The meeting ran long, I know. Thirty minutes in the gym fixes that.",
    (OfficeMaster, WorkoutComplete) => "Better than overtime. Skip the late dinner, you earned the sleep.",
    (OfficeMaster, RestDay) => "Day off from lifting. Not an excuse for a third round of drinks.",

    (LaKorean, WorkoutReminder) => "Let's go, bro! Workout time, no days off!",
    (LaKorean, WorkoutComplete) => "That was fire! Get your protein and let's crush it next time.",
    (LaKorean, RestDay) => "Chill day, bro. Recovery is where the gains happen.",

    (BusanVeteran, WorkoutReminder) => "What are you doing sitting there? Get moving. The weights won't lift themselves.",
    (BusanVeteran, WorkoutComplete) => "Not bad. Don't get cocky. Same again next time.",
    (BusanVeteran, RestDay) => "Rest properly today. Half-hearted rest is as bad as half-hearted training.",

    (Soldier, WorkoutReminder) => "Private reporting! It is workout time, sir! Please proceed to the gym!",
    (Soldier, WorkoutComplete) => "Mission accomplished, sir! Permission to suggest a protein meal!",
    (Soldier, RestDay) => "Rest day, sir! Recovery is also a duty!",
  }
}

/// Form cue for an exercise followed by the focus for today's phase
pub fn exercise_tip(exercise_name: &str, focus: &str) -> String {
  let name = exercise_name.to_lowercase();
  let cue = if name.contains("bench") {
    "Keep your chest up and your shoulder blades pinched for a stable base."
  } else if name.contains("squat") {
    "Track your knees over your toes and brace your core."
  } else if name.contains("deadlift") {
    "Keep your back flat and the bar close to your body."
  } else if name.contains("row") {
    "Pull with your elbows and squeeze your shoulder blades together."
  } else if name.contains("press") {
    "Brace your core and press in a straight line without arching your lower back."
  } else if name.contains("curl") {
    "Keep your elbows pinned and avoid swinging."
  } else {
    "Focus on precise form and steady breathing."
  };
  format!("{} {}", cue, focus)
}

/// ---------------------------------------------------------------------------
/// Message Generation
/// ---------------------------------------------------------------------------

fn system_prompt(style: CoachingStyle) -> String {
  format!(
    "You are {}. Write one short coaching message (at most two sentences) for a lifter. \
     Stay in character. Do not invent numbers that are not in the context.",
    style.persona()
  )
}

/// Coaching message for a moment, from the LLM when available, else the template
pub async fn coaching_message(
  style: CoachingStyle,
  moment: CoachingMoment,
  context: &str,
  llm: Option<&LlmClient>,
) -> String {
  let fallback = template(style, moment);
  let Some(client) = llm else {
    return fallback.to_string();
  };

  let user_message = format!(
    "Moment: {}\nContext: {}\nExample of the tone: {}",
    moment, context, fallback
  );

  match tokio::time::timeout(LLM_TIMEOUT, client.complete(&system_prompt(style), &user_message, 200)).await {
    Ok(Ok(text)) if !text.trim().is_empty() => {
      debug!(style = %style, moment = %moment, "Generated coaching message");
      text.trim().to_string()
    }
    Ok(Ok(_)) => {
      warn!(style = %style, "Empty coaching message, using template");
      fallback.to_string()
    }
    Ok(Err(e)) => {
      warn!(style = %style, error = %e, "Coaching message generation failed, using template");
      fallback.to_string()
    }
    Err(_) => {
      warn!(style = %style, "Coaching message generation timed out, using template");
      fallback.to_string()
    }
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
