pub mod classifier;
pub mod coaching;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod history;
pub mod llm;
pub mod models;
pub mod position;
pub mod prescription;
pub mod progression;
pub mod recovery;
pub mod selector;
pub mod session;

#[cfg(test)]
pub mod test_utils;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use coaching::CoachingMoment;
use db::AppState;
use filter::RecommendationFilters;

const DEFAULT_LOG_FILTER: &str = "lift_coach=info";

#[derive(Parser)]
#[command(
  name = "lift-coach",
  about = "Workout recommendation and periodization engine",
  long_about = "Exercise selection, split program tracking, progression analysis and load prescription over a local SQLite store."
)]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Next (day, cycle) in the user's split program
  Position {
    #[arg(long)]
    user: i64,

    /// Days in the program cycle
    #[arg(long, default_value = "3")]
    length: i64,
  },

  /// Recommend a split program
  Program {
    #[arg(long)]
    user: i64,
  },

  /// Recommend exercises for the next workout
  Recommend {
    #[arg(long)]
    user: i64,

    /// Target muscle area (chest, back, legs, upper, ...)
    #[arg(long)]
    target: Option<String>,

    #[arg(long)]
    equipment: Option<String>,

    #[arg(long, default_value = "6")]
    limit: usize,
  },

  /// Progression, volume, recovery or transition analysis
  Progression {
    #[arg(long)]
    user: i64,

    #[arg(long, value_enum, default_value = "analysis")]
    view: ProgressionView,
  },

  /// Prescribe a working weight for one exercise
  Weight {
    #[arg(long)]
    user: i64,

    #[arg(long)]
    exercise: i64,
  },

  /// Session lifecycle
  Session {
    #[command(subcommand)]
    action: SessionCommand,
  },

  /// Coaching message in the user's style
  Coach {
    #[arg(long)]
    user: i64,

    /// workout_reminder, workout_complete or rest_day
    #[arg(long, default_value = "workout_reminder")]
    moment: String,
  },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ProgressionView {
  Analysis,
  Volume,
  Recovery,
  Transition,
  Suggestions,
}

#[derive(Subcommand)]
enum SessionCommand {
  /// Start a session with planned exercises (comma-separated ids)
  Start {
    #[arg(long)]
    user: i64,

    #[arg(long, value_delimiter = ',')]
    exercises: Vec<i64>,
  },

  /// Log one set
  Set {
    #[arg(long)]
    session: i64,

    #[arg(long)]
    exercise: i64,

    #[arg(long)]
    weight: f64,

    #[arg(long)]
    reps: i64,

    #[arg(long)]
    rpe: Option<f64>,
  },

  Complete {
    #[arg(long)]
    session: i64,

    /// Minutes, defaults to time since start
    #[arg(long)]
    duration: Option<i64>,
  },

  Cancel {
    #[arg(long)]
    session: i64,
  },

  Delete {
    #[arg(long)]
    session: i64,
  },
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();
  init_tracing();

  let cli = Cli::parse();
  let state = AppState::from_env().await?;

  match cli.command {
    Command::Position { user, length } => {
      print_json(&commands::get_next_program_position(&state, user, length).await?)?
    }
    Command::Program { user } => print_json(&commands::select_program(&state, user).await?)?,
    Command::Recommend {
      user,
      target,
      equipment,
      limit,
    } => {
      let filters = RecommendationFilters {
        target_muscle: target,
        equipment,
      };
      print_json(&commands::recommendation::get_recommended_exercises(&state, user, filters, limit).await?)?
    }
    Command::Progression { user, view } => match view {
      ProgressionView::Analysis => print_json(&commands::progression::analyze_progression(&state, user).await?)?,
      ProgressionView::Volume => print_json(&commands::progression::optimize_volume(&state, user).await?)?,
      ProgressionView::Recovery => print_json(&commands::progression::analyze_recovery(&state, user).await?)?,
      ProgressionView::Transition => {
        print_json(&commands::progression::check_program_transition(&state, user).await?)?
      }
      ProgressionView::Suggestions => {
        print_json(&commands::progression::get_program_suggestions(&state, user).await?)?
      }
    },
    Command::Weight { user, exercise } => {
      print_json(&commands::prescription::suggested_weight(&state, user, exercise).await?)?
    }
    Command::Session { action } => match action {
      SessionCommand::Start { user, exercises } => {
        print_json(&commands::session::start_session(&state, user, exercises).await?)?
      }
      SessionCommand::Set {
        session,
        exercise,
        weight,
        reps,
        rpe,
      } => print_json(&commands::session::record_set(&state, session, exercise, weight, reps, rpe).await?)?,
      SessionCommand::Complete { session, duration } => {
        print_json(&commands::session::complete_session(&state, session, duration).await?)?
      }
      SessionCommand::Cancel { session } => print_json(&commands::session::cancel_session(&state, session).await?)?,
      SessionCommand::Delete { session } => {
        commands::session::delete_session(&state, session).await?;
        print_json(&serde_json::json!({ "deleted": session }))?
      }
    },
    Command::Coach { user, moment } => {
      let moment: CoachingMoment = moment.parse()?;
      println!("{}", commands::coaching::coaching_message(&state, user, moment).await?);
    }
  }

  state.db.close().await;
  Ok(())
}
