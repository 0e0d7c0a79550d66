//! Engine error types
//!
//! Missing history is never an error here: the engine falls back to
//! conservative defaults. Errors are reserved for missing entities, invalid
//! session transitions and storage/configuration failures.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum EngineError {
  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Invalid state: {0}")]
  InvalidState(String),

  #[error("Database error: {0}")]
  Database(String),

  #[error("Configuration error: {0}")]
  Config(String),
}

impl EngineError {
  pub fn not_found(entity: &str, id: i64) -> Self {
    EngineError::NotFound(format!("{} {}", entity, id))
  }
}

// Convert sqlx::Error to EngineError
impl From<sqlx::Error> for EngineError {
  fn from(e: sqlx::Error) -> Self {
    match e {
      sqlx::Error::RowNotFound => EngineError::NotFound("row".to_string()),
      other => EngineError::Database(other.to_string()),
    }
  }
}

impl From<sqlx::migrate::MigrateError> for EngineError {
  fn from(e: sqlx::migrate::MigrateError) -> Self {
    EngineError::Database(e.to_string())
  }
}

impl From<ConfigError> for EngineError {
  fn from(e: ConfigError) -> Self {
    EngineError::Config(e.to_string())
  }
}
