use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::classifier::RuleTable;
use crate::config::{rules_from_env, DatabaseConfig, EngineConfig};
use crate::error::EngineError;
use crate::llm::LlmClient;

pub type DbPool = SqlitePool;

/// Shared state for every command: the connection pool plus the tunables
pub struct AppState {
  pub db: DbPool,
  pub config: EngineConfig,
  pub rules: RuleTable,
  /// Coaching text falls back to templates when unset
  pub llm: Option<LlmClient>,
}

impl AppState {
  /// Build state from the environment: database URL, engine config and rule table
  pub async fn from_env() -> Result<Self, EngineError> {
    let config = EngineConfig::from_env()?;
    let rules = rules_from_env()?;
    let db = initialize_db(&DatabaseConfig::from_env()).await?;
    let llm = match LlmClient::from_env() {
      Ok(client) => Some(client),
      Err(e) => {
        debug!(error = %e, "LLM client unavailable, coaching uses templates");
        None
      }
    };
    Ok(Self { db, config, rules, llm })
  }
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(config: &DatabaseConfig) -> Result<DbPool, EngineError> {
  info!(url = %config.url, "Initializing database");

  let pool = SqlitePoolOptions::new()
    .max_connections(config.max_connections)
    .connect(&config.url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  info!("Database initialized");
  Ok(pool)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_initialize_in_memory_runs_migrations() {
    let config = DatabaseConfig {
      url: "sqlite::memory:".to_string(),
      max_connections: 1,
    };

    let pool = initialize_db(&config).await.unwrap();
    let tables: i64 = sqlx::query_scalar(
      "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'exercises', 'workout_sessions', 'muscle_recovery')",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    assert_eq!(tables, 4);
    pool.close().await;
  }
}
