//! Database operations for the `runs` ledger.
//!
//! A run row is created once when orchestration starts and updated exactly
//! once when it completes or fails; both completion paths are guarded by a
//! status-transition check so a run can never be finished twice.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Lifecycle state stored in `runs.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row from the `runs` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RunRow {
    pub id: Uuid,
    pub platform: String,
    pub category: Option<String>,
    pub source: String,
    pub status: String,
    /// Job descriptor blob recorded for reproducibility.
    pub config: Option<Value>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_products: Option<i32>,
    pub summary: Option<Value>,
}

const RUN_COLUMNS: &str = "id, platform, category, source, status, config, \
                           started_at, completed_at, total_products, summary";

/// Creates a new run in `running` status with `started_at = NOW()`.
///
/// Generates the run id in Rust so callers can log it before any other write
/// lands. Returns the full newly-created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_run(
    pool: &PgPool,
    platform: &str,
    category: Option<&str>,
    source: &str,
    config: Option<&Value>,
) -> Result<RunRow, DbError> {
    let id = Uuid::new_v4();

    let row = sqlx::query_as::<_, RunRow>(
        "INSERT INTO runs (id, platform, category, source, status, config) \
         VALUES ($1, $2, $3, $4, 'running', $5) \
         RETURNING id, platform, category, source, status, config, \
                   started_at, completed_at, total_products, summary",
    )
    .bind(id)
    .bind(platform)
    .bind(category)
    .bind(source)
    .bind(config)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run `completed`, setting `completed_at`, `total_products`, and the
/// run summary.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_run(
    pool: &PgPool,
    id: Uuid,
    total_products: i32,
    summary: &Value,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE runs \
         SET status = 'completed', completed_at = NOW(), \
             total_products = $1, summary = $2 \
         WHERE id = $3 AND status = 'running'",
    )
    .bind(total_products)
    .bind(summary)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run `failed`, setting `completed_at` and a summary carrying the
/// failure reasons.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_run(pool: &PgPool, id: Uuid, summary: &Value) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE runs \
         SET status = 'failed', completed_at = NOW(), summary = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(summary)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a single run by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_run(pool: &PgPool, id: Uuid) -> Result<RunRow, DbError> {
    let row = sqlx::query_as::<_, RunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` runs, ordered by `started_at DESC`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_runs(pool: &PgPool, limit: i64) -> Result<Vec<RunRow>, DbError> {
    let rows = sqlx::query_as::<_, RunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM runs \
         ORDER BY started_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
