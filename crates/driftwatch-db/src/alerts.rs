//! Database operations for the `alerts` table.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use driftwatch_core::Alert;

use crate::DbError;

/// A row from the `alerts` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AlertRow {
    pub id: i64,
    pub run_id: Uuid,
    pub platform: String,
    pub product_id: Option<String>,
    pub alert_type: String,
    pub message: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Replaces a run's alerts with a freshly detected set.
///
/// Alerts carry no natural unique key, so idempotency comes from deleting
/// the run's previous alerts inside the same transaction as the inserts.
/// Returns the number of alerts written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn replace_alerts_for_run(
    pool: &PgPool,
    run_id: Uuid,
    alerts: &[Alert],
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM alerts WHERE run_id = $1")
        .bind(run_id)
        .execute(&mut *tx)
        .await?;

    for alert in alerts {
        sqlx::query(
            "INSERT INTO alerts (run_id, platform, product_id, alert_type, message, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(alert.run_id)
        .bind(&alert.platform)
        .bind(alert.product_id.as_deref())
        .bind(alert.kind.as_str())
        .bind(&alert.message)
        .bind(sqlx::types::Json(&alert.metadata))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(alerts.len())
}

/// Returns a run's alerts in insertion order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_alerts_for_run(pool: &PgPool, run_id: Uuid) -> Result<Vec<AlertRow>, DbError> {
    let rows = sqlx::query_as::<_, AlertRow>(
        "SELECT id, run_id, platform, product_id, alert_type, message, metadata, created_at \
         FROM alerts WHERE run_id = $1 ORDER BY id",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
