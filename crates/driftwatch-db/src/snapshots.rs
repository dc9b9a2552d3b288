//! Database operations for `product_snapshots`.
//!
//! Snapshots are insert-only. The unique key `(platform, product_id, run_id)`
//! plus `ON CONFLICT DO NOTHING` makes duplicate observations within a run a
//! silent no-op rather than a run failure.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use driftwatch_core::{ProductSnapshot, RevenueConfidence};

use crate::DbError;

/// A row from the `product_snapshots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnapshotRow {
    pub id: i64,
    pub platform: String,
    pub product_id: String,
    pub run_id: Uuid,
    pub url: String,
    pub title: String,
    pub creator_name: Option<String>,
    pub creator_url: Option<String>,
    pub category: Option<String>,
    pub price_amount: Option<f64>,
    pub price_currency: Option<String>,
    pub price_is_pwyw: bool,
    pub rating_avg: Option<f64>,
    pub rating_count: Option<i32>,
    pub sales_count: Option<i32>,
    pub revenue_estimate: Option<f64>,
    pub revenue_confidence: String,
    pub tags: Json<Vec<String>>,
    pub observed_at: DateTime<Utc>,
    pub content_hash: String,
}

impl From<SnapshotRow> for ProductSnapshot {
    fn from(row: SnapshotRow) -> Self {
        ProductSnapshot {
            platform: row.platform,
            product_id: row.product_id,
            run_id: row.run_id,
            url: row.url,
            title: row.title,
            creator_name: row.creator_name,
            creator_url: row.creator_url,
            category: row.category,
            price_amount: row.price_amount,
            price_currency: row.price_currency,
            price_is_pwyw: row.price_is_pwyw,
            rating_avg: row.rating_avg,
            rating_count: row.rating_count,
            sales_count: row.sales_count,
            revenue_estimate: row.revenue_estimate,
            revenue_confidence: RevenueConfidence::from_db_str(&row.revenue_confidence),
            tags: row.tags.0,
            observed_at: row.observed_at,
            content_hash: row.content_hash,
        }
    }
}

const SNAPSHOT_COLUMNS: &str = "id, platform, product_id, run_id, url, title, \
    creator_name, creator_url, category, price_amount, price_currency, \
    price_is_pwyw, rating_avg, rating_count, sales_count, revenue_estimate, \
    revenue_confidence, tags, observed_at, content_hash";

/// Inserts a snapshot, treating a duplicate `(platform, product_id, run_id)`
/// as a no-op.
///
/// Returns `true` when a row was actually written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails for any reason other than
/// the unique-key conflict.
pub async fn insert_snapshot(pool: &PgPool, snapshot: &ProductSnapshot) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO product_snapshots \
             (platform, product_id, run_id, url, title, creator_name, creator_url, \
              category, price_amount, price_currency, price_is_pwyw, rating_avg, \
              rating_count, sales_count, revenue_estimate, revenue_confidence, \
              tags, observed_at, content_hash) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, \
                 $15, $16, $17, $18, $19) \
         ON CONFLICT (platform, product_id, run_id) DO NOTHING",
    )
    .bind(&snapshot.platform)
    .bind(&snapshot.product_id)
    .bind(snapshot.run_id)
    .bind(&snapshot.url)
    .bind(&snapshot.title)
    .bind(snapshot.creator_name.as_deref())
    .bind(snapshot.creator_url.as_deref())
    .bind(snapshot.category.as_deref())
    .bind(snapshot.price_amount)
    .bind(snapshot.price_currency.as_deref())
    .bind(snapshot.price_is_pwyw)
    .bind(snapshot.rating_avg)
    .bind(snapshot.rating_count)
    .bind(snapshot.sales_count)
    .bind(snapshot.revenue_estimate)
    .bind(snapshot.revenue_confidence.as_str())
    .bind(Json(&snapshot.tags))
    .bind(snapshot.observed_at)
    .bind(&snapshot.content_hash)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Returns all snapshots belonging to one run, in stable identity order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_snapshots_for_run(
    pool: &PgPool,
    run_id: Uuid,
) -> Result<Vec<SnapshotRow>, DbError> {
    let rows = sqlx::query_as::<_, SnapshotRow>(&format!(
        "SELECT {SNAPSHOT_COLUMNS} FROM product_snapshots \
         WHERE run_id = $1 \
         ORDER BY platform, product_id"
    ))
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Resolves the previous snapshot for a product identity relative to a run.
///
/// "Previous" means the latest snapshot of the same `(platform, product_id)`
/// whose owning run started strictly before `run_started_at`; ties on start
/// time break by run id so the answer is deterministic. Returns `None` for a
/// first sighting.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_previous_snapshot(
    pool: &PgPool,
    platform: &str,
    product_id: &str,
    run_started_at: DateTime<Utc>,
) -> Result<Option<SnapshotRow>, DbError> {
    let row = sqlx::query_as::<_, SnapshotRow>(
        "SELECT s.id, s.platform, s.product_id, s.run_id, s.url, s.title, \
                s.creator_name, s.creator_url, s.category, s.price_amount, \
                s.price_currency, s.price_is_pwyw, s.rating_avg, s.rating_count, \
                s.sales_count, s.revenue_estimate, s.revenue_confidence, s.tags, \
                s.observed_at, s.content_hash \
         FROM product_snapshots s \
         JOIN runs r ON r.id = s.run_id \
         WHERE s.platform = $1 AND s.product_id = $2 AND r.started_at < $3 \
         ORDER BY r.started_at DESC, r.id DESC \
         LIMIT 1",
    )
    .bind(platform)
    .bind(product_id)
    .bind(run_started_at)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
