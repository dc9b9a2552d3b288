//! Database operations for `product_diffs`, plus the run-level diff pass.
//!
//! Diffs are derived data upserted on `(platform, product_id, run_id)`, so
//! recomputing the diffs of a run is idempotent and safe to repeat at any
//! time after the run's snapshots are in place.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use driftwatch_core::{compute_product_diff, ProductDiff, ProductSnapshot};

use crate::runs::get_run;
use crate::snapshots::{get_previous_snapshot, list_snapshots_for_run};
use crate::DbError;

/// A row from the `product_diffs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DiffRow {
    pub id: i64,
    pub platform: String,
    pub product_id: String,
    pub run_id: Uuid,
    pub previous_run_id: Option<Uuid>,
    pub price_delta: Option<f64>,
    pub rating_count_delta: Option<i32>,
    pub sales_count_delta: Option<i32>,
    pub revenue_delta: Option<f64>,
    pub raw_source_changed: bool,
    pub computed_at: DateTime<Utc>,
}

impl From<DiffRow> for ProductDiff {
    fn from(row: DiffRow) -> Self {
        ProductDiff {
            platform: row.platform,
            product_id: row.product_id,
            run_id: row.run_id,
            previous_run_id: row.previous_run_id,
            price_delta: row.price_delta,
            rating_count_delta: row.rating_count_delta,
            sales_count_delta: row.sales_count_delta,
            revenue_delta: row.revenue_delta,
            raw_source_changed: row.raw_source_changed,
            computed_at: row.computed_at,
        }
    }
}

/// Inserts or replaces the diff for one `(platform, product_id, run_id)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_diff(pool: &PgPool, diff: &ProductDiff) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO product_diffs \
             (platform, product_id, run_id, previous_run_id, price_delta, \
              rating_count_delta, sales_count_delta, revenue_delta, \
              raw_source_changed, computed_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (platform, product_id, run_id) DO UPDATE SET \
             previous_run_id    = EXCLUDED.previous_run_id, \
             price_delta        = EXCLUDED.price_delta, \
             rating_count_delta = EXCLUDED.rating_count_delta, \
             sales_count_delta  = EXCLUDED.sales_count_delta, \
             revenue_delta      = EXCLUDED.revenue_delta, \
             raw_source_changed = EXCLUDED.raw_source_changed, \
             computed_at        = EXCLUDED.computed_at",
    )
    .bind(&diff.platform)
    .bind(&diff.product_id)
    .bind(diff.run_id)
    .bind(diff.previous_run_id)
    .bind(diff.price_delta)
    .bind(diff.rating_count_delta)
    .bind(diff.sales_count_delta)
    .bind(diff.revenue_delta)
    .bind(diff.raw_source_changed)
    .bind(diff.computed_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns all diffs belonging to one run, in stable identity order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_diffs_for_run(pool: &PgPool, run_id: Uuid) -> Result<Vec<DiffRow>, DbError> {
    let rows = sqlx::query_as::<_, DiffRow>(
        "SELECT id, platform, product_id, run_id, previous_run_id, price_delta, \
                rating_count_delta, sales_count_delta, revenue_delta, \
                raw_source_changed, computed_at \
         FROM product_diffs \
         WHERE run_id = $1 \
         ORDER BY platform, product_id",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Computes and upserts diffs for every snapshot of a run.
///
/// Runs strictly after all snapshot inserts for the run have finished. Each
/// snapshot is compared against the latest earlier snapshot of the same
/// product identity; products with no earlier snapshot get a first-sighting
/// diff. Returns the number of diffs written.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the run does not exist, or
/// [`DbError::Sqlx`] if any query fails.
pub async fn compute_diffs_for_run(pool: &PgPool, run_id: Uuid) -> Result<usize, DbError> {
    let run = get_run(pool, run_id).await?;
    let snapshots = list_snapshots_for_run(pool, run_id).await?;

    let mut written = 0usize;
    for row in snapshots {
        let current: ProductSnapshot = row.into();
        let previous = get_previous_snapshot(
            pool,
            &current.platform,
            &current.product_id,
            run.started_at,
        )
        .await?
        .map(ProductSnapshot::from);

        let diff = compute_product_diff(&current, previous.as_ref());
        upsert_diff(pool, &diff).await?;
        written += 1;
    }

    Ok(written)
}
