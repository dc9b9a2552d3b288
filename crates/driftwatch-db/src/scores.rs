//! Database operations for `opportunity_scores`, plus the run-level scoring
//! pass.
//!
//! Scores are derived data like diffs: upserted on
//! `(platform, product_id, run_id)` and recomputable at any time after the
//! run's diffs are in place.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use driftwatch_core::{
    detect_alerts, hours_between_runs, score_snapshot, OpportunityScore, ProductDiff,
    ProductSnapshot, ScoreConfidence,
};

use crate::alerts::replace_alerts_for_run;
use crate::diffs::list_diffs_for_run;
use crate::runs::get_run;
use crate::snapshots::list_snapshots_for_run;
use crate::DbError;

/// How many recent runs contribute category titles for novelty/saturation.
const TITLE_HISTORY_RUNS: i64 = 3;

const SCORE_COLUMNS: &str = "id, platform, product_id, run_id, title, url, category, \
     creator_name, price_amount, price_currency, rating_avg, rating_count, \
     rating_count_delta, sales_count, sales_count_delta, opportunity_score, \
     velocity_score, novelty_score, copyability_score, price_to_value_score, \
     saturation_penalty, confidence, reason_summary, saturation_examples";

/// A row from the `opportunity_scores` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ScoreRow {
    pub id: i64,
    pub platform: String,
    pub product_id: String,
    pub run_id: Uuid,
    pub title: String,
    pub url: String,
    pub category: Option<String>,
    pub creator_name: Option<String>,
    pub price_amount: Option<f64>,
    pub price_currency: Option<String>,
    pub rating_avg: Option<f64>,
    pub rating_count: Option<i32>,
    pub rating_count_delta: Option<i32>,
    pub sales_count: Option<i32>,
    pub sales_count_delta: Option<i32>,
    pub opportunity_score: f64,
    pub velocity_score: f64,
    pub novelty_score: f64,
    pub copyability_score: f64,
    pub price_to_value_score: f64,
    pub saturation_penalty: f64,
    pub confidence: String,
    pub reason_summary: String,
    pub saturation_examples: Json<Vec<String>>,
}

impl From<ScoreRow> for OpportunityScore {
    fn from(row: ScoreRow) -> Self {
        OpportunityScore {
            platform: row.platform,
            product_id: row.product_id,
            run_id: row.run_id,
            title: row.title,
            url: row.url,
            category: row.category,
            creator_name: row.creator_name,
            price_amount: row.price_amount,
            price_currency: row.price_currency,
            rating_avg: row.rating_avg,
            rating_count: row.rating_count,
            rating_count_delta: row.rating_count_delta,
            sales_count: row.sales_count,
            sales_count_delta: row.sales_count_delta,
            opportunity_score: row.opportunity_score,
            velocity_score: row.velocity_score,
            novelty_score: row.novelty_score,
            copyability_score: row.copyability_score,
            price_to_value_score: row.price_to_value_score,
            saturation_penalty: row.saturation_penalty,
            confidence: ScoreConfidence::from_db_str(&row.confidence),
            reason_summary: row.reason_summary,
            saturation_examples: row.saturation_examples.0,
        }
    }
}

/// Inserts or replaces the score for one `(platform, product_id, run_id)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_score(pool: &PgPool, score: &OpportunityScore) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO opportunity_scores \
             (platform, product_id, run_id, title, url, category, creator_name, \
              price_amount, price_currency, rating_avg, rating_count, \
              rating_count_delta, sales_count, sales_count_delta, \
              opportunity_score, velocity_score, novelty_score, \
              copyability_score, price_to_value_score, saturation_penalty, \
              confidence, reason_summary, saturation_examples) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, \
                 $15, $16, $17, $18, $19, $20, $21, $22, $23) \
         ON CONFLICT (platform, product_id, run_id) DO UPDATE SET \
             title                = EXCLUDED.title, \
             url                  = EXCLUDED.url, \
             category             = EXCLUDED.category, \
             creator_name         = EXCLUDED.creator_name, \
             price_amount         = EXCLUDED.price_amount, \
             price_currency       = EXCLUDED.price_currency, \
             rating_avg           = EXCLUDED.rating_avg, \
             rating_count         = EXCLUDED.rating_count, \
             rating_count_delta   = EXCLUDED.rating_count_delta, \
             sales_count          = EXCLUDED.sales_count, \
             sales_count_delta    = EXCLUDED.sales_count_delta, \
             opportunity_score    = EXCLUDED.opportunity_score, \
             velocity_score       = EXCLUDED.velocity_score, \
             novelty_score        = EXCLUDED.novelty_score, \
             copyability_score    = EXCLUDED.copyability_score, \
             price_to_value_score = EXCLUDED.price_to_value_score, \
             saturation_penalty   = EXCLUDED.saturation_penalty, \
             confidence           = EXCLUDED.confidence, \
             reason_summary       = EXCLUDED.reason_summary, \
             saturation_examples  = EXCLUDED.saturation_examples",
    )
    .bind(&score.platform)
    .bind(&score.product_id)
    .bind(score.run_id)
    .bind(&score.title)
    .bind(&score.url)
    .bind(score.category.as_deref())
    .bind(score.creator_name.as_deref())
    .bind(score.price_amount)
    .bind(score.price_currency.as_deref())
    .bind(score.rating_avg)
    .bind(score.rating_count)
    .bind(score.rating_count_delta)
    .bind(score.sales_count)
    .bind(score.sales_count_delta)
    .bind(score.opportunity_score)
    .bind(score.velocity_score)
    .bind(score.novelty_score)
    .bind(score.copyability_score)
    .bind(score.price_to_value_score)
    .bind(score.saturation_penalty)
    .bind(score.confidence.as_str())
    .bind(&score.reason_summary)
    .bind(Json(&score.saturation_examples))
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns a run's scores, best opportunities first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_scores_for_run(
    pool: &PgPool,
    run_id: Uuid,
    limit: i64,
) -> Result<Vec<ScoreRow>, DbError> {
    let rows = sqlx::query_as::<_, ScoreRow>(&format!(
        "SELECT {SCORE_COLUMNS} FROM opportunity_scores \
         WHERE run_id = $1 \
         ORDER BY opportunity_score DESC, product_id \
         LIMIT $2"
    ))
    .bind(run_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Titles of snapshots in the same category across the most recent runs,
/// excluding the run being scored. Feeds novelty and saturation.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn recent_titles_for_category(
    pool: &PgPool,
    category: Option<&str>,
    exclude_run_id: Uuid,
    run_limit: i64,
) -> Result<Vec<String>, DbError> {
    let titles = sqlx::query_scalar::<_, String>(
        "SELECT s.title FROM product_snapshots s \
         WHERE s.run_id IN \
             (SELECT id FROM runs ORDER BY started_at DESC, id DESC LIMIT $1) \
           AND s.run_id <> $2 \
           AND s.category IS NOT DISTINCT FROM $3",
    )
    .bind(run_limit)
    .bind(exclude_run_id)
    .bind(category)
    .fetch_all(pool)
    .await?;

    Ok(titles)
}

/// Computes and stores opportunity scores and alerts for a run.
///
/// Runs strictly after the run's diff pass. Scores are upserted per product;
/// the run's alerts are replaced wholesale so recomputation never duplicates
/// them. Returns `(scores_written, alerts_written)`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the run does not exist, or
/// [`DbError::Sqlx`] if any query fails.
pub async fn compute_opportunities_for_run(
    pool: &PgPool,
    run_id: Uuid,
) -> Result<(usize, usize), DbError> {
    let run = get_run(pool, run_id).await?;

    let snapshots: Vec<ProductSnapshot> = list_snapshots_for_run(pool, run_id)
        .await?
        .into_iter()
        .map(ProductSnapshot::from)
        .collect();
    let diffs: Vec<ProductDiff> = list_diffs_for_run(pool, run_id)
        .await?
        .into_iter()
        .map(ProductDiff::from)
        .collect();

    let previous_started_at = sqlx::query_scalar::<_, chrono::DateTime<chrono::Utc>>(
        "SELECT started_at FROM runs WHERE started_at < $1 \
         ORDER BY started_at DESC, id DESC LIMIT 1",
    )
    .bind(run.started_at)
    .fetch_optional(pool)
    .await?;

    let hours_delta = hours_between_runs(run.started_at, previous_started_at);
    let diffs_by_product: HashMap<(&str, &str), &ProductDiff> = diffs
        .iter()
        .map(|d| ((d.platform.as_str(), d.product_id.as_str()), d))
        .collect();

    let mut titles_by_category: HashMap<Option<String>, Vec<String>> = HashMap::new();
    let mut scores_written = 0usize;
    for snap in &snapshots {
        if !titles_by_category.contains_key(&snap.category) {
            let titles = recent_titles_for_category(
                pool,
                snap.category.as_deref(),
                run_id,
                TITLE_HISTORY_RUNS,
            )
            .await?;
            titles_by_category.insert(snap.category.clone(), titles);
        }
        let category_titles = &titles_by_category[&snap.category];

        let diff = diffs_by_product
            .get(&(snap.platform.as_str(), snap.product_id.as_str()))
            .copied();
        let score = score_snapshot(snap, diff, category_titles, hours_delta);
        upsert_score(pool, &score).await?;
        scores_written += 1;
    }

    let alerts = detect_alerts(&snapshots, &diffs, previous_started_at.is_some());
    let alerts_written = replace_alerts_for_run(pool, run_id, &alerts).await?;

    Ok((scores_written, alerts_written))
}
