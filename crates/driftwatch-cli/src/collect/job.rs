//! Per-job collection pipeline: one run, sequential listing pages, snapshot
//! persistence, then the diff pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use driftwatch_core::{AppConfig, JobConfig, JobsFile};
use driftwatch_db::{
    complete_run, compute_diffs_for_run, compute_opportunities_for_run, create_run, fail_run,
    insert_snapshot,
};
use driftwatch_scraper::{
    canonicalize, category_from_url, fetch_listing_with_retry, PacingState, RetryPolicy,
    RunContext, SourceAdapter,
};

use crate::fail_run_best_effort;

/// A job descriptor with CLI overrides already applied.
#[derive(Debug, Clone)]
pub(super) struct JobPlan {
    pub job: JobConfig,
    pub rate_limit_ms: u64,
}

impl JobPlan {
    pub(super) fn new(
        job: &JobConfig,
        jobs_file: &JobsFile,
        max_products_override: Option<u32>,
        rate_limit_override: Option<u64>,
    ) -> Self {
        let mut job = job.clone();
        if let Some(max) = max_products_override {
            job.max_products = max.max(1);
        }
        let rate_limit_ms = rate_limit_override.unwrap_or_else(|| jobs_file.effective_rate_limit_ms(&job));
        Self { job, rate_limit_ms }
    }
}

/// What one job's run produced, for the command-level aggregation.
#[derive(Debug)]
pub(super) struct JobOutcome {
    pub run_id: Uuid,
    pub items_collected: u32,
    pub items_skipped: u32,
    pub units_failed: u32,
    /// `true` when no work unit of the run succeeded.
    pub run_failed: bool,
}

#[derive(Debug, Default)]
pub(super) struct JobTally {
    pub(super) items_collected: u32,
    pub(super) items_skipped: u32,
    pub(super) units_failed: u32,
    pub(super) units_succeeded: u32,
    pub(super) failures: Vec<String>,
}

/// Runs the full pipeline for one job: create run, collect pages, persist
/// snapshots, compute diffs, finish the run.
///
/// A failed work unit ends paging (there is no cursor to continue from) but
/// the run still completes with what it gathered; the run is marked failed
/// only when no unit succeeded at all.
pub(super) async fn collect_job<A: SourceAdapter>(
    pool: &sqlx::PgPool,
    adapter: &A,
    config: &AppConfig,
    plan: JobPlan,
    cancelled: Arc<AtomicBool>,
) -> anyhow::Result<JobOutcome> {
    let job_blob = serde_json::to_value(&plan.job)?;
    let category = category_from_url(&plan.job.category_url);
    let run = create_run(
        pool,
        &plan.job.platform,
        category.as_deref(),
        "cli",
        Some(&job_blob),
    )
    .await?;
    tracing::info!(run_id = %run.id, job = %plan.job.name, "starting collection run");

    match run_job_units(pool, adapter, config, &plan, run.id, &cancelled).await {
        Ok(tally) => {
            // Barrier: every snapshot insert above has completed before the
            // diff pass reads them back, and the scoring pass reads the
            // diffs the diff pass just wrote.
            let diffs = compute_diffs_for_run(pool, run.id).await?;
            let (scores, alerts) = compute_opportunities_for_run(pool, run.id).await?;
            let summary = build_run_summary(&tally);
            let run_failed = tally.units_succeeded == 0;

            if run_failed {
                fail_run(pool, run.id, &summary).await?;
                tracing::warn!(run_id = %run.id, job = %plan.job.name, "run failed: no work unit succeeded");
            } else {
                complete_run(
                    pool,
                    run.id,
                    i32::try_from(tally.items_collected).unwrap_or(i32::MAX),
                    &summary,
                )
                .await?;
                tracing::info!(
                    run_id = %run.id,
                    job = %plan.job.name,
                    items = tally.items_collected,
                    skipped = tally.items_skipped,
                    diffs,
                    scores,
                    alerts,
                    "run completed"
                );
            }

            Ok(JobOutcome {
                run_id: run.id,
                items_collected: tally.items_collected,
                items_skipped: tally.items_skipped,
                units_failed: tally.units_failed,
                run_failed,
            })
        }
        Err(e) => {
            fail_run_best_effort(pool, run.id, format!("{e:#}")).await;
            Err(e)
        }
    }
}

/// The page loop for one run. Returns the tally; database or adapter errors
/// outside the retry machinery propagate and fail the run.
async fn run_job_units<A: SourceAdapter>(
    pool: &sqlx::PgPool,
    adapter: &A,
    config: &AppConfig,
    plan: &JobPlan,
    run_id: Uuid,
    cancelled: &AtomicBool,
) -> anyhow::Result<JobTally> {
    let job = &plan.job;
    let ctx = RunContext {
        platform: job.platform.clone(),
        run_id,
        category: category_from_url(&job.category_url),
        observed_at: Utc::now(),
    };
    let policy = RetryPolicy {
        max_attempts: job_max_attempts(config.unit_max_retries),
        pace_base: Duration::from_millis(config.pacing_base_delay_ms),
        cooldown_base: Duration::from_secs(config.retry_cooldown_base_secs),
        cooldown_cap: Duration::from_secs(30 * 60),
    };

    let mut pacing = PacingState::new();
    let mut tally = JobTally::default();
    let mut page_token: Option<String> = None;
    let mut first_unit = true;

    loop {
        if tally.items_collected >= job.max_products {
            break;
        }
        if cancelled.load(Ordering::SeqCst) {
            tally.failures.push("collection interrupted".to_string());
            break;
        }
        if !first_unit {
            tokio::time::sleep(pacing.delay(Duration::from_millis(plan.rate_limit_ms))).await;
        }
        first_unit = false;

        let page = match fetch_listing_with_retry(
            adapter,
            &job.category_url,
            page_token.as_deref(),
            &mut pacing,
            &policy,
        )
        .await
        {
            Ok(page) => page,
            Err(unit_err) => {
                tally.units_failed += 1;
                tally.failures.push(unit_err.to_string());
                // No cursor to continue from once a page is surrendered.
                break;
            }
        };
        tally.units_succeeded += 1;

        for mut raw in page.items {
            if tally.items_collected >= job.max_products {
                break;
            }

            if job.detailed {
                tokio::time::sleep(
                    pacing.delay(Duration::from_millis(config.pacing_base_delay_ms)),
                )
                .await;
                match adapter.fetch_detail(&raw).await {
                    Ok(detail) => raw.merge_detail(detail),
                    Err(e) => {
                        // Item keeps its listing-card facts.
                        tracing::debug!(run_id = %run_id, error = %e, "detail fetch failed, keeping listing facts");
                    }
                }
            }

            match canonicalize(&raw, &ctx) {
                Ok(snapshot) => {
                    insert_snapshot(pool, &snapshot).await?;
                    tally.items_collected += 1;
                }
                Err(e) => {
                    tally.items_skipped += 1;
                    tracing::warn!(run_id = %run_id, error = %e, "skipping malformed observation");
                }
            }
        }

        page_token = page.next_page_token;
        if page_token.is_none() {
            break;
        }
    }

    Ok(tally)
}

/// Total attempts per work unit; the configured value is already a total but
/// is clamped so a zero never disables the first attempt.
fn job_max_attempts(configured: u32) -> u32 {
    configured.max(1)
}

pub(super) fn build_run_summary(tally: &JobTally) -> Value {
    json!({
        "items_collected": tally.items_collected,
        "items_skipped": tally.items_skipped,
        "units_failed": tally.units_failed,
        "failures": tally.failures,
    })
}

#[cfg(test)]
#[path = "job_test.rs"]
mod tests;
