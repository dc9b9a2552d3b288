//! Collection command: job selection, bounded-concurrency orchestration, and
//! final aggregation.
//!
//! Each selected job gets its own run row and its own pacing state. Per-job
//! failures are recorded and reported; the command itself only errors when
//! every selected job fails.

mod job;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::bail;
use clap::Args;
use futures::stream::{self, StreamExt};

use driftwatch_core::{load_jobs, pick_jobs, AppConfig, Schedule};
use driftwatch_scraper::GumroadClient;

use job::JobPlan;

#[derive(Debug, Args)]
pub struct CollectArgs {
    /// Restrict to a schedule bucket: all, daily, or realtime
    #[arg(long, default_value = "all")]
    pub schedule: String,

    /// Comma-separated job names to run (default: all selected by schedule)
    #[arg(long)]
    pub jobs: Option<String>,

    /// Override max products for every selected job
    #[arg(long)]
    pub max_products: Option<u32>,

    /// Override the inter-request delay in milliseconds for every job
    #[arg(long)]
    pub rate_limit: Option<u64>,

    /// Preview the selected jobs without collecting or writing
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_schedule(value: &str) -> anyhow::Result<Option<Schedule>> {
    match value {
        "all" => Ok(None),
        "daily" => Ok(Some(Schedule::Daily)),
        "realtime" => Ok(Some(Schedule::Realtime)),
        other => bail!("unknown schedule \"{other}\"; expected all, daily, or realtime"),
    }
}

fn parse_job_filter(value: Option<&str>) -> Option<HashSet<String>> {
    let names: HashSet<String> = value?
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(ToString::to_string)
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

/// Runs the collection pipeline for every job selected by the arguments.
///
/// The database pool is connected only once a real collection is about to
/// start; `--dry-run` previews the selection without touching the database.
///
/// # Errors
///
/// Returns an error if the jobs file is invalid, the database is
/// unreachable, the adapter cannot be constructed, or every selected job
/// fails its run.
pub(crate) async fn run_collect(config: &AppConfig, args: &CollectArgs) -> anyhow::Result<()> {
    let jobs_file = load_jobs(&config.jobs_path)?;
    let schedule = parse_schedule(&args.schedule)?;
    let names = parse_job_filter(args.jobs.as_deref());

    let plans: Vec<JobPlan> = pick_jobs(&jobs_file, schedule, names.as_ref())
        .into_iter()
        .map(|j| JobPlan::new(j, &jobs_file, args.max_products, args.rate_limit))
        .collect();

    if plans.is_empty() {
        println!("no jobs match the given schedule/name filters; nothing to do");
        return Ok(());
    }

    if args.dry_run {
        println!("dry-run: would collect {} jobs:", plans.len());
        for plan in &plans {
            println!(
                "  {} ({}, max {} products, {}ms between requests)",
                plan.job.name, plan.job.schedule, plan.job.max_products, plan.rate_limit_ms
            );
        }
        return Ok(());
    }

    let pool = crate::init_pool(config).await?;
    let adapter = GumroadClient::new(
        config.adapter_request_timeout_secs,
        &config.adapter_user_agent,
    )?;

    // Ctrl-C requests a graceful stop: in-flight work units finish, then each
    // job wraps up its run with whatever it collected.
    let cancelled = Arc::new(AtomicBool::new(false));
    {
        let cancelled = Arc::clone(&cancelled);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, stopping after in-flight work units");
                cancelled.store(true, Ordering::SeqCst);
            }
        });
    }

    let max_concurrent = config.max_concurrent_jobs.clamp(1, 4);
    let job_count = plans.len();

    let outcomes: Vec<(String, anyhow::Result<job::JobOutcome>)> = stream::iter(plans)
        .map(|plan| {
            let pool = &pool;
            let adapter = &adapter;
            let cancelled = Arc::clone(&cancelled);
            async move {
                let name = plan.job.name.clone();
                let outcome = job::collect_job(pool, adapter, config, plan, cancelled).await;
                (name, outcome)
            }
        })
        .buffer_unordered(max_concurrent)
        .collect()
        .await;

    let mut total_collected: u64 = 0;
    let mut failed_jobs = 0usize;
    for (name, outcome) in &outcomes {
        match outcome {
            Ok(o) if o.run_failed => {
                tracing::warn!(job = %name, run_id = %o.run_id, "job run failed");
                failed_jobs += 1;
            }
            Ok(o) => {
                total_collected += u64::from(o.items_collected);
                println!(
                    "{}: run {} collected {} products ({} skipped, {} units failed)",
                    name, o.run_id, o.items_collected, o.items_skipped, o.units_failed
                );
            }
            Err(e) => {
                tracing::error!(job = %name, error = %e, "unexpected error collecting job");
                failed_jobs += 1;
            }
        }
    }

    if failed_jobs > 0 {
        tracing::warn!(failed_jobs, total_jobs = job_count, "some jobs failed");
    }
    if failed_jobs == job_count {
        bail!("all {failed_jobs} jobs failed collection");
    }

    println!("collected {total_collected} products across {job_count} jobs");
    Ok(())
}

#[cfg(test)]
#[path = "collect_test.rs"]
mod tests;
