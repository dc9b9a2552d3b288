//! Read-side commands: run listing, diff recomputation, opportunity
//! reporting, and export.

use std::path::Path;

use anyhow::Context;
use uuid::Uuid;

use driftwatch_db::{
    compute_diffs_for_run, compute_opportunities_for_run, export_run, list_runs,
    list_scores_for_run,
};

/// Recomputes the diffs and opportunity scores of an existing run. Safe to
/// repeat; both are upserted on their unique keys and the run's alerts are
/// replaced wholesale.
pub(crate) async fn run_diff(pool: &sqlx::PgPool, run_id: Uuid) -> anyhow::Result<()> {
    let written = compute_diffs_for_run(pool, run_id)
        .await
        .with_context(|| format!("computing diffs for run {run_id}"))?;
    let (scores, alerts) = compute_opportunities_for_run(pool, run_id)
        .await
        .with_context(|| format!("scoring run {run_id}"))?;
    println!("computed {written} diffs, {scores} scores, {alerts} alerts for run {run_id}");
    Ok(())
}

/// Prints a run's best-scored products, one line per product.
pub(crate) async fn run_opportunities(
    pool: &sqlx::PgPool,
    run_id: Uuid,
    limit: i64,
) -> anyhow::Result<()> {
    let scores = list_scores_for_run(pool, run_id, limit.max(1))
        .await
        .with_context(|| format!("listing scores for run {run_id}"))?;
    if scores.is_empty() {
        println!("no opportunity scores recorded for run {run_id}");
        return Ok(());
    }

    for score in scores {
        let price = score
            .price_amount
            .map_or_else(|| "-".to_string(), |p| format!("${p:.2}"));
        println!(
            "{:>5.1}  [{}]  {}  {}  {}",
            score.opportunity_score, score.confidence, price, score.title, score.reason_summary
        );
    }
    Ok(())
}

/// Exports a run with its snapshots and diffs as one JSON document.
pub(crate) async fn run_export(
    pool: &sqlx::PgPool,
    run_id: Uuid,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let export = export_run(pool, run_id)
        .await
        .with_context(|| format!("exporting run {run_id}"))?;
    let document = serde_json::to_string_pretty(&export)?;

    match out {
        Some(path) => {
            std::fs::write(path, document)
                .with_context(|| format!("writing export to {}", path.display()))?;
            println!(
                "exported run {run_id} ({} snapshots, {} diffs) to {}",
                export.snapshots.len(),
                export.diffs.len(),
                path.display()
            );
        }
        None => println!("{document}"),
    }
    Ok(())
}

/// Prints the most recent runs, newest first.
pub(crate) async fn run_list(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = list_runs(pool, limit.max(1)).await?;
    if runs.is_empty() {
        println!("no runs recorded yet");
        return Ok(());
    }

    for run in runs {
        let totals = run
            .total_products
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        println!(
            "{}  {}  {:>9}  {}  category={}  products={}",
            run.id,
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.status,
            run.platform,
            run.category.as_deref().unwrap_or("-"),
            totals
        );
    }
    Ok(())
}
