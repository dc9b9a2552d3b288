//! Run export: one serializable document carrying a run, its snapshots, and
//! its diffs.

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use driftwatch_core::{ProductDiff, ProductSnapshot};

use crate::diffs::list_diffs_for_run;
use crate::runs::{get_run, RunRow};
use crate::snapshots::list_snapshots_for_run;
use crate::DbError;

/// Complete export of one collection run.
#[derive(Debug, Serialize)]
pub struct RunExport {
    pub run: RunRow,
    pub snapshots: Vec<ProductSnapshot>,
    pub diffs: Vec<ProductDiff>,
}

/// Loads a run with all of its snapshots and diffs.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the run does not exist, or
/// [`DbError::Sqlx`] if any query fails.
pub async fn export_run(pool: &PgPool, run_id: Uuid) -> Result<RunExport, DbError> {
    let run = get_run(pool, run_id).await?;
    let snapshots = list_snapshots_for_run(pool, run_id)
        .await?
        .into_iter()
        .map(ProductSnapshot::from)
        .collect();
    let diffs = list_diffs_for_run(pool, run_id)
        .await?
        .into_iter()
        .map(ProductDiff::from)
        .collect();

    Ok(RunExport {
        run,
        snapshots,
        diffs,
    })
}
