//! Delta computation between a product's snapshots in consecutive runs.
//!
//! A diff is derived data: it can be recomputed at any time from the two
//! snapshots it references and is never a source of truth. The persistence
//! layer upserts diffs on `(platform, product_id, run_id)` so recomputation
//! is idempotent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::snapshot::{round2, ProductSnapshot};

/// The computed delta between a product's current snapshot and its snapshot
/// in the previous run, or a first-sighting record when no prior snapshot
/// exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDiff {
    pub platform: String,
    pub product_id: String,
    pub run_id: Uuid,
    /// `None` for a product seen for the first time.
    pub previous_run_id: Option<Uuid>,
    pub price_delta: Option<f64>,
    pub rating_count_delta: Option<i32>,
    pub sales_count_delta: Option<i32>,
    pub revenue_delta: Option<f64>,
    /// Whether the content hashes of the two snapshots differ.
    pub raw_source_changed: bool,
    pub computed_at: DateTime<Utc>,
}

impl ProductDiff {
    /// Returns `true` when this diff records a product with no prior snapshot.
    #[must_use]
    pub fn is_first_sighting(&self) -> bool {
        self.previous_run_id.is_none()
    }
}

/// Computes the diff for `current` against an optional `previous` snapshot of
/// the same product identity.
///
/// A missing previous snapshot is not an error: the result is a
/// first-sighting diff with a null previous-run reference and null deltas.
/// Each numeric delta is `current - previous`, null when either side is null.
#[must_use]
pub fn compute_product_diff(
    current: &ProductSnapshot,
    previous: Option<&ProductSnapshot>,
) -> ProductDiff {
    let (previous_run_id, price_delta, rating_count_delta, sales_count_delta, revenue_delta, changed) =
        match previous {
            Some(prev) => (
                Some(prev.run_id),
                delta_f64(prev.price_amount, current.price_amount),
                delta_i32(prev.rating_count, current.rating_count),
                delta_i32(prev.sales_count, current.sales_count),
                delta_f64(prev.revenue_estimate, current.revenue_estimate),
                prev.content_hash != current.content_hash,
            ),
            None => (None, None, None, None, None, false),
        };

    ProductDiff {
        platform: current.platform.clone(),
        product_id: current.product_id.clone(),
        run_id: current.run_id,
        previous_run_id,
        price_delta,
        rating_count_delta,
        sales_count_delta,
        revenue_delta,
        raw_source_changed: changed,
        computed_at: Utc::now(),
    }
}

fn delta_f64(previous: Option<f64>, current: Option<f64>) -> Option<f64> {
    match (previous, current) {
        (Some(p), Some(c)) => Some(round2(c - p)),
        _ => None,
    }
}

fn delta_i32(previous: Option<i32>, current: Option<i32>) -> Option<i32> {
    match (previous, current) {
        (Some(p), Some(c)) => Some(c - p),
        _ => None,
    }
}
