//! Retry and cooldown handling around listing fetches.
//!
//! One "work unit" is a single listing-page fetch. A unit attempt fails on a
//! transport or status error, and also when the page parses cleanly but
//! contains zero products: an empty category page usually means the source
//! has quietly started serving a stripped response, so it is retried like
//! any other transient failure. After the attempt budget is exhausted the
//! unit is surrendered as a [`UnitError`] and the run moves on.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{AdapterError, UnitError};
use crate::pacing::PacingState;
use crate::source::SourceAdapter;
use crate::types::ListingPage;

/// Retry budget and backoff shape for a single work unit.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per unit, including the first.
    pub max_attempts: u32,
    /// Base delay slept before every attempt after the first, scaled by the
    /// current pacing multiplier.
    pub pace_base: Duration,
    /// Exponential cooldown base between attempts.
    pub cooldown_base: Duration,
    /// Cooldown ceiling; the exponential curve is clamped here.
    pub cooldown_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            pace_base: Duration::from_millis(500),
            cooldown_base: Duration::from_secs(5),
            cooldown_cap: Duration::from_secs(1800),
        }
    }
}

impl RetryPolicy {
    /// Cooldown before retry number `attempt` (1-based over completed
    /// failures), with +/-25% jitter so parallel jobs do not retry in
    /// lockstep.
    #[must_use]
    pub fn cooldown_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.min(16);
        let capped = self
            .cooldown_base
            .saturating_mul(2u32.saturating_pow(exp.saturating_sub(1)))
            .min(self.cooldown_cap);
        capped.mul_f64(rand::random::<f64>() * 0.5 + 0.75)
    }
}

/// Fetches one listing page through the full retry/pacing machinery.
///
/// Every attempt after the first of a unit waits the paced base delay
/// (`pace_base * multiplier`) plus the exponential cooldown. On every
/// successful attempt `pacing` is relaxed; on every failed attempt it is
/// tightened, so both the intra-unit waits and the delay the orchestrator
/// applies between units reflect how hostile the source has been recently.
pub async fn fetch_listing_with_retry<A: SourceAdapter>(
    adapter: &A,
    category_url: &str,
    page_token: Option<&str>,
    pacing: &mut PacingState,
    policy: &RetryPolicy,
) -> Result<ListingPage, UnitError> {
    let mut last_reason = String::new();

    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            tokio::time::sleep(pacing.delay(policy.pace_base)).await;
            let cooldown = policy.cooldown_for_attempt(attempt - 1);
            debug!(
                attempt,
                cooldown_ms = cooldown.as_millis() as u64,
                category_url,
                "cooling down before retry"
            );
            tokio::time::sleep(cooldown).await;
        }

        match adapter.fetch_listing(category_url, page_token).await {
            Ok(page) if page.items.is_empty() => {
                last_reason = "listing page returned zero products (suspected soft block)"
                    .to_string();
                warn!(attempt, category_url, "empty listing page, treating as soft block");
                pacing.record_failure();
                if attempt == 1 {
                    capture_diagnostics(adapter, category_url).await;
                }
            }
            Ok(page) => {
                pacing.record_success();
                return Ok(page);
            }
            Err(err) => {
                last_reason = err.to_string();
                warn!(attempt, category_url, error = %err, "listing fetch failed");
                pacing.record_failure();
                if attempt == 1 {
                    capture_diagnostics(adapter, category_url).await;
                }
                if let AdapterError::RateLimited { retry_after_secs } = err {
                    let wait = Duration::from_secs(retry_after_secs).min(policy.cooldown_cap);
                    debug!(retry_after_secs, "honoring Retry-After before cooldown");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    Err(UnitError {
        attempts: policy.max_attempts,
        reason: last_reason,
    })
}

async fn capture_diagnostics<A: SourceAdapter>(adapter: &A, category_url: &str) {
    match adapter.capture_diagnostics(category_url).await {
        Ok(detail) => debug!(category_url, %detail, "source diagnostics"),
        Err(err) => debug!(category_url, error = %err, "diagnostics capture failed"),
    }
}
