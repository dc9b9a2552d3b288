//! The seam between the pipeline and a concrete marketplace.
//!
//! The orchestrator, resilience layer, and canonicalizer only ever see this
//! trait, so adding a platform means writing one adapter and a jobs-file
//! entry. Adapter futures are driven on a single task per job, so the trait
//! does not require `Send` futures.

use serde_json::Value;

use crate::error::AdapterError;
use crate::types::{ListingPage, RawObservation, RawObservationDetail};

/// A source of raw product observations for one marketplace platform.
#[allow(async_fn_in_trait)]
pub trait SourceAdapter {
    /// Stable platform key recorded on every run and snapshot, e.g.
    /// `"gumroad"`.
    fn platform(&self) -> &str;

    /// Fetches one page of a category listing.
    ///
    /// `page_token` is `None` for the first page; subsequent pages pass the
    /// token returned in the previous [`ListingPage`].
    async fn fetch_listing(
        &self,
        category_url: &str,
        page_token: Option<&str>,
    ) -> Result<ListingPage, AdapterError>;

    /// Fetches per-product facts only available on the product's own page.
    async fn fetch_detail(
        &self,
        observation: &RawObservation,
    ) -> Result<RawObservationDetail, AdapterError>;

    /// Best-effort capture of whatever the source returned when a fetch
    /// failed, for logging. Never load-bearing; errors here are swallowed by
    /// the caller.
    async fn capture_diagnostics(&self, category_url: &str) -> Result<Value, AdapterError>;
}
