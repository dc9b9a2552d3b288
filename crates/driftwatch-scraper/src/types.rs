//! Raw observation shapes returned by source adapters.
//!
//! These are deliberately loose: every field a listing card may or may not
//! carry is optional, and free-text fields (`price_text`, `rating_text`,
//! `sales_text`) stay unparsed until canonicalization.

use serde::{Deserialize, Serialize};

/// One unnormalized product observation from a listing page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawObservation {
    /// Platform-specific identifier, when the listing exposes one directly.
    /// Absent identifiers are derived from the URL during canonicalization.
    pub product_id: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub creator_name: Option<String>,
    pub creator_url: Option<String>,
    /// Free-text price as rendered, e.g. `"$25"`, `"€12.50"`, `"$0+"`.
    pub price_text: Option<String>,
    /// Free-text rating, e.g. `"4.8 (123)"`.
    pub rating_text: Option<String>,
    /// Free-text sales count, e.g. `"1.2K sales"`.
    pub sales_text: Option<String>,
    pub tags: Vec<String>,
}

impl RawObservation {
    /// Folds a per-product detail fetch into this observation.
    ///
    /// Detail values win for the sparse fields (listing cards omit sales far
    /// more often than detail pages do); tags are unioned.
    pub fn merge_detail(&mut self, detail: RawObservationDetail) {
        if detail.sales_text.is_some() {
            self.sales_text = detail.sales_text;
        }
        if detail.rating_text.is_some() {
            self.rating_text = detail.rating_text;
        }
        for tag in detail.tags {
            if !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
    }
}

/// Extra facts available only on a product's own page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawObservationDetail {
    pub rating_text: Option<String>,
    pub sales_text: Option<String>,
    pub tags: Vec<String>,
}

/// One page of listing results plus the cursor for the next page, if any.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub items: Vec<RawObservation>,
    pub next_page_token: Option<String>,
}
