//! Canonical product snapshot model shared by the scraper and persistence layers.
//!
//! A [`ProductSnapshot`] is the immutable fact set observed for one product
//! during one collection run. The content hash over its fact fields is the
//! cheap equality test used by diff computation; identifiers, the owning run,
//! and the observation timestamp are excluded so that two observations of
//! identical facts hash identically regardless of when they were collected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Reliability tier attached to a derived revenue estimate.
///
/// Ordered: `Low < Med < High`, so downstream consumers can filter with a
/// simple comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevenueConfidence {
    Low,
    Med,
    High,
}

impl RevenueConfidence {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RevenueConfidence::Low => "low",
            RevenueConfidence::Med => "med",
            RevenueConfidence::High => "high",
        }
    }

    /// Parses the stored text form. Unrecognized values fall back to `Low`,
    /// matching the column default.
    #[must_use]
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "high" => RevenueConfidence::High,
            "med" => RevenueConfidence::Med,
            _ => RevenueConfidence::Low,
        }
    }
}

impl std::fmt::Display for RevenueConfidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical snapshot of a marketplace product at a point in time.
///
/// Uniquely keyed by `(platform, product_id, run_id)` in storage; never
/// mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub platform: String,
    /// Platform-specific product identifier (e.g. the URL slug on Gumroad).
    pub product_id: String,
    /// The collection run that produced this observation.
    pub run_id: Uuid,
    pub url: String,
    pub title: String,
    pub creator_name: Option<String>,
    pub creator_url: Option<String>,
    pub category: Option<String>,
    pub price_amount: Option<f64>,
    /// ISO 4217 currency code when one could be determined.
    pub price_currency: Option<String>,
    /// `true` for pay-what-you-want listings; `price_amount` then carries the
    /// listed minimum, if any.
    pub price_is_pwyw: bool,
    pub rating_avg: Option<f64>,
    pub rating_count: Option<i32>,
    /// Not always observable; listing cards frequently omit it.
    pub sales_count: Option<i32>,
    pub revenue_estimate: Option<f64>,
    pub revenue_confidence: RevenueConfidence,
    pub tags: Vec<String>,
    pub observed_at: DateTime<Utc>,
    /// SHA-256 over the canonical fact serialization; see [`Self::compute_content_hash`].
    pub content_hash: String,
}

/// The fact fields that participate in the content hash, serialized in a
/// fixed declaration order. Identifiers (`platform`, `product_id`), the run
/// reference, and `observed_at` are deliberately absent.
#[derive(Serialize)]
struct SnapshotFacts<'a> {
    url: &'a str,
    title: &'a str,
    creator_name: Option<&'a str>,
    creator_url: Option<&'a str>,
    category: Option<&'a str>,
    price_amount: Option<f64>,
    price_currency: Option<&'a str>,
    price_is_pwyw: bool,
    rating_avg: Option<f64>,
    rating_count: Option<i32>,
    sales_count: Option<i32>,
    revenue_estimate: Option<f64>,
    revenue_confidence: &'a str,
    tags: &'a [String],
}

impl ProductSnapshot {
    /// Computes the deterministic hash of the fact fields.
    ///
    /// Two snapshots with identical facts hash identically regardless of
    /// collection time or owning run.
    #[must_use]
    pub fn compute_content_hash(&self) -> String {
        let facts = SnapshotFacts {
            url: &self.url,
            title: &self.title,
            creator_name: self.creator_name.as_deref(),
            creator_url: self.creator_url.as_deref(),
            category: self.category.as_deref(),
            price_amount: self.price_amount,
            price_currency: self.price_currency.as_deref(),
            price_is_pwyw: self.price_is_pwyw,
            rating_avg: self.rating_avg,
            rating_count: self.rating_count,
            sales_count: self.sales_count,
            revenue_estimate: self.revenue_estimate,
            revenue_confidence: self.revenue_confidence.as_str(),
            tags: &self.tags,
        };
        // Struct serialization order is fixed at compile time, so the JSON
        // byte stream is canonical without any key sorting.
        let serialized =
            serde_json::to_string(&facts).expect("snapshot facts serialize infallibly");
        format!("{:x}", Sha256::digest(serialized.as_bytes()))
    }

    /// Fills in `content_hash` from the current fact fields and returns `self`.
    #[must_use]
    pub fn with_content_hash(mut self) -> Self {
        self.content_hash = self.compute_content_hash();
        self
    }
}

/// Estimates gross revenue for a listing and tags the estimate with a
/// confidence tier.
///
/// The estimate is `price_amount * sales_count`, present only when both
/// inputs are known and the price is a fixed amount (not pay-what-you-want).
/// A number is never fabricated from uncertain inputs; the confidence tier is
/// always reported so consumers can filter:
///
/// - `High` — estimate present and the currency is USD.
/// - `Med` — estimate present but the currency is non-USD or unknown, or the
///   estimate is absent solely because the listing is PWYW while both inputs
///   were observed.
/// - `Low` — price or sales count missing.
#[must_use]
pub fn estimate_revenue(
    price_amount: Option<f64>,
    sales_count: Option<i32>,
    price_is_pwyw: bool,
    price_currency: Option<&str>,
) -> (Option<f64>, RevenueConfidence) {
    let (Some(price), Some(sales)) = (price_amount, sales_count) else {
        return (None, RevenueConfidence::Low);
    };

    if price_is_pwyw {
        // The sticker price is a floor, not what buyers paid.
        return (None, RevenueConfidence::Med);
    }

    let estimate = round2(price * f64::from(sales));
    let confidence = match price_currency {
        Some("USD") => RevenueConfidence::High,
        _ => RevenueConfidence::Med,
    };
    (Some(estimate), confidence)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_snapshot() -> ProductSnapshot {
        ProductSnapshot {
            platform: "gumroad".to_string(),
            product_id: "notion-dashboard".to_string(),
            run_id: Uuid::new_v4(),
            url: "https://gumroad.com/l/notion-dashboard".to_string(),
            title: "Notion Dashboard Kit".to_string(),
            creator_name: Some("Ada".to_string()),
            creator_url: Some("https://gumroad.com/ada".to_string()),
            category: Some("design".to_string()),
            price_amount: Some(25.0),
            price_currency: Some("USD".to_string()),
            price_is_pwyw: false,
            rating_avg: Some(4.8),
            rating_count: Some(123),
            sales_count: Some(10),
            revenue_estimate: Some(250.0),
            revenue_confidence: RevenueConfidence::High,
            tags: vec!["notion".to_string(), "productivity".to_string()],
            observed_at: Utc::now(),
            content_hash: String::new(),
        }
        .with_content_hash()
    }

    #[test]
    fn content_hash_is_deterministic() {
        let snapshot = make_snapshot();
        assert_eq!(snapshot.content_hash, snapshot.compute_content_hash());
        assert_eq!(snapshot.content_hash.len(), 64);
    }

    #[test]
    fn content_hash_ignores_run_and_timestamp() {
        let a = make_snapshot();
        let mut b = a.clone();
        b.run_id = Uuid::new_v4();
        b.observed_at = b.observed_at + chrono::Duration::hours(6);
        assert_eq!(a.content_hash, b.compute_content_hash());
    }

    #[test]
    fn content_hash_ignores_identifiers() {
        let a = make_snapshot();
        let mut b = a.clone();
        b.platform = "whop".to_string();
        b.product_id = "other".to_string();
        assert_eq!(a.content_hash, b.compute_content_hash());
    }

    #[test]
    fn content_hash_changes_when_price_changes() {
        let a = make_snapshot();
        let mut b = a.clone();
        b.price_amount = Some(30.0);
        assert_ne!(a.content_hash, b.compute_content_hash());
    }

    #[test]
    fn content_hash_changes_when_tags_change() {
        let a = make_snapshot();
        let mut b = a.clone();
        b.tags.push("templates".to_string());
        assert_ne!(a.content_hash, b.compute_content_hash());
    }

    #[test]
    fn content_hash_changes_when_rating_count_changes() {
        let a = make_snapshot();
        let mut b = a.clone();
        b.rating_count = Some(124);
        assert_ne!(a.content_hash, b.compute_content_hash());
    }

    #[test]
    fn revenue_fixed_price_usd_is_high_confidence() {
        let (estimate, confidence) = estimate_revenue(Some(25.0), Some(10), false, Some("USD"));
        assert_eq!(estimate, Some(250.0));
        assert_eq!(confidence, RevenueConfidence::High);
    }

    #[test]
    fn revenue_non_usd_currency_downgrades_to_med() {
        let (estimate, confidence) = estimate_revenue(Some(20.0), Some(5), false, Some("EUR"));
        assert_eq!(estimate, Some(100.0));
        assert_eq!(confidence, RevenueConfidence::Med);
    }

    #[test]
    fn revenue_unknown_currency_downgrades_to_med() {
        let (estimate, confidence) = estimate_revenue(Some(20.0), Some(5), false, None);
        assert_eq!(estimate, Some(100.0));
        assert_eq!(confidence, RevenueConfidence::Med);
    }

    #[test]
    fn revenue_missing_sales_is_null_and_low() {
        let (estimate, confidence) = estimate_revenue(Some(25.0), None, false, Some("USD"));
        assert_eq!(estimate, None);
        assert_eq!(confidence, RevenueConfidence::Low);
    }

    #[test]
    fn revenue_missing_price_is_null_and_low() {
        let (estimate, confidence) = estimate_revenue(None, Some(5), true, None);
        assert_eq!(estimate, None);
        assert_eq!(confidence, RevenueConfidence::Low);
    }

    #[test]
    fn revenue_pwyw_with_both_inputs_is_null_and_med() {
        let (estimate, confidence) = estimate_revenue(Some(5.0), Some(40), true, Some("USD"));
        assert_eq!(estimate, None);
        assert_eq!(confidence, RevenueConfidence::Med);
    }

    #[test]
    fn revenue_rounds_to_cents() {
        let (estimate, _) = estimate_revenue(Some(9.99), Some(3), false, Some("USD"));
        assert_eq!(estimate, Some(29.97));
    }

    #[test]
    fn confidence_ordering_is_low_med_high() {
        assert!(RevenueConfidence::Low < RevenueConfidence::Med);
        assert!(RevenueConfidence::Med < RevenueConfidence::High);
    }

    #[test]
    fn confidence_db_round_trip() {
        for c in [
            RevenueConfidence::Low,
            RevenueConfidence::Med,
            RevenueConfidence::High,
        ] {
            assert_eq!(RevenueConfidence::from_db_str(c.as_str()), c);
        }
        assert_eq!(
            RevenueConfidence::from_db_str("garbage"),
            RevenueConfidence::Low
        );
    }
}
