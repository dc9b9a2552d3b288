//! Turns raw adapter observations into canonical snapshots.
//!
//! This is the only place raw free-text fields get parsed. Canonicalization
//! is pure: given the same observation and run context it always produces
//! the same snapshot (including the content hash), which is what makes diff
//! computation trustworthy.

use chrono::{DateTime, Utc};
use driftwatch_core::{estimate_revenue, ProductSnapshot};
use uuid::Uuid;

use crate::error::AdapterError;
use crate::extract::{extract_price, extract_rating, extract_sales};
use crate::types::RawObservation;

/// Run-scoped identity stamped onto every snapshot.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub platform: String,
    pub run_id: Uuid,
    pub category: Option<String>,
    /// One timestamp per run so all snapshots in a run sort together.
    pub observed_at: DateTime<Utc>,
}

/// Canonicalizes one observation, or rejects it as malformed.
///
/// `url` and `title` are required; everything else degrades to `None`. A
/// missing `product_id` is derived from the last path segment of the URL, so
/// the same product keeps the same identity across runs even when the source
/// stops exposing an explicit id.
pub fn canonicalize(
    raw: &RawObservation,
    ctx: &RunContext,
) -> Result<ProductSnapshot, AdapterError> {
    let url = raw
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(AdapterError::Malformed { field: "url" })?;
    let title = raw
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AdapterError::Malformed { field: "title" })?;

    let product_id = match raw.product_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => product_id_from_url(url).ok_or(AdapterError::Malformed { field: "product_id" })?,
    };

    let price = raw.price_text.as_deref().and_then(extract_price);
    let (price_amount, price_currency, price_is_pwyw) = match price {
        Some(p) => (p.amount, p.currency, p.is_pwyw),
        None => (None, None, false),
    };

    let (rating_avg, rating_count) = raw
        .rating_text
        .as_deref()
        .map_or((None, None), extract_rating);
    let sales_count = raw.sales_text.as_deref().and_then(extract_sales);

    let (revenue_estimate, revenue_confidence) = estimate_revenue(
        price_amount,
        sales_count,
        price_is_pwyw,
        price_currency.as_deref(),
    );

    let mut tags: Vec<String> = raw
        .tags
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    tags.dedup();

    Ok(ProductSnapshot {
        platform: ctx.platform.clone(),
        product_id,
        run_id: ctx.run_id,
        url: url.to_string(),
        title: title.to_string(),
        creator_name: clean_opt(raw.creator_name.as_deref()),
        creator_url: clean_opt(raw.creator_url.as_deref()),
        category: ctx.category.clone(),
        price_amount,
        price_currency,
        price_is_pwyw,
        rating_avg,
        rating_count,
        sales_count,
        revenue_estimate,
        revenue_confidence,
        tags,
        observed_at: ctx.observed_at,
        content_hash: String::new(),
    }
    .with_content_hash())
}

fn clean_opt(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Pulls the `category` query parameter out of a listing URL, when present.
/// Percent-encoded values are decoded.
#[must_use]
pub fn category_from_url(category_url: &str) -> Option<String> {
    let url = reqwest::Url::parse(category_url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key.as_ref() == "category")
        .map(|(_, value)| value.into_owned())
        .filter(|v| !v.is_empty())
}

/// Last non-empty path segment of the listing URL, minus any query string.
fn product_id_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|seg| !seg.is_empty() && !seg.contains('.'))
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use driftwatch_core::RevenueConfidence;

    use super::*;

    fn ctx() -> RunContext {
        RunContext {
            platform: "gumroad".to_string(),
            run_id: Uuid::new_v4(),
            category: Some("design".to_string()),
            observed_at: Utc::now(),
        }
    }

    fn full_observation() -> RawObservation {
        RawObservation {
            product_id: Some("abc123".to_string()),
            url: Some("https://gumroad.com/l/abc123".to_string()),
            title: Some("Icon Pack".to_string()),
            creator_name: Some("Ada".to_string()),
            creator_url: Some("https://gumroad.com/ada".to_string()),
            price_text: Some("$25".to_string()),
            rating_text: Some("4.8 (123)".to_string()),
            sales_text: Some("10 sales".to_string()),
            tags: vec!["icons".to_string()],
        }
    }

    #[test]
    fn full_observation_canonicalizes() {
        let snapshot = canonicalize(&full_observation(), &ctx()).unwrap();
        assert_eq!(snapshot.product_id, "abc123");
        assert_eq!(snapshot.price_amount, Some(25.0));
        assert_eq!(snapshot.price_currency.as_deref(), Some("USD"));
        assert_eq!(snapshot.rating_avg, Some(4.8));
        assert_eq!(snapshot.rating_count, Some(123));
        assert_eq!(snapshot.sales_count, Some(10));
        assert_eq!(snapshot.revenue_estimate, Some(250.0));
        assert_eq!(snapshot.revenue_confidence, RevenueConfidence::High);
        assert_eq!(snapshot.category.as_deref(), Some("design"));
        assert_eq!(snapshot.content_hash.len(), 64);
    }

    #[test]
    fn missing_url_is_malformed() {
        let mut raw = full_observation();
        raw.url = None;
        let err = canonicalize(&raw, &ctx()).unwrap_err();
        assert!(matches!(err, AdapterError::Malformed { field: "url" }));
    }

    #[test]
    fn missing_title_is_malformed() {
        let mut raw = full_observation();
        raw.title = Some("   ".to_string());
        let err = canonicalize(&raw, &ctx()).unwrap_err();
        assert!(matches!(err, AdapterError::Malformed { field: "title" }));
    }

    #[test]
    fn product_id_derived_from_url() {
        let mut raw = full_observation();
        raw.product_id = None;
        raw.url = Some("https://gumroad.com/l/notion-kit?ref=feed".to_string());
        let snapshot = canonicalize(&raw, &ctx()).unwrap();
        assert_eq!(snapshot.product_id, "notion-kit");
    }

    #[test]
    fn trailing_slash_does_not_break_derived_id() {
        let mut raw = full_observation();
        raw.product_id = None;
        raw.url = Some("https://gumroad.com/l/notion-kit/".to_string());
        let snapshot = canonicalize(&raw, &ctx()).unwrap();
        assert_eq!(snapshot.product_id, "notion-kit");
    }

    #[test]
    fn sparse_observation_degrades_to_nulls() {
        let raw = RawObservation {
            url: Some("https://gumroad.com/l/mystery".to_string()),
            title: Some("Mystery Box".to_string()),
            ..RawObservation::default()
        };
        let snapshot = canonicalize(&raw, &ctx()).unwrap();
        assert_eq!(snapshot.price_amount, None);
        assert_eq!(snapshot.rating_avg, None);
        assert_eq!(snapshot.sales_count, None);
        assert_eq!(snapshot.revenue_estimate, None);
        assert_eq!(snapshot.revenue_confidence, RevenueConfidence::Low);
        assert!(!snapshot.price_is_pwyw);
    }

    #[test]
    fn canonicalization_is_deterministic() {
        let context = ctx();
        let a = canonicalize(&full_observation(), &context).unwrap();
        let b = canonicalize(&full_observation(), &context).unwrap();
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn category_extracted_from_listing_url() {
        assert_eq!(
            category_from_url("https://gumroad.com/discover?category=design&sort=hot"),
            Some("design".to_string())
        );
        assert_eq!(
            category_from_url("https://gumroad.com/discover?category=web%20design"),
            Some("web design".to_string())
        );
    }

    #[test]
    fn category_absent_when_url_has_none() {
        assert_eq!(category_from_url("https://gumroad.com/discover"), None);
        assert_eq!(category_from_url("https://gumroad.com/discover?sort=hot"), None);
        assert_eq!(
            category_from_url("https://gumroad.com/discover?category="),
            None
        );
        assert_eq!(category_from_url("not a url"), None);
    }

    #[test]
    fn pwyw_listing_gets_med_confidence_without_estimate() {
        let mut raw = full_observation();
        raw.price_text = Some("$0+".to_string());
        let snapshot = canonicalize(&raw, &ctx()).unwrap();
        assert!(snapshot.price_is_pwyw);
        assert_eq!(snapshot.revenue_estimate, None);
        assert_eq!(snapshot.revenue_confidence, RevenueConfidence::Med);
    }
}
