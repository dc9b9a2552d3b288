use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AdapterError;
use crate::source::SourceAdapter;
use crate::types::{ListingPage, RawObservation, RawObservationDetail};

/// HTTP adapter for Gumroad's public discover listings.
///
/// Handles rate limiting (429), not-found (404), and other non-2xx responses
/// as typed errors. Performs exactly one request per call; retries and
/// cooldowns live in [`crate::resilience`] so the retry budget is accounted
/// for in one place.
pub struct GumroadClient {
    client: Client,
}

/// One page of the discover feed as served over the wire.
#[derive(Debug, Deserialize)]
struct DiscoverResponse {
    #[serde(default)]
    products: Vec<DiscoverProduct>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// A product card as served over the wire. Every field is optional; listing
/// markup drops fields without notice and canonicalization decides what is
/// fatal.
#[derive(Debug, Deserialize)]
struct DiscoverProduct {
    id: Option<String>,
    url: Option<String>,
    name: Option<String>,
    seller_name: Option<String>,
    seller_url: Option<String>,
    formatted_price: Option<String>,
    rating_text: Option<String>,
    sales_text: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    rating_text: Option<String>,
    sales_text: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl From<DiscoverProduct> for RawObservation {
    fn from(p: DiscoverProduct) -> Self {
        RawObservation {
            product_id: p.id,
            url: p.url,
            title: p.name,
            creator_name: p.seller_name,
            creator_url: p.seller_url,
            price_text: p.formatted_price,
            rating_text: p.rating_text,
            sales_text: p.sales_text,
            tags: p.tags,
        }
    }
}

impl GumroadClient {
    /// Creates a `GumroadClient` with configured timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Builds the listing URL for a category plus optional page cursor.
    ///
    /// The cursor is appended via `reqwest::Url` so it is always encoded.
    fn listing_url(category_url: &str, page_token: Option<&str>) -> Result<String, AdapterError> {
        let mut url =
            reqwest::Url::parse(category_url).map_err(|e| AdapterError::InvalidListingUrl {
                url: category_url.to_owned(),
                reason: e.to_string(),
            })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AdapterError::InvalidListingUrl {
                url: category_url.to_owned(),
                reason: format!("unsupported scheme \"{}\"", url.scheme()),
            });
        }
        if let Some(token) = page_token {
            url.query_pairs_mut().append_pair("page", token);
        }
        Ok(url.to_string())
    }

    async fn get_checked(&self, url: &str) -> Result<reqwest::Response, AdapterError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(AdapterError::RateLimited { retry_after_secs });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AdapterError::NotFound {
                url: url.to_owned(),
            });
        }

        if !status.is_success() {
            return Err(AdapterError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        Ok(response)
    }
}

impl SourceAdapter for GumroadClient {
    fn platform(&self) -> &str {
        "gumroad"
    }

    async fn fetch_listing(
        &self,
        category_url: &str,
        page_token: Option<&str>,
    ) -> Result<ListingPage, AdapterError> {
        let url = Self::listing_url(category_url, page_token)?;
        let response = self.get_checked(&url).await?;
        let body = response.text().await?;
        let parsed =
            serde_json::from_str::<DiscoverResponse>(&body).map_err(|e| AdapterError::Deserialize {
                context: format!("listing page from {url}"),
                source: e,
            })?;

        Ok(ListingPage {
            items: parsed.products.into_iter().map(Into::into).collect(),
            next_page_token: parsed.next_page_token,
        })
    }

    async fn fetch_detail(
        &self,
        observation: &RawObservation,
    ) -> Result<RawObservationDetail, AdapterError> {
        let url = observation
            .url
            .as_deref()
            .ok_or(AdapterError::Malformed { field: "url" })?;
        let response = self.get_checked(url).await?;
        let body = response.text().await?;
        let parsed =
            serde_json::from_str::<DetailResponse>(&body).map_err(|e| AdapterError::Deserialize {
                context: format!("product detail from {url}"),
                source: e,
            })?;

        Ok(RawObservationDetail {
            rating_text: parsed.rating_text,
            sales_text: parsed.sales_text,
            tags: parsed.tags,
        })
    }

    async fn capture_diagnostics(&self, category_url: &str) -> Result<Value, AdapterError> {
        let response = self.client.get(category_url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(512).collect();
        Ok(json!({
            "url": category_url,
            "status": status,
            "body_bytes": body.len(),
            "body_snippet": snippet,
        }))
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
