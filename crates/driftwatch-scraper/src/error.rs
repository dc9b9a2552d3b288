use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid listing URL \"{url}\": {reason}")]
    InvalidListingUrl { url: String, reason: String },

    #[error("malformed observation: missing or empty {field}")]
    Malformed { field: &'static str },
}

/// Terminal failure of one work unit after the retry budget is exhausted.
///
/// The orchestrator records this in the run summary and moves on; it is not
/// run-fatal unless every work unit fails.
#[derive(Debug, Error)]
#[error("work unit failed after {attempts} attempts: {reason}")]
pub struct UnitError {
    pub attempts: u32,
    pub reason: String,
}
