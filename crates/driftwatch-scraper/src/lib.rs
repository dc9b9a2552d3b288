pub mod canonicalize;
pub mod client;
pub mod error;
pub mod extract;
pub mod pacing;
pub mod resilience;
pub mod source;
pub mod types;

pub use canonicalize::{canonicalize, category_from_url, RunContext};
pub use client::GumroadClient;
pub use error::{AdapterError, UnitError};
pub use pacing::PacingState;
pub use resilience::{fetch_listing_with_retry, RetryPolicy};
pub use source::SourceAdapter;
pub use types::{ListingPage, RawObservation, RawObservationDetail};
