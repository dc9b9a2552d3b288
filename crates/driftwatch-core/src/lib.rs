pub mod app_config;
pub mod config;
pub mod diff;
pub mod error;
pub mod jobs;
pub mod opportunity;
pub mod snapshot;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use diff::{compute_product_diff, ProductDiff};
pub use error::ConfigError;
pub use jobs::{load_jobs, pick_jobs, JobConfig, JobsFile, Schedule};
pub use opportunity::{
    detect_alerts, hours_between_runs, score_snapshot, Alert, AlertKind, OpportunityScore,
    ScoreConfidence,
};
pub use snapshot::{estimate_revenue, ProductSnapshot, RevenueConfidence};
