use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub jobs_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub adapter_request_timeout_secs: u64,
    pub adapter_user_agent: String,
    /// Upper bound on jobs collected concurrently; work units within a job
    /// are always sequential.
    pub max_concurrent_jobs: usize,
    /// Base wait applied before each work-unit attempt, scaled by the
    /// adaptive pacing multiplier.
    pub pacing_base_delay_ms: u64,
    /// Total attempts per work unit before it is surrendered.
    pub unit_max_retries: u32,
    /// Base for the exponential between-retry cooldown.
    pub retry_cooldown_base_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("jobs_path", &self.jobs_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "adapter_request_timeout_secs",
                &self.adapter_request_timeout_secs,
            )
            .field("adapter_user_agent", &self.adapter_user_agent)
            .field("max_concurrent_jobs", &self.max_concurrent_jobs)
            .field("pacing_base_delay_ms", &self.pacing_base_delay_ms)
            .field("unit_max_retries", &self.unit_max_retries)
            .field("retry_cooldown_base_secs", &self.retry_cooldown_base_secs)
            .finish()
    }
}
