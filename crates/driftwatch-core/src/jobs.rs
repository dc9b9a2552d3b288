//! Collection job configuration loaded from `config/jobs.yaml`.
//!
//! A job descriptor names a platform, a category/query URL, a schedule
//! bucket, and adapter-specific options. The pipeline consumes this as plain
//! configuration data; validation happens up front so a bad descriptor fails
//! before any run is created.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const DEFAULT_RATE_LIMIT_MS: u64 = 500;

/// Schedule bucket used to select which jobs a collection invocation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schedule {
    Daily,
    Realtime,
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Schedule::Daily => write!(f, "daily"),
            Schedule::Realtime => write!(f, "realtime"),
        }
    }
}

/// One collection job: a platform plus a category/query URL and its options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub platform: String,
    /// Discover/listing URL for the category or query to collect.
    pub category_url: String,
    pub schedule: Schedule,
    #[serde(default = "default_max_products")]
    pub max_products: u32,
    /// When `true`, each listed item also gets a per-product detail fetch.
    #[serde(default = "default_detailed")]
    pub detailed: bool,
    /// Per-job override of the inter-request delay; falls back to the file's
    /// `default_rate_limit_ms`.
    #[serde(default)]
    pub rate_limit_ms: Option<u64>,
}

fn default_max_products() -> u32 {
    100
}

fn default_detailed() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct JobsFile {
    #[serde(default)]
    pub default_rate_limit_ms: Option<u64>,
    pub jobs: Vec<JobConfig>,
}

impl JobsFile {
    /// Resolves the effective inter-request delay for a job.
    #[must_use]
    pub fn effective_rate_limit_ms(&self, job: &JobConfig) -> u64 {
        job.rate_limit_ms
            .or(self.default_rate_limit_ms)
            .unwrap_or(DEFAULT_RATE_LIMIT_MS)
    }
}

/// Load and validate the jobs configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// validation.
pub fn load_jobs(path: &Path) -> Result<JobsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::JobsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let jobs_file: JobsFile = serde_yaml::from_str(&content).map_err(ConfigError::JobsFileParse)?;

    validate_jobs(&jobs_file)?;

    Ok(jobs_file)
}

/// Selects the jobs matching an optional schedule bucket and an optional set
/// of job names. `None` means no filtering on that axis.
#[must_use]
pub fn pick_jobs<'a>(
    jobs_file: &'a JobsFile,
    schedule: Option<Schedule>,
    names: Option<&HashSet<String>>,
) -> Vec<&'a JobConfig> {
    jobs_file
        .jobs
        .iter()
        .filter(|job| schedule.is_none_or(|s| job.schedule == s))
        .filter(|job| names.is_none_or(|set| set.contains(&job.name)))
        .collect()
}

fn validate_jobs(jobs_file: &JobsFile) -> Result<(), ConfigError> {
    if jobs_file.jobs.is_empty() {
        return Err(ConfigError::Validation(
            "jobs file defines no jobs".to_string(),
        ));
    }

    let mut seen_names = HashSet::new();
    for job in &jobs_file.jobs {
        if job.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "job name must be non-empty".to_string(),
            ));
        }

        if job.platform.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "job '{}' has an empty platform",
                job.name
            )));
        }

        if !job.category_url.starts_with("http://") && !job.category_url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "job '{}' has a non-URL category_url: '{}'",
                job.name, job.category_url
            )));
        }

        if job.max_products == 0 {
            return Err(ConfigError::Validation(format!(
                "job '{}' has max_products 0; must be at least 1",
                job.name
            )));
        }

        let lower_name = job.name.to_lowercase();
        if !seen_names.insert(lower_name) {
            return Err(ConfigError::Validation(format!(
                "duplicate job name: '{}'",
                job.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_job(name: &str, schedule: Schedule) -> JobConfig {
        JobConfig {
            name: name.to_string(),
            platform: "gumroad".to_string(),
            category_url: "https://gumroad.com/discover?category=design".to_string(),
            schedule,
            max_products: 100,
            detailed: true,
            rate_limit_ms: None,
        }
    }

    fn make_file(jobs: Vec<JobConfig>) -> JobsFile {
        JobsFile {
            default_rate_limit_ms: Some(500),
            jobs,
        }
    }

    #[test]
    fn validate_accepts_valid_jobs() {
        let file = make_file(vec![
            make_job("design-daily", Schedule::Daily),
            make_job("software-realtime", Schedule::Realtime),
        ]);
        assert!(validate_jobs(&file).is_ok());
    }

    #[test]
    fn validate_rejects_empty_jobs_list() {
        let file = make_file(vec![]);
        let err = validate_jobs(&file).unwrap_err();
        assert!(err.to_string().contains("no jobs"));
    }

    #[test]
    fn validate_rejects_empty_name() {
        let file = make_file(vec![make_job("  ", Schedule::Daily)]);
        let err = validate_jobs(&file).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn validate_rejects_duplicate_name_case_insensitive() {
        let file = make_file(vec![
            make_job("Design", Schedule::Daily),
            make_job("design", Schedule::Realtime),
        ]);
        let err = validate_jobs(&file).unwrap_err();
        assert!(err.to_string().contains("duplicate job name"));
    }

    #[test]
    fn validate_rejects_non_url_category() {
        let mut job = make_job("bad-url", Schedule::Daily);
        job.category_url = "design".to_string();
        let file = make_file(vec![job]);
        let err = validate_jobs(&file).unwrap_err();
        assert!(err.to_string().contains("non-URL"));
    }

    #[test]
    fn validate_rejects_zero_max_products() {
        let mut job = make_job("zero-max", Schedule::Daily);
        job.max_products = 0;
        let file = make_file(vec![job]);
        let err = validate_jobs(&file).unwrap_err();
        assert!(err.to_string().contains("max_products 0"));
    }

    #[test]
    fn pick_jobs_filters_by_schedule() {
        let file = make_file(vec![
            make_job("a", Schedule::Daily),
            make_job("b", Schedule::Realtime),
            make_job("c", Schedule::Daily),
        ]);
        let picked = pick_jobs(&file, Some(Schedule::Daily), None);
        let names: Vec<&str> = picked.iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn pick_jobs_filters_by_name_set() {
        let file = make_file(vec![
            make_job("a", Schedule::Daily),
            make_job("b", Schedule::Daily),
        ]);
        let names: HashSet<String> = ["b".to_string()].into_iter().collect();
        let picked = pick_jobs(&file, None, Some(&names));
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].name, "b");
    }

    #[test]
    fn pick_jobs_without_filters_returns_all() {
        let file = make_file(vec![
            make_job("a", Schedule::Daily),
            make_job("b", Schedule::Realtime),
        ]);
        assert_eq!(pick_jobs(&file, None, None).len(), 2);
    }

    #[test]
    fn effective_rate_limit_prefers_job_override() {
        let mut job = make_job("a", Schedule::Daily);
        job.rate_limit_ms = Some(250);
        let file = make_file(vec![job.clone()]);
        assert_eq!(file.effective_rate_limit_ms(&job), 250);
    }

    #[test]
    fn effective_rate_limit_falls_back_to_file_default() {
        let job = make_job("a", Schedule::Daily);
        let file = make_file(vec![job.clone()]);
        assert_eq!(file.effective_rate_limit_ms(&job), 500);
    }

    #[test]
    fn parse_yaml_with_defaults() {
        let yaml = r"
jobs:
  - name: design
    platform: gumroad
    category_url: https://gumroad.com/discover?category=design
    schedule: daily
";
        let file: JobsFile = serde_yaml::from_str(yaml).unwrap();
        assert!(validate_jobs(&file).is_ok());
        assert_eq!(file.jobs[0].max_products, 100);
        assert!(file.jobs[0].detailed);
        assert_eq!(file.effective_rate_limit_ms(&file.jobs[0]), 500);
    }
}
