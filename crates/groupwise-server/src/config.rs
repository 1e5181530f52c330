use std::env;
use std::time::Duration;

/// Startup configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    /// Family-wise significance level for Tukey HSD.
    pub significance: f64,
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
    pub max_groups: usize,
    pub max_samples_per_group: usize,
    /// Size of the blocking pool the CPU-bound comparison runs on.
    pub compare_workers: usize,
    pub log_json: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5001".to_string(),
            significance: 0.05,
            max_body_bytes: 1024 * 1024,
            request_timeout: Duration::from_millis(5000),
            max_groups: 64,
            max_samples_per_group: 10_000,
            compare_workers: 8,
            log_json: true,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();
        let config = Self {
            bind_addr: env::var("GROUPWISE_BIND").unwrap_or(defaults.bind_addr),
            significance: env_f64("GROUPWISE_SIGNIFICANCE", defaults.significance),
            max_body_bytes: env_usize("GROUPWISE_MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout: env_duration_ms("GROUPWISE_REQUEST_TIMEOUT_MS", 5000),
            max_groups: env_usize("GROUPWISE_MAX_GROUPS", defaults.max_groups),
            max_samples_per_group: env_usize(
                "GROUPWISE_MAX_SAMPLES_PER_GROUP",
                defaults.max_samples_per_group,
            ),
            compare_workers: env_usize("GROUPWISE_COMPARE_WORKERS", defaults.compare_workers),
            log_json: env_bool("GROUPWISE_LOG_JSON", defaults.log_json),
        };
        if !(config.significance > 0.0 && config.significance < 1.0) {
            return Err(format!(
                "GROUPWISE_SIGNIFICANCE must be in (0, 1), got {}",
                config.significance
            ));
        }
        if config.max_groups < 2 {
            return Err("GROUPWISE_MAX_GROUPS must be at least 2".to_string());
        }
        if config.compare_workers == 0 {
            return Err("GROUPWISE_COMPARE_WORKERS must be positive".to_string());
        }
        Ok(config)
    }
}

pub(crate) fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

pub(crate) fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(name, default_ms))
}
