//! Application configuration

use std::env;

use supercheck_shared::CapacityLimits;

/// Queues summed into the execution stats when `QUEUE_NAMES` is unset
pub const DEFAULT_QUEUE_NAMES: &[&str] = &[
    "test-execution",
    "job-execution",
    "k6-test-execution",
    "k6-job-execution",
];

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,
    /// Base application URL; its host is the main application hostname
    pub app_url: Option<String>,
    /// Suffix for generated status-page subdomains, e.g. "supercheck.io"
    pub status_page_domain: Option<String>,

    // Redis
    pub redis_url: String,

    // Sessions
    pub session_jwt_secret: Option<String>,

    // Execution capacity
    pub queue_names: Vec<String>,
    pub default_running_capacity: u32,
    pub default_queued_capacity: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let session_jwt_secret = non_empty("SESSION_JWT_SECRET");
        if let Some(secret) = &session_jwt_secret {
            if secret.len() < 32 {
                return Err(ConfigError::WeakSecret(
                    "SESSION_JWT_SECRET must be at least 32 characters",
                ));
            }
        }

        let queue_names = match non_empty("QUEUE_NAMES") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_QUEUE_NAMES.iter().map(|q| q.to_string()).collect(),
        };

        Ok(Self {
            // Server
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            app_url: non_empty("APP_URL"),
            status_page_domain: Some(
                non_empty("STATUS_PAGE_DOMAIN").unwrap_or_else(|| "supercheck.io".to_string()),
            ),

            // Redis
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),

            // Sessions
            session_jwt_secret,

            // Execution capacity
            queue_names,
            default_running_capacity: env::var("RUNNING_CAPACITY")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            default_queued_capacity: env::var("QUEUED_CAPACITY")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .unwrap_or(50),
        })
    }

    /// Platform-wide capacity limits used when an org has no overrides
    pub fn default_limits(&self) -> CapacityLimits {
        CapacityLimits::new(self.default_running_capacity, self.default_queued_capacity)
    }
}

/// Read an env var, treating empty strings as unset
fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Weak secret: {0}")]
    WeakSecret(&'static str),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "BIND_ADDRESS",
        "APP_URL",
        "STATUS_PAGE_DOMAIN",
        "REDIS_URL",
        "SESSION_JWT_SECRET",
        "QUEUE_NAMES",
        "RUNNING_CAPACITY",
        "QUEUED_CAPACITY",
    ];

    fn cleanup_config() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        cleanup_config();

        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_address, "0.0.0.0:3000");
        assert_eq!(config.app_url, None);
        assert_eq!(config.status_page_domain.as_deref(), Some("supercheck.io"));
        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert!(config.session_jwt_secret.is_none());
        assert_eq!(config.queue_names.len(), DEFAULT_QUEUE_NAMES.len());
        assert_eq!(config.default_limits(), CapacityLimits::new(5, 50));
    }

    #[test]
    #[serial]
    fn test_overrides_and_fallbacks() {
        cleanup_config();
        env::set_var("APP_URL", "https://app.supercheck.io");
        env::set_var("STATUS_PAGE_DOMAIN", "status.example.com");
        env::set_var("QUEUE_NAMES", "alpha, beta,,gamma ");
        env::set_var("RUNNING_CAPACITY", "12");
        env::set_var("QUEUED_CAPACITY", "not-a-number");

        let config = Config::from_env().unwrap();
        assert_eq!(config.app_url.as_deref(), Some("https://app.supercheck.io"));
        assert_eq!(
            config.status_page_domain.as_deref(),
            Some("status.example.com")
        );
        assert_eq!(config.queue_names, vec!["alpha", "beta", "gamma"]);
        assert_eq!(config.default_running_capacity, 12);
        // Unparsable numbers fall back to the default
        assert_eq!(config.default_queued_capacity, 50);

        cleanup_config();
    }

    #[test]
    #[serial]
    fn test_weak_session_secret_rejected() {
        cleanup_config();
        env::set_var("SESSION_JWT_SECRET", "short");

        let result = Config::from_env();
        assert!(matches!(result, Err(ConfigError::WeakSecret(_))));

        env::set_var(
            "SESSION_JWT_SECRET",
            "a-session-secret-that-is-long-enough-for-hs256",
        );
        assert!(Config::from_env().is_ok());

        cleanup_config();
    }
}
