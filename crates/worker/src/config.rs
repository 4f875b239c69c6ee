//! Worker configuration

use std::env;
use std::time::Duration;

/// Worker configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub redis_url: String,
    /// List the worker pops webhook jobs from
    pub queue: String,
    /// List receiving jobs that permanently failed
    pub dead_letter_queue: String,
    /// HMAC key for `X-Supercheck-Signature`; unsigned when unset
    pub signing_secret: Option<String>,
    pub timeout: Duration,
    pub max_retries: usize,
}

impl WorkerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            queue: env::var("WEBHOOK_QUEUE").unwrap_or_else(|_| "supercheck:webhooks".to_string()),
            dead_letter_queue: env::var("WEBHOOK_DEAD_LETTER_QUEUE")
                .unwrap_or_else(|_| "supercheck:webhooks:dead".to_string()),
            signing_secret: env::var("WEBHOOK_SIGNING_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            timeout: Duration::from_millis(
                env::var("WEBHOOK_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10_000),
            ),
            max_retries: env::var("WEBHOOK_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "REDIS_URL",
        "WEBHOOK_QUEUE",
        "WEBHOOK_DEAD_LETTER_QUEUE",
        "WEBHOOK_SIGNING_SECRET",
        "WEBHOOK_TIMEOUT_MS",
        "WEBHOOK_MAX_RETRIES",
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

        let config = WorkerConfig::from_env();
        assert_eq!(config.queue, "supercheck:webhooks");
        assert_eq!(config.dead_letter_queue, "supercheck:webhooks:dead");
        assert!(config.signing_secret.is_none());
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    #[serial]
    fn test_overrides() {
        cleanup_config();
        env::set_var("WEBHOOK_SIGNING_SECRET", "whsec");
        env::set_var("WEBHOOK_TIMEOUT_MS", "2500");
        env::set_var("WEBHOOK_MAX_RETRIES", "bogus");

        let config = WorkerConfig::from_env();
        assert_eq!(config.signing_secret.as_deref(), Some("whsec"));
        assert_eq!(config.timeout, Duration::from_millis(2_500));
        assert_eq!(config.max_retries, 3);

        cleanup_config();
    }
}
