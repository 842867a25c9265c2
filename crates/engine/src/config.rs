use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::reliability::{CircuitBreakerConfig, RetryPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub enrichment: EnrichmentConfig,
    pub notification: NotificationConfig,
    #[serde(default)]
    pub reliability: ReliabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    pub abuseipdb_api_key: Option<String>,
    pub virustotal_api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub slack_webhook_url: Option<String>,
    pub default_channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    pub enrichment_breaker: BreakerSettings,
    pub notification_breaker: BreakerSettings,
    pub retry: RetrySettings,
    pub dlq_max_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub recovery_timeout_secs: u64,
    pub half_open_max_calls: u32,
}

impl BreakerSettings {
    pub fn to_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            recovery_timeout: Duration::from_secs(self.recovery_timeout_secs),
            half_open_max_calls: self.half_open_max_calls,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub min_wait_ms: u64,
    pub max_wait_ms: u64,
}

impl RetrySettings {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.min_wait_ms),
            Duration::from_millis(self.max_wait_ms),
        )
    }
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            enrichment_breaker: BreakerSettings {
                failure_threshold: 5,
                recovery_timeout_secs: 60,
                half_open_max_calls: 3,
            },
            notification_breaker: BreakerSettings {
                failure_threshold: 3,
                recovery_timeout_secs: 30,
                half_open_max_calls: 3,
            },
            retry: RetrySettings {
                max_attempts: 3,
                min_wait_ms: 1_000,
                max_wait_ms: 10_000,
            },
            dlq_max_size: 1_000,
        }
    }
}

impl Config {
    pub fn load() -> crate::Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        let defaults = ReliabilityConfig::default();

        let config = Config {
            enrichment: EnrichmentConfig {
                abuseipdb_api_key: std::env::var("ABUSEIPDB_API_KEY").ok(),
                virustotal_api_key: std::env::var("VIRUSTOTAL_API_KEY").ok(),
                timeout_secs: std::env::var("ENRICHMENT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            },
            notification: NotificationConfig {
                slack_webhook_url: std::env::var("SLACK_WEBHOOK_URL").ok(),
                default_channel: std::env::var("SLACK_DEFAULT_CHANNEL")
                    .unwrap_or_else(|_| "#security-alerts".to_string()),
            },
            reliability: ReliabilityConfig {
                enrichment_breaker: BreakerSettings {
                    failure_threshold: std::env::var("ENRICHMENT_FAILURE_THRESHOLD")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(defaults.enrichment_breaker.failure_threshold),
                    recovery_timeout_secs: std::env::var("ENRICHMENT_RECOVERY_TIMEOUT_SECS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(defaults.enrichment_breaker.recovery_timeout_secs),
                    half_open_max_calls: defaults.enrichment_breaker.half_open_max_calls,
                },
                notification_breaker: BreakerSettings {
                    failure_threshold: std::env::var("NOTIFICATION_FAILURE_THRESHOLD")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(defaults.notification_breaker.failure_threshold),
                    recovery_timeout_secs: std::env::var("NOTIFICATION_RECOVERY_TIMEOUT_SECS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(defaults.notification_breaker.recovery_timeout_secs),
                    half_open_max_calls: defaults.notification_breaker.half_open_max_calls,
                },
                retry: RetrySettings {
                    max_attempts: std::env::var("RETRY_MAX_ATTEMPTS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(defaults.retry.max_attempts),
                    min_wait_ms: defaults.retry.min_wait_ms,
                    max_wait_ms: defaults.retry.max_wait_ms,
                },
                dlq_max_size: std::env::var("DLQ_MAX_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.dlq_max_size),
            },
        };

        if config.enrichment.abuseipdb_api_key.is_none()
            && config.enrichment.virustotal_api_key.is_none()
        {
            tracing::warn!(
                "No threat intel API keys configured. Enrichment will serve offline records."
            );
        }

        // Validate reliability tuning
        if config.enrichment.timeout_secs == 0 {
            return Err(crate::Error::Config(
                "ENRICHMENT_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if config.reliability.retry.max_attempts == 0 {
            return Err(crate::Error::Config(
                "RETRY_MAX_ATTEMPTS must be greater than zero".to_string(),
            ));
        }
        if config.reliability.dlq_max_size == 0 {
            return Err(crate::Error::Config(
                "DLQ_MAX_SIZE must be greater than zero".to_string(),
            ));
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enrichment: EnrichmentConfig {
                abuseipdb_api_key: None,
                virustotal_api_key: None,
                timeout_secs: 10,
            },
            notification: NotificationConfig {
                slack_webhook_url: None,
                default_channel: "#security-alerts".to_string(),
            },
            reliability: ReliabilityConfig::default(),
        }
    }
}
