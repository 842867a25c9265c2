//! Circuit breaker guarding one external integration class.
//!
//! Bounds retry storms against a failing dependency by failing fast after
//! sustained failure, then cautiously re-admitting traffic through a
//! limited half-open probe budget.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation, calls flow through.
    Closed,
    /// Failing, calls are rejected until the recovery timeout passes.
    Open,
    /// Testing whether the integration recovered, limited calls allowed.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            half_open_max_calls: 3,
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    half_open_calls: u32,
    // Instant drives the recovery-timeout check; the wall-clock twin is
    // what status reports carry.
    last_failure: Option<(Instant, DateTime<Utc>)>,
}

pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                half_open_calls: 0,
                last_failure: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    /// Check whether the circuit allows a call right now.
    ///
    /// An open circuit transitions to half-open once the recovery timeout
    /// has elapsed since the last recorded failure; the transitioning call
    /// is admitted and the probe counter starts fresh.
    pub async fn can_execute(&self) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let recovered = inner
                    .last_failure
                    .map(|(at, _)| at.elapsed() >= self.config.recovery_timeout)
                    .unwrap_or(false);
                if recovered {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_calls = 0;
                    inner.success_count = 0;
                    info!(circuit = %self.name, "Circuit transition: open -> half_open");
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_calls < self.config.half_open_max_calls {
                    inner.half_open_calls += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call against the guarded integration.
    pub async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.half_open_max_calls {
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    info!(circuit = %self.name, "Circuit transition: half_open -> closed");
                }
            }
            CircuitState::Closed => {
                // A clean call forgives prior failures.
                inner.failure_count = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed call against the guarded integration.
    pub async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.failure_count += 1;
        inner.last_failure = Some((Instant::now(), Utc::now()));

        match inner.state {
            CircuitState::HalfOpen => {
                // A single failure while probing reopens the circuit.
                inner.state = CircuitState::Open;
                warn!(circuit = %self.name, "Circuit transition: half_open -> open");
            }
            CircuitState::Closed => {
                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    warn!(
                        circuit = %self.name,
                        failures = inner.failure_count,
                        "Circuit transition: closed -> open"
                    );
                }
            }
            CircuitState::Open => {}
        }
    }

    pub async fn status(&self) -> CircuitBreakerStatus {
        let inner = self.inner.lock().await;
        CircuitBreakerStatus {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            failure_threshold: self.config.failure_threshold,
            recovery_timeout_secs: self.config.recovery_timeout.as_secs(),
            half_open_max_calls: self.config.half_open_max_calls,
            last_failure: inner.last_failure.map(|(_, at)| at),
        }
    }
}

/// Point-in-time report of a breaker's state and configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerStatus {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub failure_threshold: u32,
    pub recovery_timeout_secs: u64,
    pub half_open_max_calls: u32,
    pub last_failure: Option<DateTime<Utc>>,
}
