pub mod circuit_breaker;
pub mod dead_letter;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStatus, CircuitState};
pub use dead_letter::{DeadLetterEntry, DeadLetterQueue, DeadLetterStatus, DlqStats};
pub use retry::RetryPolicy;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Types of operations that can end up in the dead-letter queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Enrichment,
    Notification,
    Playbook,
    Webhook,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationType::Enrichment => write!(f, "enrichment"),
            OperationType::Notification => write!(f, "notification"),
            OperationType::Playbook => write!(f, "playbook"),
            OperationType::Webhook => write!(f, "webhook"),
        }
    }
}
