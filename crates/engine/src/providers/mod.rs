pub mod enrichment;
pub mod notification;

pub use enrichment::ThreatIntelClient;
pub use notification::SlackNotifier;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::models::Alert;
use crate::Result;

/// Threat-intelligence lookups for network indicators.
///
/// Failures of the underlying service surface as `Error::Transient` so the
/// reliability layer can retry and trip the enrichment circuit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    async fn enrich_ip(&self, ip: &str) -> Result<JsonValue>;
    async fn enrich_domain(&self, domain: &str) -> Result<JsonValue>;
}

/// Outbound alert notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationProvider: Send + Sync {
    async fn send(&self, message: &str, channel: &str, alert: &Alert) -> Result<()>;
}
