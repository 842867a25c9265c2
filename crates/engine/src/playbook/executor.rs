//! Action execution with reliability-guarded collaborator calls.
//!
//! Every call into an external integration goes through that integration's
//! circuit breaker and the retry policy. On circuit-open or retry
//! exhaustion the operation is dead-lettered and the action degrades:
//! enrichment serves the offline intel record, notification reports a
//! failed delivery.

use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use tracing::debug;
use uuid::Uuid;

use crate::models::{ActionOutcome, ActionType, Alert, IndicatorKind, PlaybookAction};
use crate::providers::enrichment::{offline_domain_record, offline_ip_record};
use crate::providers::{EnrichmentProvider, NotificationProvider};
use crate::reliability::{CircuitBreaker, DeadLetterQueue, OperationType, RetryPolicy};
use crate::Result;

pub struct ActionExecutor {
    enrichment: Arc<dyn EnrichmentProvider>,
    notifier: Arc<dyn NotificationProvider>,
    enrichment_breaker: Arc<CircuitBreaker>,
    notification_breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    dlq: Arc<DeadLetterQueue>,
    default_channel: String,
}

impl ActionExecutor {
    pub fn new(
        enrichment: Arc<dyn EnrichmentProvider>,
        notifier: Arc<dyn NotificationProvider>,
        enrichment_breaker: Arc<CircuitBreaker>,
        notification_breaker: Arc<CircuitBreaker>,
        retry: RetryPolicy,
        dlq: Arc<DeadLetterQueue>,
        default_channel: impl Into<String>,
    ) -> Self {
        Self {
            enrichment,
            notifier,
            enrichment_breaker,
            notification_breaker,
            retry,
            dlq,
            default_channel: default_channel.into(),
        }
    }

    /// Execute a single playbook action against the alert.
    ///
    /// Handler errors are caught here and converted into a failed outcome;
    /// they never abort the enclosing playbook.
    pub async fn execute(&self, action: &PlaybookAction, alert: &mut Alert) -> ActionOutcome {
        debug!(action = %action.action_type, alert_id = %alert.id, "Executing action");

        let result = match action.action_type {
            ActionType::EnrichAll => self.enrich_all(alert).await,
            ActionType::EnrichIp => self.enrich_ip(alert).await,
            ActionType::EnrichDomain => self.enrich_domain(alert).await,
            ActionType::Notify => self.notify(action.config.as_ref(), alert).await,
            ActionType::CreateTicket => self.create_ticket(action.config.as_ref()),
            ActionType::BlockIp => self.block_ip(alert),
            ActionType::IsolateHost => self.isolate_host(action.config.as_ref()),
        };

        match result {
            Ok(outcome) => outcome,
            Err(err) => outcome(action.action_type, false, err.to_string()),
        }
    }

    async fn enrich_all(&self, alert: &mut Alert) -> Result<ActionOutcome> {
        let mut enriched = 0usize;

        if let Some(ip) = alert.source_ip.clone() {
            let record = self.lookup_ip(&ip, alert.id).await?;
            alert.enrichment_data.insert(IndicatorKind::SourceIp, record);
            enriched += 1;
        }
        if let Some(ip) = alert.destination_ip.clone() {
            let record = self.lookup_ip(&ip, alert.id).await?;
            alert
                .enrichment_data
                .insert(IndicatorKind::DestinationIp, record);
            enriched += 1;
        }
        if let Some(domain) = alert.domain.clone() {
            let record = self.lookup_domain(&domain, alert.id).await?;
            alert.enrichment_data.insert(IndicatorKind::Domain, record);
            enriched += 1;
        }

        Ok(outcome(
            ActionType::EnrichAll,
            true,
            format!("Enriched {} indicators", enriched),
        ))
    }

    async fn enrich_ip(&self, alert: &mut Alert) -> Result<ActionOutcome> {
        match alert.source_ip.clone() {
            Some(ip) => {
                let record = self.lookup_ip(&ip, alert.id).await?;
                alert.enrichment_data.insert(IndicatorKind::SourceIp, record);
                Ok(outcome(
                    ActionType::EnrichIp,
                    true,
                    format!("Enriched IP {}", ip),
                ))
            }
            None => Ok(outcome(
                ActionType::EnrichIp,
                true,
                "No source IP to enrich".to_string(),
            )),
        }
    }

    async fn enrich_domain(&self, alert: &mut Alert) -> Result<ActionOutcome> {
        match alert.domain.clone() {
            Some(domain) => {
                let record = self.lookup_domain(&domain, alert.id).await?;
                alert.enrichment_data.insert(IndicatorKind::Domain, record);
                Ok(outcome(
                    ActionType::EnrichDomain,
                    true,
                    format!("Enriched domain {}", domain),
                ))
            }
            None => Ok(outcome(
                ActionType::EnrichDomain,
                true,
                "No domain to enrich".to_string(),
            )),
        }
    }

    async fn notify(&self, config: Option<&JsonValue>, alert: &Alert) -> Result<ActionOutcome> {
        let channel = config
            .and_then(|c| c.get("channel"))
            .and_then(|v| v.as_str())
            .unwrap_or(&self.default_channel)
            .to_string();
        let message = format!("New security alert: {}", alert.title);

        if !self.notification_breaker.can_execute().await {
            self.dlq
                .add(
                    OperationType::Notification,
                    json!({ "channel": channel, "message": message }),
                    "notification circuit open",
                    Some(alert.id),
                )
                .await;
            return Ok(outcome(
                ActionType::Notify,
                false,
                format!("Notification to {} suppressed while circuit open", channel),
            ));
        }

        match self
            .retry
            .call(|| self.notifier.send(&message, &channel, alert))
            .await
        {
            Ok(()) => {
                self.notification_breaker.record_success().await;
                Ok(outcome(
                    ActionType::Notify,
                    true,
                    format!("Slack notification sent to {}", channel),
                ))
            }
            Err(err) if err.is_transient() => {
                self.notification_breaker.record_failure().await;
                self.dlq
                    .add(
                        OperationType::Notification,
                        json!({ "channel": channel, "message": message }),
                        err.to_string(),
                        Some(alert.id),
                    )
                    .await;
                Ok(outcome(
                    ActionType::Notify,
                    false,
                    format!("Notification to {} failed: {}", channel, err),
                ))
            }
            Err(err) => Err(err),
        }
    }

    fn create_ticket(&self, config: Option<&JsonValue>) -> Result<ActionOutcome> {
        let priority = config
            .and_then(|c| c.get("priority"))
            .and_then(|v| v.as_str())
            .unwrap_or("medium");
        Ok(outcome(
            ActionType::CreateTicket,
            true,
            format!("Ticket created with {} priority", priority),
        ))
    }

    fn block_ip(&self, alert: &Alert) -> Result<ActionOutcome> {
        match &alert.source_ip {
            Some(ip) => Ok(outcome(
                ActionType::BlockIp,
                true,
                format!("IP {} blocked at firewall", ip),
            )),
            None => Ok(outcome(
                ActionType::BlockIp,
                true,
                "No IP to block".to_string(),
            )),
        }
    }

    fn isolate_host(&self, config: Option<&JsonValue>) -> Result<ActionOutcome> {
        let auto = config
            .and_then(|c| c.get("auto"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let message = if auto {
            "Host isolation initiated"
        } else {
            "Host isolation recommended (manual approval required)"
        };
        Ok(outcome(ActionType::IsolateHost, true, message.to_string()))
    }

    /// One IP lookup through the breaker/retry guard. Circuit-open and
    /// retry exhaustion degrade to the offline record and dead-letter the
    /// lookup; non-transient errors propagate to the handler-level catch.
    async fn lookup_ip(&self, ip: &str, alert_id: Uuid) -> Result<JsonValue> {
        if !self.enrichment_breaker.can_execute().await {
            self.dlq
                .add(
                    OperationType::Enrichment,
                    json!({ "indicator": ip, "kind": "ip" }),
                    "enrichment circuit open",
                    Some(alert_id),
                )
                .await;
            return Ok(offline_ip_record(ip, "degraded"));
        }

        match self.retry.call(|| self.enrichment.enrich_ip(ip)).await {
            Ok(record) => {
                self.enrichment_breaker.record_success().await;
                Ok(record)
            }
            Err(err) if err.is_transient() => {
                self.enrichment_breaker.record_failure().await;
                self.dlq
                    .add(
                        OperationType::Enrichment,
                        json!({ "indicator": ip, "kind": "ip" }),
                        err.to_string(),
                        Some(alert_id),
                    )
                    .await;
                Ok(offline_ip_record(ip, "degraded"))
            }
            Err(err) => Err(err),
        }
    }

    async fn lookup_domain(&self, domain: &str, alert_id: Uuid) -> Result<JsonValue> {
        if !self.enrichment_breaker.can_execute().await {
            self.dlq
                .add(
                    OperationType::Enrichment,
                    json!({ "indicator": domain, "kind": "domain" }),
                    "enrichment circuit open",
                    Some(alert_id),
                )
                .await;
            return Ok(offline_domain_record(domain, "degraded"));
        }

        match self.retry.call(|| self.enrichment.enrich_domain(domain)).await {
            Ok(record) => {
                self.enrichment_breaker.record_success().await;
                Ok(record)
            }
            Err(err) if err.is_transient() => {
                self.enrichment_breaker.record_failure().await;
                self.dlq
                    .add(
                        OperationType::Enrichment,
                        json!({ "indicator": domain, "kind": "domain" }),
                        err.to_string(),
                        Some(alert_id),
                    )
                    .await;
                Ok(offline_domain_record(domain, "degraded"))
            }
            Err(err) => Err(err),
        }
    }
}

fn outcome(action: ActionType, success: bool, message: String) -> ActionOutcome {
    ActionOutcome {
        action,
        success,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertSeverity, AlertSource};
    use crate::providers::{MockEnrichmentProvider, MockNotificationProvider};
    use crate::reliability::{CircuitBreakerConfig, CircuitState};
    use crate::Error;
    use std::time::Duration;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(5))
    }

    fn breaker(name: &str) -> Arc<CircuitBreaker> {
        Arc::new(CircuitBreaker::new(
            name,
            CircuitBreakerConfig {
                failure_threshold: 2,
                recovery_timeout: Duration::from_secs(60),
                half_open_max_calls: 1,
            },
        ))
    }

    fn executor_with(
        enrichment: MockEnrichmentProvider,
        notifier: MockNotificationProvider,
    ) -> (ActionExecutor, Arc<DeadLetterQueue>) {
        let dlq = Arc::new(DeadLetterQueue::new(100));
        let executor = ActionExecutor::new(
            Arc::new(enrichment),
            Arc::new(notifier),
            breaker("enrichment"),
            breaker("notification"),
            fast_retry(),
            dlq.clone(),
            "#security-alerts",
        );
        (executor, dlq)
    }

    fn alert_with_ip() -> Alert {
        let mut alert = Alert::new("Beaconing host", AlertSeverity::High, AlertSource::Edr);
        alert.source_ip = Some("203.0.113.7".to_string());
        alert
    }

    #[tokio::test]
    async fn enrich_ip_merges_record_into_alert() {
        let mut enrichment = MockEnrichmentProvider::new();
        enrichment
            .expect_enrich_ip()
            .times(1)
            .returning(|ip| Ok(json!({ "ip": ip, "source": "abuseipdb" })));
        let (executor, dlq) = executor_with(enrichment, MockNotificationProvider::new());

        let mut alert = alert_with_ip();
        let outcome = executor
            .execute(&PlaybookAction::new(ActionType::EnrichIp), &mut alert)
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.message, "Enriched IP 203.0.113.7");
        assert_eq!(
            alert.enrichment_data[&IndicatorKind::SourceIp]["source"],
            "abuseipdb"
        );
        assert!(dlq.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn enrich_ip_without_indicator_is_a_successful_noop() {
        // No expectations set: any provider call would panic the mock.
        let (executor, _dlq) =
            executor_with(MockEnrichmentProvider::new(), MockNotificationProvider::new());

        let mut alert = Alert::new("No indicators", AlertSeverity::Low, AlertSource::Siem);
        let outcome = executor
            .execute(&PlaybookAction::new(ActionType::EnrichIp), &mut alert)
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.message, "No source IP to enrich");
        assert!(alert.enrichment_data.is_empty());
    }

    #[tokio::test]
    async fn enrich_all_counts_only_present_indicators() {
        let mut enrichment = MockEnrichmentProvider::new();
        enrichment
            .expect_enrich_ip()
            .times(1)
            .returning(|ip| Ok(json!({ "ip": ip })));
        enrichment
            .expect_enrich_domain()
            .times(1)
            .returning(|domain| Ok(json!({ "domain": domain })));
        let (executor, _dlq) = executor_with(enrichment, MockNotificationProvider::new());

        let mut alert = alert_with_ip();
        alert.domain = Some("evil.example.com".to_string());

        let outcome = executor
            .execute(&PlaybookAction::new(ActionType::EnrichAll), &mut alert)
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.message, "Enriched 2 indicators");
        assert!(alert.enrichment_data.contains_key(&IndicatorKind::SourceIp));
        assert!(alert.enrichment_data.contains_key(&IndicatorKind::Domain));
        assert!(!alert
            .enrichment_data
            .contains_key(&IndicatorKind::DestinationIp));
    }

    #[tokio::test]
    async fn notify_uses_channel_from_config() {
        let mut notifier = MockNotificationProvider::new();
        notifier
            .expect_send()
            .withf(|message, channel, _alert| {
                channel == "#incident-response" && message.contains("Beaconing host")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let (executor, _dlq) = executor_with(MockEnrichmentProvider::new(), notifier);

        let mut alert = alert_with_ip();
        let action =
            PlaybookAction::with_config(ActionType::Notify, json!({ "channel": "#incident-response" }));
        let outcome = executor.execute(&action, &mut alert).await;

        assert!(outcome.success);
        assert_eq!(
            outcome.message,
            "Slack notification sent to #incident-response"
        );
    }

    #[tokio::test]
    async fn notify_falls_back_to_default_channel() {
        let mut notifier = MockNotificationProvider::new();
        notifier
            .expect_send()
            .withf(|_, channel, _| channel == "#security-alerts")
            .times(1)
            .returning(|_, _, _| Ok(()));
        let (executor, _dlq) = executor_with(MockEnrichmentProvider::new(), notifier);

        let mut alert = alert_with_ip();
        let outcome = executor
            .execute(&PlaybookAction::new(ActionType::Notify), &mut alert)
            .await;

        assert!(outcome.success);
    }

    #[tokio::test]
    async fn notify_exhaustion_fails_outcome_and_dead_letters() {
        let mut notifier = MockNotificationProvider::new();
        notifier
            .expect_send()
            .times(2)
            .returning(|_, _, _| Err(Error::Transient("slack 500".into())));
        let (executor, dlq) = executor_with(MockEnrichmentProvider::new(), notifier);

        let mut alert = alert_with_ip();
        let outcome = executor
            .execute(&PlaybookAction::new(ActionType::Notify), &mut alert)
            .await;

        assert!(!outcome.success);
        assert!(outcome.message.contains("slack 500"));

        let entries = dlq.list_by_type(OperationType::Notification).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].alert_id, Some(alert.id));
    }

    #[tokio::test]
    async fn enrichment_exhaustion_degrades_and_dead_letters() {
        let mut enrichment = MockEnrichmentProvider::new();
        enrichment
            .expect_enrich_ip()
            .times(2)
            .returning(|_| Err(Error::Transient("api timeout".into())));
        let (executor, dlq) = executor_with(enrichment, MockNotificationProvider::new());

        let mut alert = alert_with_ip();
        let outcome = executor
            .execute(&PlaybookAction::new(ActionType::EnrichIp), &mut alert)
            .await;

        // The action still succeeds, serving the degraded record.
        assert!(outcome.success);
        assert_eq!(
            alert.enrichment_data[&IndicatorKind::SourceIp]["source"],
            "degraded"
        );

        let entries = dlq.list_by_type(OperationType::Enrichment).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].error, "transient external error: api timeout");
    }

    #[tokio::test]
    async fn open_enrichment_circuit_serves_degraded_without_calling_provider() {
        // No expectations: a provider call would panic the mock.
        let enrichment = MockEnrichmentProvider::new();
        let dlq = Arc::new(DeadLetterQueue::new(100));
        let enrichment_breaker = breaker("enrichment");
        // Trip the breaker (threshold 2).
        enrichment_breaker.record_failure().await;
        enrichment_breaker.record_failure().await;
        assert_eq!(enrichment_breaker.state().await, CircuitState::Open);

        let executor = ActionExecutor::new(
            Arc::new(enrichment),
            Arc::new(MockNotificationProvider::new()),
            enrichment_breaker,
            breaker("notification"),
            fast_retry(),
            dlq.clone(),
            "#security-alerts",
        );

        let mut alert = alert_with_ip();
        let outcome = executor
            .execute(&PlaybookAction::new(ActionType::EnrichIp), &mut alert)
            .await;

        assert!(outcome.success);
        assert_eq!(
            alert.enrichment_data[&IndicatorKind::SourceIp]["source"],
            "degraded"
        );
        let entries = dlq.list_by_type(OperationType::Enrichment).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].error, "enrichment circuit open");
    }

    #[tokio::test]
    async fn non_transient_error_fails_action_without_dead_lettering() {
        let mut enrichment = MockEnrichmentProvider::new();
        enrichment
            .expect_enrich_ip()
            .times(1)
            .returning(|_| Err(Error::Validation("malformed indicator".into())));
        let (executor, dlq) = executor_with(enrichment, MockNotificationProvider::new());

        let mut alert = alert_with_ip();
        let outcome = executor
            .execute(&PlaybookAction::new(ActionType::EnrichIp), &mut alert)
            .await;

        assert!(!outcome.success);
        assert!(outcome.message.contains("malformed indicator"));
        assert!(dlq.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn containment_stubs_report_config_derived_messages() {
        let (executor, _dlq) =
            executor_with(MockEnrichmentProvider::new(), MockNotificationProvider::new());
        let mut alert = alert_with_ip();

        let ticket = executor
            .execute(
                &PlaybookAction::with_config(ActionType::CreateTicket, json!({ "priority": "high" })),
                &mut alert,
            )
            .await;
        assert!(ticket.success);
        assert_eq!(ticket.message, "Ticket created with high priority");

        let block = executor
            .execute(&PlaybookAction::new(ActionType::BlockIp), &mut alert)
            .await;
        assert_eq!(block.message, "IP 203.0.113.7 blocked at firewall");

        let isolate = executor
            .execute(
                &PlaybookAction::with_config(ActionType::IsolateHost, json!({ "auto": true })),
                &mut alert,
            )
            .await;
        assert_eq!(isolate.message, "Host isolation initiated");

        let manual = executor
            .execute(&PlaybookAction::new(ActionType::IsolateHost), &mut alert)
            .await;
        assert_eq!(
            manual.message,
            "Host isolation recommended (manual approval required)"
        );
    }
}
