//! Playbook registry and orchestration.
//!
//! The engine owns the long-lived handles (registry, circuit breakers,
//! dead-letter queue) and exposes the full automation surface: playbook
//! CRUD, matching, execution, and reliability reporting. Handles are
//! injected at construction so tests can substitute fresh instances per
//! case.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::models::{
    ActionType, Alert, AlertSeverity, AlertSource, AlertStatus, Playbook, PlaybookAction,
    PlaybookExecutionResult, PlaybookSpec, TriggerCondition,
};
use crate::playbook::{ActionExecutor, TriggerEvaluator};
use crate::providers::{EnrichmentProvider, NotificationProvider};
use crate::reliability::{
    CircuitBreaker, CircuitBreakerStatus, DeadLetterEntry, DeadLetterQueue, DlqStats,
    OperationType,
};
use crate::{Error, Result};

pub struct PlaybookEngine {
    registry: RwLock<Vec<Playbook>>,
    trigger: TriggerEvaluator,
    executor: ActionExecutor,
    enrichment_breaker: Arc<CircuitBreaker>,
    notification_breaker: Arc<CircuitBreaker>,
    dlq: Arc<DeadLetterQueue>,
}

impl PlaybookEngine {
    pub fn new(
        config: &Config,
        enrichment: Arc<dyn EnrichmentProvider>,
        notifier: Arc<dyn NotificationProvider>,
    ) -> Self {
        let reliability = &config.reliability;
        let enrichment_breaker = Arc::new(CircuitBreaker::new(
            "enrichment",
            reliability.enrichment_breaker.to_breaker_config(),
        ));
        let notification_breaker = Arc::new(CircuitBreaker::new(
            "notification",
            reliability.notification_breaker.to_breaker_config(),
        ));
        let dlq = Arc::new(DeadLetterQueue::new(reliability.dlq_max_size));

        let executor = ActionExecutor::new(
            enrichment,
            notifier,
            enrichment_breaker.clone(),
            notification_breaker.clone(),
            reliability.retry.to_policy(),
            dlq.clone(),
            config.notification.default_channel.clone(),
        );

        Self {
            registry: RwLock::new(Vec::new()),
            trigger: TriggerEvaluator,
            executor,
            enrichment_breaker,
            notification_breaker,
            dlq,
        }
    }

    // Playbook registry

    pub async fn register_playbook(&self, spec: PlaybookSpec) -> Result<Playbook> {
        if spec.name.trim().is_empty() {
            return Err(Error::Validation(
                "playbook name must not be empty".to_string(),
            ));
        }
        if spec.actions.is_empty() {
            return Err(Error::Validation(
                "playbook must define at least one action".to_string(),
            ));
        }

        let playbook = Playbook {
            id: Uuid::new_v4(),
            name: spec.name,
            description: spec.description,
            enabled: spec.enabled,
            trigger: spec.trigger,
            actions: spec.actions,
        };

        let mut registry = self.registry.write().await;
        registry.push(playbook.clone());
        info!(playbook = %playbook.name, id = %playbook.id, "Registered playbook");
        Ok(playbook)
    }

    pub async fn get_playbook(&self, id: Uuid) -> Result<Playbook> {
        self.registry
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("playbook {}", id)))
    }

    /// All playbooks in registration order.
    pub async fn list_playbooks(&self) -> Vec<Playbook> {
        self.registry.read().await.clone()
    }

    pub async fn delete_playbook(&self, id: Uuid) -> Result<()> {
        let mut registry = self.registry.write().await;
        match registry.iter().position(|p| p.id == id) {
            Some(index) => {
                let removed = registry.remove(index);
                info!(playbook = %removed.name, id = %removed.id, "Deleted playbook");
                Ok(())
            }
            None => Err(Error::NotFound(format!("playbook {}", id))),
        }
    }

    /// Register the stock response playbooks, in their canonical order.
    pub async fn seed_default_playbooks(&self) -> Result<Vec<Playbook>> {
        let specs = vec![
            PlaybookSpec {
                name: "High Severity Auto-Enrich".to_string(),
                description: Some(
                    "Automatically enrich all high/critical severity alerts".to_string(),
                ),
                enabled: true,
                trigger: TriggerCondition {
                    min_severity: Some(AlertSeverity::High),
                    ..Default::default()
                },
                actions: vec![
                    PlaybookAction::new(ActionType::EnrichAll),
                    PlaybookAction::with_config(
                        ActionType::Notify,
                        json!({ "channel": "#security-alerts" }),
                    ),
                ],
            },
            PlaybookSpec {
                name: "EDR Alert Response".to_string(),
                description: Some("Handle alerts from EDR systems".to_string()),
                enabled: true,
                trigger: TriggerCondition {
                    source_types: Some(vec![AlertSource::Edr]),
                    ..Default::default()
                },
                actions: vec![
                    PlaybookAction::new(ActionType::EnrichAll),
                    PlaybookAction::with_config(
                        ActionType::CreateTicket,
                        json!({ "priority": "high" }),
                    ),
                ],
            },
            PlaybookSpec {
                name: "Malware Investigation".to_string(),
                description: Some(
                    "Triggered when malware-related keywords detected".to_string(),
                ),
                enabled: true,
                trigger: TriggerCondition {
                    keywords: Some(vec![
                        "malware".to_string(),
                        "ransomware".to_string(),
                        "trojan".to_string(),
                        "virus".to_string(),
                    ]),
                    ..Default::default()
                },
                actions: vec![
                    PlaybookAction::new(ActionType::EnrichAll),
                    PlaybookAction::with_config(ActionType::IsolateHost, json!({ "auto": false })),
                    PlaybookAction::with_config(
                        ActionType::Notify,
                        json!({ "channel": "#incident-response" }),
                    ),
                ],
            },
        ];

        let mut registered = Vec::with_capacity(specs.len());
        for spec in specs {
            registered.push(self.register_playbook(spec).await?);
        }
        Ok(registered)
    }

    // Orchestration

    /// Playbooks whose trigger matches the alert, in registration order.
    pub async fn find_matching(&self, alert: &Alert) -> Vec<Playbook> {
        self.registry
            .read()
            .await
            .iter()
            .filter(|playbook| self.trigger.matches(playbook, alert))
            .cloned()
            .collect()
    }

    /// Find and run every matching playbook against the alert, in
    /// registration order.
    ///
    /// The alert carries mutations (status, enrichment data) forward from
    /// one playbook into the next; the engine holds the sole mutable
    /// reference for the duration of the run. An empty result means no
    /// playbook matched, which is not an error at this layer.
    pub async fn run_playbooks_for_alert(
        &self,
        alert: &mut Alert,
    ) -> Vec<PlaybookExecutionResult> {
        let matching = self.find_matching(alert).await;
        info!(
            alert_id = %alert.id,
            matching = matching.len(),
            "Running playbooks for alert"
        );

        let mut results = Vec::with_capacity(matching.len());
        for playbook in matching {
            results.push(self.execute_playbook(&playbook, alert).await);
        }
        results
    }

    async fn execute_playbook(
        &self,
        playbook: &Playbook,
        alert: &mut Alert,
    ) -> PlaybookExecutionResult {
        info!(playbook = %playbook.name, alert_id = %alert.id, "Executing playbook");
        alert.status = AlertStatus::Processing;

        let mut actions_executed = Vec::with_capacity(playbook.actions.len());
        let mut overall_success = true;

        // Strictly sequential: each action observes its predecessors'
        // mutations, and every action runs regardless of earlier failures.
        for action in &playbook.actions {
            let outcome = self.executor.execute(action, alert).await;
            if !outcome.success {
                warn!(
                    playbook = %playbook.name,
                    action = %outcome.action,
                    message = %outcome.message,
                    "Playbook action failed"
                );
                overall_success = false;
            }
            actions_executed.push(outcome);
        }

        alert.status = if overall_success {
            AlertStatus::Completed
        } else {
            AlertStatus::Failed
        };

        PlaybookExecutionResult {
            playbook_id: playbook.id,
            playbook_name: playbook.name.clone(),
            alert_id: alert.id,
            success: overall_success,
            actions_executed,
            error: None,
        }
    }

    // Reliability surface

    pub async fn breaker_status(&self, name: &str) -> Result<CircuitBreakerStatus> {
        for breaker in [&self.enrichment_breaker, &self.notification_breaker] {
            if breaker.name() == name {
                return Ok(breaker.status().await);
            }
        }
        Err(Error::NotFound(format!("circuit breaker {}", name)))
    }

    pub async fn breaker_statuses(&self) -> Vec<CircuitBreakerStatus> {
        vec![
            self.enrichment_breaker.status().await,
            self.notification_breaker.status().await,
        ]
    }

    pub async fn dead_letter_entries(
        &self,
        operation_type: Option<OperationType>,
    ) -> Vec<DeadLetterEntry> {
        match operation_type {
            Some(operation_type) => self.dlq.list_by_type(operation_type).await,
            None => self.dlq.list_all().await,
        }
    }

    pub async fn remove_dead_letter_entry(&self, id: Uuid) -> bool {
        self.dlq.remove(id).await
    }

    pub async fn clear_dead_letter_queue(&self) -> usize {
        self.dlq.clear().await
    }

    pub async fn dead_letter_stats(&self) -> DlqStats {
        self.dlq.stats().await
    }
}
