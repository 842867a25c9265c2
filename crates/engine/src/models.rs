use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

// Alert lifecycle tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Low => write!(f, "low"),
            AlertSeverity::Medium => write!(f, "medium"),
            AlertSeverity::High => write!(f, "high"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for AlertSeverity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(AlertSeverity::Low),
            "medium" => Ok(AlertSeverity::Medium),
            "high" => Ok(AlertSeverity::High),
            "critical" => Ok(AlertSeverity::Critical),
            other => Err(Error::Validation(format!("invalid severity: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Pending,
    Processing,
    Enriched,
    Completed,
    Failed,
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertStatus::Pending => write!(f, "pending"),
            AlertStatus::Processing => write!(f, "processing"),
            AlertStatus::Enriched => write!(f, "enriched"),
            AlertStatus::Completed => write!(f, "completed"),
            AlertStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSource {
    Edr,
    Siem,
    Firewall,
    Ids,
    Email,
    Custom,
}

impl fmt::Display for AlertSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSource::Edr => write!(f, "edr"),
            AlertSource::Siem => write!(f, "siem"),
            AlertSource::Firewall => write!(f, "firewall"),
            AlertSource::Ids => write!(f, "ids"),
            AlertSource::Email => write!(f, "email"),
            AlertSource::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for AlertSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "edr" => Ok(AlertSource::Edr),
            "siem" => Ok(AlertSource::Siem),
            "firewall" => Ok(AlertSource::Firewall),
            "ids" => Ok(AlertSource::Ids),
            "email" => Ok(AlertSource::Email),
            "custom" => Ok(AlertSource::Custom),
            other => Err(Error::Validation(format!("invalid alert source: {}", other))),
        }
    }
}

/// Keys of the enrichment-data mapping on an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    SourceIp,
    DestinationIp,
    Domain,
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::SourceIp => write!(f, "source_ip"),
            IndicatorKind::DestinationIp => write!(f, "destination_ip"),
            IndicatorKind::Domain => write!(f, "domain"),
        }
    }
}

/// A security alert to be processed by the engine.
///
/// The caller owns the alert; `run_playbooks_for_alert` takes the sole
/// mutable reference for the duration of a run and updates `status` and
/// `enrichment_data` in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub severity: AlertSeverity,
    pub source: AlertSource,
    pub source_ip: Option<String>,
    pub destination_ip: Option<String>,
    pub domain: Option<String>,
    pub file_hash: Option<String>,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub enrichment_data: HashMap<IndicatorKind, JsonValue>,
}

impl Alert {
    pub fn new(title: impl Into<String>, severity: AlertSeverity, source: AlertSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            severity,
            source,
            source_ip: None,
            destination_ip: None,
            domain: None,
            file_hash: None,
            status: AlertStatus::Pending,
            created_at: Utc::now(),
            enrichment_data: HashMap::new(),
        }
    }
}

// Playbook definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    EnrichAll,
    EnrichIp,
    EnrichDomain,
    Notify,
    CreateTicket,
    BlockIp,
    IsolateHost,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::EnrichAll => write!(f, "enrich_all"),
            ActionType::EnrichIp => write!(f, "enrich_ip"),
            ActionType::EnrichDomain => write!(f, "enrich_domain"),
            ActionType::Notify => write!(f, "notify"),
            ActionType::CreateTicket => write!(f, "create_ticket"),
            ActionType::BlockIp => write!(f, "block_ip"),
            ActionType::IsolateHost => write!(f, "isolate_host"),
        }
    }
}

/// A single action within a playbook's ordered action list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub config: Option<JsonValue>,
}

impl PlaybookAction {
    pub fn new(action_type: ActionType) -> Self {
        Self {
            action_type,
            config: None,
        }
    }

    pub fn with_config(action_type: ActionType, config: JsonValue) -> Self {
        Self {
            action_type,
            config: Some(config),
        }
    }
}

/// Conditions that determine when a playbook runs. All present conditions
/// must hold; absent conditions are vacuously true.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerCondition {
    pub min_severity: Option<AlertSeverity>,
    pub source_types: Option<Vec<AlertSource>>,
    pub keywords: Option<Vec<String>>,
}

/// An automated response playbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playbook {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub trigger: TriggerCondition,
    pub actions: Vec<PlaybookAction>,
}

/// Input for registering a new playbook (without the assigned id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookSpec {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub trigger: TriggerCondition,
    pub actions: Vec<PlaybookAction>,
}

fn default_enabled() -> bool {
    true
}

// Execution results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action: ActionType,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookExecutionResult {
    pub playbook_id: Uuid,
    pub playbook_name: String,
    pub alert_id: Uuid,
    pub success: bool,
    pub actions_executed: Vec<ActionOutcome>,
    pub error: Option<String>,
}
