//! In-memory dead-letter queue for operations that failed beyond retry.
//!
//! Bounded ring: insertion beyond capacity evicts the oldest entry, never
//! the newest. Purely an audit/replay surface; nothing is redelivered
//! automatically.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use super::OperationType;

pub const DEFAULT_MAX_SIZE: usize = 1_000;

/// Entries are never redelivered by the queue itself, so they stay pending
/// until removed or cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeadLetterStatus {
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub id: Uuid,
    pub operation_type: OperationType,
    pub payload: JsonValue,
    pub error: String,
    pub alert_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub retry_count: u32,
    pub status: DeadLetterStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqStats {
    pub total_entries: usize,
    pub max_size: usize,
    pub by_type: HashMap<OperationType, usize>,
}

pub struct DeadLetterQueue {
    max_size: usize,
    entries: Mutex<VecDeque<DeadLetterEntry>>,
}

impl DeadLetterQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Record a permanently failed operation, evicting the oldest entry if
    /// the queue is at capacity.
    pub async fn add(
        &self,
        operation_type: OperationType,
        payload: JsonValue,
        error: impl Into<String>,
        alert_id: Option<Uuid>,
    ) -> DeadLetterEntry {
        let entry = DeadLetterEntry {
            id: Uuid::new_v4(),
            operation_type,
            payload,
            error: error.into(),
            alert_id,
            created_at: Utc::now(),
            retry_count: 0,
            status: DeadLetterStatus::Pending,
        };

        let mut entries = self.entries.lock().await;
        if entries.len() >= self.max_size {
            entries.pop_front();
        }
        entries.push_back(entry.clone());

        warn!(
            operation = %operation_type,
            alert_id = ?alert_id,
            error = %entry.error,
            queue_size = entries.len(),
            "Added entry to dead-letter queue"
        );
        entry
    }

    pub async fn list_all(&self) -> Vec<DeadLetterEntry> {
        self.entries.lock().await.iter().cloned().collect()
    }

    pub async fn list_by_type(&self, operation_type: OperationType) -> Vec<DeadLetterEntry> {
        self.entries
            .lock()
            .await
            .iter()
            .filter(|e| e.operation_type == operation_type)
            .cloned()
            .collect()
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.iter().position(|e| e.id == id) {
            Some(index) => entries.remove(index).is_some(),
            None => false,
        }
    }

    /// Drop every entry, returning how many were removed.
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let count = entries.len();
        entries.clear();
        count
    }

    pub async fn stats(&self) -> DlqStats {
        let entries = self.entries.lock().await;
        let mut by_type: HashMap<OperationType, usize> = HashMap::new();
        for entry in entries.iter() {
            *by_type.entry(entry.operation_type).or_insert(0) += 1;
        }
        DlqStats {
            total_entries: entries.len(),
            max_size: self.max_size,
            by_type,
        }
    }
}

impl Default for DeadLetterQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE)
    }
}
