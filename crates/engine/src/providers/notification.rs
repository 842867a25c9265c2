//! Slack webhook notifications for processed alerts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use tracing::info;

use super::NotificationProvider;
use crate::config::NotificationConfig;
use crate::models::{Alert, AlertSeverity};
use crate::{Error, Result};

const WEBHOOK_TIMEOUT_SECS: u64 = 10;

pub struct SlackNotifier {
    client: Client,
    webhook_url: Option<String>,
}

impl SlackNotifier {
    pub fn new(config: &NotificationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            webhook_url: config.slack_webhook_url.clone(),
        })
    }
}

#[async_trait]
impl NotificationProvider for SlackNotifier {
    async fn send(&self, message: &str, channel: &str, alert: &Alert) -> Result<()> {
        let Some(webhook_url) = &self.webhook_url else {
            info!(channel, "Slack webhook not configured, delivery simulated");
            return Ok(());
        };

        let payload = build_slack_payload(message, channel, alert);
        let response = self
            .client
            .post(webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Transient(format!("Slack request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Transient(format!(
                "Slack returned status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

fn build_slack_payload(message: &str, channel: &str, alert: &Alert) -> JsonValue {
    let mut fields = vec![
        json!({
            "title": "Alert",
            "value": format!("{} {}", severity_emoji(alert.severity), alert.title),
            "short": false,
        }),
        json!({ "title": "Severity", "value": alert.severity.to_string(), "short": true }),
        json!({ "title": "Source", "value": alert.source.to_string(), "short": true }),
        json!({ "title": "Status", "value": alert.status.to_string(), "short": true }),
        json!({ "title": "Alert ID", "value": alert.id.to_string(), "short": true }),
    ];
    if let Some(source_ip) = &alert.source_ip {
        fields.push(json!({ "title": "Source IP", "value": source_ip, "short": true }));
    }

    json!({
        "channel": channel,
        "username": "SOAREngine",
        "icon_emoji": ":shield:",
        "text": message,
        "attachments": [{
            "color": severity_color(alert.severity),
            "fields": fields,
        }],
    })
}

fn severity_emoji(severity: AlertSeverity) -> &'static str {
    match severity {
        AlertSeverity::Low => "\u{1f7e2}",
        AlertSeverity::Medium => "\u{1f7e1}",
        AlertSeverity::High => "\u{1f7e0}",
        AlertSeverity::Critical => "\u{1f534}",
    }
}

fn severity_color(severity: AlertSeverity) -> &'static str {
    match severity {
        AlertSeverity::Low => "#36a64f",
        AlertSeverity::Medium => "#ffcc00",
        AlertSeverity::High => "#ff9900",
        AlertSeverity::Critical => "#ff0000",
    }
}
