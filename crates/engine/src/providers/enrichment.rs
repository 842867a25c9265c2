//! Threat-intelligence enrichment backed by AbuseIPDB and VirusTotal.
//!
//! Without API keys the client serves deterministic offline records so the
//! engine works end-to-end with zero external dependencies. The same record
//! shape (tagged `"source": "degraded"`) stands in when the circuit is open
//! or retries are exhausted.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use super::EnrichmentProvider;
use crate::config::EnrichmentConfig;
use crate::{Error, Result};

const ABUSEIPDB_URL: &str = "https://api.abuseipdb.com/api/v2/check";
const VIRUSTOTAL_URL: &str = "https://www.virustotal.com/api/v3/domains";

pub struct ThreatIntelClient {
    client: Client,
    abuseipdb_api_key: Option<String>,
    virustotal_api_key: Option<String>,
}

impl ThreatIntelClient {
    pub fn new(config: &EnrichmentConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            abuseipdb_api_key: config.abuseipdb_api_key.clone(),
            virustotal_api_key: config.virustotal_api_key.clone(),
        })
    }
}

#[async_trait]
impl EnrichmentProvider for ThreatIntelClient {
    async fn enrich_ip(&self, ip: &str) -> Result<JsonValue> {
        let Some(api_key) = &self.abuseipdb_api_key else {
            debug!(ip, "No AbuseIPDB key configured, serving offline record");
            return Ok(offline_ip_record(ip, "mock"));
        };

        let response = self
            .client
            .get(ABUSEIPDB_URL)
            .query(&[("ipAddress", ip), ("maxAgeInDays", "90")])
            .header("Key", api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::Transient(format!("AbuseIPDB request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Transient(format!(
                "AbuseIPDB returned status {}",
                response.status()
            )));
        }

        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| Error::Transient(format!("AbuseIPDB response unreadable: {}", e)))?;
        let data = body.get("data").cloned().unwrap_or_default();

        Ok(json!({
            "ip": ip,
            "source": "abuseipdb",
            "data": {
                "is_public": data.get("isPublic"),
                "abuse_confidence_score": data.get("abuseConfidenceScore"),
                "country_code": data.get("countryCode"),
                "isp": data.get("isp"),
                "domain": data.get("domain"),
                "total_reports": data.get("totalReports"),
                "is_tor": data.get("isTor"),
                "is_whitelisted": data.get("isWhitelisted"),
            },
        }))
    }

    async fn enrich_domain(&self, domain: &str) -> Result<JsonValue> {
        let Some(api_key) = &self.virustotal_api_key else {
            debug!(domain, "No VirusTotal key configured, serving offline record");
            return Ok(offline_domain_record(domain, "mock"));
        };

        let response = self
            .client
            .get(format!("{}/{}", VIRUSTOTAL_URL, domain))
            .header("x-apikey", api_key)
            .send()
            .await
            .map_err(|e| Error::Transient(format!("VirusTotal request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Transient(format!(
                "VirusTotal returned status {}",
                response.status()
            )));
        }

        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| Error::Transient(format!("VirusTotal response unreadable: {}", e)))?;
        let attributes = body
            .pointer("/data/attributes")
            .cloned()
            .unwrap_or_default();
        let stats = attributes
            .get("last_analysis_stats")
            .cloned()
            .unwrap_or_default();

        Ok(json!({
            "domain": domain,
            "source": "virustotal",
            "data": {
                "malicious_votes": stats.get("malicious").cloned().unwrap_or(json!(0)),
                "suspicious_votes": stats.get("suspicious").cloned().unwrap_or(json!(0)),
                "harmless_votes": stats.get("harmless").cloned().unwrap_or(json!(0)),
                "reputation": attributes.get("reputation"),
                "registrar": attributes.get("registrar"),
                "creation_date": attributes.get("creation_date"),
            },
        }))
    }
}

/// Deterministic IP intel record used when no API key is configured
/// (`source: "mock"`) or when the reliability layer degrades the lookup
/// (`source: "degraded"`).
pub fn offline_ip_record(ip: &str, source: &str) -> JsonValue {
    json!({
        "ip": ip,
        "source": source,
        "data": {
            "is_public": true,
            "abuse_confidence_score": 75,
            "country_code": "RU",
            "isp": "Mock ISP Provider",
            "domain": "mock-domain.com",
            "total_reports": 42,
            "is_tor": false,
            "is_whitelisted": false,
        },
    })
}

/// Deterministic domain intel record, same role as [`offline_ip_record`].
pub fn offline_domain_record(domain: &str, source: &str) -> JsonValue {
    json!({
        "domain": domain,
        "source": source,
        "data": {
            "malicious_votes": 3,
            "suspicious_votes": 2,
            "harmless_votes": 65,
            "reputation": -5,
            "registrar": "Mock Registrar Inc.",
            "creation_date": "2020-01-15",
        },
    })
}
