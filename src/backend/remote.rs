use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use crate::backend::DetectionBackend;
use crate::config::AppConfig;
use crate::core::classifier::Assessment;
use crate::core::error::ShieldError;
use crate::core::types::{ScanDetails, Severity, ThreatIntelligence, UsageStats};

/// Client for a detection service speaking the `/scan`, `/threats`, `/usage` API.
pub struct RemoteBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct ScanRequest<'a> {
    url: &'a str,
    detailed: bool,
}

#[derive(Deserialize)]
struct ScanResponse {
    risk_score: f64,
    analysis: WireAnalysis,
    #[serde(default)]
    details: ScanDetails,
}

#[derive(Deserialize)]
struct WireAnalysis {
    #[serde(default)]
    ssl_valid: bool,
    #[serde(default)]
    domain_age: u32,
    #[serde(default)]
    redirects: u32,
    #[serde(default)]
    malware_detected: bool,
    #[serde(default)]
    phishing_indicators: Vec<String>,
}

#[derive(Deserialize)]
struct ThreatsResponse {
    threats: Vec<WireThreat>,
}

#[derive(Deserialize)]
struct WireThreat {
    id: String,
    #[serde(alias = "type")]
    threat_type: String,
    severity: Severity,
    #[serde(default)]
    description: String,
    #[serde(default)]
    indicators: Vec<String>,
    first_seen: DateTime<Utc>,
    #[serde(default)]
    last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default)]
    affected_regions: Vec<String>,
}

impl TryFrom<WireThreat> for ThreatIntelligence {
    type Error = ShieldError;

    fn try_from(w: WireThreat) -> Result<Self, Self::Error> {
        let last_seen = w.last_seen.unwrap_or(w.first_seen);
        if last_seen < w.first_seen {
            return Err(ShieldError::Backend(format!(
                "threat {} has last_seen before first_seen",
                w.id
            )));
        }
        Ok(ThreatIntelligence {
            id: w.id,
            threat_type: w.threat_type,
            severity: w.severity,
            description: w.description,
            indicators: w.indicators,
            first_seen: w.first_seen,
            last_seen,
            sources: w.sources,
            affected_regions: w.affected_regions,
        })
    }
}

impl RemoteBackend {
    pub fn new(config: &AppConfig) -> Result<Self, ShieldError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ShieldError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl DetectionBackend for RemoteBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn assess(&self, url: &str) -> Result<Assessment, ShieldError> {
        let request = self
            .client
            .post(self.endpoint("scan"))
            .json(&ScanRequest { url, detailed: true });
        let body: ScanResponse = self
            .authorize(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(Assessment {
            risk_score: body.risk_score,
            ssl_valid: body.analysis.ssl_valid,
            domain_age: body.analysis.domain_age,
            redirects: body.analysis.redirects,
            malware_signal: body.analysis.malware_detected,
            phishing_indicators: body.analysis.phishing_indicators,
            details: body.details,
        })
    }

    async fn threats(&self) -> Result<Vec<ThreatIntelligence>, ShieldError> {
        let request = self.client.get(self.endpoint("threats"));
        let body: ThreatsResponse = self
            .authorize(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        body.threats.into_iter().map(ThreatIntelligence::try_from).collect()
    }

    async fn usage(&self) -> Result<UsageStats, ShieldError> {
        let request = self.client.get(self.endpoint("usage"));
        let stats = self
            .authorize(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(stats)
    }
}
