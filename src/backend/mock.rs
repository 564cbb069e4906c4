use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::backend::DetectionBackend;
use crate::config::AppConfig;
use crate::core::classifier::{Assessment, MAX_DOMAIN_AGE_DAYS, MAX_REDIRECTS};
use crate::core::error::ShieldError;
use crate::core::types::{ScanDetails, Severity, ThreatIntelligence, UsageStats};

/// Evidence synthesizer used for demos and tests. Scores and sub-fields are
/// uniform random draws; a seed makes the sequence reproducible.
pub struct MockBackend {
    rng: Mutex<StdRng>,
    latency: Duration,
    fixed_score: Option<f64>,
}

impl MockBackend {
    pub fn new(seed: Option<u64>, latency: Duration) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng: Mutex::new(rng),
            latency,
            fixed_score: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.seed, Duration::from_millis(config.simulated_latency_ms))
    }

    /// Pin the risk score; every other field is still drawn.
    pub fn with_fixed_score(mut self, score: f64) -> Self {
        self.fixed_score = Some(score);
        self
    }

    async fn simulate_round_trip(&self, latency: Duration) {
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn draw(&self) -> Result<Assessment, ShieldError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| ShieldError::Backend("mock rng poisoned".into()))?;

        let risk_score = match self.fixed_score {
            Some(score) => score,
            None => rng.random::<f64>(),
        };
        let ip_address = format!(
            "{}.{}.{}.{}",
            rng.random_range(0..255u8),
            rng.random_range(0..255u8),
            rng.random_range(0..255u8),
            rng.random_range(0..255u8)
        );

        Ok(Assessment {
            risk_score,
            ssl_valid: rng.random::<f64>() > 0.2,
            domain_age: rng.random_range(0..=MAX_DOMAIN_AGE_DAYS),
            redirects: rng.random_range(0..=MAX_REDIRECTS),
            malware_signal: rng.random::<f64>() > 0.5,
            phishing_indicators: Vec::new(),
            details: ScanDetails {
                ip_address,
                location: "United States".to_string(),
                server_info: "nginx/1.18.0".to_string(),
                certificates: vec![
                    "SSL Certificate Valid".to_string(),
                    "Extended Validation".to_string(),
                ],
            },
        })
    }
}

#[async_trait]
impl DetectionBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn assess(&self, url: &str) -> Result<Assessment, ShieldError> {
        self.simulate_round_trip(self.latency).await;
        let assessment = self.draw()?;
        tracing::trace!(url, score = assessment.risk_score, "mock assessment");
        Ok(assessment)
    }

    async fn threats(&self) -> Result<Vec<ThreatIntelligence>, ShieldError> {
        self.simulate_round_trip(self.latency / 2).await;
        threat_catalog()
    }

    async fn usage(&self) -> Result<UsageStats, ShieldError> {
        Ok(UsageStats {
            total_requests: 1_250_000,
            requests_today: 45_000,
            average_response_time_ms: 180,
            uptime_percent: 99.97,
        })
    }
}

fn at(value: &str) -> Result<DateTime<Utc>, ShieldError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ShieldError::Backend(format!("bad catalog timestamp {value}: {e}")))
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn threat_catalog() -> Result<Vec<ThreatIntelligence>, ShieldError> {
    Ok(vec![
        ThreatIntelligence {
            id: "threat_001".into(),
            threat_type: "Phishing Campaign".into(),
            severity: Severity::High,
            description:
                "Banking credential harvesting campaign targeting major financial institutions"
                    .into(),
            indicators: strings(&["suspicious-bank-login.com", "fake-banking-portal.net"]),
            first_seen: at("2024-01-10T08:00:00Z")?,
            last_seen: at("2024-01-15T14:30:00Z")?,
            sources: strings(&["Threat Intelligence Feed", "User Reports"]),
            affected_regions: strings(&["North America", "Europe"]),
        },
        ThreatIntelligence {
            id: "threat_002".into(),
            threat_type: "Malware Distribution".into(),
            severity: Severity::Critical,
            description: "Trojan malware being distributed through fake software download sites"
                .into(),
            indicators: strings(&["free-software-download.org", "cracked-apps-here.com"]),
            first_seen: at("2024-01-12T10:15:00Z")?,
            last_seen: at("2024-01-15T16:45:00Z")?,
            sources: strings(&["Malware Analysis", "Honeypot Network"]),
            affected_regions: strings(&["Global"]),
        },
    ])
}
