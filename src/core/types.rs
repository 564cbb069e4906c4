use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Verdict for a scanned URL.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Safe,
    Suspicious,
    Dangerous,
    /// Progress placeholder for renderers. Never returned by the engine.
    Scanning,
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanStatus::Safe => write!(f, "safe"),
            ScanStatus::Suspicious => write!(f, "suspicious"),
            ScanStatus::Dangerous => write!(f, "dangerous"),
            ScanStatus::Scanning => write!(f, "scanning"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Reputation {
    Trusted,
    Unknown,
    Malicious,
}

impl fmt::Display for Reputation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reputation::Trusted => write!(f, "trusted"),
            Reputation::Unknown => write!(f, "unknown"),
            Reputation::Malicious => write!(f, "malicious"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanAnalysis {
    pub reputation: Reputation,
    pub ssl_valid: bool,
    pub content_safe: bool,
    /// Days since registration.
    pub domain_age: u32,
    pub redirects: u32,
    pub malware_detected: bool,
    pub phishing_indicators: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ScanDetails {
    pub ip_address: String,
    pub location: String,
    pub server_info: String,
    pub certificates: Vec<String>,
}

/// One evaluation of a single URL. Built once by the engine, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanResult {
    pub id: String,
    pub url: String,
    pub status: ScanStatus,
    pub risk_score: f64,
    pub timestamp: DateTime<Utc>,
    pub analysis: ScanAnalysis,
    pub details: ScanDetails,
}

/// Threat impact, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThreatIntelligence {
    pub id: String,
    pub threat_type: String,
    pub severity: Severity,
    pub description: String,
    pub indicators: Vec<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub sources: Vec<String>,
    pub affected_regions: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct UsageStats {
    pub total_requests: u64,
    pub requests_today: u64,
    pub average_response_time_ms: u64,
    pub uptime_percent: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Jsonl,
    Markdown,
    Csv,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_use_lowercase_wire_names() {
        assert_eq!(
            serde_json::to_string(&ScanStatus::Dangerous).unwrap(),
            "\"dangerous\""
        );
        assert_eq!(
            serde_json::from_str::<Severity>("\"critical\"").unwrap(),
            Severity::Critical
        );
        assert!(Severity::Critical > Severity::High);
    }
}
