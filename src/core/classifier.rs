//! Risk classification.
//!
//! `classify` is a pure mapping from a risk score to a [`ScanStatus`]. Everything
//! else on a [`ScanAnalysis`] that depends on the verdict is derived here too, so a
//! backend only has to report raw observations in an [`Assessment`].

use serde::{Deserialize, Serialize};

use crate::core::error::ShieldError;
use crate::core::types::{Reputation, ScanAnalysis, ScanDetails, ScanStatus};

pub const DEFAULT_SAFE_BELOW: f64 = 0.3;
pub const DEFAULT_DANGEROUS_AT: f64 = 0.7;

/// Upper bounds (inclusive) on the evidence a backend may report.
pub const MAX_DOMAIN_AGE_DAYS: u32 = 3649;
pub const MAX_REDIRECTS: u32 = 4;

/// Reported for dangerous URLs when the backend supplied no indicators of its own.
pub const DEFAULT_PHISHING_INDICATORS: [&str; 2] = ["Suspicious domain", "Fake login form"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Thresholds {
    /// Scores strictly below this are safe.
    #[serde(default = "default_safe_below")]
    pub safe_below: f64,
    /// Scores at or above this are dangerous.
    #[serde(default = "default_dangerous_at")]
    pub dangerous_at: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            safe_below: DEFAULT_SAFE_BELOW,
            dangerous_at: DEFAULT_DANGEROUS_AT,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), ShieldError> {
        let ordered = self.safe_below > 0.0
            && self.safe_below < self.dangerous_at
            && self.dangerous_at <= 1.0;
        if ordered {
            Ok(())
        } else {
            Err(ShieldError::Config(format!(
                "thresholds must satisfy 0 < safe_below < dangerous_at <= 1 (got {} / {})",
                self.safe_below, self.dangerous_at
            )))
        }
    }
}

fn default_safe_below() -> f64 {
    DEFAULT_SAFE_BELOW
}

fn default_dangerous_at() -> f64 {
    DEFAULT_DANGEROUS_AT
}

/// Raw observations about one URL, as produced by a detection backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub risk_score: f64,
    pub ssl_valid: bool,
    pub domain_age: u32,
    pub redirects: u32,
    /// Backend's malware verdict. Only surfaces when the URL classifies as dangerous.
    pub malware_signal: bool,
    pub phishing_indicators: Vec<String>,
    pub details: ScanDetails,
}

pub fn classify(risk_score: f64, thresholds: &Thresholds) -> ScanStatus {
    if risk_score < thresholds.safe_below {
        ScanStatus::Safe
    } else if risk_score < thresholds.dangerous_at {
        ScanStatus::Suspicious
    } else {
        ScanStatus::Dangerous
    }
}

pub fn reputation_for(status: ScanStatus) -> Reputation {
    match status {
        ScanStatus::Safe => Reputation::Trusted,
        ScanStatus::Dangerous => Reputation::Malicious,
        ScanStatus::Suspicious | ScanStatus::Scanning => Reputation::Unknown,
    }
}

pub fn derive_analysis(status: ScanStatus, assessment: &Assessment) -> ScanAnalysis {
    let dangerous = status == ScanStatus::Dangerous;
    let phishing_indicators = if !dangerous {
        Vec::new()
    } else if assessment.phishing_indicators.is_empty() {
        DEFAULT_PHISHING_INDICATORS
            .iter()
            .map(|s| s.to_string())
            .collect()
    } else {
        assessment.phishing_indicators.clone()
    };

    ScanAnalysis {
        reputation: reputation_for(status),
        ssl_valid: assessment.ssl_valid,
        content_safe: !dangerous,
        domain_age: assessment.domain_age,
        redirects: assessment.redirects,
        malware_detected: dangerous && assessment.malware_signal,
        phishing_indicators,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(risk_score: f64, malware_signal: bool) -> Assessment {
        Assessment {
            risk_score,
            ssl_valid: true,
            domain_age: 365,
            redirects: 1,
            malware_signal,
            phishing_indicators: Vec::new(),
            details: ScanDetails::default(),
        }
    }

    #[test]
    fn classification_boundaries() {
        let t = Thresholds::default();
        assert_eq!(classify(0.0, &t), ScanStatus::Safe);
        assert_eq!(classify(0.2999, &t), ScanStatus::Safe);
        assert_eq!(classify(0.3, &t), ScanStatus::Suspicious);
        assert_eq!(classify(0.6999, &t), ScanStatus::Suspicious);
        assert_eq!(classify(0.7, &t), ScanStatus::Dangerous);
        assert_eq!(classify(0.9999, &t), ScanStatus::Dangerous);
    }

    #[test]
    fn custom_thresholds_shift_verdicts() {
        let t = Thresholds {
            safe_below: 0.5,
            dangerous_at: 0.9,
        };
        assert_eq!(classify(0.4, &t), ScanStatus::Safe);
        assert_eq!(classify(0.8, &t), ScanStatus::Suspicious);
    }

    #[test]
    fn phishing_indicators_only_when_dangerous() {
        let t = Thresholds::default();
        for score in [0.0, 0.1, 0.3, 0.5, 0.69, 0.7, 0.85, 0.99] {
            let status = classify(score, &t);
            let analysis = derive_analysis(status, &assessment(score, true));
            assert_eq!(
                !analysis.phishing_indicators.is_empty(),
                status == ScanStatus::Dangerous,
                "score {score}"
            );
            assert_eq!(analysis.malware_detected, status == ScanStatus::Dangerous);
            assert_eq!(analysis.content_safe, status != ScanStatus::Dangerous);
        }
    }

    #[test]
    fn dangerous_without_malware_signal_is_not_malware() {
        let analysis = derive_analysis(ScanStatus::Dangerous, &assessment(0.9, false));
        assert!(!analysis.malware_detected);
        assert_eq!(analysis.reputation, Reputation::Malicious);
        assert_eq!(
            analysis.phishing_indicators,
            vec!["Suspicious domain", "Fake login form"]
        );
    }

    #[test]
    fn backend_indicators_are_kept_for_dangerous_urls() {
        let mut a = assessment(0.95, false);
        a.phishing_indicators = vec!["Credential form posts offsite".into()];
        let analysis = derive_analysis(ScanStatus::Dangerous, &a);
        assert_eq!(analysis.phishing_indicators, a.phishing_indicators);

        let safe = derive_analysis(ScanStatus::Safe, &a);
        assert!(safe.phishing_indicators.is_empty());
        assert_eq!(safe.reputation, Reputation::Trusted);
    }

    #[test]
    fn rejects_unordered_thresholds() {
        assert!(Thresholds::default().validate().is_ok());
        let bad = Thresholds {
            safe_below: 0.8,
            dangerous_at: 0.7,
        };
        assert!(matches!(bad.validate(), Err(ShieldError::Config(_))));
        let zero = Thresholds {
            safe_below: 0.0,
            dangerous_at: 0.7,
        };
        assert!(zero.validate().is_err());
    }
}
