//! Client-side selection and counting over a threat snapshot.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::error::ShieldError;
use crate::core::time::active_window;
use crate::core::types::{Severity, ThreatIntelligence};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeverityFilter {
    #[default]
    All,
    Only(Severity),
}

impl SeverityFilter {
    pub fn matches(&self, severity: Severity) -> bool {
        match self {
            SeverityFilter::All => true,
            SeverityFilter::Only(wanted) => *wanted == severity,
        }
    }
}

impl FromStr for SeverityFilter {
    type Err = ShieldError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "all" | "" => Ok(SeverityFilter::All),
            "low" => Ok(SeverityFilter::Only(Severity::Low)),
            "medium" => Ok(SeverityFilter::Only(Severity::Medium)),
            "high" => Ok(SeverityFilter::Only(Severity::High)),
            "critical" => Ok(SeverityFilter::Only(Severity::Critical)),
            other => Err(ShieldError::InvalidInput(format!(
                "unknown severity filter: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    All,
    /// Case-insensitive substring of `threat_type`.
    Contains(String),
}

impl TypeFilter {
    pub fn contains(text: &str) -> Self {
        TypeFilter::Contains(text.to_lowercase())
    }

    fn matches(&self, threat_type_lower: &str) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Contains(needle) => threat_type_lower.contains(&needle.to_lowercase()),
        }
    }
}

impl FromStr for TypeFilter {
    type Err = ShieldError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case("all") {
            Ok(TypeFilter::All)
        } else {
            Ok(TypeFilter::contains(value))
        }
    }
}

/// Display filters applied to a threat list. The default query selects everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ThreatQuery {
    pub search: String,
    pub severity: SeverityFilter,
    pub threat_type: TypeFilter,
}

impl ThreatQuery {
    pub fn matches(&self, threat: &ThreatIntelligence) -> bool {
        let search = self.search.to_lowercase();
        let threat_type = threat.threat_type.to_lowercase();
        let matches_search =
            threat.description.to_lowercase().contains(&search) || threat_type.contains(&search);

        matches_search
            && self.severity.matches(threat.severity)
            && self.threat_type.matches(&threat_type)
    }
}

/// Records satisfying every predicate of `query`, in input order.
pub fn filter_threats<'a>(
    threats: &'a [ThreatIntelligence],
    query: &ThreatQuery,
) -> Vec<&'a ThreatIntelligence> {
    threats.iter().filter(|t| query.matches(t)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ThreatStats {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    /// Seen within the last 24 hours of `now`.
    pub active: usize,
}

/// Counters over the full, unfiltered snapshot. Depends on `now`, so callers
/// recompute it per query.
pub fn summarize(threats: &[ThreatIntelligence], now: DateTime<Utc>) -> ThreatStats {
    let window = active_window();
    threats.iter().fold(
        ThreatStats {
            total: threats.len(),
            ..ThreatStats::default()
        },
        |mut stats, t| {
            match t.severity {
                Severity::Critical => stats.critical += 1,
                Severity::High => stats.high += 1,
                Severity::Low | Severity::Medium => {}
            }
            if now.signed_duration_since(t.last_seen) < window {
                stats.active += 1;
            }
            stats
        },
    )
}
