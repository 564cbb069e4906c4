use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::core::error::ShieldError;
use crate::core::threat::ThreatStats;
use crate::core::time::now_utc;
use crate::core::types::{OutputFormat, ScanResult, ThreatIntelligence};

pub const CSV_HEADER: &str = "URL,Status,Risk Score,SSL Valid,Malware Detected,Timestamp";
pub const THREAT_CSV_HEADER: [&str; 6] =
    ["ID", "Type", "Severity", "Description", "First Seen", "Last Seen"];

pub fn write_scan_results(
    results: &[ScanResult],
    format: OutputFormat,
    path: &Path,
) -> Result<(), ShieldError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let body = render_scan_results(results, format)?;
    fs::write(path, body)?;
    tracing::info!("wrote {} scan results to {}", results.len(), path.display());
    Ok(())
}

pub fn render_scan_results(
    results: &[ScanResult],
    format: OutputFormat,
) -> Result<String, ShieldError> {
    match format {
        OutputFormat::Csv => scan_results_csv(results),
        OutputFormat::Json => to_json_pretty(results),
        OutputFormat::Jsonl => {
            let mut lines = String::new();
            for result in results {
                lines.push_str(&to_json(result)?);
                lines.push('\n');
            }
            Ok(lines)
        }
        OutputFormat::Markdown => Ok(scan_results_markdown(results)),
    }
}

/// One header row plus one row per result, joined with `\n`.
pub fn scan_results_csv(results: &[ScanResult]) -> Result<String, ShieldError> {
    let mut writer = csv_writer();
    writer.write_record(CSV_HEADER.split(',')).map_err(csv_error)?;
    for r in results {
        writer
            .write_record([
                r.url.clone(),
                r.status.to_string(),
                format!("{:.2}", r.risk_score),
                r.analysis.ssl_valid.to_string(),
                r.analysis.malware_detected.to_string(),
                iso_timestamp(&r.timestamp),
            ])
            .map_err(csv_error)?;
    }
    finish_csv(writer)
}

fn threats_csv(matches: &[&ThreatIntelligence]) -> Result<String, ShieldError> {
    let mut writer = csv_writer();
    writer.write_record(THREAT_CSV_HEADER).map_err(csv_error)?;
    for t in matches {
        writer
            .write_record([
                t.id.clone(),
                t.threat_type.clone(),
                t.severity.to_string(),
                t.description.clone(),
                iso_timestamp(&t.first_seen),
                iso_timestamp(&t.last_seen),
            ])
            .map_err(csv_error)?;
    }
    finish_csv(writer)
}

fn csv_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

// Rows are joined, not terminated: the table carries no trailing newline.
fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<String, ShieldError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| ShieldError::Backend(format!("csv export failed: {}", e.error())))?;
    let mut out = String::from_utf8(bytes)
        .map_err(|e| ShieldError::Backend(format!("csv export failed: {e}")))?;
    if out.ends_with('\n') {
        out.pop();
    }
    Ok(out)
}

fn csv_error(err: csv::Error) -> ShieldError {
    ShieldError::Backend(format!("csv export failed: {err}"))
}

fn iso_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn scan_results_markdown(results: &[ScanResult]) -> String {
    let mut out = String::new();
    out.push_str("# SecureURL Scan Results\n\n");
    out.push_str(&format!("Generated: {}\n\n", now_utc().to_rfc3339()));
    if results.is_empty() {
        out.push_str("_No scan results._\n");
    }
    for r in results {
        out.push_str(&format!("## {} ({})\n", r.url, r.status));
        out.push_str(&format!(
            "- Risk score: {:.2}\n- Reputation: {}\n- SSL valid: {}\n- Content safe: {}\n- Domain age: {} days\n- Redirects: {}\n- Malware detected: {}\n- IP: {} ({})\n- Server: {}\n- Scanned: {}\n",
            r.risk_score,
            r.analysis.reputation,
            r.analysis.ssl_valid,
            r.analysis.content_safe,
            r.analysis.domain_age,
            r.analysis.redirects,
            r.analysis.malware_detected,
            r.details.ip_address,
            r.details.location,
            r.details.server_info,
            iso_timestamp(&r.timestamp)
        ));
        if !r.analysis.phishing_indicators.is_empty() {
            out.push_str("- Phishing indicators:\n");
            for ind in &r.analysis.phishing_indicators {
                out.push_str(&format!("  - {ind}\n"));
            }
        }
        out.push('\n');
    }
    out
}

#[derive(Serialize)]
struct ThreatReport<'a> {
    stats: &'a ThreatStats,
    threats: &'a [&'a ThreatIntelligence],
}

/// Filtered threat list together with counters over the full snapshot.
pub fn render_threat_report(
    matches: &[&ThreatIntelligence],
    stats: &ThreatStats,
    format: OutputFormat,
) -> Result<String, ShieldError> {
    match format {
        OutputFormat::Json => to_json_pretty(&ThreatReport {
            stats,
            threats: matches,
        }),
        OutputFormat::Jsonl => {
            let mut lines = String::new();
            for t in matches {
                lines.push_str(&to_json(t)?);
                lines.push('\n');
            }
            Ok(lines)
        }
        OutputFormat::Markdown => Ok(threats_markdown(matches, stats)),
        OutputFormat::Csv => threats_csv(matches),
    }
}

fn threats_markdown(matches: &[&ThreatIntelligence], stats: &ThreatStats) -> String {
    let mut out = String::new();
    out.push_str("# Threat Intelligence\n\n");
    out.push_str(&format!(
        "Total: {} | Critical: {} | High: {} | Active (24h): {}\n\n",
        stats.total, stats.critical, stats.high, stats.active
    ));
    if matches.is_empty() {
        out.push_str("_No threats match the current filters._\n");
    }
    for t in matches {
        out.push_str(&format!("## {} [{}] {}\n", t.threat_type, t.severity, t.id));
        out.push_str(&format!(
            "{}\n- Indicators: {}\n- First seen: {}\n- Last seen: {}\n- Sources: {}\n- Regions: {}\n\n",
            t.description,
            t.indicators.join(", "),
            t.first_seen.to_rfc3339(),
            t.last_seen.to_rfc3339(),
            t.sources.join(", "),
            t.affected_regions.join(", ")
        ));
    }
    out
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ShieldError> {
    serde_json::to_string(value).map_err(|e| ShieldError::Backend(e.to_string()))
}

fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String, ShieldError> {
    serde_json::to_string_pretty(value).map_err(|e| ShieldError::Backend(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Reputation, ScanAnalysis, ScanDetails, ScanStatus, Severity};
    use chrono::TimeZone;

    fn result(url: &str, risk_score: f64, status: ScanStatus) -> ScanResult {
        ScanResult {
            id: "scan_1".into(),
            url: url.into(),
            status,
            risk_score,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
            analysis: ScanAnalysis {
                reputation: Reputation::Unknown,
                ssl_valid: true,
                content_safe: true,
                domain_age: 100,
                redirects: 0,
                malware_detected: false,
                phishing_indicators: vec![],
            },
            details: ScanDetails::default(),
        }
    }

    #[test]
    fn csv_has_header_and_two_decimal_scores() {
        let csv = scan_results_csv(&[
            result("https://example.com", 0.123, ScanStatus::Safe),
            result("https://b.example", 0.5, ScanStatus::Suspicious),
        ])
        .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            "https://example.com,safe,0.12,true,false,2024-01-15T10:30:00.000Z"
        );
        assert_eq!(
            lines[2],
            "https://b.example,suspicious,0.50,true,false,2024-01-15T10:30:00.000Z"
        );
        assert!(!csv.ends_with('\n'));
    }

    #[test]
    fn csv_quotes_fields_with_commas() {
        let csv = scan_results_csv(&[result("https://x.test/?a=\"1,2\"", 0.1, ScanStatus::Safe)])
            .unwrap();
        assert!(csv
            .lines()
            .nth(1)
            .unwrap()
            .starts_with("\"https://x.test/?a=\"\"1,2\"\"\",safe,0.10"));
    }

    #[test]
    fn empty_results_render_header_only() {
        assert_eq!(scan_results_csv(&[]).unwrap(), CSV_HEADER);
    }

    #[test]
    fn threat_report_renders_csv_rows() {
        let at = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
        let threat = ThreatIntelligence {
            id: "threat_001".into(),
            threat_type: "Phishing Campaign".into(),
            severity: Severity::High,
            description: "Banking credential harvesting, major banks".into(),
            indicators: vec!["suspicious-bank.com".into()],
            first_seen: at,
            last_seen: at,
            sources: vec![],
            affected_regions: vec![],
        };
        let stats = ThreatStats::default();
        let out = render_threat_report(&[&threat], &stats, OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "ID,Type,Severity,Description,First Seen,Last Seen");
        assert_eq!(
            lines[1],
            "threat_001,Phishing Campaign,high,\"Banking credential harvesting, major banks\",2024-01-10T08:00:00.000Z,2024-01-10T08:00:00.000Z"
        );
        assert!(!out.starts_with('#'));
    }

    #[test]
    fn jsonl_has_one_line_per_result() {
        let out = render_scan_results(
            &[
                result("https://a.test", 0.1, ScanStatus::Safe),
                result("https://b.test", 0.8, ScanStatus::Dangerous),
            ],
            OutputFormat::Jsonl,
        )
        .unwrap();
        assert_eq!(out.lines().count(), 2);
        assert!(out.contains("\"status\":\"dangerous\""));
    }
}
