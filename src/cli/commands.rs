use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::flags::{Cli, Command, ExportArgs};
use crate::config::{apply_overrides, load_config};
use crate::core::engine::Engine;
use crate::core::output::{render_scan_results, render_threat_report, write_scan_results};
use crate::core::threat::{filter_threats, summarize, ThreatQuery};
use crate::core::time::now_utc;
use crate::core::types::{OutputFormat, ScanResult};

pub async fn run(cli: Cli) -> Result<()> {
    let cfg = load_config(cli.config.as_deref()).context("failed to load config")?;
    let cfg = apply_overrides(cfg, &cli.overrides())?;
    let engine = Engine::new(cfg)?;
    tracing::info!("using {} backend", engine.backend_name());

    match cli.command {
        Command::Scan { url, export } => {
            let result = engine.scan(&url).await?;
            emit_scan_results(&[result], &export)
        }
        Command::Bulk { file, urls, export } => {
            let urls = collect_urls(file.as_deref(), urls)?;
            let results = engine.bulk_scan(&urls).await?;
            emit_scan_results(&results, &export)
        }
        Command::Threats {
            search,
            severity,
            threat_type,
            format,
        } => {
            let query = ThreatQuery {
                search,
                severity: severity.parse()?,
                threat_type: threat_type.parse()?,
            };
            let threats = engine.list_threats().await?;
            let stats = summarize(&threats, now_utc());
            let matches = filter_threats(&threats, &query);
            println!(
                "{}",
                render_threat_report(&matches, &stats, OutputFormat::from(format))?
            );
            Ok(())
        }
        Command::Usage => {
            let stats = engine.usage_stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
    }
}

fn emit_scan_results(results: &[ScanResult], export: &ExportArgs) -> Result<()> {
    let format = OutputFormat::from(export.format);
    match &export.output {
        Some(path) => write_scan_results(results, format, path)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{}", render_scan_results(results, format)?);
            Ok(())
        }
    }
}

fn collect_urls(file: Option<&Path>, mut urls: Vec<String>) -> Result<Vec<String>> {
    if let Some(path) = file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read url list {}", path.display()))?;
        urls.extend(parse_url_lines(&text));
    }
    Ok(urls)
}

/// One url per line; blank lines and `#` comments are dropped.
pub fn parse_url_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_lines_skip_blanks_and_comments() {
        let urls = parse_url_lines("https://a.test\n\n  # staging\n  https://b.test  \n\t\n");
        assert_eq!(urls, vec!["https://a.test", "https://b.test"]);
    }
}
