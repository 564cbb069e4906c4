use std::{fs, path::Path};

use serde::Deserialize;

use crate::core::classifier::Thresholds;
use crate::core::error::ShieldError;

pub const DEFAULT_CONFIG_PATH: &str = "config/secureurl.toml";
pub const API_KEY_ENV: &str = "SECUREURL_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local generator standing in for a detection service.
    #[default]
    Mock,
    /// HTTP detection service at `base_url`.
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// HTTP client timeout for the remote backend.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Deadline for one backend call, once the scan holds a permit.
    #[serde(default = "default_scan_timeout_ms")]
    pub scan_timeout_ms: u64,
    #[serde(default)]
    pub batch_timeout_ms: Option<u64>,
    #[serde(default = "default_max_concurrent_scans")]
    pub max_concurrent_scans: usize,
    #[serde(default = "default_max_bulk_urls")]
    pub max_bulk_urls: usize,
    /// Service time the mock backend simulates per scan.
    #[serde(default = "default_simulated_latency_ms")]
    pub simulated_latency_ms: u64,
    /// Seeds the mock backend for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl Default for AppConfig {
    fn default() -> Self {
        default_config()
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ShieldError> {
        self.thresholds.validate()?;
        if self.max_concurrent_scans == 0 {
            return Err(ShieldError::Config(
                "max_concurrent_scans must be at least 1".into(),
            ));
        }
        if self.max_bulk_urls == 0 {
            return Err(ShieldError::Config("max_bulk_urls must be at least 1".into()));
        }
        if self.scan_timeout_ms == 0 {
            return Err(ShieldError::Config("scan_timeout_ms must be positive".into()));
        }
        if self.backend == BackendKind::Remote && self.base_url.trim().is_empty() {
            return Err(ShieldError::Config(
                "base_url is required for the remote backend".into(),
            ));
        }
        Ok(())
    }
}

/// Command-line overrides layered on top of the file config.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend: Option<BackendKind>,
    pub base_url: Option<String>,
    pub max_concurrent_scans: Option<usize>,
    pub simulated_latency_ms: Option<u64>,
    pub seed: Option<u64>,
}

pub fn load_config(path: Option<&str>) -> Result<AppConfig, ShieldError> {
    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    let path = path.map(Path::new).unwrap_or(default_path);

    let mut cfg = if path.exists() {
        let content = fs::read_to_string(path).map_err(|e| ShieldError::Config(e.to_string()))?;
        parse_config(&content)?
    } else {
        tracing::debug!("no config at {}, using defaults", path.display());
        default_config()
    };

    if cfg.api_key.is_none() {
        cfg.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty());
    }
    cfg.validate()?;
    Ok(cfg)
}

pub fn parse_config(content: &str) -> Result<AppConfig, ShieldError> {
    toml::from_str(content).map_err(|e| ShieldError::Config(e.to_string()))
}

pub fn apply_overrides(cfg: AppConfig, overrides: &Overrides) -> Result<AppConfig, ShieldError> {
    let mut cfg = cfg;
    if let Some(backend) = overrides.backend {
        cfg.backend = backend;
    }
    if let Some(base_url) = &overrides.base_url {
        cfg.base_url = base_url.clone();
    }
    if let Some(n) = overrides.max_concurrent_scans {
        cfg.max_concurrent_scans = n;
    }
    if let Some(ms) = overrides.simulated_latency_ms {
        cfg.simulated_latency_ms = ms;
    }
    if overrides.seed.is_some() {
        cfg.seed = overrides.seed;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn default_base_url() -> String {
    "https://api.secureurl.com/v1".to_string()
}

fn default_user_agent() -> String {
    format!("secureurl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_scan_timeout_ms() -> u64 {
    30_000
}

fn default_max_concurrent_scans() -> usize {
    8
}

fn default_max_bulk_urls() -> usize {
    100
}

fn default_simulated_latency_ms() -> u64 {
    2_000
}

fn default_config() -> AppConfig {
    AppConfig {
        backend: BackendKind::Mock,
        base_url: default_base_url(),
        api_key: None,
        user_agent: default_user_agent(),
        timeout_ms: default_timeout_ms(),
        scan_timeout_ms: default_scan_timeout_ms(),
        batch_timeout_ms: None,
        max_concurrent_scans: default_max_concurrent_scans(),
        max_bulk_urls: default_max_bulk_urls(),
        simulated_latency_ms: default_simulated_latency_ms(),
        seed: None,
        thresholds: Thresholds::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = load_config(Some("does/not/exist.toml")).unwrap();
        assert_eq!(cfg.backend, BackendKind::Mock);
        assert_eq!(cfg.max_bulk_urls, 100);
        assert_eq!(cfg.simulated_latency_ms, 2_000);
        assert_eq!(cfg.thresholds, Thresholds::default());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg = parse_config(
            r#"
            backend = "remote"
            base_url = "http://localhost:8080/v1"
            max_concurrent_scans = 2

            [thresholds]
            dangerous_at = 0.8
            "#,
        )
        .unwrap();
        assert_eq!(cfg.backend, BackendKind::Remote);
        assert_eq!(cfg.max_concurrent_scans, 2);
        assert_eq!(cfg.thresholds.safe_below, 0.3);
        assert_eq!(cfg.thresholds.dangerous_at, 0.8);
        assert_eq!(cfg.scan_timeout_ms, 30_000);
    }

    #[test]
    fn overrides_are_validated() {
        let overrides = Overrides {
            max_concurrent_scans: Some(0),
            ..Overrides::default()
        };
        assert!(matches!(
            apply_overrides(default_config(), &overrides),
            Err(ShieldError::Config(_))
        ));

        let overrides = Overrides {
            seed: Some(7),
            simulated_latency_ms: Some(0),
            ..Overrides::default()
        };
        let cfg = apply_overrides(default_config(), &overrides).unwrap();
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.simulated_latency_ms, 0);
    }

    #[test]
    fn rejects_bad_thresholds_from_file() {
        let cfg = parse_config("[thresholds]\nsafe_below = 0.9\n").unwrap();
        assert!(cfg.validate().is_err());
    }
}
