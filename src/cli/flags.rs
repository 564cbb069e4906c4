use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{BackendKind, Overrides};
use crate::core::types::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "secureurl",
    version,
    about = "URL reputation scanning and threat-intelligence lookup"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to config file (TOML). Default: config/secureurl.toml
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Detection backend to use
    #[arg(long, global = true, value_enum)]
    pub backend: Option<BackendArg>,

    /// Base address of the remote detection service
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Maximum scans in flight at once
    #[arg(long, global = true)]
    pub max_concurrent: Option<usize>,

    /// Seed for the mock backend
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Simulated per-scan latency of the mock backend, in milliseconds
    #[arg(long, global = true)]
    pub latency_ms: Option<u64>,

    /// Increase verbosity (debug, trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log file path
    #[arg(long, global = true, default_value = "data/secureurl.log")]
    pub log_file: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan a single URL
    Scan {
        url: String,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Scan several URLs concurrently
    Bulk {
        /// File with one URL per line (blank lines and # comments are skipped)
        #[arg(long)]
        file: Option<PathBuf>,
        urls: Vec<String>,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Show threat intelligence, optionally filtered
    Threats {
        /// Case-insensitive text matched against description and type
        #[arg(long, default_value = "")]
        search: String,
        /// all|low|medium|high|critical
        #[arg(long, default_value = "all")]
        severity: String,
        /// all, or text matched against the threat type
        #[arg(long = "type", default_value = "all")]
        threat_type: String,
        #[arg(long, value_enum, default_value = "md")]
        format: OutputFormatArg,
    },
    /// Show API usage statistics
    Usage,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ExportArgs {
    /// Output format for scan results
    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormatArg,
    /// Write results to this file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum BackendArg {
    Mock,
    Remote,
}

impl From<BackendArg> for BackendKind {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::Mock => BackendKind::Mock,
            BackendArg::Remote => BackendKind::Remote,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormatArg {
    Json,
    Jsonl,
    Md,
    Csv,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(value: OutputFormatArg) -> Self {
        match value {
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Jsonl => OutputFormat::Jsonl,
            OutputFormatArg::Md => OutputFormat::Markdown,
            OutputFormatArg::Csv => OutputFormat::Csv,
        }
    }
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            backend: self.backend.map(BackendKind::from),
            base_url: self.base_url.clone(),
            max_concurrent_scans: self.max_concurrent,
            simulated_latency_ms: self.latency_ms,
            seed: self.seed,
        }
    }
}
