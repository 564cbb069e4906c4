use std::{fs, io, path::Path};

use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use secureurl::cli::{commands, flags::Cli};

const LOG_ROTATE_BYTES: u64 = 1_000_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli)?;

    commands::run(cli).await
}

fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let log_path = Path::new(&cli.log_file);
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let rotation = rotate_log(log_path, LOG_ROTATE_BYTES);
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let file_layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(false);

    // Results go to stdout; keep diagnostics on stderr so exports stay clean.
    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    if let Err(err) = rotation {
        tracing::warn!("could not rotate {}: {}", log_path.display(), err);
    }
    Ok(())
}

/// Moves `path` aside to `<name>.log.1` once it grows past `max_bytes`.
fn rotate_log(path: &Path, max_bytes: u64) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() > max_bytes => {
            fs::rename(path, path.with_extension("log.1"))?;
            Ok(true)
        }
        Ok(_) => Ok(false),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("secureurl-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn rotates_only_past_the_limit() {
        let dir = scratch_dir("rotate");
        let log = dir.join("secureurl.log");
        assert!(!rotate_log(&log, 4).unwrap());

        fs::write(&log, b"1234").unwrap();
        assert!(!rotate_log(&log, 4).unwrap());

        fs::write(&log, b"12345").unwrap();
        assert!(rotate_log(&log, 4).unwrap());
        assert!(!log.exists());
        assert!(dir.join("secureurl.log.1").exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn failed_rotation_is_reported() {
        let dir = scratch_dir("rotate-fail");
        let log = dir.join("secureurl.log");
        fs::write(&log, b"12345").unwrap();
        let blocker = dir.join("secureurl.log.1");
        fs::create_dir_all(blocker.join("occupied")).unwrap();

        assert!(rotate_log(&log, 4).is_err());
        assert!(log.exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
