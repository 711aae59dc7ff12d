use std::error::Error;
use std::fs::{self, OpenOptions};
use std::path::Path;

use tracing_subscriber::EnvFilter;

// Third-party crates that are chatty below warn.
const QUIET_TARGETS: [&str; 2] = ["mysql_async=warn", "mysql_common=warn"];

fn filter_directives(level: &str) -> String {
    let level = level.trim();
    let level = if level.is_empty() { "info" } else { level };
    std::iter::once(level)
        .chain(QUIET_TARGETS)
        .collect::<Vec<_>>()
        .join(",")
}

/// `RUST_LOG` wins over the configured level.
fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directives(level)))
        .unwrap_or_else(|_| EnvFilter::new(filter_directives("info")))
}

/// Sends all tracing output to `file_path`; the terminal belongs to the UI.
pub fn init_logging(level: &str, file_path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(level))
        .with_ansi(false)
        .with_target(true)
        .with_writer(log_file)
        .try_init()
        .map_err(|error| -> Box<dyn Error> { error })?;

    tracing::debug!(level, file = %file_path.display(), "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::{filter_directives, init_logging};

    #[test]
    fn directives_start_with_the_configured_level() {
        assert_eq!(
            filter_directives("debug"),
            "debug,mysql_async=warn,mysql_common=warn"
        );
        assert!(filter_directives("  ").starts_with("info,"));
    }

    #[test]
    fn init_creates_the_log_file_and_its_directory() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_dir.path().join("logs").join("shelf.log");

        init_logging("info", &path).expect("first init succeeds");
        assert!(path.exists());
    }
}
