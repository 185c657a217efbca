use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::error::{ScrapeError, ScrapeResult};

/// Build the level filter: `RUST_LOG` wins, then the configured level
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging system.
///
/// Console output goes to stderr so stdout stays free for results.
pub fn init_logging(config: &LoggingConfig) -> ScrapeResult<()> {
    let mut layers = Vec::new();

    if config.console_enabled {
        let console_layer = fmt::layer()
            .with_target(config.include_targets)
            .with_writer(std::io::stderr)
            .boxed();

        layers.push(console_layer);
    }

    if config.file_enabled {
        std::fs::create_dir_all(&config.log_directory)?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("pagescrape")
            .filename_suffix("log")
            .max_log_files(config.max_files)
            .build(&config.log_directory)
            .map_err(|e| ScrapeError::config(format!("failed to open log directory: {}", e)))?;

        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_target(config.include_targets)
            .with_writer(file_appender)
            .boxed();

        layers.push(file_layer);
    }

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(layers)
        .try_init()
        .map_err(|e| ScrapeError::config(format!("logging already initialized: {}", e)))?;

    info!("Logging system initialized (level: {})", config.level);
    if config.file_enabled {
        info!("Log directory: {}", config.log_directory.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_with_file_layer() {
        let dir = TempDir::new().unwrap();
        let config = LoggingConfig {
            level: "debug".to_string(),
            file_enabled: true,
            console_enabled: false,
            log_directory: dir.path().join("logs"),
            ..LoggingConfig::default()
        };

        // Another test binary thread may have installed a subscriber first.
        let _ = init_logging(&config);
        assert!(config.log_directory.exists());
    }
}
