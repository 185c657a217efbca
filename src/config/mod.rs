use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{ScrapeError, ScrapeResult};
use crate::scraper::options::{merge_headers, FetchOptions, DEFAULT_TIMEOUT_MS, DEFAULT_USER_AGENT};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraping: ScrapingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    pub request_timeout_ms: u64,
    pub user_agent: String,
    pub accept_language: Option<String>,
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub max_files: usize,
    pub log_directory: PathBuf,
    pub include_targets: bool,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: Some("en-US,en;q=0.5".to_string()),
            headers: HashMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: false,
            console_enabled: true,
            max_files: 5,
            log_directory: get_data_directory().join("logs"),
            include_targets: true,
        }
    }
}

impl ScrapingConfig {
    /// Default fetch options for a [`crate::Scraper`]
    pub fn fetch_options(&self) -> FetchOptions {
        let mut headers = HashMap::new();
        merge_headers(&mut headers, self.headers.clone());
        if self.user_agent != DEFAULT_USER_AGENT {
            merge_headers(&mut headers, [("User-Agent".to_string(), self.user_agent.clone())]);
        }

        FetchOptions {
            timeout_ms: self.request_timeout_ms,
            headers,
            basic_auth: None,
            cookie_header: None,
            accept_language: self.accept_language.clone(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location, writing defaults there
    /// on first run
    pub async fn load() -> ScrapeResult<Self> {
        let config_path = get_config_path();

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            info!("No configuration file found, using defaults");
            let mut config = Self::default();
            config.save_to(&config_path).await?;
            ConfigOverrides::apply(&mut config);
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from specific file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> ScrapeResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let mut config: AppConfig = toml::from_str(&content).map_err(|e| {
            ScrapeError::config(format!("invalid configuration file {}: {}", path.display(), e))
        })?;

        ConfigOverrides::apply(&mut config);
        config.validate()?;

        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Save configuration to `path`
    pub async fn save_to<P: AsRef<Path>>(&self, path: P) -> ScrapeResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ScrapeError::config(format!("failed to serialize configuration: {}", e)))?;
        tokio::fs::write(path, content).await?;

        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> ScrapeResult<()> {
        if self.scraping.request_timeout_ms == 0 {
            return Err(ScrapeError::config("scraping.request_timeout_ms must be > 0"));
        }

        if self.scraping.user_agent.trim().is_empty() {
            return Err(ScrapeError::config("scraping.user_agent must not be empty"));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ScrapeError::config(format!(
                "logging.level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.logging.level
            )));
        }

        Ok(())
    }
}

/// Get the default data directory
fn get_data_directory() -> PathBuf {
    directories::ProjectDirs::from("com", "pagescrape", "pagescrape")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default().join("data"))
}

/// Get the configuration file path
pub fn get_config_path() -> PathBuf {
    directories::ProjectDirs::from("com", "pagescrape", "pagescrape")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default().join("config.toml"))
}

/// Environment-based configuration overrides
pub struct ConfigOverrides;

impl ConfigOverrides {
    /// Apply `PAGESCRAPE_*` environment variables
    pub fn apply(config: &mut AppConfig) {
        Self::apply_from(config, |key| std::env::var(key).ok());
    }

    fn apply_from(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(timeout) = lookup("PAGESCRAPE_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok()) {
            config.scraping.request_timeout_ms = timeout;
        }

        if let Some(user_agent) = lookup("PAGESCRAPE_USER_AGENT") {
            config.scraping.user_agent = user_agent;
        }

        if let Some(language) = lookup("PAGESCRAPE_ACCEPT_LANGUAGE") {
            config.scraping.accept_language = Some(language).filter(|l| !l.is_empty());
        }

        if let Some(level) = lookup("PAGESCRAPE_LOG_LEVEL") {
            config.logging.level = level;
        }
    }
}
