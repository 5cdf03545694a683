// Configuration File Support
//
// TOML configuration with environment variable overrides.
// Loaded from the XDG config directory (~/.config/termgate/config.toml)
// unless a path is given on the command line.

use crate::logging::LoggingConfig;
use crate::portfolio::PortfolioConfig;
use crate::tools::{ExecutorConfig, DEFAULT_SEARCH_PATH, DEFAULT_TIMEOUT_SECS, MAX_OUTPUT_SIZE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest timeout an operator may configure
const MAX_TIMEOUT_SECS: u64 = 300;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub executor: ExecutorSettings,
    pub metrics: MetricsConfig,
    pub portfolio: PortfolioConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Origins allowed by CORS
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            allowed_origins: vec![
                "http://localhost:5000".to_string(),
                "http://127.0.0.1:5000".to_string(),
            ],
        }
    }
}

/// Child process limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Wall-clock limit in seconds
    pub timeout_secs: u64,

    /// Maximum bytes kept per output stream
    pub max_output_size: usize,

    /// `PATH` handed to child processes
    pub search_path: String,

    /// Working directory for child processes (default: the service's own)
    pub working_dir: Option<PathBuf>,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_output_size: MAX_OUTPUT_SIZE,
            search_path: DEFAULT_SEARCH_PATH.to_string(),
            working_dir: None,
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve /metrics
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration from the default XDG config directory
    ///
    /// A missing file yields the defaults (with environment overrides).
    pub fn load() -> Result<Self> {
        Self::load_from_path(Self::config_path())
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the resulting configuration is invalid.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file from {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };

        let config = config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Default configuration file path
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("dev", "termgate", "termgate") {
            proj_dirs.config_dir().join("config.toml")
        } else {
            // Fallback if XDG dirs cannot be determined
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config").join("termgate").join("config.toml")
        }
    }

    /// Apply environment variable overrides
    ///
    /// - TERMGATE_HOST
    /// - TERMGATE_PORT
    /// - TERMGATE_LOG_LEVEL
    /// - TERMGATE_LOG_FORMAT
    /// - TERMGATE_TIMEOUT_SECS
    ///
    /// Values that do not parse are ignored.
    fn apply_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("TERMGATE_HOST") {
            if !host.is_empty() {
                self.server.host = host;
            }
        }
        if let Ok(port) = std::env::var("TERMGATE_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }

        if let Ok(level) = std::env::var("TERMGATE_LOG_LEVEL") {
            if let Ok(level) = level.parse() {
                self.logging.level = level;
            }
        }
        if let Ok(format) = std::env::var("TERMGATE_LOG_FORMAT") {
            if let Ok(format) = format.parse() {
                self.logging.format = format;
            }
        }

        if let Ok(timeout) = std::env::var("TERMGATE_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                self.executor.timeout_secs = timeout;
            }
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            anyhow::bail!("Server host must not be empty");
        }

        if self.executor.timeout_secs == 0 || self.executor.timeout_secs > MAX_TIMEOUT_SECS {
            anyhow::bail!(
                "Executor timeout must be between 1 and {} seconds, got {}",
                MAX_TIMEOUT_SECS,
                self.executor.timeout_secs
            );
        }
        if self.executor.max_output_size == 0 {
            anyhow::bail!("Executor max_output_size must be > 0");
        }
        if self.executor.search_path.trim().is_empty() {
            anyhow::bail!("Executor search_path must not be empty");
        }
        if let Some(dir) = &self.executor.working_dir {
            if !dir.is_dir() {
                anyhow::bail!("Executor working_dir {:?} is not a directory", dir);
            }
        }

        for origin in &self.server.allowed_origins {
            if !(origin.starts_with("http://") || origin.starts_with("https://")) {
                anyhow::bail!("Invalid CORS origin: {}", origin);
            }
        }

        for key in self.portfolio.entries.keys() {
            if key.trim().is_empty() || key.contains(char::is_whitespace) {
                anyhow::bail!("Portfolio section name {:?} must be a single word", key);
            }
        }

        Ok(())
    }

    /// Resolve executor limits, pinning the working directory
    pub fn executor_config(&self) -> Result<ExecutorConfig> {
        let working_dir = match &self.executor.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to determine working directory")?,
        };

        Ok(ExecutorConfig {
            timeout: Duration::from_secs(self.executor.timeout_secs),
            max_output_size: self.executor.max_output_size,
            search_path: self.executor.search_path.clone(),
            working_dir,
        })
    }
}
