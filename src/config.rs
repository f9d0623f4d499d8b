//! Configuration system for the JobHub executor
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. Environment variables (JOBHUB_* prefix)
//! 2. Configuration file (TOML)
//! 3. Default values

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::executor::DuplicatePolicy;

/// Main executor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// This executor's identity and control-surface settings
    pub executor: ExecutorSettings,

    /// Scheduling-center connection settings
    pub center: CenterSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Executor identity and control-surface settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Interface the control surface binds to
    pub bind_ip: String,

    /// Port the control surface binds to
    pub bind_port: u16,

    /// Address announced to the scheduling center. Defaults to
    /// `http://{bind_ip}:{bind_port}`; set this when binding a wildcard
    /// interface or running behind NAT.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advertised_address: Option<String>,

    /// Key identifying this executor group on the center
    /// (hostname if not set)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_key: Option<String>,

    /// Policy for a start request naming a job id that is already
    /// running: "replace" or "reject"
    pub on_duplicate: String,
}

/// Scheduling-center connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CenterSettings {
    /// Base HTTP address of the scheduling center
    pub address: String,

    /// Heartbeat period in seconds
    pub heartbeat_interval_secs: u64,

    /// Per-request timeout for outbound calls, in seconds
    pub request_timeout_secs: u64,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// Default implementations

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            bind_ip: "0.0.0.0".to_string(),
            bind_port: 9999,
            advertised_address: None,
            registry_key: None,
            on_duplicate: "replace".to_string(),
        }
    }
}

impl Default for CenterSettings {
    fn default() -> Self {
        Self {
            address: "http://127.0.0.1:8080".to_string(),
            heartbeat_interval_secs: 20,
            request_timeout_secs: 10,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_files: 5,
            json_format: false,
        }
    }
}

impl ExecutorSettings {
    /// Socket address the control surface binds to
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_ip, self.bind_port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address: {}", e)))
    }

    /// Address announced to the scheduling center
    pub fn advertised_address(&self) -> String {
        self.advertised_address
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.bind_ip, self.bind_port))
    }

    /// Registry key, falling back to the machine hostname
    pub fn registry_key(&self) -> String {
        self.registry_key.clone().unwrap_or_else(|| {
            hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "jobhub-executor".to_string())
        })
    }

    /// Parsed duplicate-start policy
    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        DuplicatePolicy::parse(&self.on_duplicate).unwrap_or_default()
    }
}

impl CenterSettings {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ExecutorConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        let config_file = Self::find_config_file(config_path)?;
        if let Some(path) = config_file {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
            config = toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides();

        // 3. Validate
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let expanded = shellexpand::tilde(path);
            let path = PathBuf::from(expanded.as_ref());
            if path.exists() {
                return Ok(Some(path));
            } else {
                return Err(Error::ConfigNotFound { path });
            }
        }

        // Search in standard locations
        let search_paths = [
            // Current directory
            PathBuf::from("jobhub-executor.toml"),
            PathBuf::from("config.toml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("jobhub").join("executor.toml"))
                .unwrap_or_default(),
            // Home directory
            dirs::home_dir()
                .map(|p| p.join(".jobhub").join("executor.toml"))
                .unwrap_or_default(),
            // System config (Linux)
            PathBuf::from("/etc/jobhub/executor.toml"),
        ];

        for path in &search_paths {
            if path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Executor settings
        if let Ok(val) = std::env::var("JOBHUB_BIND_IP") {
            self.executor.bind_ip = val;
        }
        if let Ok(val) = std::env::var("JOBHUB_BIND_PORT") {
            if let Ok(n) = val.parse() {
                self.executor.bind_port = n;
            }
        }
        if let Ok(val) = std::env::var("JOBHUB_ADVERTISED_ADDRESS") {
            self.executor.advertised_address = Some(val);
        }
        if let Ok(val) = std::env::var("JOBHUB_REGISTRY_KEY") {
            self.executor.registry_key = Some(val);
        }
        if let Ok(val) = std::env::var("JOBHUB_ON_DUPLICATE") {
            self.executor.on_duplicate = val;
        }

        // Center settings
        if let Ok(val) = std::env::var("JOBHUB_CENTER_ADDRESS") {
            self.center.address = val;
        }
        if let Ok(val) = std::env::var("JOBHUB_HEARTBEAT_INTERVAL_SECS") {
            if let Ok(n) = val.parse() {
                self.center.heartbeat_interval_secs = n;
            }
        }
        if let Ok(val) = std::env::var("JOBHUB_REQUEST_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.center.request_timeout_secs = n;
            }
        }

        // Logging settings
        if let Ok(val) = std::env::var("JOBHUB_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("JOBHUB_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("JOBHUB_LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate center address
        if self.center.address.is_empty() {
            return Err(Error::Config("Center address cannot be empty".to_string()));
        }
        if !self.center.address.starts_with("http://")
            && !self.center.address.starts_with("https://")
        {
            return Err(Error::Config(
                "Center address must start with http:// or https://".to_string(),
            ));
        }
        url::Url::parse(&self.center.address)
            .map_err(|e| Error::Config(format!("Invalid center address: {}", e)))?;

        // Validate advertised address when set
        if let Some(ref addr) = self.executor.advertised_address {
            if !addr.starts_with("http://") && !addr.starts_with("https://") {
                return Err(Error::Config(
                    "Advertised address must start with http:// or https://".to_string(),
                ));
            }
        }

        // Validate bind address
        self.executor.bind_addr()?;

        // Validate registry key when set
        if let Some(ref key) = self.executor.registry_key {
            if key.trim().is_empty() {
                return Err(Error::Config("Registry key cannot be blank".to_string()));
            }
        }

        // Validate duplicate policy
        if DuplicatePolicy::parse(&self.executor.on_duplicate).is_none() {
            return Err(Error::Config(format!(
                "Invalid on_duplicate policy '{}'. Must be 'replace' or 'reject'",
                self.executor.on_duplicate
            )));
        }

        // Validate heartbeat interval
        if self.center.heartbeat_interval_secs == 0 {
            return Err(Error::Config(
                "heartbeat_interval_secs must be greater than zero".to_string(),
            ));
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<()> {
    let config_path = path
        .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".jobhub")
                .join("executor.toml")
        });

    // Check if file exists
    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    // Create parent directories
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
    }

    // Write the default config with comments
    fs::write(&config_path, generate_default_config())
        .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

    println!("Configuration file created: {}", config_path.display());
    Ok(())
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# JobHub Executor Configuration
# https://github.com/jobhub/executor

[executor]
# Interface the control surface binds to
bind_ip = "0.0.0.0"

# Port the control surface binds to
bind_port = 9999

# Address announced to the scheduling center.
# Set this when binding a wildcard interface or running behind NAT.
# advertised_address = "http://10.0.0.5:9999"

# Key identifying this executor group on the center (hostname if unset)
# registry_key = "demo-executor"

# Policy for a start request naming a job id that is already running:
# "replace" or "reject"
on_duplicate = "replace"

[center]
# Base HTTP address of the scheduling center
address = "http://127.0.0.1:8080"

# Heartbeat period in seconds
heartbeat_interval_secs = 20

# Per-request timeout for outbound calls, in seconds
request_timeout_secs = 10

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.jobhub/logs/executor.log"

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#
    .to_string()
}
