//! Configuration file for the `ddm` host application
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [http]
//! timeout_secs = 30
//!
//! [[daemons]]
//! name = "weather"
//! type = "timer"
//! status = "active"
//! url = "https://api.example.com/weather"
//! args = { city = "Oslo" }
//! intervals_ms = { active = 60000, idle = 600000 }
//!
//! [[daemons]]
//! name = "inbox"
//! type = "event"
//!
//! [daemons.triggers.refresh]
//! url = "https://api.example.com/inbox"
//! throttle_ms = 500
//! ```

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::daemon::DaemonType;
use crate::errors::{AppError, AppResult};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub daemons: Vec<DaemonSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Daily-rolling log file in addition to the console
    pub path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            path: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Settings for the HTTP client shared by every daemon's fetch function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Extra attempts after a failed request; 0 disables retrying
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            max_retries: 0,
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("data-daemons/{}", env!("CARGO_PKG_VERSION"))
}

fn default_retry_delay_ms() -> u64 {
    500
}

/// One daemon as written in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub daemon_type: DaemonType,
    #[serde(default)]
    pub status: String,
    /// Endpoint polled by timer ticks and forced fetches
    pub url: Option<String>,
    /// Static arguments sent with every request to `url`
    pub args: Option<Value>,
    #[serde(default)]
    pub intervals_ms: BTreeMap<String, u64>,
    #[serde(default)]
    pub triggers: BTreeMap<String, TriggerSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerSpec {
    pub url: String,
    pub args: Option<Value>,
    pub throttle_ms: Option<u64>,
}

impl Config {
    /// Configuration written by `ddm init`
    pub fn example() -> Self {
        let mut intervals_ms = BTreeMap::new();
        intervals_ms.insert("active".to_string(), 5_000);
        intervals_ms.insert("idle".to_string(), 60_000);

        let mut triggers = BTreeMap::new();
        triggers.insert(
            "refresh".to_string(),
            TriggerSpec {
                url: "https://httpbin.org/uuid".to_string(),
                args: None,
                throttle_ms: Some(1_000),
            },
        );

        Config {
            logging: LoggingConfig::default(),
            http: HttpConfig::default(),
            daemons: vec![
                DaemonSpec {
                    name: "clock".to_string(),
                    daemon_type: DaemonType::Timer,
                    status: "active".to_string(),
                    url: Some("https://httpbin.org/get".to_string()),
                    args: Some(serde_json::json!({ "source": "ddm" })),
                    intervals_ms,
                    triggers: BTreeMap::new(),
                },
                DaemonSpec {
                    name: "uuid".to_string(),
                    daemon_type: DaemonType::Event,
                    status: String::new(),
                    url: Some("https://httpbin.org/uuid".to_string()),
                    args: None,
                    intervals_ms: BTreeMap::new(),
                    triggers,
                },
            ],
        }
    }

    /// Check everything that can be checked before any daemon starts
    pub fn validate(&self) -> AppResult<()> {
        let mut seen = HashSet::new();

        for spec in &self.daemons {
            if spec.name.trim().is_empty() {
                return Err(AppError::invalid_daemon(&spec.name, "daemon name must not be empty"));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(AppError::invalid_daemon(&spec.name, "daemon name is used more than once"));
            }
            if let Some(url) = &spec.url {
                parse_url(&spec.name, url)?;
            }

            match spec.daemon_type {
                DaemonType::Timer => {
                    if spec.url.is_none() {
                        return Err(AppError::invalid_daemon(&spec.name, "timer daemons need a url"));
                    }
                    if spec.intervals_ms.values().all(|ms| *ms == 0) {
                        return Err(AppError::invalid_daemon(
                            &spec.name,
                            "timer daemons need at least one non-zero interval",
                        ));
                    }
                }
                DaemonType::Event => {
                    if spec.triggers.is_empty() {
                        return Err(AppError::invalid_daemon(&spec.name, "event daemons need a trigger"));
                    }
                    for trigger in spec.triggers.values() {
                        parse_url(&spec.name, &trigger.url)?;
                    }
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn parse_url(daemon: &str, url: &str) -> AppResult<Url> {
    Url::parse(url).map_err(|e| AppError::invalid_daemon(daemon, format!("invalid url '{}': {}", url, e)))
}

/// Loads and saves the configuration file
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Wrap an in-memory configuration; nothing touches disk until [`save`](Self::save)
    pub fn new(path: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            config_path: path.into(),
            config,
        }
    }

    /// Load an existing configuration file
    pub fn load(path: impl Into<PathBuf>) -> AppResult<Self> {
        let config_path = path.into();
        if !config_path.exists() {
            return Err(AppError::ConfigNotFound { path: config_path });
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| AppError::io_with_source(&config_path, "read config file", e))?;
        let config = toml::from_str(&content)?;

        Ok(Self { config_path, config })
    }

    /// Load the file at `path`, writing the example configuration first if
    /// it does not exist
    pub fn load_or_create(path: impl Into<PathBuf>) -> AppResult<Self> {
        let config_path = path.into();
        if config_path.exists() {
            return Self::load(config_path);
        }

        let manager = Self {
            config_path,
            config: Config::example(),
        };
        manager.save()?;
        Ok(manager)
    }

    /// `<config dir>/data-daemons/daemons.toml`
    pub fn default_path() -> AppResult<PathBuf> {
        let base_dirs =
            BaseDirs::new().ok_or_else(|| AppError::config("Failed to get base directories"))?;
        Ok(base_dirs.config_dir().join("data-daemons").join("daemons.toml"))
    }

    pub fn save(&self) -> AppResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io_with_source(parent, "create config directory", e))?;
        }

        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| AppError::config_with_source("Failed to serialize config", e))?;
        fs::write(&self.config_path, content)
            .map_err(|e| AppError::io_with_source(&self.config_path, "write config file", e))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
