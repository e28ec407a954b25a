//! CLI Context for dependency injection and shared state
//!
//! Resolves the configuration path once and sets up logging before any
//! handler runs.

use anyhow::Result;
use data_daemons::config::{ConfigManager, LoggingConfig};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;

/// CLI execution context shared by every handler
#[derive(Debug, Clone)]
pub struct CliContext {
    pub config_path: PathBuf,
    pub verbose: bool,
}

impl CliContext {
    /// `config_path` falls back to the per-user default location
    pub fn new(config_path: Option<PathBuf>, verbose: bool) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path,
            None => ConfigManager::default_path()?,
        };

        Ok(Self {
            config_path,
            verbose,
        })
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the configuration file, failing if it does not exist
    pub fn load_config(&self) -> Result<ConfigManager> {
        Ok(ConfigManager::load(&self.config_path)?)
    }

    /// Initialize logging from the `[logging]` section.
    ///
    /// Logs go to stderr so broadcast output on stdout stays machine-readable.
    /// The returned guard must be held for as long as the file layer should
    /// keep flushing.
    pub fn init_logging(&self) -> Result<Option<WorkerGuard>> {
        // A missing or broken file is reported by the command itself
        let logging = ConfigManager::load(&self.config_path)
            .map(|manager| manager.config().logging.clone())
            .unwrap_or_default();

        let level = if self.verbose {
            "debug"
        } else {
            logging.level.as_str()
        };
        let env_filter = tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(level.parse().unwrap_or(tracing::Level::INFO.into()));

        let console_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false);

        let guard = match file_writer(&logging) {
            Some((file_writer, guard)) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .with(file_layer)
                    .try_init()?;
                Some(guard)
            }
            None => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .try_init()?;
                None
            }
        };

        if self.verbose {
            tracing::debug!("Verbose logging enabled");
            tracing::debug!("Config path: {:?}", self.config_path);
        }

        Ok(guard)
    }
}

fn file_writer(
    logging: &LoggingConfig,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let log_path = logging.path.as_ref()?;
    let file_appender = tracing_appender::rolling::daily(
        log_path.parent().unwrap_or_else(|| Path::new(".")),
        log_path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("ddm.log")),
    );
    Some(tracing_appender::non_blocking(file_appender))
}
