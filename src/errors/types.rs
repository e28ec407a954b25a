//! Error types for the data daemon manager
//!
//! Configuration errors (unknown daemon, missing interval, invalid registration)
//! are surfaced synchronously from the call that hit them. Fetch errors come
//! from the user supplied fetch functions and leave the cache untouched.

use std::path::PathBuf;
use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // Daemon management errors
    #[error("No such daemon '{name}'")]
    DaemonNotFound {
        name: String,
    },

    #[error("No interval set for daemon '{name}' in status '{status}'")]
    NoInterval {
        name: String,
        status: String,
    },

    #[error("Invalid configuration for daemon '{name}': {reason}")]
    InvalidDaemonConfig {
        name: String,
        reason: String,
    },

    #[error("Daemon '{name}' has no fetch function")]
    NoFetchFunction {
        name: String,
    },

    #[error("Fetch failed for daemon '{name}': {source}")]
    Fetch {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{} daemon(s) failed to start: {}", .failed.len(), .failed.join(", "))]
    PartialStart {
        failed: Vec<String>,
    },

    // Configuration file errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        path: PathBuf,
    },

    // I/O errors
    #[error("File I/O error for '{path}': {operation}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Serialization errors
    #[error("TOML parsing error: {context}")]
    TomlParsing {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Network and HTTP errors
    #[error("HTTP request failed: {method} {url}")]
    HttpRequest {
        method: String,
        url: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Network timeout while requesting {url}")]
    NetworkTimeout {
        url: String,
    },

    #[error("HTTP {status_code}: {reason}")]
    HttpStatus {
        status_code: u16,
        reason: String,
    },

    // Validation and parsing errors
    #[error("Invalid command argument '{argument}': {reason}")]
    InvalidArgument {
        argument: String,
        reason: String,
    },

    #[error("{message}")]
    Other {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a DaemonNotFound error
    pub fn daemon_not_found(name: impl Into<String>) -> Self {
        Self::DaemonNotFound { name: name.into() }
    }

    /// Create an InvalidDaemonConfig error
    pub fn invalid_daemon(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDaemonConfig {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a failed fetch for the named daemon
    pub fn fetch(name: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Fetch {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Create a new Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new Config error with source
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new I/O error with source
    pub fn io_with_source(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Io {
            path: path.into(),
            operation: operation.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new InvalidArgument error
    pub fn invalid_argument(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    /// Whether a fetch that failed with this error is worth repeating
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkTimeout { .. } => true,
            Self::HttpRequest { .. } => true,
            Self::HttpStatus { status_code, .. } => {
                *status_code >= 500 || *status_code == 408 || *status_code == 429
            }
            _ => false,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::DaemonNotFound { .. }
            | Self::NoInterval { .. }
            | Self::InvalidDaemonConfig { .. }
            | Self::NoFetchFunction { .. }
            | Self::PartialStart { .. } => "daemon",
            Self::Fetch { .. } => "fetch",
            Self::Config { .. } | Self::ConfigNotFound { .. } => "config",
            Self::Io { .. } => "io",
            Self::TomlParsing { .. } => "serialization",
            Self::HttpRequest { .. } | Self::NetworkTimeout { .. } | Self::HttpStatus { .. } => "network",
            Self::InvalidArgument { .. } => "validation",
            Self::Other { .. } => "internal",
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        let operation = match err.kind() {
            std::io::ErrorKind::NotFound => "file not found",
            std::io::ErrorKind::PermissionDenied => "permission denied",
            _ => "I/O operation",
        }
        .to_string();

        Self::Io {
            path: PathBuf::from("unknown"),
            operation,
            source: Some(Box::new(err)),
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::TomlParsing {
            context: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        if err.is_timeout() {
            Self::NetworkTimeout { url }
        } else if let Some(status) = err.status() {
            Self::HttpStatus {
                status_code: status.as_u16(),
                reason: err.to_string(),
            }
        } else {
            Self::HttpRequest {
                method: "GET".to_string(),
                url,
                source: Some(Box::new(err)),
            }
        }
    }
}
