//! Centralized error handling module
//!
//! Library operations return [`AppResult`]; the binary works in `anyhow::Result`
//! at its top level.

pub mod types;

pub use types::{AppError, AppResult};

/// Convert from anyhow::Error to AppError for host code that mixes the two
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Other {
            message: err.to_string(),
            source: Some(err.into()),
        }
    }
}
