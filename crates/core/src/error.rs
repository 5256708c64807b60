use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("timeline synchronizer needs a tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
    #[error("pixels per day must be positive and finite, got {0}")]
    InvalidScale(f64),
    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

/// Failure reported by an external collaborator.
///
/// The synchronizer never interprets these; they are passed verbatim to the
/// notification service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
}
