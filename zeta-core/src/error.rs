//! Error types for the ZZT harness.

use thiserror::Error;

/// Errors that can occur while assembling storage or starting a session.
///
/// Lookups that miss return `None` and rejected writes return `false`;
/// only initialization-time failures surface as a `ZetaError`.
#[derive(Error, Debug)]
pub enum ZetaError {
    #[error("No free 8.3 name for {0}")]
    NameExhausted(String),

    #[error("Read-only storage")]
    ReadOnly,

    #[error("Executable not found (tried {0:?})")]
    ExecutableNotFound(Vec<String>),

    #[error("Persistent storage unavailable: {0}")]
    PersistentUnavailable(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for harness operations.
pub type ZetaResult<T> = Result<T, ZetaError>;
