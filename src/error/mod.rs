//! Error types for the publishing pipeline
//!
//! [`PublishError`] covers everything that can stop a run or fail a single
//! file. Run-fatal variants (`AuthMissing`, `AuthRejected`, `ReleaseNotFound`,
//! `LocalFileMissing`, `Config`) are raised before any asset is touched;
//! the rest are folded into per-file outcomes by the orchestrator.

pub mod handlers;

use crate::transport::TransportError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PublishError>;

#[derive(Debug, Error)]
pub enum PublishError {
    /// No API token was configured
    #[error("Authentication error: no API token configured (set GITHUB_TOKEN or GH_TOKEN)")]
    AuthMissing,

    /// The service refused the configured token
    #[error("Authentication error: credentials rejected (status {status}): {message}")]
    AuthRejected { status: u16, message: String },

    #[error("Release not found for tag '{tag}'")]
    ReleaseNotFound { tag: String },

    /// One or more desired files are absent on local storage
    #[error("Local file(s) missing: {}", names.join(", "))]
    LocalFileMissing { names: Vec<String> },

    #[error("Transport error: {0}")]
    Transport(TransportError),

    /// Non-success status, or a success status with an unusable body
    #[error("Rejected by server (status {status}): {body}")]
    RejectedByServer { status: u16, body: String },

    #[error("Parse error: {0}")]
    ResponseParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PublishError {
    /// Whether this error aborts the whole run rather than a single file
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PublishError::AuthMissing
                | PublishError::AuthRejected { .. }
                | PublishError::ReleaseNotFound { .. }
                | PublishError::LocalFileMissing { .. }
                | PublishError::Config(_)
        )
    }
}

impl From<TransportError> for PublishError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::AuthMissing => PublishError::AuthMissing,
            other => PublishError::Transport(other),
        }
    }
}

impl From<serde_json::Error> for PublishError {
    fn from(err: serde_json::Error) -> Self {
        PublishError::ResponseParse(err.to_string())
    }
}
