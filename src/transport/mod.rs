//! Transport abstraction for the release service
//!
//! Every network exchange in the pipeline goes through [`Transport::request`]:
//! a method, a path or absolute URL, a header map and a body in, a raw
//! status code and body out. No retries happen at this layer. Two
//! implementations are provided:
//! - [`HttpTransport`]: direct HTTPS calls through reqwest
//! - [`GhCliTransport`]: the same exchanges driven through the `gh api` command

pub mod gh_cli;
pub mod http;

pub use gh_cli::GhCliTransport;
pub use http::HttpTransport;

use crate::config::{Credentials, PublishConfig, TransportKind};
use crate::logging::Logger;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Media type requested for every API call
pub const API_ACCEPT: &str = "application/vnd.github+json";

/// REST API version pinned on every API call
pub const API_VERSION: &str = "2022-11-28";

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("release-asset-pusher/", env!("CARGO_PKG_VERSION"));

/// Transport trait for release service communication
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request and return the raw status and body
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;

    /// Short name used in log output
    fn name(&self) -> &'static str;
}

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no API token configured")]
    AuthMissing,

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to launch {0}")]
    Spawn(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Bytes(Vec<u8>),
    /// Local file streamed as the raw body
    File { path: PathBuf, len: u64 },
}

/// One request against the release service
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    /// API path (resolved against the API base) or absolute URL
    pub target: String,
    pub headers: BTreeMap<String, String>,
    pub body: RequestBody,
}

impl TransportRequest {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: BTreeMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::Get, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::Post, target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::Delete, target)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn is_absolute(&self) -> bool {
        self.target.starts_with("https://") || self.target.starts_with("http://")
    }
}

/// Raw response from the release service
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Total deadline for one request
///
/// Streamed file bodies get `upload_timeout` (`None` is unbounded); every
/// other request gets `timeout`.
pub fn deadline_for(body: &RequestBody, timeout: Duration, upload_timeout: Option<Duration>) -> Option<Duration> {
    match body {
        RequestBody::File { .. } => upload_timeout,
        _ => Some(timeout),
    }
}

/// Build the transport selected by configuration
pub fn build_transport(
    config: &PublishConfig,
    credentials: Credentials,
    logger: Logger,
) -> Result<Arc<dyn Transport>, TransportError> {
    let transport: Arc<dyn Transport> = match config.transport {
        TransportKind::Http => Arc::new(
            HttpTransport::new(&config.api_url, credentials, config.timeout(), logger)?
                .with_upload_timeout(config.upload_timeout()),
        ),
        TransportKind::Gh => Arc::new(
            GhCliTransport::new(config.gh_program.clone(), credentials, config.timeout(), logger)
                .with_upload_timeout(config.upload_timeout()),
        ),
    };
    Ok(transport)
}
