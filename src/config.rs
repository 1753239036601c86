//! Configuration management module
//!
//! [`PublishConfig`] is the one explicit value that tells a run where to
//! publish (owner, repository, tag), what to publish (the desired files) and
//! how (transport, timeout, concurrency). It is layered as
//! defaults → JSON file → `RELEASE_PUSHER_*` environment → command line.

use crate::error::{PublishError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Environment variables holding the API token, in lookup order
pub const TOKEN_ENV_VARS: &[&str] = &["GITHUB_TOKEN", "GH_TOKEN"];

/// Which [`Transport`](crate::transport::Transport) implementation carries requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Direct HTTPS calls
    #[default]
    Http,
    /// The `gh api` command
    Gh,
}

impl std::str::FromStr for TransportKind {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(TransportKind::Http),
            "gh" => Ok(TransportKind::Gh),
            other => Err(PublishError::Config(format!(
                "unknown transport '{}', expected 'http' or 'gh'",
                other
            ))),
        }
    }
}

/// One artifact to publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredFile {
    /// Asset name on the release
    pub name: String,
    /// Local path; relative paths resolve against `release_dir`
    pub path: PathBuf,
    /// Overrides the content type inferred from `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl DesiredFile {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            content_type: None,
            label: None,
        }
    }

    /// Parse a `NAME=PATH` pair, or a bare `PATH` named after its file name
    pub fn parse_pair(spec: &str) -> Result<Self> {
        if let Some((name, path)) = spec.split_once('=') {
            if name.is_empty() || path.is_empty() {
                return Err(PublishError::Config(format!(
                    "invalid asset '{}', expected NAME=PATH",
                    spec
                )));
            }
            return Ok(Self::new(name, path));
        }

        let path = PathBuf::from(spec);
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PublishError::Config(format!("cannot derive asset name from '{}'", spec)))?
            .to_string();
        Ok(Self::new(name, path))
    }
}

/// API token, read once per run
#[derive(Clone, Default)]
pub struct Credentials {
    token: Option<String>,
}

impl Credentials {
    pub fn none() -> Self {
        Self { token: None }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Read the token from `GITHUB_TOKEN`, falling back to `GH_TOKEN`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let token = TOKEN_ENV_VARS
            .iter()
            .filter_map(|key| lookup(key))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty());
        Self { token }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_present(&self) -> bool {
        self.token.is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Publishing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub owner: String,
    pub repository: String,
    pub tag: String,
    pub api_url: String,
    pub release_dir: Option<PathBuf>,
    pub assets: Vec<DesiredFile>,
    pub transport: TransportKind,
    pub gh_program: PathBuf,
    pub timeout_secs: u64,
    /// Total deadline for one streamed upload; unset means only `timeout_secs`
    /// of inactivity ends it
    pub upload_timeout_secs: Option<u64>,
    pub concurrency: usize,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repository: String::new(),
            tag: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            release_dir: None,
            assets: Vec::new(),
            transport: TransportKind::Http,
            gh_program: PathBuf::from("gh"),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            upload_timeout_secs: None,
            concurrency: 1,
        }
    }
}

impl PublishConfig {
    pub fn new(owner: impl Into<String>, repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repository: repository.into(),
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_asset(mut self, asset: DesiredFile) -> Self {
        self.assets.push(asset);
        self
    }

    pub fn with_release_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.release_dir = Some(dir.into());
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Load from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PublishError::Config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            PublishError::Config(format!("invalid config file {}: {}", path.display(), e))
        })
    }

    /// Apply `RELEASE_PUSHER_*` overrides from the process environment
    pub fn apply_env(self) -> Result<Self> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(val) = lookup("RELEASE_PUSHER_OWNER") {
            self.owner = val;
        }
        if let Some(val) = lookup("RELEASE_PUSHER_REPOSITORY") {
            self.repository = val;
        }
        if let Some(val) = lookup("RELEASE_PUSHER_TAG") {
            self.tag = val;
        }
        if let Some(val) = lookup("RELEASE_PUSHER_API_URL") {
            self.api_url = val;
        }
        if let Some(val) = lookup("RELEASE_PUSHER_RELEASE_DIR") {
            self.release_dir = Some(PathBuf::from(val));
        }
        if let Some(val) = lookup("RELEASE_PUSHER_TRANSPORT") {
            self.transport = val.parse()?;
        }
        if let Some(val) = lookup("RELEASE_PUSHER_TIMEOUT") {
            self.timeout_secs = val.parse().map_err(|_| {
                PublishError::Config(format!("RELEASE_PUSHER_TIMEOUT must be a number of seconds, got '{}'", val))
            })?;
        }
        if let Some(val) = lookup("RELEASE_PUSHER_UPLOAD_TIMEOUT") {
            self.upload_timeout_secs = Some(val.parse().map_err(|_| {
                PublishError::Config(format!("RELEASE_PUSHER_UPLOAD_TIMEOUT must be a number of seconds, got '{}'", val))
            })?);
        }
        if let Some(val) = lookup("RELEASE_PUSHER_CONCURRENCY") {
            self.concurrency = val.parse().map_err(|_| {
                PublishError::Config(format!("RELEASE_PUSHER_CONCURRENCY must be a positive number, got '{}'", val))
            })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("owner", &self.owner),
            ("repository", &self.repository),
            ("tag", &self.tag),
        ] {
            if value.trim().is_empty() {
                return Err(PublishError::Config(format!("{} cannot be empty", field)));
            }
            if value.contains('/') && field != "tag" {
                return Err(PublishError::Config(format!("{} cannot contain '/': {}", field, value)));
            }
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(PublishError::Config(format!(
                "invalid API URL: {}. Must start with http:// or https://",
                self.api_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(PublishError::Config("timeout must be greater than 0".to_string()));
        }
        if self.timeout_secs > 86400 {
            return Err(PublishError::Config("timeout cannot exceed 24 hours (86400 seconds)".to_string()));
        }
        if self.upload_timeout_secs == Some(0) {
            return Err(PublishError::Config("upload timeout must be greater than 0".to_string()));
        }
        if self.concurrency == 0 {
            return Err(PublishError::Config("concurrency must be greater than 0".to_string()));
        }
        if self.assets.is_empty() {
            return Err(PublishError::Config("no assets configured".to_string()));
        }

        let mut seen = HashSet::new();
        for asset in &self.assets {
            if asset.name.trim().is_empty() {
                return Err(PublishError::Config(format!(
                    "asset for {} has an empty name",
                    asset.path.display()
                )));
            }
            if asset.name.contains('/') || asset.name.contains('\\') {
                return Err(PublishError::Config(format!(
                    "asset name cannot contain path separators: {}",
                    asset.name
                )));
            }
            if !seen.insert(asset.name.as_str()) {
                return Err(PublishError::Config(format!("duplicate asset name: {}", asset.name)));
            }
        }
        Ok(())
    }

    /// Desired files with paths resolved against `release_dir`
    pub fn desired_files(&self) -> Vec<DesiredFile> {
        self.assets
            .iter()
            .map(|asset| {
                let mut asset = asset.clone();
                if let Some(dir) = &self.release_dir {
                    if asset.path.is_relative() {
                        asset.path = dir.join(&asset.path);
                    }
                }
                asset
            })
            .collect()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn upload_timeout(&self) -> Option<Duration> {
        self.upload_timeout_secs.map(Duration::from_secs)
    }

    /// Browser URL of the release page
    pub fn release_page_url(&self) -> String {
        format!(
            "https://github.com/{}/{}/releases/tag/{}",
            self.owner, self.repository, self.tag
        )
    }
}
