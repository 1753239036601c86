//! Release resolution
//!
//! Resolves a tag to a [`Release`], including the asset upload endpoint.
//! The service hands the endpoint back as a URI template
//! (`.../assets{?name,label}`); [`UploadEndpoint`] strips the template
//! expression and re-adds `name`/`label` as properly encoded query pairs.

pub mod inventory;

pub use inventory::{AssetInventory, RemoteAsset};

use crate::error::handlers::HttpErrorHandler;
use crate::error::{PublishError, Result};
use crate::logging::Logger;
use crate::transport::{Transport, TransportRequest};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

/// Characters left as-is in a single path segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode a value so it stays one path segment (`#`, `%`, `/`, `?` included)
pub fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Owner/repository pair that scopes every API path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCoordinates {
    pub owner: String,
    pub repository: String,
}

impl RepoCoordinates {
    pub fn new(owner: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repository: repository.into(),
        }
    }

    /// API path under `/repos/{owner}/{repository}`
    pub fn path(&self, suffix: &str) -> String {
        format!(
            "/repos/{}/{}/{}",
            self.owner,
            self.repository,
            suffix.trim_start_matches('/')
        )
    }
}

/// Parameterized asset upload endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadEndpoint {
    base: Url,
}

impl UploadEndpoint {
    /// Build from the service's URI template, dropping any `{...}` expression
    pub fn from_template(template: &str) -> Result<Self> {
        let stripped = template.split('{').next().unwrap_or_default().trim();
        if stripped.is_empty() {
            return Err(PublishError::ResponseParse(format!(
                "release upload_url is not a usable template: '{}'",
                template
            )));
        }
        let base = Url::parse(stripped).map_err(|e| {
            PublishError::ResponseParse(format!("invalid upload URL '{}': {}", stripped, e))
        })?;
        Ok(Self { base })
    }

    /// Concrete upload URL for one asset
    pub fn url_for(&self, name: &str, label: Option<&str>) -> Url {
        let mut url = self.base.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("name", name);
            if let Some(label) = label {
                pairs.append_pair("label", label);
            }
        }
        url
    }

    pub fn base(&self) -> &Url {
        &self.base
    }
}

/// Resolved release, fetched once per run
#[derive(Debug, Clone, Serialize)]
pub struct Release {
    pub id: u64,
    pub tag: String,
    pub name: String,
    pub upload_endpoint: UploadEndpoint,
    pub html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReleasePayload {
    id: u64,
    tag_name: String,
    name: Option<String>,
    upload_url: String,
    html_url: Option<String>,
}

impl Release {
    fn from_payload(payload: ReleasePayload, requested_tag: &str) -> Result<Self> {
        if payload.tag_name != requested_tag {
            return Err(PublishError::ResponseParse(format!(
                "lookup for tag '{}' returned release {} tagged '{}'",
                requested_tag, payload.id, payload.tag_name
            )));
        }
        let upload_endpoint = UploadEndpoint::from_template(&payload.upload_url)?;
        let name = payload
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| payload.tag_name.clone());
        Ok(Self {
            id: payload.id,
            tag: payload.tag_name,
            name,
            upload_endpoint,
            html_url: payload.html_url,
        })
    }
}

/// Looks up releases by tag
#[derive(Clone)]
pub struct ReleaseLocator {
    transport: Arc<dyn Transport>,
    repo: RepoCoordinates,
    logger: Logger,
}

impl ReleaseLocator {
    pub fn new(transport: Arc<dyn Transport>, repo: RepoCoordinates, logger: Logger) -> Self {
        Self {
            transport,
            repo,
            logger,
        }
    }

    pub async fn locate(&self, tag: &str) -> Result<Release> {
        self.logger.step(&format!(
            "Resolving release {} in {}/{}",
            tag, self.repo.owner, self.repo.repository
        ));

        let path = self.repo.path(&format!("releases/tags/{}", encode_segment(tag)));
        let response = self.transport.request(TransportRequest::get(path)).await?;

        if !response.is_success() {
            return Err(HttpErrorHandler::release_lookup_error(
                response.status,
                &response.text(),
                tag,
            ));
        }

        let payload: ReleasePayload = response.json().map_err(|e| {
            PublishError::ResponseParse(format!("failed to parse release {}: {}", tag, e))
        })?;
        let release = Release::from_payload(payload, tag)?;

        self.logger.success(&format!("Found release: {} (ID: {})", release.name, release.id));
        self.logger.detail(&format!("Upload endpoint: {}", release.upload_endpoint.base()));
        Ok(release)
    }
}
