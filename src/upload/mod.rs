//! Asset upload
//!
//! Streams one local file to the release's upload endpoint. Only a `201
//! Created` carrying a download URL counts as success; every other status,
//! redirects included, is a rejection. A created response whose reported
//! size or digest disagrees with the local file is treated as a malformed
//! success and rejected as well.

pub mod content_type;
pub mod local;

pub use content_type::{DEFAULT_CONTENT_TYPE, content_type_for};
pub use local::LocalArtifact;

use crate::digest;
use crate::error::handlers::HttpErrorHandler;
use crate::error::{PublishError, Result};
use crate::logging::Logger;
use crate::release::{Release, RemoteAsset};
use crate::transport::{RequestBody, Transport, TransportRequest};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Status the service uses for a created asset
pub const CREATED: u16 = 201;

/// Asset created by a successful upload
#[derive(Debug, Clone)]
pub struct UploadedAsset {
    pub asset: RemoteAsset,
    pub elapsed: Duration,
}

#[derive(Debug, Deserialize)]
struct UploadedPayload {
    id: Option<u64>,
    name: Option<String>,
    size: Option<u64>,
    browser_download_url: Option<String>,
    digest: Option<String>,
}

#[derive(Clone)]
pub struct Uploader {
    transport: Arc<dyn Transport>,
    logger: Logger,
}

impl Uploader {
    pub fn new(transport: Arc<dyn Transport>, logger: Logger) -> Self {
        Self { transport, logger }
    }

    pub async fn upload(&self, release: &Release, artifact: &LocalArtifact) -> Result<UploadedAsset> {
        let file = &artifact.file;

        // Re-checked here: the file may have gone since pre-flight
        let len = match tokio::fs::metadata(&file.path).await {
            Ok(metadata) if metadata.is_file() => metadata.len(),
            _ => {
                return Err(PublishError::LocalFileMissing {
                    names: vec![file.name.clone()],
                });
            }
        };

        let content_type = file
            .content_type
            .clone()
            .unwrap_or_else(|| content_type_for(&file.name).to_string());
        let url = release.upload_endpoint.url_for(&file.name, file.label.as_deref());

        self.logger.step(&format!(
            "📤 Uploading {} ({}, {})",
            file.name,
            self.logger.format_size(len),
            content_type
        ));

        let request = TransportRequest::post(url.as_str())
            .with_header("Content-Type", content_type)
            .with_body(RequestBody::File {
                path: file.path.clone(),
                len,
            });

        let started = Instant::now();
        let response = self.transport.request(request).await?;
        let elapsed = started.elapsed();

        if response.status != CREATED {
            let body = response.text();
            self.logger.detail(&HttpErrorHandler::describe_upload_failure(response.status, &body));
            return Err(PublishError::RejectedByServer {
                status: response.status,
                body: HttpErrorHandler::excerpt(&body),
            });
        }

        let payload: UploadedPayload = response.json().map_err(|e| {
            PublishError::ResponseParse(format!("created response for {} is not valid JSON: {}", file.name, e))
        })?;
        let asset = self.verify_created(payload, artifact, len)?;

        self.logger.success(&format!(
            "Successfully uploaded: {} in {}",
            file.name,
            self.logger.format_duration(elapsed)
        ));
        self.logger.detail(&format!("📥 Download URL: {}", asset.download_url));

        Ok(UploadedAsset { asset, elapsed })
    }

    fn verify_created(&self, payload: UploadedPayload, artifact: &LocalArtifact, len: u64) -> Result<RemoteAsset> {
        let malformed = |reason: String| PublishError::RejectedByServer {
            status: CREATED,
            body: format!("malformed success: {}", reason),
        };

        let download_url = payload
            .browser_download_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| malformed("response has no download URL".to_string()))?;

        if let Some(size) = payload.size {
            if size != len {
                return Err(malformed(format!(
                    "service reports {} bytes, local file has {}",
                    size, len
                )));
            }
        }

        if let Some(reported) = payload.digest.as_deref() {
            match digest::matches_reported(&artifact.sha256, reported) {
                Some(false) => {
                    return Err(malformed(format!(
                        "service digest {} does not match local sha256:{}",
                        reported, artifact.sha256
                    )));
                }
                Some(true) => self.logger.detail("Digest verified"),
                None => self.logger.debug(&format!("Skipping unsupported digest {}", reported)),
            }
        }

        Ok(RemoteAsset {
            id: payload.id.unwrap_or_default(),
            name: payload.name.unwrap_or_else(|| artifact.file.name.clone()),
            size: payload.size.unwrap_or(len),
            download_url,
            digest: payload.digest,
        })
    }
}
