//! Asset inventory of a release
//!
//! Every call goes back to the service; nothing is cached, so a listing made
//! after a delete reflects the delete.

use crate::error::{PublishError, Result};
use crate::logging::Logger;
use crate::release::{Release, RepoCoordinates};
use crate::transport::{Transport, TransportRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const PAGE_SIZE: usize = 100;
const MAX_PAGES: usize = 50;

/// Asset attached to a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAsset {
    pub id: u64,
    pub name: String,
    pub size: u64,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

#[derive(Clone)]
pub struct AssetInventory {
    transport: Arc<dyn Transport>,
    repo: RepoCoordinates,
    logger: Logger,
}

impl AssetInventory {
    pub fn new(transport: Arc<dyn Transport>, repo: RepoCoordinates, logger: Logger) -> Self {
        Self {
            transport,
            repo,
            logger,
        }
    }

    /// List every asset currently attached to the release
    pub async fn list(&self, release: &Release) -> Result<Vec<RemoteAsset>> {
        let mut assets = Vec::new();
        let mut complete = false;

        for page in 1..=MAX_PAGES {
            let path = self.repo.path(&format!(
                "releases/{}/assets?per_page={}&page={}",
                release.id, PAGE_SIZE, page
            ));
            let response = self.transport.request(TransportRequest::get(path)).await?;

            if !response.is_success() {
                return Err(PublishError::RejectedByServer {
                    status: response.status,
                    body: response.text(),
                });
            }

            let batch: Vec<RemoteAsset> = response.json().map_err(|e| {
                PublishError::ResponseParse(format!("failed to parse asset list: {}", e))
            })?;
            let short_page = batch.len() < PAGE_SIZE;
            assets.extend(batch);
            if short_page {
                complete = true;
                break;
            }
        }

        if !complete {
            let message = format!(
                "release {} still has assets after {} pages of {}; listing is incomplete",
                release.tag, MAX_PAGES, PAGE_SIZE
            );
            self.logger.warning(&message);
            return Err(PublishError::ResponseParse(message));
        }

        self.logger.detail(&format!(
            "Release {} has {} asset(s)",
            release.tag,
            assets.len()
        ));
        Ok(assets)
    }

    pub async fn find_by_name(&self, release: &Release, name: &str) -> Result<Option<RemoteAsset>> {
        Ok(self
            .list(release)
            .await?
            .into_iter()
            .find(|asset| asset.name == name))
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub(crate) fn repo(&self) -> &RepoCoordinates {
        &self.repo
    }
}
