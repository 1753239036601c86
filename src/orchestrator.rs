//! Publishing pipeline driver
//!
//! Order of work for a run:
//! 1. pre-flight: every desired file must exist locally, or nothing happens
//! 2. resolve the release once
//! 3. per file, in order: reconcile the target name, upload, record outcome
//!
//! With `concurrency > 1` several files are in flight at once, but each file
//! still reconciles before it uploads and outcomes keep input order.

use crate::config::PublishConfig;
use crate::error::{PublishError, Result};
use crate::logging::Logger;
use crate::outcome::{RunReport, UploadOutcome};
use crate::reconcile::AssetReconciler;
use crate::release::{AssetInventory, Release, ReleaseLocator, RepoCoordinates};
use crate::transport::Transport;
use crate::upload::{LocalArtifact, Uploader};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// What a dry run would do with one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlannedAction {
    Create,
    Replace { asset_id: u64, remote_size: u64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedUpload {
    pub name: String,
    pub local_size: u64,
    pub sha256: String,
    pub action: PlannedAction,
}

/// Result of a dry run
#[derive(Debug, Clone, Serialize)]
pub struct PublishPlan {
    pub release: Release,
    pub uploads: Vec<PlannedUpload>,
}

pub struct Orchestrator {
    config: PublishConfig,
    locator: ReleaseLocator,
    inventory: AssetInventory,
    reconciler: AssetReconciler,
    uploader: Uploader,
    logger: Logger,
}

impl Orchestrator {
    pub fn new(config: PublishConfig, transport: Arc<dyn Transport>, logger: Logger) -> Self {
        let repo = RepoCoordinates::new(config.owner.clone(), config.repository.clone());
        let locator = ReleaseLocator::new(transport.clone(), repo.clone(), logger.clone());
        let inventory = AssetInventory::new(transport.clone(), repo, logger.clone());
        let reconciler = AssetReconciler::new(inventory.clone(), logger.clone());
        let uploader = Uploader::new(transport, logger.clone());

        Self {
            config,
            locator,
            inventory,
            reconciler,
            uploader,
            logger,
        }
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// Check every desired file before any network activity
    pub async fn preflight(&self) -> Result<Vec<LocalArtifact>> {
        self.logger.subsection("Checking release files");

        let mut artifacts = Vec::new();
        let mut missing = Vec::new();

        for file in self.config.desired_files() {
            match LocalArtifact::inspect(&file).await? {
                Some(artifact) => {
                    self.logger.success(&format!(
                        "Found: {} ({})",
                        artifact.name(),
                        self.logger.format_size(artifact.size)
                    ));
                    self.logger.detail(&format!("sha256:{}", artifact.sha256));
                    artifacts.push(artifact);
                }
                None => {
                    self.logger.error(&format!("Missing: {} ({})", file.name, file.path.display()));
                    missing.push(file.name);
                }
            }
        }

        if !missing.is_empty() {
            self.logger.error(&format!(
                "{} file(s) are missing. Build the artifacts first.",
                missing.len()
            ));
            return Err(PublishError::LocalFileMissing { names: missing });
        }
        Ok(artifacts)
    }

    /// Publish every desired file
    ///
    /// `Err` means the run was aborted before any upload: bad configuration,
    /// missing local files, missing or rejected credentials, or no release for
    /// the tag. Per-file failures are reported inside the [`RunReport`].
    pub async fn run(&self) -> Result<RunReport> {
        let started = Instant::now();
        self.config.validate()?;

        let artifacts = self.preflight().await?;

        self.logger.subsection("Resolving release");
        let release = self.locator.locate(&self.config.tag).await?;

        self.logger.subsection(&format!("Uploading {} file(s)", artifacts.len()));
        let outcomes: Vec<UploadOutcome> = stream::iter(artifacts.iter())
            .map(|artifact| self.publish_one(&release, artifact))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        Ok(RunReport {
            release,
            outcomes,
            elapsed: started.elapsed(),
        })
    }

    async fn publish_one(&self, release: &Release, artifact: &LocalArtifact) -> UploadOutcome {
        let name = artifact.name();
        let reconciliation = self.reconciler.reconcile(release, name).await;
        let result = self.uploader.upload(release, artifact).await;
        let outcome = UploadOutcome::from_upload(name, reconciliation, result);

        if !outcome.is_success() {
            self.logger.error(&format!("Failed to upload {}: {}", name, outcome.reason()));
        }
        outcome
    }

    /// Dry run: pre-flight, release resolution and one inventory listing
    pub async fn plan(&self) -> Result<PublishPlan> {
        self.config.validate()?;
        let artifacts = self.preflight().await?;

        self.logger.subsection("Resolving release");
        let release = self.locator.locate(&self.config.tag).await?;
        let existing = self.inventory.list(&release).await?;

        let uploads = artifacts
            .into_iter()
            .map(|artifact| {
                let action = existing
                    .iter()
                    .find(|asset| asset.name == artifact.file.name)
                    .map(|asset| PlannedAction::Replace {
                        asset_id: asset.id,
                        remote_size: asset.size,
                    })
                    .unwrap_or(PlannedAction::Create);
                PlannedUpload {
                    name: artifact.file.name,
                    local_size: artifact.size,
                    sha256: artifact.sha256,
                    action,
                }
            })
            .collect();

        Ok(PublishPlan { release, uploads })
    }
}
