//! Removal of same-name assets ahead of an upload
//!
//! Reconciliation is best effort. A failed lookup or delete is reported as a
//! [`ReconciliationWarning`] and the upload still goes ahead; if the stale
//! asset survived, the service rejects the duplicate name and the upload
//! outcome records it.

use crate::error::handlers::HttpErrorHandler;
use crate::logging::Logger;
use crate::release::{AssetInventory, Release};
use crate::transport::TransportRequest;
use serde::Serialize;

/// Non-fatal problem met while clearing a target name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationWarning {
    /// Asset that could not be removed, when one was found
    pub asset_id: Option<u64>,
    pub status: Option<u16>,
    pub message: String,
}

/// Result of reconciling one target name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Reconciliation {
    /// No asset held the name
    Absent,
    /// A stale asset was deleted
    Replaced { asset_id: u64, size: u64 },
    Warning(ReconciliationWarning),
}

impl Reconciliation {
    pub fn is_warning(&self) -> bool {
        matches!(self, Reconciliation::Warning(_))
    }

    pub fn warning(&self) -> Option<&ReconciliationWarning> {
        match self {
            Reconciliation::Warning(warning) => Some(warning),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct AssetReconciler {
    inventory: AssetInventory,
    logger: Logger,
}

impl AssetReconciler {
    pub fn new(inventory: AssetInventory, logger: Logger) -> Self {
        Self { inventory, logger }
    }

    pub async fn reconcile(&self, release: &Release, name: &str) -> Reconciliation {
        let existing = match self.inventory.find_by_name(release, name).await {
            Ok(existing) => existing,
            Err(e) => {
                let warning = ReconciliationWarning {
                    asset_id: None,
                    status: None,
                    message: format!("could not list existing assets: {}", e),
                };
                self.logger.warning(&format!("{}: {}", name, warning.message));
                return Reconciliation::Warning(warning);
            }
        };

        let Some(asset) = existing else {
            self.logger.detail(&format!("No existing asset named {}", name));
            return Reconciliation::Absent;
        };

        self.logger.step(&format!("🗑️  Deleting existing asset: {} (ID: {})", name, asset.id));
        let path = self
            .inventory
            .repo()
            .path(&format!("releases/assets/{}", asset.id));

        match self
            .inventory
            .transport()
            .request(TransportRequest::delete(path))
            .await
        {
            Ok(response) if response.status == 204 => Reconciliation::Replaced {
                asset_id: asset.id,
                size: asset.size,
            },
            Ok(response) => {
                let warning = ReconciliationWarning {
                    asset_id: Some(asset.id),
                    status: Some(response.status),
                    message: HttpErrorHandler::describe_delete_failure(response.status, &response.text()),
                };
                self.logger.warning(&format!(
                    "Could not delete existing asset {}: {}",
                    name, warning.message
                ));
                Reconciliation::Warning(warning)
            }
            Err(e) => {
                let warning = ReconciliationWarning {
                    asset_id: Some(asset.id),
                    status: None,
                    message: format!("delete request failed: {}", e),
                };
                self.logger.warning(&format!(
                    "Could not delete existing asset {}: {}",
                    name, warning.message
                ));
                Reconciliation::Warning(warning)
            }
        }
    }
}
