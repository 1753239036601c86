//! Per-file outcomes and the aggregate run report
//!
//! Outcomes are built once per desired file by the orchestrator and never
//! changed afterwards. Console output is rendered from these values.

use crate::error::PublishError;
use crate::reconcile::Reconciliation;
use crate::release::Release;
use crate::upload::UploadedAsset;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Success,
    LocalMissing,
    /// A same-name asset could not be removed and the service refused the duplicate
    RemoteConflictUnresolved,
    TransportFailure,
    RejectedByServer,
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UploadStatus::Success => "success",
            UploadStatus::LocalMissing => "local file missing",
            UploadStatus::RemoteConflictUnresolved => "remote conflict unresolved",
            UploadStatus::TransportFailure => "transport failure",
            UploadStatus::RejectedByServer => "rejected by server",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub name: String,
    pub status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub reconciliation: Reconciliation,
}

impl UploadOutcome {
    /// Fold a reconciliation and an upload result into the file's outcome
    pub fn from_upload(
        name: &str,
        reconciliation: Reconciliation,
        result: Result<UploadedAsset, PublishError>,
    ) -> Self {
        let (status, download_url, status_code, detail) = match result {
            Ok(uploaded) => (UploadStatus::Success, Some(uploaded.asset.download_url), None, None),
            Err(PublishError::LocalFileMissing { .. }) => (
                UploadStatus::LocalMissing,
                None,
                None,
                Some("local file disappeared before upload".to_string()),
            ),
            Err(PublishError::Transport(e)) => (UploadStatus::TransportFailure, None, None, Some(e.to_string())),
            Err(PublishError::AuthMissing) => (
                UploadStatus::TransportFailure,
                None,
                None,
                Some(PublishError::AuthMissing.to_string()),
            ),
            Err(PublishError::RejectedByServer { status, body })
                if status == 422 && reconciliation.is_warning() =>
            {
                (UploadStatus::RemoteConflictUnresolved, None, Some(status), Some(body))
            }
            Err(PublishError::RejectedByServer { status, body }) => {
                (UploadStatus::RejectedByServer, None, Some(status), Some(body))
            }
            Err(other) => (UploadStatus::RejectedByServer, None, None, Some(other.to_string())),
        };

        Self {
            name: name.to_string(),
            status,
            download_url,
            status_code,
            detail,
            reconciliation,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == UploadStatus::Success
    }

    /// One-line reason for a failed outcome
    pub fn reason(&self) -> String {
        match (&self.status_code, &self.detail) {
            (Some(code), Some(detail)) => format!("{} (status {}): {}", self.status, code, detail),
            (Some(code), None) => format!("{} (status {})", self.status, code),
            (None, Some(detail)) => format!("{}: {}", self.status, detail),
            (None, None) => self.status.to_string(),
        }
    }
}

/// Overall verdict of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateResult {
    Success,
    PartialFailure { failures: Vec<(String, String)> },
}

/// Structured result of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub release: Release,
    pub outcomes: Vec<UploadOutcome>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(UploadOutcome::is_success)
    }

    pub fn aggregate(&self) -> AggregateResult {
        if self.is_success() {
            AggregateResult::Success
        } else {
            AggregateResult::PartialFailure {
                failures: self
                    .outcomes
                    .iter()
                    .filter(|o| !o.is_success())
                    .map(|o| (o.name.clone(), o.reason()))
                    .collect(),
            }
        }
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }

    /// Summary lines: tally, download links, failure reasons
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{}/{} files uploaded successfully",
            self.succeeded(),
            self.total()
        )];

        for outcome in &self.outcomes {
            match (&outcome.download_url, outcome.reconciliation.warning()) {
                (Some(url), _) => lines.push(format!("📥 {}: {}", outcome.name, url)),
                (None, Some(warning)) => lines.push(format!(
                    "❌ {}: {} (earlier delete warning: {})",
                    outcome.name,
                    outcome.reason(),
                    warning.message
                )),
                (None, None) => lines.push(format!("❌ {}: {}", outcome.name, outcome.reason())),
            }
        }
        lines
    }
}

/// Exit code for a finished run, including runs aborted by a fatal error
pub fn exit_code_for(result: &Result<RunReport, PublishError>) -> i32 {
    match result {
        Ok(report) => report.exit_code(),
        Err(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::ReconciliationWarning;
    use crate::release::{RemoteAsset, UploadEndpoint};

    fn release() -> Release {
        Release {
            id: 1,
            tag: "v1.0.0".to_string(),
            name: "Mixer 1.0.0".to_string(),
            upload_endpoint: UploadEndpoint::from_template("https://uploads.example.test/releases/1/assets{?name,label}")
                .unwrap(),
            html_url: None,
        }
    }

    fn success(name: &str) -> UploadOutcome {
        let uploaded = UploadedAsset {
            asset: RemoteAsset {
                id: 9,
                name: name.to_string(),
                size: 3,
                download_url: format!("https://example.test/download/{}", name),
                digest: None,
            },
            elapsed: Duration::from_millis(5),
        };
        UploadOutcome::from_upload(name, Reconciliation::Absent, Ok(uploaded))
    }

    fn rejected(name: &str, status: u16, reconciliation: Reconciliation) -> UploadOutcome {
        UploadOutcome::from_upload(
            name,
            reconciliation,
            Err(PublishError::RejectedByServer {
                status,
                body: "nope".to_string(),
            }),
        )
    }

    #[test]
    fn all_success_aggregates_to_success() {
        let report = RunReport {
            release: release(),
            outcomes: vec![success("a.zip"), success("b.zip")],
            elapsed: Duration::ZERO,
        };
        assert_eq!(report.aggregate(), AggregateResult::Success);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.summary_lines()[0], "2/2 files uploaded successfully");
    }

    #[test]
    fn single_rejection_is_partial_failure() {
        let report = RunReport {
            release: release(),
            outcomes: vec![success("a.zip"), rejected("b.zip", 500, Reconciliation::Absent)],
            elapsed: Duration::ZERO,
        };
        assert_eq!(report.exit_code(), 1);
        match report.aggregate() {
            AggregateResult::PartialFailure { failures } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].0, "b.zip");
                assert!(failures[0].1.contains("status 500"));
            }
            other => panic!("unexpected aggregate: {:?}", other),
        }
    }

    #[test]
    fn duplicate_after_failed_delete_is_conflict() {
        let warning = Reconciliation::Warning(ReconciliationWarning {
            asset_id: Some(4),
            status: Some(403),
            message: "forbidden".to_string(),
        });
        let outcome = rejected("a.zip", 422, warning);
        assert_eq!(outcome.status, UploadStatus::RemoteConflictUnresolved);

        let plain = rejected("a.zip", 422, Reconciliation::Absent);
        assert_eq!(plain.status, UploadStatus::RejectedByServer);
    }

    #[test]
    fn parse_errors_count_as_rejections() {
        let outcome = UploadOutcome::from_upload(
            "a.zip",
            Reconciliation::Absent,
            Err(PublishError::ResponseParse("bad json".to_string())),
        );
        assert_eq!(outcome.status, UploadStatus::RejectedByServer);
        assert!(outcome.download_url.is_none());
    }

    #[test]
    fn fatal_errors_exit_nonzero() {
        let result: Result<RunReport, PublishError> = Err(PublishError::ReleaseNotFound {
            tag: "v9".to_string(),
        });
        assert_eq!(exit_code_for(&result), 1);
    }
}
