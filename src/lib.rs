//! Release Asset Pusher Library
//!
//! Publishes locally built artifacts as named assets of a tagged release and
//! converges on one asset per name however many times it is re-run. The
//! pipeline is: pre-flight local check, release lookup, then per file
//! reconcile (delete a same-name asset) and upload.

pub mod cli;
pub mod config;
pub mod digest;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod outcome;
pub mod reconcile;
pub mod release;
pub mod transport;
pub mod upload;

pub use config::{Credentials, DesiredFile, PublishConfig, TransportKind};
pub use error::{PublishError, Result};
pub use logging::Logger;
pub use orchestrator::{Orchestrator, PlannedAction, PublishPlan};
pub use outcome::{AggregateResult, RunReport, UploadOutcome, UploadStatus};
pub use transport::{Transport, TransportError, TransportRequest, TransportResponse};
