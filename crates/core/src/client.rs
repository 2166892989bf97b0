//! Scan service client abstraction.
//!
//! The [`ScanClient`] trait is the narrow boundary through which the core talks
//! to the remote scanning service. Transport, authentication and the JSON wire
//! format all live behind it; the awaiter and result retrieval only ever see
//! typed snapshots and classified [`ScanError`]s.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐   ┌─────────────────┐
//! │ CompletionAwaiter │   │ ResultRetriever │
//! └─────────┬─────────┘   └────────┬────────┘
//!           │                      │
//!           ▼                      ▼
//!        ┌──────────────────────────┐
//!        │    ScanClient (trait)    │
//!        └──────────────────────────┘
//!              │              │
//!              ▼              ▼
//!        HTTP client     ScriptedScanClient
//!       (collaborator)      (test-util)
//! ```
//!
//! # Error contract
//!
//! Implementations classify HTTP failures with [`crate::http::classify`] and
//! may return any error kind except `ScanFailed`, `Timeout`, `Cancelled` and
//! `PreconditionViolation`; those are synthesized by the core.

use std::future::Future;

use tokio::io::AsyncRead;

use crate::error::ScanError;
use crate::types::{ScanSnapshot, ScanSummary};

/// Owned report byte stream. Dropping it closes the underlying connection.
pub type ReportStream = Box<dyn AsyncRead + Send + Unpin>;

/// Remote operations of the scanning service.
///
/// The trait is `Send + Sync + 'static` so a single client can be shared via
/// `Arc` across many concurrent awaits.
pub trait ScanClient: Send + Sync + 'static {
    /// Starts a new scan of a code artifact.
    ///
    /// The returned snapshot is usually `WAITING` or `RUNNING`.
    fn create(
        &self,
        project_id: &str,
        code_artifact_id: &str,
        label: &str,
    ) -> impl Future<Output = Result<ScanSnapshot, ScanError>> + Send;

    /// Fetches the current state of a scan.
    fn get(
        &self,
        project_id: &str,
        scan_id: &str,
    ) -> impl Future<Output = Result<ScanSnapshot, ScanError>> + Send;

    /// Fetches the analysis report of a finished scan.
    fn get_report(
        &self,
        project_id: &str,
        scan_id: &str,
    ) -> impl Future<Output = Result<ReportStream, ScanError>> + Send;

    /// Fetches the aggregate summary of a finished scan.
    fn get_summary(
        &self,
        project_id: &str,
        scan_id: &str,
    ) -> impl Future<Output = Result<ScanSummary, ScanError>> + Send;
}
