#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`config`]: Awaiter configuration (`AwaiterConfig`, builder)
//! - [`awaiter`]: Completion polling (`CompletionAwaiter`, `AwaitHandle`)
//! - [`retrieval`]: Report and summary retrieval (`ResultRetriever`)
//! - [`workflow`]: Start, await and collect under one deadline (`ScanWorkflow`)
//!
//! # Architecture
//!
//! ```text
//! ScanWorkflow::start ──> ScanClient::create
//!
//! ScanWorkflow::run
//!     |
//!     CompletionAwaiter ──poll──> ScanClient::get ──sleep──> Scheduler
//!     |
//!     CompletedScan
//!     |
//!     ResultRetriever ──> get_summary ‖ get_report ──> report file
//! ```

pub mod awaiter;
pub mod config;
pub mod retrieval;
pub mod workflow;

// --- Public API Re-exports ---

// Awaiting
pub use awaiter::{AwaitHandle, CompletionAwaiter};

// Configuration
pub use config::{AwaiterConfig, AwaiterConfigBuilder};

// Retrieval
pub use retrieval::ResultRetriever;

// Workflow
pub use workflow::{ScanOutcome, ScanWorkflow};
