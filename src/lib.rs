//! Capstan - Kubernetes workload benchmark orchestrator
//!
//! Capstan deploys a workload into a cluster, drives a paired testing tool
//! through an ordered sequence of test cases, watches the tool's log output
//! for the completion sentinel, persists the captured logs as result
//! artifacts, and tears everything down afterward.
//!
//! # Architecture
//!
//! Each configured workload is bound to exactly one testing tool. A tool's
//! test cases run strictly sequentially (later cases may depend on cluster
//! capacity freed by earlier cleanups); distinct tools run concurrently,
//! each driven by its own runner with independent state.
//!
//! Every test case moves through a single state machine, written once and
//! parameterized over the [`workload::Tool`] trait:
//!
//! ```text
//! Init -> Deploying -> AwaitingReady -> Executing -> AwaitingCompletion
//!      -> Collecting -> CleaningUp -> Done   (Failed absorbs from any state)
//! ```
//!
//! # Modules
//!
//! - [`config`] - Run configuration loading and tool construction
//! - [`health`] - Pod status snapshots and the health classifier
//! - [`completion`] - Log sentinel detection
//! - [`poll`] - Bounded sleep-then-sample polling engine
//! - [`store`] - Object-store abstraction over the Kubernetes API
//! - [`template`] - Template rendering for pod manifests
//! - [`results`] - Write-once result artifact persistence
//! - [`workload`] - Workload/tool types, tool variants, and the runner
//! - [`error`] - Error types for the orchestrator

#![deny(missing_docs)]

use std::time::Duration;

pub mod completion;
pub mod config;
pub mod error;
pub mod health;
pub mod poll;
pub mod results;
pub mod store;
pub mod template;
pub mod workload;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================
// These constants define the default timing and naming values used throughout
// Capstan. Centralizing them here keeps the runner, the store, and test
// fixtures consistent.

/// Namespace all benchmark objects are created in unless configured otherwise
pub const DEFAULT_NAMESPACE: &str = "capstan";

/// Interval between readiness polls of a freshly created workload pod
pub const READY_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Readiness poll attempt budget (one minute at [`READY_POLL_INTERVAL`])
pub const READY_POLL_ATTEMPTS: u32 = 6;

/// Interval between completion polls of a running testing pod
pub const COMPLETION_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Completion poll attempt budget (one hour at [`COMPLETION_POLL_INTERVAL`])
pub const COMPLETION_POLL_ATTEMPTS: u32 = 120;

/// Resolution of the post-delete absence poll
pub const DELETE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Upper bound on waiting for a deleted pod to disappear
pub const DELETE_WAIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Field manager name used for server-side apply operations
pub const FIELD_MANAGER: &str = "capstan";
