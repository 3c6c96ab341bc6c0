//! Error types for the Capstan orchestrator
//!
//! The taxonomy mirrors the failure classes of the test-case lifecycle:
//! rendering, transport, health, timeout, and cleanup failures are distinct
//! variants so the runner can fail fast on definitive failures while keeping
//! cleanup errors from masking the original case outcome.

use thiserror::Error;

use crate::template::TemplateError;

/// Main error type for Capstan operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Template rendering failed (bad template or params; never retried)
    #[error("render error: {0}")]
    Render(#[from] TemplateError),

    /// Kubernetes API call failed (surfaced immediately, no automatic retry)
    #[error("kubernetes error: {0}")]
    Transport(#[from] kube::Error),

    /// Workload or testing object is definitively unhealthy (fail-fast)
    #[error("health failure: {0}")]
    Health(String),

    /// Polling budget exhausted without success or definitive failure
    #[error("{0}")]
    Timeout(String),

    /// Deletion or termination wait failed during teardown
    #[error("cleanup error: {0}")]
    Cleanup(String),

    /// Run configuration is invalid or unreadable
    #[error("config error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem error while persisting result artifacts
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A test-case failure wrapped with its tool/workload/case identity
    #[error("tool {tool} workload {workload} case {case}: {source}")]
    Case {
        /// Testing tool that was driving the case
        tool: String,
        /// Workload under test
        workload: String,
        /// Test case that failed
        case: String,
        /// The underlying failure
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a health failure with the given reason
    pub fn health(reason: impl Into<String>) -> Self {
        Self::Health(reason.into())
    }

    /// Create a timeout error with the given message
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a cleanup error with the given message
    pub fn cleanup(msg: impl Into<String>) -> Self {
        Self::Cleanup(msg.into())
    }

    /// Create a config error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Wrap an error with the identity of the test case it belongs to
    pub fn for_case(
        self,
        tool: impl Into<String>,
        workload: impl Into<String>,
        case: impl Into<String>,
    ) -> Self {
        Self::Case {
            tool: tool.into(),
            workload: workload.into(),
            case: case.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, unwrapping any test-case context layers
    pub fn root(&self) -> &Error {
        match self {
            Self::Case { source, .. } => source.root(),
            other => other,
        }
    }
}
