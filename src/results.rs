//! Write-once result artifact persistence
//!
//! Captured log bodies are persisted under a directory tree keyed by the run
//! UUID so repeated runs never collide:
//!
//! ```text
//! <resultsRoot>/<runUUID>/workloads/<workload>/<tool>/<case>/<tool>.log
//! ```
//!
//! Artifacts are write-once: the file is created exclusively and never
//! appended to or overwritten.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;
use uuid::Uuid;

use crate::{Error, Result};

/// Sink persisting result artifacts for one run
#[derive(Clone, Debug)]
pub struct ResultsSink {
    root: PathBuf,
    run_id: String,
}

impl ResultsSink {
    /// Create a sink rooted at `root` with a fresh run UUID
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_run_id(root, Uuid::new_v4().to_string())
    }

    /// Create a sink with an explicit run id (used by tests and resumed runs)
    pub fn with_run_id(root: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            run_id: run_id.into(),
        }
    }

    /// The run UUID artifacts of this sink are keyed by
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Canonical artifact path for a (workload, tool, case) triple
    pub fn artifact_path(&self, workload: &str, tool: &str, case: &str) -> PathBuf {
        self.root
            .join(&self.run_id)
            .join("workloads")
            .join(workload)
            .join(tool)
            .join(case)
            .join(format!("{tool}.log"))
    }

    /// Persist a captured log body as the artifact for one test case
    ///
    /// Creates parent directories as needed. Fails if the artifact already
    /// exists; artifacts are never mutated after creation.
    pub fn persist(&self, workload: &str, tool: &str, case: &str, body: &[u8]) -> Result<PathBuf> {
        let path = self.artifact_path(workload, tool, case);
        let dir = path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir)?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "result artifact {} already exists; artifacts are write-once",
                        path.display()
                    ),
                )),
                _ => Error::Io(e),
            })?;
        file.write_all(body)?;

        info!(
            workload = %workload,
            tool = %tool,
            case = %case,
            path = %path.display(),
            "Persisted result artifact"
        );
        Ok(path)
    }
}
