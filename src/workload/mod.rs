//! Workload and tool types for benchmark orchestration
//!
//! A [`Workload`] is the system under test; a [`Tool`] binds it to an ordered
//! sequence of [`TestCase`]s and knows how to render the pod manifests each
//! case needs. Tool variants differ only in rendering and in which auxiliary
//! resources they require; the lifecycle state machine in [`runner`] is
//! written once over the [`Tool`] trait and shared by every variant.

mod runner;
mod scripted;
mod templates;
mod wrk;

pub use runner::{CaseState, PollSettings, ToolReport, ToolRunner};
pub use scripted::ScriptedTool;
pub use wrk::WrkTool;

use std::collections::BTreeMap;
use std::time::Duration;

use crate::Result;

/// The system under test deployed into the cluster for benchmarking
#[derive(Clone, Debug)]
pub struct Workload {
    /// Workload name (also used in pod names and artifact paths)
    pub name: String,
    /// Container image reference for the workload pod
    pub image: String,
}

/// One parameterized benchmark scenario within a tool's sequence
#[derive(Clone, Debug, Default)]
pub struct TestCase {
    /// Case name (also used in pod names and artifact paths)
    pub name: String,
    /// Tool arguments, kept structured until the template boundary
    pub args: Vec<String>,
    /// Schedule the testing pod on the same node as the workload pod
    pub affinity: bool,
    /// Environment variable assignments for the testing payload
    pub envs: BTreeMap<String, String>,
}

/// A config map a tool requires before its testing pod starts
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigMapSpec {
    /// Config map name (unique per tool and case)
    pub name: String,
    /// Keyed data entries
    pub data: BTreeMap<String, String>,
}

/// Polymorphic contract implemented by each concrete testing tool
///
/// Implementations provide only variant-specific behavior: how the workload
/// and testing pod manifests are rendered and which auxiliary config maps
/// the testing payload needs. Sequencing, polling, collection, and cleanup
/// live in [`ToolRunner`] and must not be duplicated per variant.
pub trait Tool: Send + Sync {
    /// Name of the testing tool
    fn name(&self) -> &str;

    /// The workload this tool benchmarks
    fn workload(&self) -> &Workload;

    /// Inter-case delay, applied between consecutive test cases
    fn steps(&self) -> Duration;

    /// The ordered sequence of test cases this tool runs
    fn test_cases(&self) -> &[TestCase];

    /// Render the workload pod manifest for a test case
    fn render_workload(&self, case: &TestCase) -> Result<Vec<u8>>;

    /// Render the testing pod manifest, wired to the workload pod's IP
    fn render_testing(&self, case: &TestCase, workload_ip: &str) -> Result<Vec<u8>>;

    /// Auxiliary config maps to create after readiness, before the testing pod
    fn aux_config_maps(&self, _case: &TestCase, _run_id: &str) -> Result<Vec<ConfigMapSpec>> {
        Ok(Vec::new())
    }
}

/// Name of the workload pod created for a test case
pub fn workload_pod_name(workload: &str, case: &str) -> String {
    format!("capstan-{workload}-{case}").to_lowercase()
}

/// Name of the testing pod created for a test case
pub fn testing_pod_name(tool: &str, case: &str) -> String {
    format!("capstan-{tool}-{case}").to_lowercase()
}

/// Quote and join structured tool arguments for use inside a shell command
///
/// Each argument is single-quoted with embedded quotes escaped, so arbitrary
/// argument content survives the template boundary intact. This replaces
/// ad-hoc comma-joined string concatenation at call sites.
pub fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|arg| format!("'{}'", arg.replace('\'', r"'\''")))
        .collect::<Vec<_>>()
        .join(" ")
}
