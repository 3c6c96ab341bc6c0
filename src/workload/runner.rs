//! Test-case lifecycle orchestration
//!
//! [`ToolRunner`] drives every test case of a tool through the same state
//! machine, whatever the tool variant:
//!
//! ```text
//! Init -> Deploying -> AwaitingReady -> Executing -> AwaitingCompletion
//!      -> Collecting -> CleaningUp -> Done
//! ```
//!
//! `Failed` absorbs from any non-terminal state; cleanup is still attempted
//! for every handle created before the failure, exactly once per handle, and
//! cleanup errors are reported without masking the original outcome. Cases
//! run strictly sequentially with the tool's inter-case delay between them;
//! the per-case [`CaseRun`] record replaces any mutable cursor on the tool
//! itself, so one runner per tool is safe alongside others.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::completion::is_complete;
use crate::health::{classify, ObservationSnapshot, Verdict};
use crate::poll::poll;
use crate::results::ResultsSink;
use crate::store::ObjectStore;
use crate::{
    Error, Result, COMPLETION_POLL_ATTEMPTS, COMPLETION_POLL_INTERVAL, READY_POLL_ATTEMPTS,
    READY_POLL_INTERVAL,
};

use super::{testing_pod_name, workload_pod_name, TestCase, Tool};

/// States a test case moves through
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaseState {
    /// Nothing created yet
    Init,
    /// Rendering and submitting the workload object
    Deploying,
    /// Polling the workload object until healthy
    AwaitingReady,
    /// Creating auxiliary resources and the testing object
    Executing,
    /// Polling the testing object's logs for the sentinel
    AwaitingCompletion,
    /// Fetching the final log body and persisting the artifact
    Collecting,
    /// Deleting every object created for the case
    CleaningUp,
    /// Terminal success
    Done,
    /// Terminal failure (cleanup still attempted)
    Failed,
}

/// Kind of cluster object a handle refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HandleKind {
    Pod,
    ConfigMap,
}

/// Opaque reference to a cluster object created during a test case
///
/// No handle outlives its owning test case: every tracked handle is deleted
/// exactly once during cleanup, in reverse creation order.
#[derive(Clone, Debug)]
struct ObjectHandle {
    kind: HandleKind,
    namespace: String,
    name: String,
}

/// Per-case state record threaded through the runner's call chain
struct CaseRun {
    case: String,
    state: CaseState,
    handles: Vec<ObjectHandle>,
}

impl CaseRun {
    fn new(case: &str) -> Self {
        Self {
            case: case.to_string(),
            state: CaseState::Init,
            handles: Vec::new(),
        }
    }

    fn transition(&mut self, next: CaseState) {
        debug!(case = %self.case, from = ?self.state, to = ?next, "State transition");
        self.state = next;
    }

    fn track(&mut self, kind: HandleKind, namespace: &str, name: &str) {
        self.handles.push(ObjectHandle {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
    }
}

/// Poll intervals and attempt budgets used by the runner
#[derive(Clone, Copy, Debug)]
pub struct PollSettings {
    /// Interval between workload readiness samples
    pub ready_interval: Duration,
    /// Readiness attempt budget
    pub ready_attempts: u32,
    /// Interval between testing completion samples
    pub completion_interval: Duration,
    /// Completion attempt budget
    pub completion_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            ready_interval: READY_POLL_INTERVAL,
            ready_attempts: READY_POLL_ATTEMPTS,
            completion_interval: COMPLETION_POLL_INTERVAL,
            completion_attempts: COMPLETION_POLL_ATTEMPTS,
        }
    }
}

/// Outcome of driving one tool through its full case sequence
#[derive(Debug)]
pub struct ToolReport {
    /// Testing tool name
    pub tool: String,
    /// Workload name
    pub workload: String,
    /// Number of cases that completed successfully
    pub passed: usize,
    /// Failed cases with the error that ended each one
    pub failures: Vec<(String, Error)>,
}

impl ToolReport {
    fn new(tool: &str, workload: &str) -> Self {
        Self {
            tool: tool.to_string(),
            workload: workload.to_string(),
            passed: 0,
            failures: Vec::new(),
        }
    }

    /// Whether every case of the tool completed successfully
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives a tool's test cases through the shared lifecycle state machine
#[derive(Clone)]
pub struct ToolRunner {
    store: Arc<dyn ObjectStore>,
    sink: ResultsSink,
    namespace: String,
    poll: PollSettings,
}

impl ToolRunner {
    /// Create a runner over a store and artifact sink
    pub fn new(store: Arc<dyn ObjectStore>, sink: ResultsSink, namespace: impl Into<String>) -> Self {
        Self {
            store,
            sink,
            namespace: namespace.into(),
            poll: PollSettings::default(),
        }
    }

    /// Override the default poll intervals and budgets
    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    /// Run every test case of a tool, strictly in order
    ///
    /// A failed case is logged and does not stop later cases; its cleanup
    /// has already been attempted by the time the next case starts. The
    /// tool's inter-case delay is applied between cases, not after the last.
    pub async fn run_tool(&self, tool: &dyn Tool) -> ToolReport {
        let cases = tool.test_cases();
        let mut report = ToolReport::new(tool.name(), &tool.workload().name);
        info!(
            tool = %tool.name(),
            workload = %tool.workload().name,
            cases = cases.len(),
            "Starting tool run"
        );

        for (index, case) in cases.iter().enumerate() {
            info!(tool = %tool.name(), case = %case.name, "Running test case");
            match self.run_case(tool, case).await {
                Ok(()) => {
                    info!(tool = %tool.name(), case = %case.name, "Test case done");
                    report.passed += 1;
                }
                Err(e) => {
                    error!(error = %e, "Test case failed, continuing with next case");
                    report.failures.push((case.name.clone(), e));
                }
            }

            // Back-pressure against cluster churn between cases.
            if index + 1 < cases.len() {
                tokio::time::sleep(tool.steps()).await;
            }
        }

        report
    }

    /// Run a single test case through the full lifecycle
    ///
    /// Cleanup always runs, exactly once per tracked handle, whether the
    /// case succeeded or failed; cleanup errors are logged but never mask
    /// the case outcome. Errors carry (tool, workload, case) context.
    pub async fn run_case(&self, tool: &dyn Tool, case: &TestCase) -> Result<()> {
        let mut run = CaseRun::new(&case.name);
        let outcome = self.drive(tool, case, &mut run).await;

        match outcome {
            Ok(()) => run.transition(CaseState::CleaningUp),
            Err(_) => run.transition(CaseState::Failed),
        }

        if let Err(cleanup_err) = self.cleanup(&mut run).await {
            warn!(case = %case.name, error = %cleanup_err, "Cleanup reported errors");
        }

        match outcome {
            Ok(()) => {
                run.transition(CaseState::Done);
                Ok(())
            }
            Err(e) => Err(e.for_case(tool.name(), &tool.workload().name, &case.name)),
        }
    }

    /// The forward path of the state machine, up to a persisted artifact
    async fn drive(&self, tool: &dyn Tool, case: &TestCase, run: &mut CaseRun) -> Result<()> {
        let ns = &self.namespace;

        // Deploy the workload object.
        run.transition(CaseState::Deploying);
        let workload_pod = workload_pod_name(&tool.workload().name, &case.name);
        let payload = tool.render_workload(case)?;
        self.store.create_pod(ns, &payload).await?;
        run.track(HandleKind::Pod, ns, &workload_pod);

        // Wait for the workload to report healthy and discover its IP.
        run.transition(CaseState::AwaitingReady);
        let snapshot = poll(
            self.poll.ready_interval,
            self.poll.ready_attempts,
            "workload readiness",
            || self.store.pod_snapshot(ns, &workload_pod),
            classify,
        )
        .await?;
        let workload_ip = snapshot.pod_ip.ok_or_else(|| {
            Error::health(format!("pod {workload_pod} is running but reports no IP"))
        })?;

        // Create auxiliary resources, then the testing object.
        run.transition(CaseState::Executing);
        for cm in tool.aux_config_maps(case, self.sink.run_id())? {
            self.store
                .create_config_map(ns, &cm.name, cm.data.clone())
                .await?;
            run.track(HandleKind::ConfigMap, ns, &cm.name);
        }
        let testing_pod = testing_pod_name(tool.name(), &case.name);
        let payload = tool.render_testing(case, &workload_ip)?;
        self.store.create_pod(ns, &payload).await?;
        run.track(HandleKind::Pod, ns, &testing_pod);

        // Wait for the testing payload to print the sentinel. A testing pod
        // that turns unhealthy fails fast, same rules as readiness.
        run.transition(CaseState::AwaitingCompletion);
        poll(
            self.poll.completion_interval,
            self.poll.completion_attempts,
            "testing completion",
            || self.sample_completion(ns, &testing_pod),
            |(snapshot, logs)| match classify(snapshot) {
                Verdict::Failing(reason) => Verdict::Failing(reason),
                _ if is_complete(logs) => Verdict::Healthy,
                _ => Verdict::Pending,
            },
        )
        .await?;

        // Fetch the final log body and persist it as the result artifact.
        run.transition(CaseState::Collecting);
        let body = self.store.pod_logs(ns, &testing_pod).await?;
        self.sink
            .persist(&tool.workload().name, tool.name(), &case.name, &body)?;

        Ok(())
    }

    /// One completion-poll observation: testing pod status plus its logs
    async fn sample_completion(
        &self,
        namespace: &str,
        pod: &str,
    ) -> Result<(ObservationSnapshot, Vec<u8>)> {
        let snapshot = self.store.pod_snapshot(namespace, pod).await?;
        let logs = self.store.pod_logs(namespace, pod).await?;
        Ok((snapshot, logs))
    }

    /// Delete every tracked handle in reverse creation order
    ///
    /// Each handle is attempted exactly once; failures are collected rather
    /// than aborting the sweep, and handles are drained so a repeated call
    /// is a no-op.
    async fn cleanup(&self, run: &mut CaseRun) -> Result<()> {
        let mut failures = Vec::new();

        for handle in run.handles.drain(..).rev().collect::<Vec<_>>() {
            let result = match handle.kind {
                HandleKind::Pod => self.store.delete_pod(&handle.namespace, &handle.name).await,
                HandleKind::ConfigMap => {
                    self.store
                        .delete_config_map(&handle.namespace, &handle.name)
                        .await
                }
            };
            if let Err(e) = result {
                warn!(object = %handle.name, error = %e, "Failed to delete object during cleanup");
                failures.push(format!("{}: {e}", handle.name));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::cleanup(failures.join("; ")))
        }
    }
}
