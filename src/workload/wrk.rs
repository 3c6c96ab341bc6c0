//! Load-generator tool variant: wrk benchmarking an nginx workload
//!
//! Deploys an nginx pod as the workload, then a wrk pod driving HTTP load
//! against the workload pod's IP. The per-case `affinity` flag pins the wrk
//! pod to the workload's node (pod affinity) or forces it onto a different
//! node (pod anti-affinity), so the same case set measures both same-node
//! and cross-node paths.

use std::time::Duration;

use serde::Serialize;

use crate::completion::SENTINEL;
use crate::template::Renderer;
use crate::Result;

use super::templates::{NGINX_POD, WRK_POD};
use super::{shell_join, testing_pod_name, workload_pod_name, TestCase, Tool, Workload};

/// The wrk testing tool
pub struct WrkTool {
    workload: Workload,
    name: String,
    image: String,
    namespace: String,
    steps: Duration,
    cases: Vec<TestCase>,
    renderer: Renderer,
}

#[derive(Serialize)]
struct WorkloadParams {
    name: String,
    namespace: String,
    case: String,
    image: String,
}

#[derive(Serialize)]
struct TestingParams {
    name: String,
    namespace: String,
    case: String,
    tool: String,
    image: String,
    workload: String,
    affinity: bool,
    command: String,
}

impl WrkTool {
    /// Create a wrk tool bound to a workload and its case sequence
    pub fn new(
        workload: Workload,
        name: impl Into<String>,
        image: impl Into<String>,
        namespace: impl Into<String>,
        steps: Duration,
        cases: Vec<TestCase>,
    ) -> Self {
        Self {
            workload,
            name: name.into(),
            image: image.into(),
            namespace: namespace.into(),
            steps,
            cases,
            renderer: Renderer::new(),
        }
    }

    /// The shell command the testing container runs
    ///
    /// Arguments stay structured until this boundary and are shell-quoted
    /// individually. The sentinel prints unconditionally so a failed wrk run
    /// still completes and has its output collected.
    fn command(&self, case: &TestCase, workload_ip: &str) -> String {
        format!(
            "wrk {} http://{}:80/ ; echo '{}'",
            shell_join(&case.args),
            workload_ip,
            SENTINEL
        )
    }
}

impl Tool for WrkTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn workload(&self) -> &Workload {
        &self.workload
    }

    fn steps(&self) -> Duration {
        self.steps
    }

    fn test_cases(&self) -> &[TestCase] {
        &self.cases
    }

    fn render_workload(&self, case: &TestCase) -> Result<Vec<u8>> {
        let params = WorkloadParams {
            name: workload_pod_name(&self.workload.name, &case.name),
            namespace: self.namespace.clone(),
            case: case.name.clone(),
            image: self.workload.image.clone(),
        };
        Ok(self.renderer.render(NGINX_POD, &params)?)
    }

    fn render_testing(&self, case: &TestCase, workload_ip: &str) -> Result<Vec<u8>> {
        let params = TestingParams {
            name: testing_pod_name(&self.name, &case.name),
            namespace: self.namespace.clone(),
            case: case.name.clone(),
            tool: self.name.clone(),
            image: self.image.clone(),
            workload: workload_pod_name(&self.workload.name, &case.name),
            affinity: case.affinity,
            command: self.command(case, workload_ip),
        };
        Ok(self.renderer.render(WRK_POD, &params)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Pod;

    fn tool() -> WrkTool {
        WrkTool::new(
            Workload {
                name: "nginx".to_string(),
                image: "nginx:1.27".to_string(),
            },
            "wrk",
            "williamyeh/wrk",
            "capstan",
            Duration::from_secs(60),
            vec![
                TestCase {
                    name: "same-node".to_string(),
                    args: vec!["-t".to_string(), "4".to_string()],
                    affinity: true,
                    ..Default::default()
                },
                TestCase {
                    name: "diff-node".to_string(),
                    args: vec!["-t".to_string(), "4".to_string()],
                    affinity: false,
                    ..Default::default()
                },
            ],
        )
    }

    #[test]
    fn workload_manifest_is_a_valid_pod() {
        let tool = tool();
        let payload = tool.render_workload(&tool.cases[0]).unwrap();
        let pod: Pod = serde_yaml::from_slice(&payload).expect("should decode as Pod");
        assert_eq!(pod.metadata.name.as_deref(), Some("capstan-nginx-same-node"));
        let spec = pod.spec.unwrap();
        assert_eq!(spec.containers[0].image.as_deref(), Some("nginx:1.27"));
    }

    #[test]
    fn affinity_case_pins_to_the_workload_node() {
        let tool = tool();
        let payload = tool.render_testing(&tool.cases[0], "10.244.1.7").unwrap();
        let pod: Pod = serde_yaml::from_slice(&payload).expect("should decode as Pod");
        let affinity = pod.spec.unwrap().affinity.unwrap();
        assert!(affinity.pod_affinity.is_some());
        assert!(affinity.pod_anti_affinity.is_none());
    }

    #[test]
    fn anti_affinity_case_forces_a_different_node() {
        let tool = tool();
        let payload = tool.render_testing(&tool.cases[1], "10.244.1.7").unwrap();
        let pod: Pod = serde_yaml::from_slice(&payload).expect("should decode as Pod");
        let affinity = pod.spec.unwrap().affinity.unwrap();
        assert!(affinity.pod_affinity.is_none());
        assert!(affinity.pod_anti_affinity.is_some());
    }

    #[test]
    fn command_targets_the_workload_ip_and_prints_the_sentinel() {
        let tool = tool();
        let command = tool.command(&tool.cases[0], "10.244.1.7");
        assert_eq!(
            command,
            "wrk '-t' '4' http://10.244.1.7:80/ ; echo 'Capstan Testing Done'"
        );
    }

    #[test]
    fn testing_pod_is_named_after_tool_and_case() {
        let tool = tool();
        let payload = tool.render_testing(&tool.cases[1], "10.244.1.7").unwrap();
        let pod: Pod = serde_yaml::from_slice(&payload).unwrap();
        assert_eq!(pod.metadata.name.as_deref(), Some("capstan-wrk-diff-node"));
        assert_eq!(pod.metadata.namespace.as_deref(), Some("capstan"));
    }
}
