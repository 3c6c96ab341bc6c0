//! Scripted-command tool variant
//!
//! Runs an operator-supplied shell script against the workload instead of a
//! fixed benchmark binary. Before the testing pod starts, two config maps
//! are created per case: one carrying the script body and one carrying the
//! case's environment assignments plus run metadata. The script receives the
//! workload pod's IP as `WORKLOAD_HOST` and must print the completion
//! sentinel (`capstan::completion::SENTINEL`) when it finishes.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::template::Renderer;
use crate::{Error, Result};

use super::templates::{SCRIPTED_TESTING_POD, SCRIPTED_WORKLOAD_POD};
use super::{testing_pod_name, workload_pod_name, ConfigMapSpec, TestCase, Tool, Workload};

/// Key the script body is stored under in its config map
const SCRIPT_KEY: &str = "script.sh";

/// A testing tool driven by a mounted shell script
pub struct ScriptedTool {
    workload: Workload,
    name: String,
    image: String,
    namespace: String,
    script: PathBuf,
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
    pod_ip: String,
    envs_config_map: String,
    script_config_map: String,
}

impl ScriptedTool {
    /// Create a scripted tool bound to a workload and its case sequence
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        workload: Workload,
        name: impl Into<String>,
        image: impl Into<String>,
        namespace: impl Into<String>,
        script: impl Into<PathBuf>,
        steps: Duration,
        cases: Vec<TestCase>,
    ) -> Self {
        Self {
            workload,
            name: name.into(),
            image: image.into(),
            namespace: namespace.into(),
            script: script.into(),
            steps,
            cases,
            renderer: Renderer::new(),
        }
    }

    fn script_config_map_name(&self, case: &TestCase) -> String {
        format!("{}-script", testing_pod_name(&self.name, &case.name))
    }

    fn envs_config_map_name(&self, case: &TestCase) -> String {
        format!("{}-envs", testing_pod_name(&self.name, &case.name))
    }
}

impl Tool for ScriptedTool {
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
        Ok(self.renderer.render(SCRIPTED_WORKLOAD_POD, &params)?)
    }

    fn render_testing(&self, case: &TestCase, workload_ip: &str) -> Result<Vec<u8>> {
        let params = TestingParams {
            name: testing_pod_name(&self.name, &case.name),
            namespace: self.namespace.clone(),
            case: case.name.clone(),
            tool: self.name.clone(),
            image: self.image.clone(),
            pod_ip: workload_ip.to_string(),
            envs_config_map: self.envs_config_map_name(case),
            script_config_map: self.script_config_map_name(case),
        };
        Ok(self.renderer.render(SCRIPTED_TESTING_POD, &params)?)
    }

    fn aux_config_maps(&self, case: &TestCase, run_id: &str) -> Result<Vec<ConfigMapSpec>> {
        let body = std::fs::read_to_string(&self.script).map_err(|e| {
            Error::config(format!(
                "unable to read script {}: {e}",
                self.script.display()
            ))
        })?;

        let mut script_data = BTreeMap::new();
        script_data.insert(SCRIPT_KEY.to_string(), body);

        // Case envs first; run metadata wins on key collisions.
        let mut env_data = case.envs.clone();
        env_data.insert("CAPSTAN_RUN_ID".to_string(), run_id.to_string());
        env_data.insert("CAPSTAN_WORKLOAD".to_string(), self.workload.name.clone());
        env_data.insert("CAPSTAN_TOOL".to_string(), self.name.clone());
        env_data.insert("CAPSTAN_CASE".to_string(), case.name.clone());
        env_data.insert(
            "CAPSTAN_START_TIME".to_string(),
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        );

        Ok(vec![
            ConfigMapSpec {
                name: self.script_config_map_name(case),
                data: script_data,
            },
            ConfigMapSpec {
                name: self.envs_config_map_name(case),
                data: env_data,
            },
        ])
    }
}
