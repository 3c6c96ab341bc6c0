//! Run configuration loading and tool construction
//!
//! A run is described by a single YAML file: where results go, which
//! namespace to use, and one testing tool per workload with its ordered test
//! cases. Configuration is validated up front so a bad run fails before
//! anything is created in the cluster.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::workload::{ScriptedTool, TestCase, Tool, Workload, WrkTool};
use crate::{Error, Result, DEFAULT_NAMESPACE};

fn default_results_dir() -> PathBuf {
    PathBuf::from("./results")
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_steps_seconds() -> u64 {
    60
}

/// Top-level run configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root directory result artifacts are persisted under
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Namespace all benchmark objects are created in
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Workloads to benchmark, each with its paired testing tool
    pub workloads: Vec<WorkloadConfig>,
}

/// One workload and the testing tool bound to it
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkloadConfig {
    /// Workload name
    pub name: String,
    /// Workload container image
    pub image: String,
    /// The testing tool driven against this workload
    pub tool: ToolConfig,
}

/// Which tool variant to construct
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// wrk HTTP load generator against an nginx workload
    Wrk,
    /// Operator-supplied script mounted into the testing pod
    Scripted,
}

/// Testing tool configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    /// Tool variant
    pub kind: ToolKind,
    /// Tool name (used in pod names and artifact paths)
    pub name: String,
    /// Tool container image
    pub image: String,
    /// Path to the script body (scripted variant only)
    #[serde(default)]
    pub script: Option<PathBuf>,
    /// Inter-case delay in seconds
    #[serde(default = "default_steps_seconds")]
    pub steps_seconds: u64,
    /// Ordered test cases
    pub cases: Vec<CaseConfig>,
}

/// One test case of a tool
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseConfig {
    /// Case name
    pub name: String,
    /// Tool arguments, kept structured
    #[serde(default)]
    pub args: Vec<String>,
    /// Schedule the testing pod on the workload's node
    #[serde(default)]
    pub affinity: bool,
    /// Environment variable assignments for the testing payload
    #[serde(default)]
    pub envs: BTreeMap<String, String>,
}

impl Config {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let body = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("unable to read {}: {e}", path.display())))?;
        let config: Config = serde_yaml::from_str(&body)
            .map_err(|e| Error::config(format!("unable to parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration before anything touches the cluster
    pub fn validate(&self) -> Result<()> {
        if self.workloads.is_empty() {
            return Err(Error::config("no workloads configured"));
        }
        if self.namespace.is_empty() {
            return Err(Error::config("namespace must not be empty"));
        }

        for workload in &self.workloads {
            if workload.name.is_empty() {
                return Err(Error::config("workload name must not be empty"));
            }
            let tool = &workload.tool;
            if tool.name.is_empty() {
                return Err(Error::config(format!(
                    "workload {} has a tool with no name",
                    workload.name
                )));
            }
            if tool.cases.is_empty() {
                return Err(Error::config(format!(
                    "tool {} has no test cases",
                    tool.name
                )));
            }
            if tool.kind == ToolKind::Scripted && tool.script.is_none() {
                return Err(Error::config(format!(
                    "scripted tool {} requires a script path",
                    tool.name
                )));
            }

            let mut seen = HashSet::new();
            for case in &tool.cases {
                if case.name.is_empty() {
                    return Err(Error::config(format!(
                        "tool {} has a case with no name",
                        tool.name
                    )));
                }
                if !seen.insert(case.name.as_str()) {
                    return Err(Error::config(format!(
                        "tool {} has duplicate case {}",
                        tool.name, case.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Construct one tool instance per configured workload
    pub fn build_tools(&self) -> Result<Vec<Box<dyn Tool>>> {
        self.workloads
            .iter()
            .map(|w| build_tool(w, &self.namespace))
            .collect()
    }
}

fn build_tool(config: &WorkloadConfig, namespace: &str) -> Result<Box<dyn Tool>> {
    let workload = Workload {
        name: config.name.clone(),
        image: config.image.clone(),
    };
    let tool = &config.tool;
    let steps = Duration::from_secs(tool.steps_seconds);
    let cases: Vec<TestCase> = tool
        .cases
        .iter()
        .map(|c| TestCase {
            name: c.name.clone(),
            args: c.args.clone(),
            affinity: c.affinity,
            envs: c.envs.clone(),
        })
        .collect();

    match tool.kind {
        ToolKind::Wrk => Ok(Box::new(WrkTool::new(
            workload, &tool.name, &tool.image, namespace, steps, cases,
        ))),
        ToolKind::Scripted => {
            let script = tool.script.as_ref().ok_or_else(|| {
                Error::config(format!("scripted tool {} requires a script path", tool.name))
            })?;
            Ok(Box::new(ScriptedTool::new(
                workload, &tool.name, &tool.image, namespace, script, steps, cases,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
results_dir: /var/lib/capstan/results
namespace: bench
workloads:
  - name: nginx
    image: nginx:1.27
    tool:
      kind: wrk
      name: wrk
      image: williamyeh/wrk
      steps_seconds: 30
      cases:
        - name: same-node
          args: ["-t", "4", "-c", "100"]
          affinity: true
        - name: diff-node
          args: ["-t", "4", "-c", "100"]
  - name: mysql
    image: mysql:8
    tool:
      kind: scripted
      name: sysbench
      image: severalnines/sysbench
      script: ./scripts/sysbench.sh
      cases:
        - name: oltp-read-write
          envs:
            THREADS: "8"
"#;

    fn parse(body: &str) -> Config {
        serde_yaml::from_str(body).expect("should parse")
    }

    #[test]
    fn full_config_parses_and_validates() {
        let config = parse(FULL);
        config.validate().unwrap();

        assert_eq!(config.namespace, "bench");
        assert_eq!(config.workloads.len(), 2);
        assert_eq!(config.workloads[0].tool.kind, ToolKind::Wrk);
        assert_eq!(config.workloads[0].tool.steps_seconds, 30);
        assert!(config.workloads[0].tool.cases[0].affinity);
        assert!(!config.workloads[0].tool.cases[1].affinity);
        assert_eq!(config.workloads[1].tool.kind, ToolKind::Scripted);
        assert_eq!(
            config.workloads[1].tool.cases[0].envs["THREADS"],
            "8"
        );
    }

    #[test]
    fn defaults_apply_when_omitted() {
        let config = parse(
            r#"
workloads:
  - name: nginx
    image: nginx:1.27
    tool:
      kind: wrk
      name: wrk
      image: williamyeh/wrk
      cases:
        - name: same-node
"#,
        );
        config.validate().unwrap();
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.results_dir, PathBuf::from("./results"));
        assert_eq!(config.workloads[0].tool.steps_seconds, 60);
        assert!(config.workloads[0].tool.cases[0].args.is_empty());
    }

    #[test]
    fn empty_workloads_are_rejected() {
        let config = parse("workloads: []");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("no workloads"));
    }

    #[test]
    fn tool_without_cases_is_rejected() {
        let config = parse(
            r#"
workloads:
  - name: nginx
    image: nginx:1.27
    tool:
      kind: wrk
      name: wrk
      image: williamyeh/wrk
      cases: []
"#,
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("no test cases"));
    }

    #[test]
    fn scripted_tool_without_script_is_rejected() {
        let config = parse(
            r#"
workloads:
  - name: mysql
    image: mysql:8
    tool:
      kind: scripted
      name: sysbench
      image: severalnines/sysbench
      cases:
        - name: oltp
"#,
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("requires a script path"));
    }

    #[test]
    fn duplicate_case_names_are_rejected() {
        let config = parse(
            r#"
workloads:
  - name: nginx
    image: nginx:1.27
    tool:
      kind: wrk
      name: wrk
      image: williamyeh/wrk
      cases:
        - name: same-node
        - name: same-node
"#,
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate case"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: std::result::Result<Config, _> = serde_yaml::from_str(
            r#"
workloads: []
unexpected_field: true
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn build_tools_constructs_one_tool_per_workload() {
        let config = parse(FULL);
        let tools = config.build_tools().unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name(), "wrk");
        assert_eq!(tools[0].workload().name, "nginx");
        assert_eq!(tools[0].steps(), Duration::from_secs(30));
        assert_eq!(tools[1].name(), "sysbench");
        assert_eq!(tools[1].test_cases().len(), 1);
    }
}
