//! Capstan - Kubernetes workload benchmark orchestrator

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures::future::join_all;
use kube::Client;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use capstan::config::Config;
use capstan::results::ResultsSink;
use capstan::store::{KubeStore, ObjectStore};
use capstan::workload::{ToolReport, ToolRunner};

/// Capstan - deploy workloads, benchmark them, collect the results
#[derive(Parser, Debug)]
#[command(name = "capstan", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the configured benchmark suite against the current cluster
    Run(RunArgs),
}

/// Run mode arguments
#[derive(Parser, Debug)]
struct RunArgs {
    /// Path to the run configuration YAML file
    #[arg(short = 'f', long = "config")]
    config_file: PathBuf,

    /// Override the results directory from the config file
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Override the namespace from the config file
    #[arg(long, env = "CAPSTAN_NAMESPACE")]
    namespace: Option<String>,

    /// Keep the namespace after the run (for debugging)
    #[arg(long)]
    keep_namespace: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,kube=warn")),
        )
        .init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Run(args) => match run(args).await {
            Ok(all_passed) => {
                if all_passed {
                    0
                } else {
                    1
                }
            }
            Err(e) => {
                error!(error = %e, "Benchmark run aborted");
                1
            }
        },
    };
    std::process::exit(exit_code);
}

/// Execute a full benchmark run; returns whether every case passed
async fn run(args: RunArgs) -> capstan::Result<bool> {
    let mut config = Config::load(&args.config_file)?;
    if let Some(results_dir) = args.results_dir {
        config.results_dir = results_dir;
    }
    if let Some(namespace) = args.namespace {
        config.namespace = namespace;
    }
    config.validate()?;

    let client = Client::try_default().await?;
    let store: Arc<dyn ObjectStore> = Arc::new(KubeStore::new(client));
    let sink = ResultsSink::new(&config.results_dir);
    info!(
        run_id = %sink.run_id(),
        namespace = %config.namespace,
        workloads = config.workloads.len(),
        "Starting benchmark run"
    );

    store.create_namespace(&config.namespace).await?;

    // One task per tool: tools run concurrently, each with its own runner
    // state; cases within a tool stay strictly sequential.
    let runner = ToolRunner::new(store.clone(), sink, &config.namespace);
    let handles: Vec<_> = config
        .build_tools()?
        .into_iter()
        .map(|tool| {
            let runner = runner.clone();
            tokio::spawn(async move { runner.run_tool(tool.as_ref()).await })
        })
        .collect();

    let mut reports: Vec<ToolReport> = Vec::new();
    for joined in join_all(handles).await {
        match joined {
            Ok(report) => reports.push(report),
            Err(e) => error!(error = %e, "Tool task panicked"),
        }
    }

    if args.keep_namespace {
        warn!(namespace = %config.namespace, "Keeping namespace as requested");
    } else if let Err(e) = store.delete_namespace(&config.namespace).await {
        // Teardown failure is reported but never masks the run outcome.
        warn!(namespace = %config.namespace, error = %e, "Failed to delete namespace");
    }

    let mut all_passed = reports.len() == config.workloads.len();
    for report in &reports {
        info!(
            tool = %report.tool,
            workload = %report.workload,
            passed = report.passed,
            failed = report.failures.len(),
            "Tool run finished"
        );
        for (case, err) in &report.failures {
            error!(tool = %report.tool, case = %case, error = %err, "Case failed");
        }
        all_passed &= report.all_passed();
    }

    Ok(all_passed)
}
