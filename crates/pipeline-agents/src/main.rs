use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use orchestration::{PipelineConfig, PipelineOrchestrator, WorkflowState};
use tracing::{info, warn};

use pipeline_agents::agents::build_collaborators;
use pipeline_agents::config::{check_endpoint, AgentsConfig};
use pipeline_agents::prompts::PROMPT_VERSION;

#[derive(Parser)]
#[command(name = "pipeline-agents", about = "Multi-agent generation pipeline runner")]
struct Cli {
    /// Task to run the pipeline for.
    #[arg(long, default_value = "Build ETL pipeline for sales_data.csv")]
    task: String,

    /// Initial data locator (defaults to the engine's built-in cursor).
    #[arg(long)]
    data: Option<String>,

    /// Format tag for --data.
    #[arg(long, default_value = "csv")]
    format: String,

    /// Maximum voting rounds before forced exit.
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Write the report JSON here (default: timestamped file under reports/).
    #[arg(long)]
    report: Option<PathBuf>,

    /// Skip the endpoint reachability check.
    #[arg(long)]
    no_preflight: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AgentsConfig::default();
    info!(
        prompt_version = PROMPT_VERSION,
        generator = %config.generator_endpoint.url,
        reviewer = %config.reviewer_endpoint.url,
        panel = config.review_panel,
        "Pipeline agents starting"
    );

    if !cli.no_preflight && !check_endpoint(&config.generator_endpoint.url).await {
        warn!(
            url = %config.generator_endpoint.url,
            "Generator endpoint unreachable — stages will run on fallback artifacts"
        );
    }

    let collaborators = build_collaborators(&config).await;
    let mut pipeline_config = PipelineConfig::default();
    if let Some(max_rounds) = cli.max_rounds {
        pipeline_config.max_rounds = max_rounds;
    }
    let orchestrator = PipelineOrchestrator::with_config(collaborators, pipeline_config);

    let mut state = WorkflowState::new(&cli.task);
    if let Some(data) = &cli.data {
        state = state.with_data_cursor(data, &cli.format);
    }

    let report = orchestrator.run_with_state(state).await?;
    println!("{}", report.summary_line());
    for artifact in &report.artifacts {
        println!("  [{}] {}", artifact.name, artifact.rationale);
    }

    let report_path = cli.report.or_else(|| {
        config.report_dir.as_ref().map(|dir| {
            dir.join(format!(
                "pipeline_{}.json",
                chrono::Utc::now().format("%Y%m%d_%H%M%S")
            ))
        })
    });
    if let Some(path) = report_path {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        report.write_json(&path)?;
        info!(path = %path.display(), "Report written");
    }

    Ok(())
}
