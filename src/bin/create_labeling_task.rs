use anyhow::Context;
use clap::Parser;

use damage_assess::cli::{init_tracing, CreateLabelingTaskArgs};
use damage_assess::config::CreateLabelingTaskConfig;
use damage_assess::labeling::{CommandExporter, VertexAiClient};
use damage_assess::pipeline::run_create_labeling_task;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CreateLabelingTaskArgs::parse();
    init_tracing(args.verbose);

    let config = CreateLabelingTaskConfig::try_from(args)?;
    let exporter = CommandExporter::from_command_line(&config.export_command)?;

    let vertex = VertexAiClient::from_environment()
        .await
        .context("Failed to load cloud credentials")?;

    let job = run_create_labeling_task(&config, &exporter, &vertex).await?;
    tracing::info!(job = %job.name, dataset = %job.dataset, region = job.region, "Labeling task created");

    Ok(())
}
