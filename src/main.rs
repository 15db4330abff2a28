use anyhow::Context;
use clap::Parser;

use damage_assess::buildings::BuildingSource;
use damage_assess::cli::{init_tracing, GenerateExamplesArgs};
use damage_assess::config::GenerateExamplesConfig;
use damage_assess::generate::CommandGenerator;
use damage_assess::labeling::{LabelingService, VertexAiClient};
use damage_assess::open_street_map::{OverpassClient, DEFAULT_OVERPASS_URL};
use damage_assess::pipeline::{run_generate_examples, Collaborators};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = GenerateExamplesArgs::parse();
    init_tracing(args.verbose);

    let config = GenerateExamplesConfig::try_from(args)?;

    let overpass_url = match &config.buildings {
        BuildingSource::OpenStreetMap { overpass_url } => overpass_url.as_str(),
        _ => DEFAULT_OVERPASS_URL,
    };
    let finder = OverpassClient::new(overpass_url)?;
    let generator = CommandGenerator::from_command_line(&config.engine_command)?;

    let vertex = match config.labeling {
        Some(_) => Some(
            VertexAiClient::from_environment()
                .await
                .context("Failed to load cloud credentials")?,
        ),
        None => None,
    };

    let collaborators = Collaborators {
        buildings: &finder,
        generator: &generator,
        labeling: vertex.as_ref().map(|client| client as &dyn LabelingService),
    };

    let summary = run_generate_examples(&config, &collaborators).await?;

    tracing::info!(
        buildings = summary.building_count,
        labeled = summary.labeled_count,
        import_file = %summary.import_file,
        "Generated examples"
    );
    if let Some(job) = &summary.labeling_job {
        tracing::info!(job = %job.name, dataset = %job.dataset, region = job.region, "Labeling task created");
    }

    Ok(())
}
