//! Run orchestration
//!
//! Stages run strictly in order, each awaiting its collaborator:
//! discovery, label ingestion, example generation, then optionally pool
//! provisioning and the labeling job. The first failing stage ends the run.

use crate::buildings;
use crate::config::{
    CreateLabelingTaskConfig, GenerateExamplesConfig, LabelingConfig, LabelingImages,
};
use crate::error::{Error, Result};
use crate::generate::{self, ExampleGenerator, GenerationRequest};
use crate::labeling::{
    launch_labeling_job, provision_pool, timestamped_dataset_name, LabelingImageExporter,
    LabelingJob, LabelingJobRequest, LabelingService,
};
use crate::labels;
use crate::open_street_map::BuildingFinder;

/// The external systems a run talks to
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub buildings: &'a dyn BuildingFinder,
    pub generator: &'a dyn ExampleGenerator,
    /// Only needed when the run creates a labeling task
    pub labeling: Option<&'a dyn LabelingService>,
}

/// What a generation run produced
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub building_count: usize,
    pub labeled_count: usize,
    /// Import manifest written by the engine
    pub import_file: String,
    pub labeling_job: Option<LabelingJob>,
}

/// Runs example generation and, when configured, creates a labeling task
/// for the generated sample.
pub async fn run_generate_examples(
    config: &GenerateExamplesConfig,
    collaborators: &Collaborators<'_>,
) -> Result<RunSummary> {
    let regions = match (&config.aoi_path, config.buildings.needs_regions()) {
        (Some(path), true) => buildings::read_aois(path)?,
        (None, true) => {
            return Err(Error::config(
                "--aoi-path must be specified unless --buildings-method=none",
            ))
        }
        (_, false) => Vec::new(),
    };

    let building_centroids =
        buildings::get_building_centroids(&config.buildings, &regions, collaborators.buildings)
            .await?;
    tracing::info!(count = building_centroids.len(), "Resolved building centroids");

    let labeled_coordinates = match &config.labels {
        Some(labels) => {
            labels::read_labels_file(&labels.path, &labels.property, &labels.classes, labels.keep)?
        }
        None => Vec::new(),
    };

    if building_centroids.is_empty() && labeled_coordinates.is_empty() {
        return Err(Error::config(
            "No work to do: no buildings were found and no labeled coordinates were read",
        ));
    }

    let request = GenerationRequest {
        before_image_path: config.before_image_path.clone(),
        after_image_path: config.after_image_path.clone(),
        output_dir: config.output_dir.clone(),
        params: config.params.clone(),
        building_centroids,
        labeled_coordinates,
        engine: config.engine.clone(),
        raster_env: config.raster_env.clone(),
    };
    let import_file = generate::generate_examples(&request, collaborators.generator).await?;

    let labeling_job = match &config.labeling {
        Some(labeling) => {
            let service = collaborators.labeling.ok_or_else(|| {
                Error::config("A labeling service is required to create a labeling task")
            })?;
            Some(run_labeling_task(labeling, &import_file, service).await?)
        }
        None => None,
    };

    Ok(RunSummary {
        building_count: request.building_centroids.len(),
        labeled_count: request.labeled_coordinates.len(),
        import_file,
        labeling_job,
    })
}

/// Provisions the labeler pool and launches a labeling job over an import manifest
pub async fn run_labeling_task(
    config: &LabelingConfig,
    import_file_uri: &str,
    service: &dyn LabelingService,
) -> Result<LabelingJob> {
    let dataset_name = timestamped_dataset_name(&config.dataset_name, &chrono::Local::now());

    // pools live in the project region; only the dataset and job are routed
    let pool = provision_pool(
        &config.pool,
        &config.project,
        &config.location,
        &dataset_name,
        service,
    )
    .await?;

    let request = LabelingJobRequest {
        project: config.project.clone(),
        location: config.location.clone(),
        dataset_name,
        import_file_uri: import_file_uri.to_string(),
        instructions_uri: config.instructions_uri.clone(),
        inputs_schema_uri: config.inputs_schema_uri.clone(),
        class_names: config.class_names.clone(),
    };
    launch_labeling_job(&request, &pool, service).await
}

/// Runs a labeling-only task: exports labeling images unless an import
/// file is given, then sets up the pool and job
pub async fn run_create_labeling_task(
    config: &CreateLabelingTaskConfig,
    exporter: &dyn LabelingImageExporter,
    service: &dyn LabelingService,
) -> Result<LabelingJob> {
    let import_file = match &config.images {
        LabelingImages::Existing(uri) => uri.clone(),
        LabelingImages::Export(request) => {
            let import_file = exporter.export(request).await?;
            tracing::info!(import_file = %import_file, "Wrote labeling images");
            import_file
        }
    };

    run_labeling_task(&config.labeling, &import_file, service).await
}
