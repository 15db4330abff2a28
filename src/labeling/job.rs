//! Labeling job launch

use crate::error::Result;
use crate::manifest;

use super::{labeling_dataset_region, JobSpec, LabelerPool, LabelingService};

/// Inputs for creating a labeling job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelingJobRequest {
    pub project: String,
    /// The project's region; the job region is derived from it
    pub location: String,
    /// Unique per run
    pub dataset_name: String,
    pub import_file_uri: String,
    pub instructions_uri: String,
    pub inputs_schema_uri: String,
    pub class_names: Vec<String>,
}

/// A submitted labeling job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelingJob {
    pub name: String,
    pub dataset: String,
    pub region: &'static str,
}

/// Creates a dataset from the import manifest and a labeling job for it.
///
/// The first failing step aborts; resources created before it are left in place.
pub async fn launch_labeling_job(
    request: &LabelingJobRequest,
    pool: &LabelerPool,
    service: &dyn LabelingService,
) -> Result<LabelingJob> {
    let region = labeling_dataset_region(&request.location);
    if region != request.location {
        tracing::info!(
            configured = %request.location,
            region,
            "Labeling dataset region differs from project region"
        );
    }

    if let Some(images) = manifest::check_import_file(&request.import_file_uri)? {
        tracing::info!(images, "Import file checked");
    }

    let dataset = service
        .create_dataset(&request.project, region, &request.dataset_name)
        .await?;
    tracing::info!(dataset = %dataset, "Created labeling dataset");

    service
        .import_data(&dataset, region, &request.import_file_uri)
        .await?;
    tracing::info!(import_file = %request.import_file_uri, "Imported labeling images");

    let spec = JobSpec {
        display_name: request.dataset_name.clone(),
        dataset: dataset.clone(),
        specialist_pool: pool.name.clone(),
        instructions_uri: request.instructions_uri.clone(),
        inputs_schema_uri: request.inputs_schema_uri.clone(),
        class_names: request.class_names.clone(),
    };
    let name = service
        .create_labeling_job(&request.project, region, &spec)
        .await?;
    tracing::info!(job = %name, pool = %pool.name, "Created labeling job");

    Ok(LabelingJob {
        name,
        dataset,
        region,
    })
}
