//! Human labeling: labeler pools, labeling datasets and jobs

pub mod images;
pub mod job;
pub mod pool;
pub mod vertex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone};

use crate::error::Result;

pub use images::{CommandExporter, ExportRequest, LabelingImageExporter};
pub use job::{launch_labeling_job, LabelingJob, LabelingJobRequest};
pub use pool::{provision_pool, LabelerPool, NewPool, PoolSelection};
pub use vertex::VertexAiClient;

/// The only European region labeling datasets can be created in
pub const EUROPE_LABELING_REGION: &str = "europe-west4";
/// The only US region labeling datasets can be created in
pub const US_LABELING_REGION: &str = "us-central1";

/// Default instructions shown to labelers
pub const DEFAULT_INSTRUCTIONS_URI: &str = "gs://skai-public/labeling_instructions.pdf";
/// Default inputs schema for image classification labeling jobs
pub const DEFAULT_INPUTS_SCHEMA_URI: &str =
    "gs://google-cloud-aiplatform/schema/datalabelingjob/inputs/image_classification_1.0.0.yaml";

/// Chooses where to host a labeling dataset.
///
/// Labeling datasets can only live in [`EUROPE_LABELING_REGION`] or
/// [`US_LABELING_REGION`]; every European project region maps to the
/// former, everything else to the latter.
pub fn labeling_dataset_region(project_region: &str) -> &'static str {
    if project_region.starts_with("europe-") {
        EUROPE_LABELING_REGION
    } else {
        US_LABELING_REGION
    }
}

/// Makes a per-run dataset name: `{name}_{YYYYmmdd_HHMMSS}_{8 hex digits}`.
///
/// The random suffix keeps two runs started within the same second apart.
pub fn timestamped_dataset_name<Tz>(name: &str, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", name, now.format("%Y%m%d_%H%M%S"), &suffix[..8])
}

/// Labeler pool creation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSpec {
    pub project: String,
    pub region: String,
    pub display_name: String,
    pub manager_emails: Vec<String>,
    pub worker_emails: Vec<String>,
}

/// Labeling job creation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub display_name: String,
    /// Resource name of the dataset to label
    pub dataset: String,
    /// Resource name of the labeler pool
    pub specialist_pool: String,
    pub instructions_uri: String,
    pub inputs_schema_uri: String,
    /// Annotation classes offered to labelers
    pub class_names: Vec<String>,
}

/// The remote labeling service.
///
/// Every call returns once the service reports the resource created.
#[async_trait]
pub trait LabelingService: Send + Sync {
    /// Creates a labeler pool and returns its resource name
    async fn create_specialist_pool(&self, spec: &PoolSpec) -> Result<String>;

    /// Creates an image dataset and returns its resource name
    async fn create_dataset(&self, project: &str, region: &str, display_name: &str)
        -> Result<String>;

    /// Imports the images listed in a manifest into a dataset
    async fn import_data(&self, dataset: &str, region: &str, import_file_uri: &str) -> Result<()>;

    /// Creates a labeling job and returns its resource name
    async fn create_labeling_job(&self, project: &str, region: &str, spec: &JobSpec)
        -> Result<String>;
}
