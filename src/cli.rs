//! Command-line arguments for the two entry points

use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::generate::command::DEFAULT_ENGINE_COMMAND;
use crate::labeling::images::{DEFAULT_EXPORT_COMMAND, DEFAULT_MAX_IMAGES};
use crate::labeling::{DEFAULT_INPUTS_SCHEMA_URI, DEFAULT_INSTRUCTIONS_URI};
use crate::open_street_map::DEFAULT_OVERPASS_URL;

/// Building detection method
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum BuildingsMethod {
    /// Read buildings from --buildings-file
    File,
    /// Query OpenStreetMap
    OpenStreetMap,
    /// No buildings; labeled examples only
    None,
}

/// Labeler pool and job options shared by both entry points
#[derive(Debug, Clone, Args)]
pub struct LabelerArgs {
    /// Existing labeler pool, e.g. projects/<project>/locations/us-central1/specialistPools/<id>
    #[arg(long)]
    pub cloud_labeler_pool: Option<String>,

    /// Emails of workers of a new labeler pool. The first email becomes the manager.
    #[arg(long, value_delimiter = ',')]
    pub cloud_labeler_emails: Vec<String>,

    /// URI for labeling instructions
    #[arg(long, default_value = DEFAULT_INSTRUCTIONS_URI)]
    pub labeler_instructions_uri: String,

    /// Label inputs schema URI
    #[arg(long, default_value = DEFAULT_INPUTS_SCHEMA_URI)]
    pub label_inputs_schema_uri: String,
}

/// Generates training examples from before/after imagery and optionally
/// sends a sample of them out for labeling.
#[derive(Debug, Clone, Parser)]
#[command(name = "generate-examples")]
#[command(version)]
pub struct GenerateExamplesArgs {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Cloud project name
    #[arg(long, env = "CLOUD_PROJECT")]
    pub cloud_project: Option<String>,

    /// Cloud region, e.g. us-central1
    #[arg(long, env = "CLOUD_REGION")]
    pub cloud_region: Option<String>,

    /// Run the pipeline on distributed workers
    #[arg(long)]
    pub use_dataflow: bool,

    /// Service account the workers run as (project default when unset)
    #[arg(long)]
    pub worker_service_account: Option<String>,

    /// Worker container image for distributed runs
    #[arg(long)]
    pub dataflow_container_image: Option<String>,

    /// Runtime version of the distributed workers, e.g. 3.8. Selects a
    /// prebuilt worker image when --dataflow-container-image is unset.
    #[arg(long, env = "WORKER_RUNTIME_VERSION")]
    pub worker_runtime_version: Option<String>,

    /// Example generation engine executable and arguments
    #[arg(long, default_value = DEFAULT_ENGINE_COMMAND)]
    pub engine_command: String,

    /// Dataset name
    #[arg(long)]
    pub dataset_name: Option<String>,

    /// Path of pre-disaster GeoTIFF
    #[arg(long)]
    pub before_image_path: String,

    /// Path of post-disaster GeoTIFF
    #[arg(long)]
    pub after_image_path: String,

    /// GeoJSON file containing the area of interest
    #[arg(long)]
    pub aoi_path: Option<PathBuf>,

    /// Output directory
    #[arg(long)]
    pub output_dir: String,

    /// Image patch size
    #[arg(long, default_value_t = 64)]
    pub example_patch_size: u32,

    /// Patch size used during alignment
    #[arg(long, default_value_t = 256)]
    pub alignment_patch_size: u32,

    /// Desired resolution (m/pixel) of the image patches
    #[arg(long, default_value_t = 0.5)]
    pub resolution: f64,

    /// Number of output shards
    #[arg(long, default_value_t = 20)]
    pub output_shards: u32,

    /// Raster I/O environment, comma delimited "var=value" pairs
    #[arg(long, value_delimiter = ',')]
    pub gdal_env: Vec<String>,

    /// Building detection method
    #[arg(long, value_enum, default_value_t = BuildingsMethod::File)]
    pub buildings_method: BuildingsMethod,

    /// File containing building locations (CSV or GeoJSON)
    #[arg(long)]
    pub buildings_file: Option<PathBuf>,

    /// OpenStreetMap Overpass server URL
    #[arg(long, default_value = DEFAULT_OVERPASS_URL)]
    pub overpass_url: String,

    /// Read labels for the dataset from this file
    #[arg(long)]
    pub labels_file: Option<PathBuf>,

    /// Property to use as label, e.g. "Main_Damag"
    #[arg(long)]
    pub label_property: Option<String>,

    /// Names of the label classes
    #[arg(long, value_delimiter = ',', default_value = "undamaged,damaged")]
    pub label_classes: Vec<String>,

    /// Number of labeled examples to keep (0 keeps all)
    #[arg(long, default_value_t = 1000)]
    pub num_keep_labeled_examples: usize,

    /// Create a labeling task for a random subset of examples
    #[arg(long)]
    pub create_cloud_labeling_task: bool,

    /// Patch size used for labeling
    #[arg(long, default_value_t = 256)]
    pub labeling_patch_size: u32,

    /// Number of examples to label
    #[arg(long, default_value_t = 500)]
    pub num_labeling_examples: u32,

    #[command(flatten)]
    pub labeler: LabelerArgs,
}

/// Exports labeling images from unlabeled examples and creates a labeling
/// task for them
#[derive(Debug, Clone, Parser)]
#[command(name = "create-labeling-task")]
#[command(version)]
pub struct CreateLabelingTaskArgs {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Cloud project name
    #[arg(long, env = "CLOUD_PROJECT", default_value = "disaster-assessment")]
    pub cloud_project: String,

    /// Project location
    #[arg(long, default_value = "us-central1")]
    pub cloud_location: String,

    /// Dataset name
    #[arg(long)]
    pub dataset_name: String,

    /// Pattern matching the unlabeled example files
    #[arg(long)]
    pub examples_pattern: Option<String>,

    /// Directory to write labeling images to
    #[arg(long)]
    pub images_dir: Option<String>,

    /// Maximum number of images to label
    #[arg(long, default_value_t = DEFAULT_MAX_IMAGES)]
    pub max_images: u32,

    /// Randomly sample images
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub randomize: bool,

    /// Labeling image exporter executable and arguments
    #[arg(long, default_value = DEFAULT_EXPORT_COMMAND)]
    pub export_command: String,

    /// Existing import file listing the labeling images. Skips the export.
    #[arg(long)]
    pub import_file_uri: Option<String>,

    /// Names of the label classes
    #[arg(long, value_delimiter = ',', default_value = "undamaged,damaged")]
    pub label_classes: Vec<String>,

    #[command(flatten)]
    pub labeler: LabelerArgs,
}

/// Installs the global tracing subscriber
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("damage_assess=debug,info")
        } else {
            EnvFilter::new("damage_assess=info,warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
