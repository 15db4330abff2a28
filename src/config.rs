//! Validated run configuration
//!
//! Command-line arguments are checked once and turned into immutable
//! config values here; stages only ever see these types.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::buildings::BuildingSource;
use crate::cli::{BuildingsMethod, CreateLabelingTaskArgs, GenerateExamplesArgs, LabelerArgs};
use crate::error::{Error, Result};
use crate::generate::{self, DistributedOptions, ExecutionEngine, GenerationParams};
use crate::labeling::{ExportRequest, PoolSelection};
use crate::labels::{ClassSchema, KeepLimit};

/// Where labeled coordinates come from
#[derive(Debug, Clone, PartialEq)]
pub struct LabelsConfig {
    pub path: PathBuf,
    pub property: String,
    pub classes: ClassSchema,
    pub keep: KeepLimit,
}

/// Labeler pool and job settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelingConfig {
    pub project: String,
    /// Project region; the labeling region is derived from it
    pub location: String,
    /// Base name; each run appends a timestamp and random suffix
    pub dataset_name: String,
    pub pool: PoolSelection,
    pub instructions_uri: String,
    pub inputs_schema_uri: String,
    pub class_names: Vec<String>,
}

impl LabelingConfig {
    fn from_args(
        project: String,
        location: String,
        dataset_name: String,
        classes: &ClassSchema,
        labeler: LabelerArgs,
    ) -> Result<Self> {
        if dataset_name.trim().is_empty() {
            return Err(Error::config("Dataset name must not be empty"));
        }

        Ok(Self {
            project,
            location,
            dataset_name,
            pool: PoolSelection::new(labeler.cloud_labeler_pool, &labeler.cloud_labeler_emails)?,
            instructions_uri: labeler.labeler_instructions_uri,
            inputs_schema_uri: labeler.label_inputs_schema_uri,
            class_names: classes.names().to_vec(),
        })
    }
}

/// Configuration of a full example generation run
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateExamplesConfig {
    pub before_image_path: String,
    pub after_image_path: String,
    pub output_dir: String,
    pub aoi_path: Option<PathBuf>,
    pub params: GenerationParams,
    pub engine: ExecutionEngine,
    pub engine_command: String,
    pub raster_env: BTreeMap<String, String>,
    pub buildings: BuildingSource,
    pub labels: Option<LabelsConfig>,
    /// Set when a labeling task should be created after generation
    pub labeling: Option<LabelingConfig>,
}

fn required(value: Option<String>, flag: &str, purpose: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::config(format!("--{} must be specified {}", flag, purpose)))
}

impl TryFrom<GenerateExamplesArgs> for GenerateExamplesConfig {
    type Error = Error;

    fn try_from(args: GenerateExamplesArgs) -> Result<Self> {
        let params = GenerationParams {
            example_patch_size: args.example_patch_size,
            alignment_patch_size: args.alignment_patch_size,
            labeling_patch_size: args.labeling_patch_size,
            resolution: args.resolution,
            output_shards: args.output_shards,
            num_labeling_examples: args.num_labeling_examples,
        };
        params.validate()?;

        let raster_env = generate::parse_raster_env(args.gdal_env.as_slice())?;

        let engine = if args.use_dataflow {
            let container_image = generate::resolve_container_image(
                args.dataflow_container_image.as_deref(),
                args.worker_runtime_version.as_deref(),
            )?;
            ExecutionEngine::Distributed(DistributedOptions {
                container_image,
                cloud_project: required(args.cloud_project.clone(), "cloud-project", "when using Dataflow")?,
                cloud_region: required(args.cloud_region.clone(), "cloud-region", "when using Dataflow")?,
                worker_service_account: args.worker_service_account.clone(),
            })
        } else {
            ExecutionEngine::Local
        };

        let buildings = match args.buildings_method {
            BuildingsMethod::File => BuildingSource::File(args.buildings_file.clone().ok_or_else(|| {
                Error::config("--buildings-file must be specified when --buildings-method=file")
            })?),
            BuildingsMethod::OpenStreetMap => BuildingSource::OpenStreetMap {
                overpass_url: args.overpass_url.clone(),
            },
            BuildingsMethod::None => BuildingSource::None,
        };

        if buildings.needs_regions() && args.aoi_path.is_none() {
            return Err(Error::config(
                "--aoi-path must be specified unless --buildings-method=none",
            ));
        }

        if args.labels_file.is_none() && !buildings.needs_regions() {
            return Err(Error::config(
                "At least --labels-file (for labeled examples) or --buildings-method other than \
                 none (for unlabeled examples) should be specified",
            ));
        }

        let classes = ClassSchema::new(args.label_classes.clone())?;

        let labels = match args.labels_file.clone() {
            Some(path) => Some(LabelsConfig {
                path,
                property: required(args.label_property.clone(), "label-property", "with --labels-file")?,
                classes: classes.clone(),
                keep: KeepLimit::from_count(args.num_keep_labeled_examples),
            }),
            None => None,
        };

        let labeling = if args.create_cloud_labeling_task {
            let purpose = "to create a labeling task";
            Some(LabelingConfig::from_args(
                required(args.cloud_project.clone(), "cloud-project", purpose)?,
                required(args.cloud_region.clone(), "cloud-region", purpose)?,
                required(args.dataset_name.clone(), "dataset-name", purpose)?,
                &classes,
                args.labeler.clone(),
            )?)
        } else {
            None
        };

        Ok(Self {
            before_image_path: args.before_image_path,
            after_image_path: args.after_image_path,
            output_dir: args.output_dir,
            aoi_path: args.aoi_path,
            params,
            engine,
            engine_command: args.engine_command,
            raster_env,
            buildings,
            labels,
            labeling,
        })
    }
}

/// Where a labeling-only run gets its import manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelingImages {
    /// A manifest that already exists
    Existing(String),
    /// Render images from unlabeled examples first
    Export(ExportRequest),
}

/// Configuration of a labeling-only run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateLabelingTaskConfig {
    pub images: LabelingImages,
    pub export_command: String,
    pub labeling: LabelingConfig,
}

impl TryFrom<CreateLabelingTaskArgs> for CreateLabelingTaskConfig {
    type Error = Error;

    fn try_from(args: CreateLabelingTaskArgs) -> Result<Self> {
        let classes = ClassSchema::new(args.label_classes)?;

        let images = match args.import_file_uri.filter(|uri| !uri.trim().is_empty()) {
            Some(uri) => LabelingImages::Existing(uri),
            None => {
                let purpose = "unless --import-file-uri is given";
                let request = ExportRequest {
                    examples_pattern: required(args.examples_pattern, "examples-pattern", purpose)?,
                    images_dir: required(args.images_dir, "images-dir", purpose)?,
                    max_images: args.max_images,
                    randomize: args.randomize,
                };
                request.validate()?;
                LabelingImages::Export(request)
            }
        };

        Ok(Self {
            images,
            export_command: args.export_command,
            labeling: LabelingConfig::from_args(
                args.cloud_project,
                args.cloud_location,
                args.dataset_name,
                &classes,
                args.labeler,
            )?,
        })
    }
}
