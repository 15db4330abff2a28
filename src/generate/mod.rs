//! Example generation dispatch
//!
//! Patch extraction and alignment run in an external engine, either
//! in-process on this machine or on distributed workers. This module builds
//! the single [`GenerationRequest`] the engine consumes and hands it over.

pub mod command;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::manifest;
use crate::types::{BuildingCentroid, LabeledCoordinate};

pub use command::CommandGenerator;

/// Patch geometry and output layout of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationParams {
    /// Side length of example patches, in pixels
    pub example_patch_size: u32,
    /// Side length of patches used for before/after alignment
    pub alignment_patch_size: u32,
    /// Side length of patches rendered for human labeling
    pub labeling_patch_size: u32,
    /// Output resolution in meters per pixel
    pub resolution: f64,
    pub output_shards: u32,
    /// Number of examples exported for labeling
    pub num_labeling_examples: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            example_patch_size: 64,
            alignment_patch_size: 256,
            labeling_patch_size: 256,
            resolution: 0.5,
            output_shards: 20,
            num_labeling_examples: 500,
        }
    }
}

impl GenerationParams {
    /// Rejects sizes, counts and resolutions the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("example_patch_size", self.example_patch_size),
            ("alignment_patch_size", self.alignment_patch_size),
            ("labeling_patch_size", self.labeling_patch_size),
            ("output_shards", self.output_shards),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(Error::config(format!("{} must be positive", name)));
            }
        }
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(Error::config(format!(
                "resolution must be a positive number, got {}",
                self.resolution
            )));
        }
        Ok(())
    }
}

/// Settings for running the engine on distributed workers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributedOptions {
    /// Worker container image
    pub container_image: String,
    pub cloud_project: String,
    pub cloud_region: String,
    /// Account the workers run as; the project default when unset
    pub worker_service_account: Option<String>,
}

/// Where the engine runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionEngine {
    Local,
    Distributed(DistributedOptions),
}

impl ExecutionEngine {
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionEngine::Local => "local",
            ExecutionEngine::Distributed(_) => "distributed",
        }
    }
}

/// Everything the engine needs for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub before_image_path: String,
    pub after_image_path: String,
    pub output_dir: String,
    #[serde(flatten)]
    pub params: GenerationParams,
    pub building_centroids: Vec<BuildingCentroid>,
    pub labeled_coordinates: Vec<LabeledCoordinate>,
    pub engine: ExecutionEngine,
    /// Environment for the raster I/O layer
    pub raster_env: BTreeMap<String, String>,
}

impl GenerationRequest {
    /// Total number of coordinates the engine will extract patches for
    pub fn coordinate_count(&self) -> usize {
        self.building_centroids.len() + self.labeled_coordinates.len()
    }

    /// Where the engine writes the labeling import manifest
    pub fn import_file_path(&self) -> String {
        manifest::import_file_path(&self.output_dir)
    }
}

/// The external example generation engine
#[async_trait]
pub trait ExampleGenerator: Send + Sync {
    /// Runs the engine to completion
    async fn generate(&self, request: &GenerationRequest) -> Result<()>;
}

/// Parses `var=value` settings for the raster I/O layer.
///
/// Values may themselves contain `=`; only the first one separates.
pub fn parse_raster_env<S: AsRef<str>>(settings: &[S]) -> Result<BTreeMap<String, String>> {
    settings
        .iter()
        .map(|setting| {
            let setting = setting.as_ref();
            setting
                .split_once('=')
                .map(|(var, value)| (var.to_string(), value.to_string()))
                .ok_or_else(|| {
                    Error::config(format!(
                        "Raster environment setting \"{}\" should have the form \"var=value\"",
                        setting
                    ))
                })
        })
        .collect()
}

/// Picks the distributed worker image.
///
/// An explicit image always wins. Otherwise the worker runtime version
/// selects a prebuilt image; only minor versions 7, 8 and 9 have one.
pub fn resolve_container_image(
    explicit: Option<&str>,
    runtime_version: Option<&str>,
) -> Result<String> {
    if let Some(image) = explicit {
        return Ok(image.to_string());
    }

    let unsupported = || {
        Error::config(
            "A worker container image must be specified for distributed execution \
             unless the worker runtime version is 3.7, 3.8 or 3.9",
        )
    };

    let version = runtime_version.ok_or_else(unsupported)?;
    let mut parts = version.trim().split('.');
    let major = parts.next().filter(|p| !p.is_empty()).ok_or_else(unsupported)?;
    let minor = parts.next().ok_or_else(unsupported)?;

    match minor {
        "7" | "8" | "9" => Ok(format!(
            "gcr.io/disaster-assessment/dataflow_{}.{}_image:latest",
            major, minor
        )),
        _ => Err(unsupported()),
    }
}

/// Runs the engine for a request and returns the import manifest location
pub async fn generate_examples(
    request: &GenerationRequest,
    generator: &dyn ExampleGenerator,
) -> Result<String> {
    tracing::info!(
        engine = request.engine.name(),
        buildings = request.building_centroids.len(),
        labeled = request.labeled_coordinates.len(),
        shards = request.params.output_shards,
        output_dir = %request.output_dir,
        "Starting example generation"
    );

    generator.generate(request).await?;

    let import_file = request.import_file_path();
    tracing::info!(import_file = %import_file, "Example generation finished");
    Ok(import_file)
}
