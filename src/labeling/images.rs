//! Labeling image export
//!
//! Before a labeling-only run can create a job, a sample of unlabeled
//! examples has to be rendered as side-by-side before/after images and
//! listed in an import manifest. The rendering happens in an external
//! exporter, the same way example generation does.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::generate::command::{run_with_stdin, split_command_line};
use crate::manifest;

/// Exporter executable used when none is configured
pub const DEFAULT_EXPORT_COMMAND: &str = "skai-create-labeling-images";

/// Default cap on exported images
pub const DEFAULT_MAX_IMAGES: u32 = 1000;

/// Which examples to render and where
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRequest {
    /// Pattern matching the unlabeled example files
    pub examples_pattern: String,
    /// Directory receiving the images and the import manifest
    pub images_dir: String,
    pub max_images: u32,
    /// Sample examples at random instead of taking the first ones
    pub randomize: bool,
}

impl ExportRequest {
    pub fn validate(&self) -> Result<()> {
        if self.examples_pattern.trim().is_empty() {
            return Err(Error::config("Examples pattern must not be empty"));
        }
        if self.images_dir.trim().is_empty() {
            return Err(Error::config("Images directory must not be empty"));
        }
        if self.max_images == 0 {
            return Err(Error::config("max_images must be positive"));
        }
        Ok(())
    }

    /// Where the exporter writes the import manifest
    pub fn import_file_path(&self) -> String {
        manifest::images_dir_import_file(&self.images_dir)
    }
}

/// Renders labeling images and writes their import manifest
#[async_trait]
pub trait LabelingImageExporter: Send + Sync {
    /// Runs the export and returns the import manifest location
    async fn export(&self, request: &ExportRequest) -> Result<String>;
}

/// Spawns an exporter executable with the request as JSON on stdin
#[derive(Debug, Clone)]
pub struct CommandExporter {
    program: String,
    args: Vec<String>,
}

impl CommandExporter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parses a whitespace-separated command line
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let (program, args) = split_command_line(command_line)?;
        Ok(Self::new(program, args))
    }
}

#[async_trait]
impl LabelingImageExporter for CommandExporter {
    async fn export(&self, request: &ExportRequest) -> Result<String> {
        tracing::info!(
            examples = %request.examples_pattern,
            images_dir = %request.images_dir,
            max_images = request.max_images,
            randomize = request.randomize,
            "Exporting labeling images"
        );

        let payload = serde_json::to_vec(request)?;
        run_with_stdin(&self.program, &self.args, &Default::default(), &payload).await?;

        Ok(request.import_file_path())
    }
}
