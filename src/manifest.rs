//! Labeling import manifests
//!
//! The generation engine exports a sample of examples as composite
//! before/after images and lists them in a headerless CSV, one image URI
//! per row in the first column. The labeling service imports that file.

use std::path::Path;

use crate::error::{Error, Result};

/// File name of the manifest inside a labeling images directory
pub const IMPORT_FILE_NAME: &str = "import_file.csv";

/// Location of the manifest relative to the output directory
pub const IMPORT_FILE_RELATIVE_PATH: &str = "examples/labeling_images/import_file.csv";

fn join(dir: &str, relative: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        return relative.to_string();
    }
    format!("{}/{}", dir, relative)
}

/// Returns the manifest location for an output directory (local path or URI)
pub fn import_file_path(output_dir: &str) -> String {
    join(output_dir, IMPORT_FILE_RELATIVE_PATH)
}

/// Returns the manifest location inside a labeling images directory
pub fn images_dir_import_file(images_dir: &str) -> String {
    join(images_dir, IMPORT_FILE_NAME)
}

/// Returns true for URIs the labeling service reads directly
pub fn is_remote(uri: &str) -> bool {
    uri.starts_with("gs://")
}

/// Image URIs listed in an import manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportManifest {
    pub images: Vec<String>,
}

impl ImportManifest {
    /// Reads a manifest from a local file
    pub fn read(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut images = Vec::new();
        for record in reader.records() {
            let record = record?;
            if let Some(uri) = record.get(0).map(str::trim).filter(|uri| !uri.is_empty()) {
                images.push(uri.to_string());
            }
        }

        Ok(Self { images })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Checks a local manifest lists at least one image. Remote manifests are
/// not inspected and yield None.
pub fn check_import_file(uri: &str) -> Result<Option<usize>> {
    if is_remote(uri) {
        return Ok(None);
    }

    let manifest = ImportManifest::read(Path::new(uri))?;
    if manifest.is_empty() {
        return Err(Error::data(format!("Import file {} lists no images", uri)));
    }
    Ok(Some(manifest.len()))
}
