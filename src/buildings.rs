//! Building discovery: turns the configured source into building centroids

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::formats;
use crate::open_street_map::BuildingFinder;
use crate::types::{BuildingCentroid, Region};

/// Where building locations come from
#[derive(Debug, Clone, PartialEq)]
pub enum BuildingSource {
    /// A vector file of building footprints or points
    File(PathBuf),
    /// OpenStreetMap via an Overpass server
    OpenStreetMap { overpass_url: String },
    /// No buildings; only labeled coordinates are used
    None,
}

impl BuildingSource {
    /// Returns true when this source needs an area of interest
    pub fn needs_regions(&self) -> bool {
        !matches!(self, BuildingSource::None)
    }
}

/// Reads the area-of-interest polygons
pub fn read_aois(path: &Path) -> Result<Vec<Region>> {
    let regions = formats::read_regions(path)?;
    if regions.is_empty() {
        return Err(Error::data(format!(
            "Area of interest file {} contains no polygons",
            path.display()
        )));
    }
    Ok(regions)
}

/// Reads building centroids from a file, keeping those inside any region
pub fn read_buildings_file(path: &Path, regions: &[Region]) -> Result<Vec<BuildingCentroid>> {
    let records = formats::read_points(path)?;
    let total = records.len();

    let centroids: Vec<BuildingCentroid> = records
        .par_iter()
        .filter(|record| regions.iter().any(|region| region.contains(record.position)))
        .map(|record| BuildingCentroid::from(record.position))
        .collect();

    tracing::debug!(
        path = %path.display(),
        total,
        kept = centroids.len(),
        "Clipped buildings file to area of interest"
    );

    Ok(centroids)
}

/// Resolves building centroids for the configured source.
///
/// `finder` is only consulted for [`BuildingSource::OpenStreetMap`].
pub async fn get_building_centroids(
    source: &BuildingSource,
    regions: &[Region],
    finder: &dyn BuildingFinder,
) -> Result<Vec<BuildingCentroid>> {
    match source {
        BuildingSource::File(path) => read_buildings_file(path, regions),
        BuildingSource::OpenStreetMap { overpass_url } => {
            tracing::info!(url = %overpass_url, regions = regions.len(), "Querying OpenStreetMap for buildings");
            finder.building_centroids(regions).await
        }
        BuildingSource::None => Ok(Vec::new()),
    }
}
