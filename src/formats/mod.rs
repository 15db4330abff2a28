//! Geospatial vector file readers
//!
//! Every reader hands back geometry already reprojected to WGS84
//! longitude/latitude, so callers never deal with source CRSes.

pub mod csv_points;
pub mod geojson;

use std::fs::File;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::projection::{epsg, Coordinate, Transformer};
use crate::types::Region;

use self::geojson::{FeatureCollection, GeoJson};

/// A feature reduced to its centroid, with its attribute table row
#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    /// Centroid in WGS84
    pub position: Coordinate,
    pub properties: Map<String, Value>,
}

/// Supported vector formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorFormat {
    GeoJson,
    Csv,
}

impl VectorFormat {
    /// Detects the format from a path's extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("geojson") | Some("json") => Ok(VectorFormat::GeoJson),
            Some("csv") => Ok(VectorFormat::Csv),
            _ => Err(Error::config(format!(
                "Unsupported vector file format: {}",
                path.display()
            ))),
        }
    }
}

/// Reads a GeoJSON file; a blank file is an empty collection
fn read_collection(path: &Path) -> Result<FeatureCollection> {
    let bytes = std::fs::read(path)?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(FeatureCollection {
            features: Vec::new(),
            crs: None,
        });
    }
    Ok(GeoJson::from_slice(&bytes)?.into_collection())
}

/// Builds a reprojection to WGS84, or None when the data already is WGS84
fn wgs84_transformer(source_epsg: u32) -> Result<Option<Transformer>> {
    if source_epsg == epsg::WGS84 {
        return Ok(None);
    }

    let transformer = Transformer::to_wgs84(source_epsg)?;
    tracing::debug!(
        from = transformer.from_epsg(),
        to = transformer.to_epsg(),
        "Reprojecting vector data"
    );
    Ok(Some(transformer))
}

/// Reads every feature of a vector file as a centroid plus properties.
///
/// Features without geometry are skipped. Order follows the file.
pub fn read_points(path: &Path) -> Result<Vec<PointRecord>> {
    match VectorFormat::from_path(path)? {
        VectorFormat::Csv => csv_points::read_points(File::open(path)?),
        VectorFormat::GeoJson => {
            let collection = read_collection(path)?;
            let transformer = wgs84_transformer(collection.epsg()?)?;

            let mut records = Vec::with_capacity(collection.features.len());
            for feature in collection.features {
                let centroid = match &feature.geometry {
                    Some(geometry) => geometry.centroid()?,
                    None => None,
                };
                let Some(centroid) = centroid else {
                    continue;
                };

                let position = match &transformer {
                    Some(transformer) => transformer.transform(centroid)?,
                    None => centroid,
                };

                records.push(PointRecord {
                    position,
                    properties: feature.properties.unwrap_or_default(),
                });
            }

            Ok(records)
        }
    }
}

/// Reads the polygons of a GeoJSON file as WGS84 regions
pub fn read_regions(path: &Path) -> Result<Vec<Region>> {
    if VectorFormat::from_path(path)? != VectorFormat::GeoJson {
        return Err(Error::config(format!(
            "Area of interest must be a GeoJSON file: {}",
            path.display()
        )));
    }

    let collection = read_collection(path)?;
    let transformer = wgs84_transformer(collection.epsg()?)?;

    let mut regions = Vec::new();
    for geometry in collection.features.iter().filter_map(|f| f.geometry.as_ref()) {
        for rings in geometry.polygons()? {
            let mut rings = match &transformer {
                Some(transformer) => rings
                    .iter()
                    .map(|ring| transformer.transform_many(ring))
                    .collect::<Result<Vec<_>>>()?,
                None => rings,
            };

            if rings.is_empty() {
                continue;
            }
            let exterior = rings.remove(0);
            regions.push(Region::with_holes(exterior, rings));
        }
    }

    Ok(regions)
}
