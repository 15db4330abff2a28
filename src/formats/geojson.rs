//! GeoJSON vector files

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::geometry;
use crate::projection::{epsg, Coordinate};

/// A GeoJSON position: `[x, y]` with an optional altitude
pub type Position = Vec<f64>;

/// Top-level GeoJSON document
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJson {
    FeatureCollection(FeatureCollection),
    Feature(Feature),
}

/// A collection of features, optionally tagged with a legacy `crs` member
#[derive(Debug, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    #[serde(default)]
    pub crs: Option<Crs>,
}

/// A single feature
#[derive(Debug, Deserialize)]
pub struct Feature {
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

/// Named CRS member from GeoJSON 2008
#[derive(Debug, Deserialize)]
pub struct Crs {
    pub properties: CrsProperties,
}

#[derive(Debug, Deserialize)]
pub struct CrsProperties {
    pub name: String,
}

/// GeoJSON geometry
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

fn to_coordinate(position: &Position) -> Result<Coordinate> {
    match position.as_slice() {
        [x, y, ..] => Ok(Coordinate::new(*x, *y)),
        _ => Err(Error::data(format!(
            "GeoJSON position needs at least 2 values, got {}",
            position.len()
        ))),
    }
}

fn to_ring(positions: &[Position]) -> Result<Vec<Coordinate>> {
    positions.iter().map(to_coordinate).collect()
}

fn to_rings(rings: &[Vec<Position>]) -> Result<Vec<Vec<Coordinate>>> {
    rings.iter().map(|ring| to_ring(ring)).collect()
}

impl Geometry {
    /// Returns the geometry's centroid in its own CRS.
    ///
    /// Areal geometries use the area-weighted centroid, everything else the
    /// vertex mean. Empty geometries have no centroid.
    pub fn centroid(&self) -> Result<Option<Coordinate>> {
        let centroid = match self {
            Geometry::Point { coordinates } => Some(to_coordinate(coordinates)?),
            Geometry::MultiPoint { coordinates } | Geometry::LineString { coordinates } => {
                geometry::mean_point(&to_ring(coordinates)?)
            }
            Geometry::MultiLineString { coordinates } => {
                let points: Vec<Coordinate> = to_rings(coordinates)?.into_iter().flatten().collect();
                geometry::mean_point(&points)
            }
            Geometry::Polygon { coordinates } => {
                let rings = to_rings(coordinates)?;
                geometry::polygons_centroid([rings.as_slice()])
            }
            Geometry::MultiPolygon { coordinates } => {
                let polygons = coordinates
                    .iter()
                    .map(|polygon| to_rings(polygon))
                    .collect::<Result<Vec<_>>>()?;
                geometry::polygons_centroid(polygons.iter().map(Vec::as_slice))
            }
            Geometry::GeometryCollection { geometries } => {
                let centroids = geometries
                    .iter()
                    .filter_map(|g| g.centroid().transpose())
                    .collect::<Result<Vec<_>>>()?;
                geometry::mean_point(&centroids)
            }
        };

        Ok(centroid)
    }

    /// Returns every polygon as rings (exterior first). Non-areal geometries yield nothing.
    pub fn polygons(&self) -> Result<Vec<Vec<Vec<Coordinate>>>> {
        match self {
            Geometry::Polygon { coordinates } => Ok(vec![to_rings(coordinates)?]),
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .map(|polygon| to_rings(polygon))
                .collect(),
            Geometry::GeometryCollection { geometries } => {
                let mut polygons = Vec::new();
                for geometry in geometries {
                    polygons.extend(geometry.polygons()?);
                }
                Ok(polygons)
            }
            _ => Ok(Vec::new()),
        }
    }
}

impl GeoJson {
    /// Parses a GeoJSON document
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Flattens the document into a feature collection
    pub fn into_collection(self) -> FeatureCollection {
        match self {
            GeoJson::FeatureCollection(collection) => collection,
            GeoJson::Feature(feature) => FeatureCollection {
                features: vec![feature],
                crs: None,
            },
        }
    }
}

impl FeatureCollection {
    /// EPSG code of the collection's CRS. GeoJSON without a `crs` member is WGS84.
    pub fn epsg(&self) -> Result<u32> {
        match &self.crs {
            None => Ok(epsg::WGS84),
            Some(crs) => parse_crs_name(&crs.properties.name),
        }
    }
}

/// Parses OGC URN and `EPSG:` style CRS names
pub fn parse_crs_name(name: &str) -> Result<u32> {
    if name.ends_with("CRS84") {
        return Ok(epsg::WGS84);
    }

    name.rsplit(':')
        .next()
        .filter(|_| name.contains("EPSG"))
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| Error::data(format!("Unsupported CRS name \"{}\"", name)))
}
