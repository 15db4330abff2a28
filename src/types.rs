//! Core data types for damage-assess

use serde::{Deserialize, Serialize};

use crate::projection::Coordinate;

/// A detected building location in WGS84
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildingCentroid {
    pub lon: f64,
    pub lat: f64,
}

impl BuildingCentroid {
    /// Creates a new building centroid
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Returns the centroid as a coordinate
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::from_lonlat(self.lon, self.lat)
    }
}

impl From<Coordinate> for BuildingCentroid {
    fn from(coord: Coordinate) -> Self {
        Self::new(coord.x, coord.y)
    }
}

/// A point with a known damage label
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledCoordinate {
    pub lon: f64,
    pub lat: f64,
    /// Class index, or the numeric label as read from the file
    pub label: f64,
}

impl LabeledCoordinate {
    /// Creates a new labeled coordinate
    pub fn new(lon: f64, lat: f64, label: f64) -> Self {
        Self { lon, lat, label }
    }
}

/// A polygon bounding an area of interest, in WGS84
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Exterior ring
    pub exterior: Vec<Coordinate>,
    /// Holes
    pub interiors: Vec<Vec<Coordinate>>,
}

impl Region {
    /// Creates a region without holes
    pub fn new(exterior: Vec<Coordinate>) -> Self {
        Self {
            exterior,
            interiors: Vec::new(),
        }
    }

    /// Creates a region with holes
    pub fn with_holes(exterior: Vec<Coordinate>, interiors: Vec<Vec<Coordinate>>) -> Self {
        Self { exterior, interiors }
    }

    /// Returns true if the point lies inside the exterior ring and outside every hole
    pub fn contains(&self, point: Coordinate) -> bool {
        let Some((min_x, min_y, max_x, max_y)) = self.bounding_box() else {
            return false;
        };
        if point.x < min_x || point.x > max_x || point.y < min_y || point.y > max_y {
            return false;
        }

        crate::geometry::ring_contains(&self.exterior, point)
            && !self
                .interiors
                .iter()
                .any(|hole| crate::geometry::ring_contains(hole, point))
    }

    /// Returns (min_lon, min_lat, max_lon, max_lat) of the exterior ring
    pub fn bounding_box(&self) -> Option<(f64, f64, f64, f64)> {
        let first = self.exterior.first()?;
        let init = (first.x, first.y, first.x, first.y);
        Some(self.exterior.iter().fold(init, |(x0, y0, x1, y1), c| {
            (x0.min(c.x), y0.min(c.y), x1.max(c.x), y1.max(c.y))
        }))
    }
}
