use crate::error::{Error, Result};
use crate::projection::coordinate::Coordinate;
use crate::projection::epsg;
use proj::Proj;

/// Transforms coordinates between different coordinate reference systems
pub struct Transformer {
    proj: Proj,
    from_epsg: u32,
    to_epsg: u32,
}

impl Transformer {
    /// Creates a new transformer from source to target CRS using EPSG codes
    pub fn new(from_epsg: u32, to_epsg: u32) -> Result<Self> {
        let from = format!("EPSG:{}", from_epsg);
        let to = format!("EPSG:{}", to_epsg);

        let proj = Proj::new_known_crs(&from, &to, None)
            .map_err(|e| Error::Projection(format!("Failed to create projection: {}", e)))?;

        Ok(Self {
            proj,
            from_epsg,
            to_epsg,
        })
    }

    /// Creates a transformer from the given CRS to WGS84 longitude/latitude
    pub fn to_wgs84(from_epsg: u32) -> Result<Self> {
        Self::new(from_epsg, epsg::WGS84)
    }

    /// Transforms a coordinate from source to target CRS
    pub fn transform(&self, coord: Coordinate) -> Result<Coordinate> {
        let result = self.proj.convert((coord.x, coord.y))
            .map_err(|e| Error::Projection(format!("Transformation failed: {}", e)))?;

        Ok(Coordinate::new(result.0, result.1))
    }

    /// Transforms multiple coordinates in bulk
    pub fn transform_many(&self, coords: &[Coordinate]) -> Result<Vec<Coordinate>> {
        coords.iter()
            .map(|&coord| self.transform(coord))
            .collect()
    }

    /// Returns the source EPSG code
    pub fn from_epsg(&self) -> u32 {
        self.from_epsg
    }

    /// Returns the target EPSG code
    pub fn to_epsg(&self) -> u32 {
        self.to_epsg
    }
}
