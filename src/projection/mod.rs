//! Coordinates and CRS transformation

pub mod coordinate;
pub mod transformer;

pub use coordinate::Coordinate;
pub use transformer::Transformer;

/// Frequently used EPSG codes
pub mod epsg {
    /// WGS84 longitude/latitude
    pub const WGS84: u32 = 4326;
}
