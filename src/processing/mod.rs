// src/processing/mod.rs
pub mod formulas;
pub mod indices;
pub mod mask;
pub mod parallel;
pub mod percentile;
pub mod zonal;

use gdal::raster::Buffer;

// Re-export main components
pub use parallel::{BandSource, IndexCalculator, ParallelProcessor};

/// NoData value of every float product band.
pub const NODATA: f32 = -999.0;

pub const LST_C: &str = "LST_C";
pub const EMIS_31: &str = "Emis_31";
pub const EMIS_32: &str = "Emis_32";
pub const BBE: &str = "BBE";
pub const NDVI: &str = "NDVI";
pub const FVC: &str = "FVC";
pub const BBE_FVC: &str = "BBE_FVC";

/// True when `value` carries data.
#[inline]
pub fn is_valid(value: f32) -> bool {
    value != NODATA && value.is_finite()
}

/// A named output plane of the pipeline.
#[derive(Debug, Clone)]
pub struct Product {
    pub name: &'static str,
    pub data: Buffer<f32>,
    /// Multiplier applied when the band is stored as int16.
    pub fixed_point_scale: f32,
}

impl Product {
    pub fn new(name: &'static str, data: Buffer<f32>) -> Self {
        // Celsius keeps two decimals, unitless bands keep four.
        let fixed_point_scale = if name == LST_C { 100.0 } else { 10000.0 };
        Self {
            name,
            data,
            fixed_point_scale,
        }
    }
}
