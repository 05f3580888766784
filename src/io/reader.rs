// src/io/reader.rs
use std::path::Path;

use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, Metadata};

use crate::error::{LstError, Result};

/// Grid of a raster: projection, geotransform and size.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoInfo {
    pub projection: String,
    pub geo_transform: [f64; 6],
    pub width: usize,
    pub height: usize,
}

impl GeoInfo {
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        let (width, height) = dataset.raster_size();
        Ok(Self {
            projection: dataset.projection(),
            geo_transform: dataset.geo_transform()?,
            width,
            height,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_dataset(&Dataset::open(path.as_ref())?)
    }

    /// (width, height)
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Same size, same geotransform (to a thousandth of a pixel) and same
    /// coordinate system.
    pub fn same_grid(&self, other: &GeoInfo) -> Result<bool> {
        if self.size() != other.size() {
            return Ok(false);
        }

        let pixel = self.geo_transform[1]
            .abs()
            .max(self.geo_transform[5].abs());
        let tolerance = GRID_TOLERANCE * pixel;
        let aligned = self
            .geo_transform
            .iter()
            .zip(&other.geo_transform)
            .all(|(a, b)| (a - b).abs() <= tolerance);
        if !aligned {
            return Ok(false);
        }

        match (self.projection.is_empty(), other.projection.is_empty()) {
            (true, true) => Ok(true),
            (false, false) if self.projection == other.projection => Ok(true),
            (false, false) => Ok(SpatialRef::from_wkt(&self.projection)?
                == SpatialRef::from_wkt(&other.projection)?),
            _ => Ok(false),
        }
    }

    /// [`GridMismatch`](LstError::GridMismatch) unless `other` lies on this grid.
    pub fn ensure_same_grid(&self, other: &GeoInfo, context: &str) -> Result<()> {
        if self.same_grid(other)? {
            return Ok(());
        }
        Err(LstError::GridMismatch {
            context: format!(
                "{context} (origin {:?} vs {:?})",
                (self.geo_transform[0], self.geo_transform[3]),
                (other.geo_transform[0], other.geo_transform[3])
            ),
            expected: self.size(),
            found: other.size(),
        })
    }
}

/// Largest geotransform difference, in pixels, still treated as the same grid.
const GRID_TOLERANCE: f64 = 1e-3;

/// Locate a band by description, falling back to a 1-based index.
///
/// MODIS HDF-to-GeoTIFF conversions usually keep the SDS name as band
/// description, so `LST_Day_1km` is found wherever it sits in the file.
pub fn resolve_band(dataset: &Dataset, path: &Path, name: &str, fallback: usize) -> Result<usize> {
    let count = dataset.raster_count() as usize;
    for index in 1..=count {
        let band = dataset.rasterband(index)?;
        if band.description().is_ok_and(|d| d == name) {
            return Ok(index);
        }
    }

    if (1..=count).contains(&fallback) {
        Ok(fallback)
    } else {
        Err(LstError::MissingBand {
            path: path.to_path_buf(),
            band: format!("{name} (index {fallback})"),
        })
    }
}

/// Read one whole band as f32.
pub fn read_band<P: AsRef<Path>>(path: P, band_index: usize) -> Result<Buffer<f32>> {
    let path = path.as_ref();
    let dataset = Dataset::open(path)?;
    if !(1..=dataset.raster_count() as usize).contains(&band_index) {
        return Err(LstError::MissingBand {
            path: path.to_path_buf(),
            band: format!("index {band_index}"),
        });
    }
    let size = dataset.raster_size();
    let band = dataset.rasterband(band_index)?;
    Ok(band.read_as::<f32>((0, 0), size, size, None)?)
}
