//! Boundary clipping: burn boundary features into a zone raster on the
//! product grid and mask product bands with it.

use gdal::raster::{rasterize, Buffer};
use gdal::spatial_ref::SpatialRef;
use gdal::DriverManager;
use tracing::{debug, warn};

use crate::error::{LstError, Result};
use crate::io::boundary::Boundary;
use crate::io::reader::GeoInfo;
use crate::processing::NODATA;

/// Zone id per pixel: `k > 0` is feature `k - 1`, 0 is outside.
#[derive(Debug, Clone)]
pub struct ZoneRaster {
    buffer: Buffer<i32>,
    zone_count: usize,
}

impl ZoneRaster {
    /// Wrap an existing zone plane. Ids above `zone_count` are treated as
    /// outside.
    pub fn from_buffer(buffer: Buffer<i32>, zone_count: usize) -> Self {
        Self { buffer, zone_count }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.buffer.shape()
    }

    pub fn data(&self) -> &[i32] {
        self.buffer.data()
    }

    pub fn zone_count(&self) -> usize {
        self.zone_count
    }

    /// Feature index of the pixel at `(col, row)`, if inside a feature.
    pub fn feature_at(&self, col: usize, row: usize) -> Option<usize> {
        let (width, height) = self.shape();
        if col >= width || row >= height {
            return None;
        }
        self.feature_of(self.buffer.data()[row * width + col])
    }

    /// Feature index for a raw zone id.
    pub fn feature_of(&self, zone: i32) -> Option<usize> {
        if zone > 0 && (zone as usize) <= self.zone_count {
            Some(zone as usize - 1)
        } else {
            None
        }
    }

    /// Number of pixels inside any feature.
    pub fn covered_pixels(&self) -> usize {
        self.buffer
            .data()
            .iter()
            .filter(|&&zone| self.feature_of(zone).is_some())
            .count()
    }

    /// Set every pixel outside the boundary to NoData.
    pub fn mask(&self, band: &mut Buffer<f32>) -> Result<()> {
        if band.shape() != self.shape() {
            return Err(LstError::GridMismatch {
                context: "boundary mask".to_string(),
                expected: self.shape(),
                found: band.shape(),
            });
        }

        let zones = self.buffer.data();
        for (value, &zone) in band.data_mut().iter_mut().zip(zones) {
            if self.feature_of(zone).is_none() {
                *value = NODATA;
            }
        }
        Ok(())
    }
}

/// Rasterize `boundary` onto the grid described by `geo`.
///
/// A pixel belongs to a feature when its center lies inside the polygon.
/// Later features win where polygons overlap.
pub fn rasterize_zones(boundary: &Boundary, geo: &GeoInfo) -> Result<ZoneRaster> {
    let driver = DriverManager::get_driver_by_name("MEM")?;
    let mut zones_ds = driver.create_with_band_type::<i32, _>("", geo.width, geo.height, 1)?;
    zones_ds.set_geo_transform(&geo.geo_transform)?;
    if !geo.projection.is_empty() {
        zones_ds.set_projection(&geo.projection)?;
    }

    let raster_srs = if geo.projection.is_empty() {
        None
    } else {
        Some(SpatialRef::from_wkt(&geo.projection)?)
    };

    for feature in boundary.features() {
        let geometry = match (&raster_srs, boundary.spatial_ref()) {
            (Some(target), Some(source)) if target != source => {
                debug!(feature = feature.index, "reprojecting boundary feature");
                feature.geometry.transform_to(target)?
            }
            _ => feature.geometry.clone(),
        };

        rasterize(
            &mut zones_ds,
            &[1],
            &[geometry],
            &[(feature.index + 1) as f64],
            None,
        )?;
    }

    let band = zones_ds.rasterband(1)?;
    let buffer = band.read_as::<i32>((0, 0), geo.size(), geo.size(), None)?;
    let zones = ZoneRaster::from_buffer(buffer, boundary.len());

    let mut counts = vec![0usize; boundary.len()];
    for &zone in zones.data() {
        if let Some(index) = zones.feature_of(zone) {
            counts[index] += 1;
        }
    }
    let covered: usize = counts.iter().sum();
    if covered == 0 {
        return Err(LstError::EmptyRegion(boundary.name().to_string()));
    }
    for (index, _) in counts.iter().enumerate().filter(|&(_, &count)| count == 0) {
        warn!(feature = index, "boundary feature covers no pixel center");
    }
    debug!(covered, features = boundary.len(), "rasterized boundary");

    Ok(zones)
}
