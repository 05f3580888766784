//! Zonal mean
//!
//! Averages every product band over the pixels of each boundary feature.

use gdal::raster::Buffer;

use crate::error::{LstError, Result};
use crate::processing::is_valid;
use crate::processing::mask::ZoneRaster;

/// Statistics of one boundary feature.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonalStats {
    /// Index of the feature in the boundary layer.
    pub feature: usize,
    /// Pixels whose center falls inside the feature.
    pub pixel_count: usize,
    /// Mean per band, in band order. `None` when the feature has no valid
    /// pixel for that band.
    pub means: Vec<Option<f64>>,
}

/// Mean of each band over each zone of `zones`.
///
/// Returns one entry per feature, in feature order, including features that
/// cover no pixel.
pub fn zonal_means(bands: &[&Buffer<f32>], zones: &ZoneRaster) -> Result<Vec<ZonalStats>> {
    for band in bands {
        if band.shape() != zones.shape() {
            return Err(LstError::GridMismatch {
                context: "zonal statistics".to_string(),
                expected: zones.shape(),
                found: band.shape(),
            });
        }
    }

    let zone_count = zones.zone_count();
    let mut pixel_counts = vec![0usize; zone_count];
    let mut sums = vec![vec![0.0f64; bands.len()]; zone_count];
    let mut counts = vec![vec![0usize; bands.len()]; zone_count];

    for (i, &zone) in zones.data().iter().enumerate() {
        let Some(feature) = zones.feature_of(zone) else {
            continue;
        };
        pixel_counts[feature] += 1;

        for (b, band) in bands.iter().enumerate() {
            let value = band.data()[i];
            if is_valid(value) {
                sums[feature][b] += f64::from(value);
                counts[feature][b] += 1;
            }
        }
    }

    let results = (0..zone_count)
        .map(|feature| ZonalStats {
            feature,
            pixel_count: pixel_counts[feature],
            means: sums[feature]
                .iter()
                .zip(&counts[feature])
                .map(|(&sum, &count)| (count > 0).then(|| sum / count as f64))
                .collect(),
        })
        .collect();

    Ok(results)
}
