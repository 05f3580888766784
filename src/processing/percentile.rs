//! Percentile reduction over valid pixels.

use gdal::raster::Buffer;

use crate::processing::is_valid;
use crate::processing::mask::ZoneRaster;

/// Percentile `p` (0..=100) of `values` with linear interpolation between the
/// closest ranks. Invalid pixels are ignored; `None` when nothing is left.
pub fn percentile(values: &[f32], p: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| is_valid(*v))
        .map(f64::from)
        .collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = p.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Valid values of `band` that fall inside any zone.
pub fn values_in_zones(band: &Buffer<f32>, zones: &ZoneRaster) -> Vec<f32> {
    band.data()
        .iter()
        .zip(zones.data())
        .filter(|(value, zone)| zones.feature_of(**zone).is_some() && is_valid(**value))
        .map(|(value, _)| *value)
        .collect()
}
