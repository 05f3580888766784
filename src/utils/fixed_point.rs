// src/utils/fixed_point.rs
use crate::processing::NODATA;

/// NoData marker of int16 product bands.
pub const NODATA_INT: i16 = i16::MIN;

/// Scale a float band to int16. Values are clamped so they never collide
/// with [`NODATA_INT`].
pub fn to_fixed_point(data: &[f32], scale_factor: f32, nodata_value: i16) -> Vec<i16> {
    data.iter()
        .map(|&value| {
            if value == NODATA || !value.is_finite() {
                nodata_value
            } else {
                let scaled = (value * scale_factor).round();
                scaled.clamp(-(i16::MAX as f32), i16::MAX as f32) as i16
            }
        })
        .collect()
}
