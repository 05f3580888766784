//! Per-pixel conversions for MODIS LST/emissivity products.
//!
//! Every function works on physical values and knows nothing about NoData;
//! the calculators in [`crate::processing::indices`] take care of masking.

/// MOD11 `LST_Day_1km` scale factor (Kelvin per digital number).
pub const LST_SCALE: f32 = 0.02;
pub const KELVIN_OFFSET: f32 = 273.15;
/// Scale factor applied to `Emis_31` / `Emis_32` digital numbers.
pub const EMISSIVITY_SCALE: f32 = 0.002;

pub const BBE_WEIGHT_31: f32 = 0.273;
pub const BBE_WEIGHT_32: f32 = 0.706;
pub const BBE_OFFSET: f32 = -0.013;

/// Emissivity of a fully vegetated pixel.
pub const VEGETATION_EMISSIVITY: f32 = 0.986;
/// Emissivity of bare soil.
pub const SOIL_EMISSIVITY: f32 = 0.972;

/// MOD13 NDVI scale factor.
pub const NDVI_SCALE: f32 = 0.0001;

/// Raw LST digital number to degrees Celsius.
#[inline]
pub fn lst_celsius(raw: f32) -> f32 {
    raw * LST_SCALE - KELVIN_OFFSET
}

/// Raw emissivity digital number to unitless emissivity.
#[inline]
pub fn emissivity(raw: f32) -> f32 {
    raw * EMISSIVITY_SCALE
}

/// Broadband emissivity from MODIS bands 31 and 32.
#[inline]
pub fn broadband_emissivity(emis_31: f32, emis_32: f32) -> f32 {
    BBE_WEIGHT_31 * emis_31 + BBE_WEIGHT_32 * emis_32 + BBE_OFFSET
}

/// Normalized difference (NIR - Red) / (NIR + Red). `None` when the sum is
/// not positive.
#[inline]
pub fn ndvi(nir: f32, red: f32) -> Option<f32> {
    let sum = nir + red;
    if sum > 0.0 {
        Some((nir - red) / sum)
    } else {
        None
    }
}

/// Fractional vegetation cover, `clamp((ndvi - min) / (max - min), 0, 1)^2`.
///
/// A degenerate range (`max <= min`) splits the scene at `min`: pixels at or
/// below it are soil, pixels above it are vegetation.
#[inline]
pub fn fractional_vegetation(ndvi: f32, ndvi_min: f32, ndvi_max: f32) -> f32 {
    let range = ndvi_max - ndvi_min;
    let fraction = if range > 0.0 {
        ((ndvi - ndvi_min) / range).clamp(0.0, 1.0)
    } else if ndvi > ndvi_min {
        1.0
    } else {
        0.0
    };
    fraction * fraction
}

/// Emissivity blended between soil and vegetation by cover fraction.
#[inline]
pub fn blended_emissivity(fvc: f32, vegetation: f32, soil: f32) -> f32 {
    soil * (1.0 - fvc) + vegetation * fvc
}
