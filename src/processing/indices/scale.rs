// src/processing/indices/scale.rs
use crate::error::Result;
use crate::processing::formulas::{EMISSIVITY_SCALE, KELVIN_OFFSET, LST_SCALE};
use crate::processing::parallel::IndexCalculator;
use crate::processing::{EMIS_31, EMIS_32, LST_C, NDVI};
use crate::utils::gdal_ext::TypedBuffer;

use super::{f32_input, map_unary};

/// `value * scale + offset` on a single band, the conversion from stored
/// digital numbers to physical units.
pub struct LinearScale {
    band_index: usize,
    scale: f32,
    offset: f32,
    name: String,
}

impl LinearScale {
    pub fn new(band_index: usize, scale: f32, offset: f32, name: Option<String>) -> Self {
        Self {
            band_index,
            scale,
            offset,
            name: name.unwrap_or_else(|| "SCALED".to_string()),
        }
    }

    /// MOD11 `LST_Day_1km` to degrees Celsius.
    pub fn lst_celsius(band_index: usize) -> Self {
        Self::new(band_index, LST_SCALE, -KELVIN_OFFSET, Some(LST_C.to_string()))
    }

    /// MOD11 `Emis_31` to emissivity.
    pub fn emis_31(band_index: usize) -> Self {
        Self::new(band_index, EMISSIVITY_SCALE, 0.0, Some(EMIS_31.to_string()))
    }

    /// MOD11 `Emis_32` to emissivity.
    pub fn emis_32(band_index: usize) -> Self {
        Self::new(band_index, EMISSIVITY_SCALE, 0.0, Some(EMIS_32.to_string()))
    }

    /// Precomputed NDVI stored with an integer scale (MOD13: 0.0001).
    pub fn ndvi(band_index: usize, scale: f32) -> Self {
        Self::new(band_index, scale, 0.0, Some(NDVI.to_string()))
    }
}

impl IndexCalculator for LinearScale {
    fn calculate(&self, inputs: &[TypedBuffer]) -> Result<TypedBuffer> {
        let band = f32_input(inputs, self.band_index, &self.name)?;
        let (scale, offset) = (self.scale, self.offset);
        Ok(TypedBuffer::F32(map_unary(band, |value| value * scale + offset)))
    }

    fn required_bands(&self) -> usize {
        self.band_index + 1
    }

    fn name(&self) -> &str {
        &self.name
    }
}
