// src/processing/indices/ndi.rs
use crate::error::Result;
use crate::processing::formulas::ndvi;
use crate::processing::parallel::IndexCalculator;
use crate::utils::gdal_ext::TypedBuffer;

use super::{f32_input, map_binary};

/// Normalized Difference Index (NDI) calculator, (A - B) / (A + B).
///
/// With NIR as A and Red as B this is NDVI.
pub struct NDI {
    band_a_index: usize,
    band_b_index: usize,
    name: String,
}

impl NDI {
    pub fn new(band_a_index: usize, band_b_index: usize, name: Option<String>) -> Self {
        Self {
            band_a_index,
            band_b_index,
            name: name.unwrap_or_else(|| "NDI".to_string()),
        }
    }
}

impl IndexCalculator for NDI {
    fn calculate(&self, inputs: &[TypedBuffer]) -> Result<TypedBuffer> {
        let band_a = f32_input(inputs, self.band_a_index, &self.name)?;
        let band_b = f32_input(inputs, self.band_b_index, &self.name)?;

        Ok(TypedBuffer::F32(map_binary(band_a, band_b, ndvi)?))
    }

    fn required_bands(&self) -> usize {
        2 // NDI requires exactly 2 bands
    }

    fn name(&self) -> &str {
        &self.name
    }
}
