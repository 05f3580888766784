// src/processing/indices/bbe.rs
use crate::error::Result;
use crate::processing::formulas::broadband_emissivity;
use crate::processing::parallel::IndexCalculator;
use crate::processing::BBE;
use crate::utils::gdal_ext::TypedBuffer;

use super::{f32_input, map_binary};

/// Broadband emissivity from scaled MODIS band 31/32 emissivities:
/// 0.273 * E31 + 0.706 * E32 - 0.013
pub struct BroadbandEmissivity {
    emis_31_index: usize,
    emis_32_index: usize,
    name: String,
}

impl BroadbandEmissivity {
    pub fn new(emis_31_index: usize, emis_32_index: usize, name: Option<String>) -> Self {
        Self {
            emis_31_index,
            emis_32_index,
            name: name.unwrap_or_else(|| BBE.to_string()),
        }
    }
}

impl IndexCalculator for BroadbandEmissivity {
    fn calculate(&self, inputs: &[TypedBuffer]) -> Result<TypedBuffer> {
        let emis_31 = f32_input(inputs, self.emis_31_index, &self.name)?;
        let emis_32 = f32_input(inputs, self.emis_32_index, &self.name)?;

        let result = map_binary(emis_31, emis_32, |e31, e32| {
            Some(broadband_emissivity(e31, e32))
        })?;
        Ok(TypedBuffer::F32(result))
    }

    fn required_bands(&self) -> usize {
        2 // BBE requires Emis_31 and Emis_32
    }

    fn name(&self) -> &str {
        &self.name
    }
}
