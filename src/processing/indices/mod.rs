// src/processing/indices/mod.rs
pub mod bbe;
pub mod fvc;
pub mod ndi;
pub mod scale;

// Re-export indices
pub use bbe::BroadbandEmissivity;
pub use fvc::{FractionalVegetation, VegetationEmissivity};
pub use ndi::NDI;
pub use scale::LinearScale;

use gdal::raster::Buffer;
use rayon::prelude::*;

use crate::error::{LstError, Result};
use crate::processing::{is_valid, NODATA};
use crate::utils::gdal_ext::TypedBuffer;

/// Borrow input `index` as a float plane.
pub(crate) fn f32_input<'a>(
    inputs: &'a [TypedBuffer],
    index: usize,
    calculator: &str,
) -> Result<&'a Buffer<f32>> {
    inputs
        .get(index)
        .ok_or_else(|| LstError::NotEnoughBands {
            calculator: calculator.to_string(),
            required: index + 1,
            provided: inputs.len(),
        })?
        .as_f32()
        .ok_or_else(|| LstError::UnsupportedBuffer(calculator.to_string()))
}

/// Apply `op` to every valid pixel; NoData stays NoData.
pub(crate) fn map_unary<F>(input: &Buffer<f32>, op: F) -> Buffer<f32>
where
    F: Fn(f32) -> f32 + Sync,
{
    let shape = input.shape();
    let data = input.data();
    let mut result_data = vec![NODATA; data.len()];

    result_data
        .par_iter_mut()
        .zip(data.par_iter())
        .for_each(|(result, &value)| {
            if is_valid(value) {
                *result = op(value);
            }
        });

    Buffer::new(shape, result_data)
}

/// Combine two planes pixel by pixel. A pixel is NoData when either input
/// is NoData or `op` yields `None`.
pub(crate) fn map_binary<F>(a: &Buffer<f32>, b: &Buffer<f32>, op: F) -> Result<Buffer<f32>>
where
    F: Fn(f32, f32) -> Option<f32> + Sync,
{
    if a.shape() != b.shape() {
        return Err(LstError::GridMismatch {
            context: "pixel operands".to_string(),
            expected: a.shape(),
            found: b.shape(),
        });
    }

    let shape = a.shape();
    let a_data = a.data();
    let b_data = b.data();
    let mut result_data = vec![NODATA; a_data.len()];

    result_data
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, result)| {
            let (a_val, b_val) = (a_data[i], b_data[i]);
            if is_valid(a_val) && is_valid(b_val) {
                *result = op(a_val, b_val).unwrap_or(NODATA);
            }
        });

    Ok(Buffer::new(shape, result_data))
}
