// src/utils/gdal_ext.rs
use gdal::raster::Buffer;

/// Raster plane handed between calculators, tagged with its pixel type.
#[derive(Debug, Clone)]
pub enum TypedBuffer {
    F32(Buffer<f32>),
    /// Integer plane (raw digital numbers, zone ids). The float calculators
    /// reject it with `UnsupportedBuffer`.
    I32(Buffer<i32>),
}

impl TypedBuffer {
    /// (width, height) of the plane.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            TypedBuffer::F32(buffer) => buffer.shape(),
            TypedBuffer::I32(buffer) => buffer.shape(),
        }
    }

    pub fn as_f32(&self) -> Option<&Buffer<f32>> {
        match self {
            TypedBuffer::F32(buffer) => Some(buffer),
            _ => None,
        }
    }

    pub fn into_f32(self) -> Option<Buffer<f32>> {
        match self {
            TypedBuffer::F32(buffer) => Some(buffer),
            _ => None,
        }
    }
}

impl From<Buffer<f32>> for TypedBuffer {
    fn from(buffer: Buffer<f32>) -> Self {
        TypedBuffer::F32(buffer)
    }
}

impl From<Buffer<i32>> for TypedBuffer {
    fn from(buffer: Buffer<i32>) -> Self {
        TypedBuffer::I32(buffer)
    }
}
