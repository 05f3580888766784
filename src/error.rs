use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LstError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No scenes dated between {start} (inclusive) and {end} (exclusive) in {location}")]
    EmptyCollection {
        location: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Boundary {0} covers no valid pixel of the raster grid")]
    EmptyRegion(String),

    #[error("Grid mismatch for {context}: expected {expected:?}, found {found:?}")]
    GridMismatch {
        context: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Band {band} not found in {}", path.display())]
    MissingBand { path: PathBuf, band: String },

    #[error("Cannot parse an acquisition date from {0}")]
    InvalidDate(String),

    #[error("Not enough input bands for {calculator}. Required: {required}, provided: {provided}")]
    NotEnoughBands {
        calculator: String,
        required: usize,
        provided: usize,
    },

    #[error("Unsupported input buffer type for {0}")]
    UnsupportedBuffer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Block reader failure: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, LstError>;
