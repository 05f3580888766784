// src/batch.rs
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{LstError, Result};
use crate::io::writer::WriteOptions;
use crate::pipeline::{self, BandSelection, Report, Request, Variant, VegetationParams, DEFAULT_FOLDER};
use crate::processing::ParallelProcessor;
use crate::render::ColorRamp;

#[derive(Deserialize, Serialize, Debug)]
pub struct BatchConfig {
    #[serde(default)]
    pub global: GlobalParams,
    pub jobs: Vec<Job>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct GlobalParams {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_folder")]
    pub folder: String,
    #[serde(default = "default_compress")]
    pub compress: String,
    #[serde(default = "default_compress_level")]
    pub compress_level: u8,
    #[serde(default)]
    pub fixed_point: bool,
    #[serde(default = "default_true")]
    pub tiled: bool,
    #[serde(default = "default_vis_min")]
    pub vis_min: f64,
    #[serde(default = "default_vis_max")]
    pub vis_max: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

impl Default for GlobalParams {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            folder: default_folder(),
            compress: default_compress(),
            compress_level: default_compress_level(),
            fixed_point: false,
            tiled: true,
            vis_min: default_vis_min(),
            vis_max: default_vis_max(),
            opacity: default_opacity(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_folder() -> String {
    DEFAULT_FOLDER.to_string()
}

fn default_compress() -> String {
    "DEFLATE".to_string()
}

fn default_compress_level() -> u8 {
    6
}

fn default_true() -> bool {
    true
}

fn default_vis_min() -> f64 {
    10.0
}

fn default_vis_max() -> f64 {
    40.0
}

fn default_opacity() -> f64 {
    0.8
}

/// One region / time-window request.
#[derive(Deserialize, Serialize, Debug)]
pub struct Job {
    /// `lst` (narrow-band BBE) or `fvc` (vegetation-fraction BBE)
    #[serde(rename = "type")]
    pub job_type: String,
    pub collection: PathBuf,
    pub boundary: PathBuf,
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default)]
    pub bands: BandSelection,
    /// Required for `fvc` jobs.
    pub vegetation: Option<VegetationParams>,
    pub description: Option<String>,
    pub folder: Option<String>,
    pub fixed_point: Option<bool>,
    pub compress: Option<String>,
    pub compress_level: Option<u8>,
    pub tiled: Option<bool>,
}

impl Job {
    /// Resolve the job against global parameters.
    pub fn to_request(&self, global: &GlobalParams) -> Result<Request> {
        let variant = match self.job_type.to_lowercase().as_str() {
            "lst" | "narrowband" => Variant::Narrowband,
            "fvc" | "vegetation" => {
                let params = self.vegetation.clone().ok_or_else(|| {
                    LstError::Config(format!(
                        "{} job for {} is missing its vegetation parameters",
                        self.job_type,
                        self.boundary.display()
                    ))
                })?;
                Variant::VegetationFraction(params)
            }
            other => return Err(LstError::Config(format!("Unknown job type: {other}"))),
        };

        let mut request = Request::new(
            &self.collection,
            &self.boundary,
            self.start,
            self.end,
            variant,
            &global.output_dir,
        );
        request.bands = self.bands;
        request.folder = self.folder.clone().unwrap_or_else(|| global.folder.clone());
        if let Some(description) = &self.description {
            request.description = description.clone();
        }
        request.ramp = ColorRamp::with_range(global.vis_min, global.vis_max, global.opacity);
        request.write = WriteOptions {
            fixed_point: self.fixed_point.unwrap_or(global.fixed_point),
            compress: self.compress.clone().unwrap_or_else(|| global.compress.clone()),
            compress_level: self.compress_level.unwrap_or(global.compress_level),
            tiled: self.tiled.unwrap_or(global.tiled),
        };
        Ok(request)
    }
}

pub fn load_batch(config_path: &Path) -> Result<BatchConfig> {
    let config_content = fs::read_to_string(config_path)?;
    Ok(serde_json::from_str(&config_content)?)
}

/// Run every job in order. The first failure stops the batch.
pub fn process_batch(config_path: &Path, processor: &ParallelProcessor) -> Result<Vec<Report>> {
    let config = load_batch(config_path)?;

    // Resolve everything up front so a bad job fails before any work
    let requests = config
        .jobs
        .iter()
        .map(|job| job.to_request(&config.global))
        .collect::<Result<Vec<_>>>()?;

    info!("Starting batch processing with {} jobs", requests.len());

    let mut reports = Vec::with_capacity(requests.len());
    for (i, request) in requests.iter().enumerate() {
        info!(
            "[{}/{}] {} -> {}",
            i + 1,
            requests.len(),
            request.boundary.display(),
            request.description
        );
        reports.push(pipeline::run(processor, request)?);
        debug!(datasets = processor.cache_size(), "releasing dataset cache");
        processor.clear_cache();
    }

    info!("Batch processing complete");
    Ok(reports)
}
