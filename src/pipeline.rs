//! One region / time-window request, from scene collection to exports.
//!
//! load -> composite -> scale -> derive -> mask -> zonal mean -> render ->
//! export. Any failure aborts the request.

use std::path::PathBuf;

use chrono::NaiveDate;
use gdal::raster::Buffer;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LstError, Result};
use crate::io::boundary::Boundary;
use crate::io::collection::SceneCollection;
use crate::io::reader::{resolve_band, GeoInfo};
use crate::io::table::{export_path, write_zonal_csv};
use crate::io::writer::{write_products, WriteOptions};
use crate::processing::formulas::{NDVI_SCALE, SOIL_EMISSIVITY, VEGETATION_EMISSIVITY};
use crate::processing::indices::{
    BroadbandEmissivity, FractionalVegetation, LinearScale, VegetationEmissivity, NDI,
};
use crate::processing::mask::{rasterize_zones, ZoneRaster};
use crate::processing::percentile::{percentile, values_in_zones};
use crate::processing::zonal::{zonal_means, ZonalStats};
use crate::processing::{
    BandSource, ParallelProcessor, Product, BBE, BBE_FVC, EMIS_31, EMIS_32, FVC, LST_C, NDVI,
};
use crate::render::{render_overlay, write_overlay, ColorRamp, Legend};
use crate::utils::gdal_ext::TypedBuffer;

/// MOD11 fill value of LST and emissivity digital numbers.
pub const MODIS_FILL: f32 = 0.0;

pub const LST_BAND_NAME: &str = "LST_Day_1km";
pub const EMIS_31_BAND_NAME: &str = "Emis_31";
pub const EMIS_32_BAND_NAME: &str = "Emis_32";

pub const DEFAULT_FOLDER: &str = "EarthEngineExports";

/// 1-based band positions inside each LST scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandSelection {
    pub lst: usize,
    pub emis_31: usize,
    pub emis_32: usize,
}

impl Default for BandSelection {
    fn default() -> Self {
        Self {
            lst: 1,
            emis_31: 2,
            emis_32: 3,
        }
    }
}

/// Where NDVI comes from in the NDVI collection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NdviSource {
    /// Precomputed NDVI stored with an integer scale.
    Band { band: usize, scale: f32 },
    /// (NIR - Red) / (NIR + Red) from reflectance bands.
    RedNir { red: usize, nir: usize },
}

impl Default for NdviSource {
    fn default() -> Self {
        NdviSource::Band {
            band: 1,
            scale: NDVI_SCALE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VegetationParams {
    pub ndvi_collection: PathBuf,
    #[serde(default)]
    pub ndvi_source: NdviSource,
    #[serde(default = "default_low_percentile")]
    pub low_percentile: f64,
    #[serde(default = "default_high_percentile")]
    pub high_percentile: f64,
    #[serde(default = "default_vegetation_emissivity")]
    pub vegetation_emissivity: f32,
    #[serde(default = "default_soil_emissivity")]
    pub soil_emissivity: f32,
}

fn default_low_percentile() -> f64 {
    5.0
}

fn default_high_percentile() -> f64 {
    95.0
}

fn default_vegetation_emissivity() -> f32 {
    VEGETATION_EMISSIVITY
}

fn default_soil_emissivity() -> f32 {
    SOIL_EMISSIVITY
}

impl VegetationParams {
    pub fn new(ndvi_collection: impl Into<PathBuf>) -> Self {
        Self {
            ndvi_collection: ndvi_collection.into(),
            ndvi_source: NdviSource::default(),
            low_percentile: default_low_percentile(),
            high_percentile: default_high_percentile(),
            vegetation_emissivity: VEGETATION_EMISSIVITY,
            soil_emissivity: SOIL_EMISSIVITY,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for p in [self.low_percentile, self.high_percentile] {
            if !(0.0..=100.0).contains(&p) {
                return Err(LstError::Config(format!("percentile {p} outside 0..=100")));
            }
        }
        if self.low_percentile >= self.high_percentile {
            return Err(LstError::Config(format!(
                "low percentile {} must be below high percentile {}",
                self.low_percentile, self.high_percentile
            )));
        }
        Ok(())
    }
}

/// How emissivity is derived.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    /// BBE from MODIS bands 31 and 32.
    Narrowband,
    /// BBE from fractional vegetation cover.
    VegetationFraction(VegetationParams),
}

impl Variant {
    pub fn default_description(&self) -> &'static str {
        match self {
            Variant::Narrowband => "LST_Emis_BBE",
            Variant::VegetationFraction(_) => "LST_FVC_BBE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub collection: PathBuf,
    pub boundary: PathBuf,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub bands: BandSelection,
    pub variant: Variant,
    pub output_dir: PathBuf,
    pub folder: String,
    pub description: String,
    pub ramp: ColorRamp,
    pub write: WriteOptions,
}

impl Request {
    /// Request with default bands, export naming, ramp and raster options.
    pub fn new(
        collection: impl Into<PathBuf>,
        boundary: impl Into<PathBuf>,
        start: NaiveDate,
        end: NaiveDate,
        variant: Variant,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        let description = variant.default_description().to_string();
        Self {
            collection: collection.into(),
            boundary: boundary.into(),
            start,
            end,
            bands: BandSelection::default(),
            variant,
            output_dir: output_dir.into(),
            folder: DEFAULT_FOLDER.to_string(),
            description,
            ramp: ColorRamp::surface_temperature(),
            write: WriteOptions::default(),
        }
    }
}

/// Files and statistics produced by one request.
#[derive(Debug, Clone)]
pub struct Report {
    pub scenes: usize,
    pub bands: Vec<&'static str>,
    pub stats: Vec<ZonalStats>,
    pub csv_path: PathBuf,
    pub raster_path: PathBuf,
    pub overlay_path: PathBuf,
    pub legend_path: PathBuf,
    /// NDVI 5th/95th percentile used for FVC, vegetation variant only.
    pub ndvi_range: Option<(f32, f32)>,
}

pub fn run(processor: &ParallelProcessor, request: &Request) -> Result<Report> {
    if request.start >= request.end {
        return Err(LstError::Config(format!(
            "empty date window {} .. {}",
            request.start, request.end
        )));
    }

    if let Variant::VegetationFraction(params) = &request.variant {
        params.validate()?;
    }

    info!(
        collection = %request.collection.display(),
        boundary = %request.boundary.display(),
        start = %request.start,
        end = %request.end,
        "starting LST request"
    );

    let collection = SceneCollection::from_dir(&request.collection)?
        .require_window(request.start, request.end)?;
    let first = collection
        .first()
        .ok_or_else(|| LstError::Config("collection has no scene".to_string()))?;
    let geo = GeoInfo::open(&first.path)?;

    let lst_raw = composite(
        processor,
        &collection,
        LST_BAND_NAME,
        request.bands.lst,
        Some(MODIS_FILL),
    )?;
    let lst = processor.apply_f32(&LinearScale::lst_celsius(0), &[lst_raw.into()])?;

    let boundary = Boundary::open(&request.boundary)?;
    let zones = rasterize_zones(&boundary, &geo)?;

    let mut ndvi_range = None;
    let mut products = vec![Product::new(LST_C, lst)];

    match &request.variant {
        Variant::Narrowband => {
            let e31_raw = composite(
                processor,
                &collection,
                EMIS_31_BAND_NAME,
                request.bands.emis_31,
                Some(MODIS_FILL),
            )?;
            let e32_raw = composite(
                processor,
                &collection,
                EMIS_32_BAND_NAME,
                request.bands.emis_32,
                Some(MODIS_FILL),
            )?;

            let emis_31 = processor.apply_f32(&LinearScale::emis_31(0), &[e31_raw.into()])?;
            let emis_32 = processor.apply_f32(&LinearScale::emis_32(0), &[e32_raw.into()])?;
            let bbe_calc = BroadbandEmissivity::new(0, 1, None);
            let bbe = processor.apply_f32(
                &bbe_calc,
                &[emis_31.clone().into(), emis_32.clone().into()],
            )?;

            products.push(Product::new(EMIS_31, emis_31));
            products.push(Product::new(EMIS_32, emis_32));
            products.push(Product::new(BBE, bbe));
        }
        Variant::VegetationFraction(params) => {
            let (ndvi, fvc, bbe_fvc, range) =
                vegetation_products(processor, request, params, &geo, &zones)?;
            ndvi_range = Some(range);
            products.push(Product::new(NDVI, ndvi));
            products.push(Product::new(FVC, fvc));
            products.push(Product::new(BBE_FVC, bbe_fvc));
        }
    }

    for product in &mut products {
        zones.mask(&mut product.data)?;
    }

    let bands: Vec<&'static str> = products.iter().map(|p| p.name).collect();
    let planes: Vec<&Buffer<f32>> = products.iter().map(|p| &p.data).collect();
    let stats = zonal_means(&planes, &zones)?;
    for (feature, row) in boundary.features().iter().zip(&stats) {
        info!(
            feature = feature.index,
            pixels = row.pixel_count,
            "means: {}",
            bands
                .iter()
                .zip(&row.means)
                .map(|(band, mean)| match mean {
                    Some(m) => format!("{band}={m:.4}"),
                    None => format!("{band}=n/a"),
                })
                .join(" ")
        );
    }

    // Exports
    let csv_path = export_path(&request.output_dir, &request.folder, &request.description)?;
    write_zonal_csv(&csv_path, &boundary, &bands, &stats)?;

    let raster_path = csv_path.with_extension("tif");
    write_products(&raster_path, &geo, &products, &request.write)?;

    let overlay = render_overlay(&products[0].data, &zones, &request.ramp)?;
    let overlay_path = csv_path.with_extension("png");
    write_overlay(&overlay, &geo, &overlay_path)?;

    let legend_path = request
        .output_dir
        .join(&request.folder)
        .join(format!("{}_legend.json", request.description));
    Legend::surface_temperature().write_json(&legend_path)?;

    Ok(Report {
        scenes: collection.len(),
        bands,
        stats,
        csv_path,
        raster_path,
        overlay_path,
        legend_path,
        ndvi_range,
    })
}

/// Temporal mean of one named band over a collection.
fn composite(
    processor: &ParallelProcessor,
    collection: &SceneCollection,
    name: &str,
    fallback: usize,
    fill: Option<f32>,
) -> Result<Buffer<f32>> {
    let sources = collection
        .scenes()
        .iter()
        .map(|scene| -> Result<BandSource> {
            let dataset = processor.cache().get_dataset(&scene.path)?;
            let dataset = dataset.lock();
            let band = resolve_band(&dataset, &scene.path, name, fallback)?;
            Ok(BandSource::new(scene.path.clone(), band))
        })
        .collect::<Result<Vec<_>>>()?;

    processor.composite_mean(&sources, fill)
}

fn vegetation_products(
    processor: &ParallelProcessor,
    request: &Request,
    params: &VegetationParams,
    geo: &GeoInfo,
    zones: &ZoneRaster,
) -> Result<(Buffer<f32>, Buffer<f32>, Buffer<f32>, (f32, f32))> {
    let collection = SceneCollection::from_dir(&params.ndvi_collection)?
        .require_window(request.start, request.end)?;
    // The composite keeps every NDVI scene on the grid of the first one
    if let Some(first) = collection.first() {
        let dataset = processor.cache().get_dataset(&first.path)?;
        let ndvi_grid = GeoInfo::from_dataset(&dataset.lock())?;
        geo.ensure_same_grid(
            &ndvi_grid,
            &format!("NDVI collection {}", params.ndvi_collection.display()),
        )?;
    }

    let mut ndvi = match params.ndvi_source {
        NdviSource::Band { band, scale } => {
            let raw = composite(processor, &collection, NDVI, band, None)?;
            processor.apply_f32(&LinearScale::ndvi(0, scale), &[raw.into()])?
        }
        NdviSource::RedNir { red, nir } => {
            let red = composite(processor, &collection, "Red", red, None)?;
            let nir = composite(processor, &collection, "NIR", nir, None)?;
            let ndi = NDI::new(0, 1, Some(NDVI.to_string()));
            processor.apply_f32(&ndi, &[TypedBuffer::F32(nir), TypedBuffer::F32(red)])?
        }
    };

    zones.mask(&mut ndvi)?;

    let samples = values_in_zones(&ndvi, zones);
    let (Some(low), Some(high)) = (
        percentile(&samples, params.low_percentile),
        percentile(&samples, params.high_percentile),
    ) else {
        return Err(LstError::EmptyRegion(format!(
            "{} (no valid NDVI)",
            request.boundary.display()
        )));
    };
    let (ndvi_min, ndvi_max) = (low as f32, high as f32);
    if ndvi_max <= ndvi_min {
        warn!(ndvi_min, ndvi_max, "degenerate NDVI range, FVC becomes binary");
    }
    info!(
        ndvi_min,
        ndvi_max,
        samples = samples.len(),
        "NDVI percentiles for vegetation cover"
    );

    let fvc_calc = FractionalVegetation::new(0, ndvi_min, ndvi_max, None);
    let fvc = processor.apply_f32(&fvc_calc, &[ndvi.clone().into()])?;

    let bbe_calc = VegetationEmissivity::new(
        0,
        params.vegetation_emissivity,
        params.soil_emissivity,
        None,
    );
    let bbe = processor.apply_f32(&bbe_calc, &[fvc.clone().into()])?;

    Ok((ndvi, fvc, bbe, (ndvi_min, ndvi_max)))
}
