use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::error::Result;
use crate::io::writer::WriteOptions;
use crate::pipeline::{
    BandSelection, NdviSource, Request, Variant, VegetationParams, DEFAULT_FOLDER,
};
use crate::processing::formulas::{NDVI_SCALE, SOIL_EMISSIVITY, VEGETATION_EMISSIVITY};
use crate::render::ColorRamp;

#[derive(Parser)]
#[command(name = "lst-calc")]
#[command(about = "MODIS land surface temperature and emissivity over a boundary")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Root directory for exports
    #[arg(short, long, default_value = "output", global = true)]
    pub output_dir: PathBuf,

    /// Store rasters as int16 with SCALE metadata instead of float32
    #[arg(long, global = true)]
    pub fixed_point: bool,

    /// Compression algorithm (NONE, DEFLATE, LZW, ZSTD)
    #[arg(long, default_value = "DEFLATE", global = true)]
    pub compress: String,

    /// Compression level
    #[arg(long, default_value = "6", global = true)]
    pub compress_level: u8,

    /// Write tiled GeoTIFFs
    #[arg(long, default_value_t = true, action = ArgAction::Set, global = true)]
    pub tiled: bool,

    /// Threads reading scene blocks (default: CPU count, at least 4)
    #[arg(long, global = true)]
    pub io_threads: Option<usize>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            fixed_point: self.fixed_point,
            compress: self.compress.clone(),
            compress_level: self.compress_level,
            tiled: self.tiled,
        }
    }

    /// Pipeline request for the `lst` and `fvc` subcommands.
    pub fn request(&self) -> Result<Option<Request>> {
        let (region, variant) = match &self.command {
            Commands::Lst { region } => (region, Variant::Narrowband),
            Commands::Fvc { region, vegetation } => {
                (region, Variant::VegetationFraction(vegetation.params()?))
            }
            Commands::Batch { .. } => return Ok(None),
        };

        let mut request = Request::new(
            &region.collection,
            &region.boundary,
            region.start,
            region.end,
            variant,
            &self.output_dir,
        );
        request.bands = BandSelection {
            lst: region.lst_band,
            emis_31: region.emis31_band,
            emis_32: region.emis32_band,
        };
        request.folder = region.folder.clone();
        if let Some(description) = &region.description {
            request.description = description.clone();
        }
        request.ramp = ColorRamp::with_range(region.vis_min, region.vis_max, region.opacity);
        request.write = self.write_options();
        Ok(Some(request))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// LST with broadband emissivity from MODIS bands 31 and 32
    Lst {
        #[command(flatten)]
        region: RegionArgs,
    },

    /// LST with broadband emissivity from fractional vegetation cover
    Fvc {
        #[command(flatten)]
        region: RegionArgs,

        #[command(flatten)]
        vegetation: VegetationArgs,
    },

    /// Run several requests from a JSON file
    Batch {
        /// Batch configuration
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Args)]
pub struct RegionArgs {
    /// Directory of MOD11A2 scenes (GeoTIFF)
    #[arg(short, long)]
    pub collection: PathBuf,

    /// Boundary polygons (any OGR vector format)
    #[arg(short, long)]
    pub boundary: PathBuf,

    /// First day of the window (YYYY-MM-DD, inclusive)
    #[arg(short, long)]
    pub start: NaiveDate,

    /// End of the window (YYYY-MM-DD, exclusive)
    #[arg(short, long)]
    pub end: NaiveDate,

    /// LST_Day_1km band when scenes carry no band descriptions
    #[arg(long, default_value = "1")]
    pub lst_band: usize,

    /// Emis_31 band when scenes carry no band descriptions
    #[arg(long, default_value = "2")]
    pub emis31_band: usize,

    /// Emis_32 band when scenes carry no band descriptions
    #[arg(long, default_value = "3")]
    pub emis32_band: usize,

    /// Export base name (default depends on the subcommand)
    #[arg(short, long)]
    pub description: Option<String>,

    /// Export folder under the output directory
    #[arg(long, default_value = DEFAULT_FOLDER)]
    pub folder: String,

    /// Temperature at the cold end of the palette (°C)
    #[arg(long, default_value = "10")]
    pub vis_min: f64,

    /// Temperature at the hot end of the palette (°C)
    #[arg(long, default_value = "40")]
    pub vis_max: f64,

    /// Overlay opacity
    #[arg(long, default_value = "0.8")]
    pub opacity: f64,
}

#[derive(Args)]
pub struct VegetationArgs {
    /// Directory of NDVI (or red/NIR reflectance) scenes
    #[arg(long)]
    pub ndvi_collection: PathBuf,

    /// Band holding scaled NDVI
    #[arg(long, default_value = "1")]
    pub ndvi_band: usize,

    /// Scale applied to the NDVI band
    #[arg(long, default_value_t = NDVI_SCALE)]
    pub ndvi_scale: f32,

    /// Red reflectance band; NDVI is computed when given with --nir-band
    #[arg(long, requires = "nir_band")]
    pub red_band: Option<usize>,

    /// NIR reflectance band
    #[arg(long, requires = "red_band")]
    pub nir_band: Option<usize>,

    /// Percentile taken as bare-soil NDVI
    #[arg(long, default_value = "5")]
    pub low_percentile: f64,

    /// Percentile taken as full-vegetation NDVI
    #[arg(long, default_value = "95")]
    pub high_percentile: f64,

    #[arg(long, default_value_t = VEGETATION_EMISSIVITY)]
    pub veg_emissivity: f32,

    #[arg(long, default_value_t = SOIL_EMISSIVITY)]
    pub soil_emissivity: f32,
}

impl VegetationArgs {
    pub fn params(&self) -> Result<VegetationParams> {
        let ndvi_source = match (self.red_band, self.nir_band) {
            (Some(red), Some(nir)) => NdviSource::RedNir { red, nir },
            _ => NdviSource::Band {
                band: self.ndvi_band,
                scale: self.ndvi_scale,
            },
        };

        let params = VegetationParams {
            ndvi_collection: self.ndvi_collection.clone(),
            ndvi_source,
            low_percentile: self.low_percentile,
            high_percentile: self.high_percentile,
            vegetation_emissivity: self.veg_emissivity,
            soil_emissivity: self.soil_emissivity,
        };
        params.validate()?;
        Ok(params)
    }
}
