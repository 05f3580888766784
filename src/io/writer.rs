// src/io/writer.rs
use std::path::Path;

use gdal::raster::{Buffer, RasterCreationOptions};
use gdal::{DriverManager, DriverType, Metadata};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{LstError, Result};
use crate::io::reader::GeoInfo;
use crate::processing::{Product, NODATA};
use crate::utils::fixed_point::{to_fixed_point, NODATA_INT};

/// Raster output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Store int16 with SCALE metadata instead of float32.
    pub fixed_point: bool,
    pub compress: String,
    pub compress_level: u8,
    pub tiled: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            fixed_point: false,
            compress: "DEFLATE".to_string(),
            compress_level: 6,
            tiled: true,
        }
    }
}

impl WriteOptions {
    pub fn creation_options(&self) -> Vec<String> {
        let mut options = Vec::new();
        let compress = self.compress.to_uppercase();

        // Add compression if not NONE
        if compress != "NONE" {
            options.push(format!("COMPRESS={compress}"));

            // Add compression level for supported algorithms
            match compress.as_str() {
                "DEFLATE" => options.push(format!("ZLEVEL={}", self.compress_level.min(9))),
                "ZSTD" => options.push(format!("ZSTD_LEVEL={}", self.compress_level.min(22))),
                _ => {}
            }
        }

        if self.tiled {
            options.push("TILED=YES".to_string());
        }

        options.push("NUM_THREADS=ALL_CPUS".to_string());
        options
    }
}

/// Write the products as one multi-band raster, one band per product in
/// order, with the product name as band description.
pub fn write_products(
    output_path: &Path,
    geo: &GeoInfo,
    products: &[Product],
    options: &WriteOptions,
) -> Result<()> {
    if products.is_empty() {
        return Err(LstError::Config("no product bands to write".to_string()));
    }
    for product in products {
        if product.data.shape() != geo.size() {
            return Err(LstError::GridMismatch {
                context: format!("output band {}", product.name),
                expected: geo.size(),
                found: product.data.shape(),
            });
        }
    }

    let driver = DriverManager::get_output_driver_for_dataset_name(output_path, DriverType::Raster)
        .ok_or_else(|| {
            LstError::Config(format!("unknown output format for {}", output_path.display()))
        })?;

    let creation_options = RasterCreationOptions::from_iter(options.creation_options());

    let mut output = if options.fixed_point {
        driver.create_with_band_type_with_options::<i16, _>(
            output_path,
            geo.width,
            geo.height,
            products.len(),
            &creation_options,
        )?
    } else {
        driver.create_with_band_type_with_options::<f32, _>(
            output_path,
            geo.width,
            geo.height,
            products.len(),
            &creation_options,
        )?
    };

    if !geo.projection.is_empty() {
        output.set_projection(&geo.projection)?;
    }
    output.set_geo_transform(&geo.geo_transform)?;

    for (i, product) in products.iter().enumerate() {
        let mut band = output.rasterband(i + 1)?;
        let shape = product.data.shape();
        band.set_description(product.name)?;

        if options.fixed_point {
            band.set_no_data_value(Some(NODATA_INT as f64))?;
            band.set_metadata_item("SCALE", &format!("{}", 1.0 / product.fixed_point_scale as f64), "")?;
            band.set_metadata_item("OFFSET", "0", "")?;

            let fixed = to_fixed_point(product.data.data(), product.fixed_point_scale, NODATA_INT);
            let mut buffer = Buffer::new(shape, fixed);
            band.write((0, 0), shape, &mut buffer)?;
        } else {
            band.set_no_data_value(Some(NODATA as f64))?;

            let mut buffer = Buffer::new(shape, product.data.data().to_vec());
            band.write((0, 0), shape, &mut buffer)?;
        }
    }

    output.flush_cache()?;
    info!(
        path = %output_path.display(),
        bands = %products.iter().map(|p| p.name).join(","),
        "wrote product raster"
    );
    Ok(())
}
