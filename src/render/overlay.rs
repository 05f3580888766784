//! Georeferenced PNG overlay: colored band plus boundary outline.

use std::fs;
use std::path::Path;

use gdal::raster::Buffer;
use image::{ImageFormat, Rgba, RgbaImage};
use tracing::info;

use crate::error::{LstError, Result};
use crate::io::reader::GeoInfo;
use crate::processing::mask::ZoneRaster;
use crate::render::colormap::{ColorRamp, Rgb};

/// Outline drawn around each boundary feature.
const OUTLINE: Rgb = Rgb::BLACK;

/// Color `band` with `ramp` and draw a one-pixel outline on the edge pixels
/// of every zone. Pixels outside the boundary stay transparent.
pub fn render_overlay(band: &Buffer<f32>, zones: &ZoneRaster, ramp: &ColorRamp) -> Result<RgbaImage> {
    let (width, height) = band.shape();
    if zones.shape() != (width, height) {
        return Err(LstError::GridMismatch {
            context: "overlay".to_string(),
            expected: (width, height),
            found: zones.shape(),
        });
    }

    let data = band.data();
    let mut image = RgbaImage::new(width as u32, height as u32);

    for row in 0..height {
        for col in 0..width {
            let pixel = if is_outline(zones, col, row) {
                Rgba([OUTLINE.r, OUTLINE.g, OUTLINE.b, 255])
            } else {
                Rgba(ramp.rgba(data[row * width + col]))
            };
            image.put_pixel(col as u32, row as u32, pixel);
        }
    }

    Ok(image)
}

/// Inside a zone with a 4-neighbour in another zone, outside, or off-grid.
fn is_outline(zones: &ZoneRaster, col: usize, row: usize) -> bool {
    let Some(feature) = zones.feature_at(col, row) else {
        return false;
    };

    let (width, height) = zones.shape();
    let neighbours = [
        (col.checked_sub(1), Some(row)),
        ((col + 1 < width).then_some(col + 1), Some(row)),
        (Some(col), row.checked_sub(1)),
        (Some(col), (row + 1 < height).then_some(row + 1)),
    ];

    neighbours.iter().any(|neighbour| match *neighbour {
        (Some(c), Some(r)) => zones.feature_at(c, r) != Some(feature),
        _ => true,
    })
}

/// ESRI world file for a north-up or rotated grid; coordinates refer to the
/// center of the upper-left pixel.
pub fn world_file(geo: &GeoInfo) -> String {
    let [x0, pixel_width, row_rotation, y0, col_rotation, pixel_height] = geo.geo_transform;
    let center_x = x0 + pixel_width / 2.0 + row_rotation / 2.0;
    let center_y = y0 + col_rotation / 2.0 + pixel_height / 2.0;
    format!(
        "{pixel_width}\n{col_rotation}\n{row_rotation}\n{pixel_height}\n{center_x}\n{center_y}\n"
    )
}

/// Write `image` as PNG with a `.pgw` world file next to it.
pub fn write_overlay(image: &RgbaImage, geo: &GeoInfo, path: &Path) -> Result<()> {
    image.save_with_format(path, ImageFormat::Png)?;
    fs::write(path.with_extension("pgw"), world_file(geo))?;
    info!(path = %path.display(), "wrote map overlay");
    Ok(())
}
