//! CSV export of per-feature zonal means.
//!
//! Column layout: `system:index`, the boundary attributes, one column per
//! product band, `.geo` (feature geometry as GeoJSON).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{LstError, Result};
use crate::io::boundary::Boundary;
use crate::processing::zonal::ZonalStats;

pub const INDEX_COLUMN: &str = "system:index";
pub const GEOMETRY_COLUMN: &str = ".geo";

/// `<output_dir>/<folder>/<description>.csv`, creating the folder.
pub fn export_path(output_dir: &Path, folder: &str, description: &str) -> Result<PathBuf> {
    let dir = output_dir.join(folder);
    fs::create_dir_all(&dir)?;
    Ok(dir.join(format!("{description}.csv")))
}

pub fn header(boundary: &Boundary, bands: &[&str]) -> Vec<String> {
    std::iter::once(INDEX_COLUMN.to_string())
        .chain(boundary.field_names().iter().cloned())
        .chain(bands.iter().map(|band| band.to_string()))
        .chain(std::iter::once(GEOMETRY_COLUMN.to_string()))
        .collect()
}

/// Write one row per feature. `stats` must come from the same boundary,
/// with means in `bands` order.
pub fn write_zonal_csv(
    path: &Path,
    boundary: &Boundary,
    bands: &[&str],
    stats: &[ZonalStats],
) -> Result<()> {
    if stats.len() != boundary.len() {
        return Err(LstError::Config(format!(
            "{} zonal rows for {} boundary features",
            stats.len(),
            boundary.len()
        )));
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(header(boundary, bands))?;

    for (feature, row) in boundary.features().iter().zip(stats) {
        if row.means.len() != bands.len() {
            return Err(LstError::Config(format!(
                "feature {} has {} means for {} bands",
                feature.index,
                row.means.len(),
                bands.len()
            )));
        }

        let mut record = Vec::with_capacity(bands.len() + feature.attributes.len() + 2);
        record.push(format!("{:020}", feature.index));
        record.extend(feature.attributes.iter().cloned());
        // Empty cell where the feature has no valid pixel
        record.extend(
            row.means
                .iter()
                .map(|mean| mean.map(|m| m.to_string()).unwrap_or_default()),
        );
        record.push(feature.geometry.json()?);
        writer.write_record(&record)?;
    }

    writer.flush()?;
    info!(path = %path.display(), rows = stats.len(), "exported zonal means");
    Ok(())
}
