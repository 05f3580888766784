//! Fixed-bucket legend of the temperature overlay.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::render::colormap::{Rgb, TEMPERATURE_PALETTE};

pub const TEMPERATURE_TITLE: &str = "Land Surface Temperature (°C)";
pub const TEMPERATURE_LABELS: [&str; 4] = ["≤ 15 °C", "16 – 25 °C", "26 – 35 °C", "≥ 36 °C"];
/// Upper bound (inclusive) of every bucket but the last.
pub const TEMPERATURE_BREAKS: [f64; 3] = [15.0, 25.0, 35.0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub color: String,
    pub hex: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    pub title: String,
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    pub fn surface_temperature() -> Self {
        let entries = TEMPERATURE_PALETTE
            .iter()
            .zip(TEMPERATURE_LABELS)
            .map(|(color, label)| LegendEntry {
                color: color.to_string(),
                hex: Rgb::from_name(color).unwrap_or(Rgb::BLACK).hex(),
                label: label.to_string(),
            })
            .collect();

        Self {
            title: TEMPERATURE_TITLE.to_string(),
            entries,
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "wrote legend");
        for entry in &self.entries {
            info!("  {} {}", entry.hex, entry.label);
        }
        Ok(())
    }
}

/// Legend row of a Celsius value.
pub fn bucket_for(celsius: f64) -> usize {
    TEMPERATURE_BREAKS
        .iter()
        .position(|&upper| celsius <= upper)
        .unwrap_or(TEMPERATURE_BREAKS.len())
}
