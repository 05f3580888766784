//! Palette ramps for the temperature overlay.

use serde::{Deserialize, Serialize};

use crate::processing::is_valid;

/// RGB color with 0..=255 channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const BLUE: Self = Self::new(0, 0, 255);
    pub const GREEN: Self = Self::new(0, 128, 0);
    pub const YELLOW: Self = Self::new(255, 255, 0);
    pub const RED: Self = Self::new(255, 0, 0);

    /// CSS color names used by the palettes.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "black" => Some(Self::BLACK),
            "blue" => Some(Self::BLUE),
            "green" => Some(Self::GREEN),
            "yellow" => Some(Self::YELLOW),
            "red" => Some(Self::RED),
            _ => None,
        }
    }

    /// `#rrggbb`
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Palette names of the surface temperature overlay, cold to hot.
pub const TEMPERATURE_PALETTE: [&str; 4] = ["blue", "green", "yellow", "red"];

/// Evenly spaced color stops stretched over `[min, max]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRamp {
    pub stops: Vec<Rgb>,
    pub min: f64,
    pub max: f64,
    /// 0.0 (transparent) ..= 1.0 (opaque)
    pub opacity: f64,
}

impl ColorRamp {
    pub fn new(stops: Vec<Rgb>, min: f64, max: f64, opacity: f64) -> Self {
        Self {
            stops,
            min,
            max,
            opacity: opacity.clamp(0.0, 1.0),
        }
    }

    /// Blue-green-yellow-red over 10..40 °C at 80% opacity.
    pub fn surface_temperature() -> Self {
        Self::with_range(10.0, 40.0, 0.8)
    }

    pub fn with_range(min: f64, max: f64, opacity: f64) -> Self {
        let stops = TEMPERATURE_PALETTE
            .iter()
            .filter_map(|name| Rgb::from_name(name))
            .collect();
        Self::new(stops, min, max, opacity)
    }

    pub fn alpha(&self) -> u8 {
        (self.opacity * 255.0).round() as u8
    }

    /// Color of `value`, clamped to the ramp ends.
    pub fn color_at(&self, value: f64) -> Rgb {
        match self.stops.len() {
            0 => Rgb::BLACK,
            1 => self.stops[0],
            n => {
                let range = self.max - self.min;
                let t = if range.abs() > f64::EPSILON {
                    ((value - self.min) / range).clamp(0.0, 1.0)
                } else {
                    0.0
                };

                let position = t * (n - 1) as f64;
                let lower = (position.floor() as usize).min(n - 2);
                let local = position - lower as f64;
                let (a, b) = (self.stops[lower], self.stops[lower + 1]);
                let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * local).round() as u8;
                Rgb::new(lerp(a.r, b.r), lerp(a.g, b.g), lerp(a.b, b.b))
            }
        }
    }

    /// RGBA pixel for a band value; NoData is fully transparent.
    pub fn rgba(&self, value: f32) -> [u8; 4] {
        if !is_valid(value) {
            return [0, 0, 0, 0];
        }
        let Rgb { r, g, b } = self.color_at(f64::from(value));
        [r, g, b, self.alpha()]
    }
}
