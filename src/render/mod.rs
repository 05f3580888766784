// src/render/mod.rs
pub mod colormap;
pub mod legend;
pub mod overlay;

pub use colormap::{ColorRamp, Rgb};
pub use legend::{Legend, LegendEntry};
pub use overlay::{render_overlay, write_overlay};
