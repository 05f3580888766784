// src/lib.rs
pub mod batch;
pub mod cli;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod processing;
pub mod render;
pub mod utils;

pub use error::{LstError, Result};

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
