// src/io/mod.rs
pub mod boundary;
pub mod collection;
pub mod reader;
pub mod table;
pub mod writer;

pub use boundary::Boundary;
pub use collection::SceneCollection;
pub use reader::GeoInfo;
pub use writer::{write_products, WriteOptions};
