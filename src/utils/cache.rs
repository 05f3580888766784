// src/utils/cache.rs
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gdal::Dataset;
use parking_lot::Mutex;

use crate::error::Result;

/// Thread-safe cache for GDAL datasets
///
/// Scenes are opened once and shared between the block reader workers and
/// the band lookups done while assembling a composite.
#[derive(Default)]
pub struct RasterCache {
    datasets: Mutex<HashMap<PathBuf, Arc<Mutex<Dataset>>>>,
}

impl RasterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_dataset<P: AsRef<Path>>(&self, path: P) -> Result<Arc<Mutex<Dataset>>> {
        let path_buf = path.as_ref().to_path_buf();

        let mut cache = self.datasets.lock();

        if let Some(dataset) = cache.get(&path_buf) {
            return Ok(Arc::clone(dataset));
        }

        // Not in cache, open and add it
        let dataset = Arc::new(Mutex::new(Dataset::open(path.as_ref())?));
        cache.insert(path_buf, Arc::clone(&dataset));

        Ok(dataset)
    }

    pub fn clear(&self) {
        self.datasets.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.datasets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.lock().is_empty()
    }
}
