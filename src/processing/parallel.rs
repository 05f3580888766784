// src/processing/parallel.rs
use std::{
    collections::HashMap,
    mem,
    ops::DerefMut,
    panic,
    path::PathBuf,
    sync::Arc,
    thread::{self, JoinHandle},
};

use flume::{Receiver, Sender};
use gdal::raster::Buffer;
use itertools::Itertools;
use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{LstError, Result};
use crate::io::reader::GeoInfo;
use crate::processing::NODATA;
use crate::utils::cache::RasterCache;
use crate::utils::gdal_ext::TypedBuffer;

/// One band of one raster file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandSource {
    pub path: PathBuf,
    /// 1-based GDAL band index.
    pub band: usize,
}

impl BandSource {
    pub fn new(path: impl Into<PathBuf>, band: usize) -> Self {
        Self {
            path: path.into(),
            band,
        }
    }
}

type BlockReadHandler = Box<dyn Fn(usize, usize, Result<HashMap<usize, Buffer<f32>>>) + Send + Sync>;

struct BlockReadRequest {
    source_idx: usize,
    x: usize,
    y: usize,
    state: BlockReadState,
    handler: Arc<BlockReadHandler>,
}

#[derive(Clone)]
struct BlockReadState {
    slots: Arc<Mutex<BlockSlots>>,
    num_sources: usize,
}

#[derive(Default)]
struct BlockSlots {
    blocks: HashMap<usize, Buffer<f32>>,
    received: usize,
    error: Option<LstError>,
}

pub struct ParallelProcessor {
    io_threads: usize,
    cache: Arc<RasterCache>,
}

impl ParallelProcessor {
    pub fn new(io_threads: Option<usize>) -> Self {
        Self::with_cache(io_threads, Arc::new(RasterCache::new()))
    }

    pub fn with_cache(io_threads: Option<usize>, cache: Arc<RasterCache>) -> Self {
        let io_threads = io_threads.unwrap_or_else(|| num_cpus::get().max(4)).max(1);

        Self { io_threads, cache }
    }

    pub fn io_threads(&self) -> usize {
        self.io_threads
    }

    pub fn cache(&self) -> &RasterCache {
        &self.cache
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Run a calculator over in-memory planes.
    pub fn apply<I: IndexCalculator + ?Sized>(
        &self,
        calculator: &I,
        inputs: &[TypedBuffer],
    ) -> Result<TypedBuffer> {
        if inputs.len() < calculator.required_bands() {
            return Err(LstError::NotEnoughBands {
                calculator: calculator.name().to_string(),
                required: calculator.required_bands(),
                provided: inputs.len(),
            });
        }

        if let Some(first) = inputs.first() {
            if let Some(other) = inputs.iter().find(|input| input.shape() != first.shape()) {
                return Err(LstError::GridMismatch {
                    context: format!("{} inputs", calculator.name()),
                    expected: first.shape(),
                    found: other.shape(),
                });
            }
        }

        debug!(
            calculator = calculator.name(),
            inputs = inputs.len(),
            "applying calculator"
        );
        calculator.calculate(inputs)
    }

    /// Same as [`apply`](Self::apply) for calculators producing float planes.
    pub fn apply_f32<I: IndexCalculator + ?Sized>(
        &self,
        calculator: &I,
        inputs: &[TypedBuffer],
    ) -> Result<Buffer<f32>> {
        self.apply(calculator, inputs)?
            .into_f32()
            .ok_or_else(|| LstError::UnsupportedBuffer(calculator.name().to_string()))
    }

    /// Per-pixel mean of `sources`, the temporal composite of a collection.
    ///
    /// Values equal to a band's NoData or to `fill` do not count. Pixels with
    /// no valid observation come out as [`NODATA`]. Every source must share
    /// the grid of the first one.
    pub fn composite_mean(&self, sources: &[BandSource], fill: Option<f32>) -> Result<Buffer<f32>> {
        let first = sources
            .first()
            .ok_or_else(|| LstError::Config("composite needs at least one source".to_string()))?;

        let (grid, block_size) = {
            let dataset = self.cache.get_dataset(&first.path)?;
            let dataset = dataset.lock();
            let band = dataset.rasterband(first.band)?;
            (GeoInfo::from_dataset(&dataset)?, band.block_size())
        };
        let raster_size = grid.size();

        for source in &sources[1..] {
            let dataset = self.cache.get_dataset(&source.path)?;
            let dataset = dataset.lock();
            dataset.rasterband(source.band)?;
            let other = GeoInfo::from_dataset(&dataset)?;
            grid.ensure_same_grid(&other, &source.path.display().to_string())?;
        }

        info!(
            sources = sources.len(),
            width = raster_size.0,
            height = raster_size.1,
            io_threads = self.io_threads(),
            "building temporal mean composite"
        );
        debug!(
            "composite inputs: {}",
            sources
                .iter()
                .map(|s| format!("{}#{}", s.path.display(), s.band))
                .join(", ")
        );

        let block_reader = ParallelBlockReader::new(
            Arc::new(sources.to_vec()),
            Arc::clone(&self.cache),
            self.io_threads,
            fill,
            raster_size,
            block_size,
        );

        let (tx, rx) = flume::unbounded();
        let handler: Arc<BlockReadHandler> = Arc::new(Box::new(move |x, y, blocks| {
            // The receiver outlives every request.
            let _ = tx.send((x, y, blocks));
        }));

        // Request processing of each block
        for y in 0..block_reader.blocks.1 {
            for x in 0..block_reader.blocks.0 {
                block_reader.run(x, y, Arc::clone(&handler))?;
            }
        }
        drop(handler);

        let (width, height) = raster_size;
        let mut output = vec![NODATA; width * height];
        let mut failure = None;

        // Assemble blocks as they become available
        for (x, y, blocks) in rx {
            let blocks = match blocks {
                Ok(blocks) => blocks,
                Err(e) => {
                    failure.get_or_insert(e);
                    continue;
                }
            };

            let Some((block_width, block_height)) = blocks.get(&0).map(Buffer::shape) else {
                continue;
            };
            let mean = mean_of_blocks(&blocks, sources.len());

            let start_x = x * block_reader.region_size.0;
            let start_y = y * block_reader.region_size.1;
            for row in 0..block_height {
                let dst = (start_y + row) * width + start_x;
                output[dst..dst + block_width]
                    .copy_from_slice(&mean[row * block_width..(row + 1) * block_width]);
            }
        }

        block_reader.join();

        match failure {
            Some(e) => Err(e),
            None => Ok(Buffer::new((width, height), output)),
        }
    }
}

fn mean_of_blocks(blocks: &HashMap<usize, Buffer<f32>>, num_sources: usize) -> Vec<f32> {
    let planes: Vec<&[f32]> = (0..num_sources)
        .filter_map(|i| blocks.get(&i).map(Buffer::data))
        .collect();
    let len = planes.first().map_or(0, |p| p.len());

    let mut mean = vec![NODATA; len];
    mean.par_iter_mut().enumerate().for_each(|(i, result)| {
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for plane in &planes {
            let value = plane[i];
            if !value.is_nan() {
                sum += f64::from(value);
                count += 1;
            }
        }
        if count > 0 {
            *result = (sum / count as f64) as f32;
        }
    });
    mean
}

fn is_missing(value: f32, nodata: Option<f64>, fill: Option<f32>) -> bool {
    value.is_nan()
        || nodata.is_some_and(|nd| f64::from(value) == nd)
        || fill.is_some_and(|f| value == f)
}

struct ParallelBlockReader {
    region_size: (usize, usize),
    blocks: (usize, usize),
    num_sources: usize,
    workers: Vec<JoinHandle<()>>,
    req_tx: Sender<BlockReadRequest>,
}

impl ParallelBlockReader {
    fn new(
        sources: Arc<Vec<BandSource>>,
        cache: Arc<RasterCache>,
        threads: usize,
        fill: Option<f32>,
        raster_size: (usize, usize),
        block_size: (usize, usize),
    ) -> Self {
        // Use the native block size, never larger than the image itself
        let region_size = if block_size.0 > 0 && block_size.1 > 0 {
            (
                block_size.0.min(raster_size.0),
                block_size.1.min(raster_size.1),
            )
        } else {
            (256.min(raster_size.0), 256.min(raster_size.1))
        };

        // Number of blocks needed to cover the entire raster
        let blocks = (
            raster_size.0.div_ceil(region_size.0.max(1)),
            raster_size.1.div_ceil(region_size.1.max(1)),
        );

        let (req_tx, req_rx) = flume::unbounded();

        let mut workers = Vec::with_capacity(threads);
        for _ in 0..threads {
            let req_rx: Receiver<BlockReadRequest> = req_rx.clone();
            let cache = Arc::clone(&cache);
            let sources = Arc::clone(&sources);

            workers.push(thread::spawn(move || {
                for request in req_rx {
                    let BlockReadRequest {
                        source_idx,
                        x,
                        y,
                        state,
                        handler,
                    } = request;

                    let block = read_block(
                        &cache,
                        &sources[source_idx],
                        fill,
                        region_size,
                        raster_size,
                        (x, y),
                    );

                    let complete = {
                        let mut slots = state.slots.lock();
                        slots.received += 1;
                        match block {
                            Ok(buffer) => {
                                slots.blocks.insert(source_idx, buffer);
                            }
                            Err(e) => {
                                slots.error.get_or_insert(e);
                            }
                        }
                        if slots.received == state.num_sources {
                            Some(mem::take(slots.deref_mut()))
                        } else {
                            None
                        }
                    };

                    if let Some(slots) = complete {
                        let result = match slots.error {
                            Some(e) => Err(e),
                            None => Ok(slots.blocks),
                        };
                        (handler)(x, y, result);
                    }
                }
            }));
        }

        Self {
            region_size,
            blocks,
            num_sources: sources.len(),
            workers,
            req_tx,
        }
    }

    fn run(&self, block_x: usize, block_y: usize, handler: Arc<BlockReadHandler>) -> Result<()> {
        let state = BlockReadState {
            slots: Arc::new(Mutex::new(BlockSlots::default())),
            num_sources: self.num_sources,
        };

        for source_idx in 0..self.num_sources {
            let request = BlockReadRequest {
                source_idx,
                x: block_x,
                y: block_y,
                state: state.clone(),
                handler: Arc::clone(&handler),
            };
            self.req_tx
                .send(request)
                .map_err(|_| LstError::Worker("all block reader workers exited".to_string()))?;
        }
        Ok(())
    }

    fn join(self) {
        drop(self.req_tx);

        let mut errors = Vec::new();
        for worker in self.workers {
            if let Err(e) = worker.join() {
                errors.push(e);
            }
        }

        if !errors.is_empty() {
            panic::resume_unwind(Box::new(errors));
        }
    }
}

/// Read block (x, y) of one source, with missing values turned into NaN.
fn read_block(
    cache: &RasterCache,
    source: &BandSource,
    fill: Option<f32>,
    region_size: (usize, usize),
    raster_size: (usize, usize),
    (x, y): (usize, usize),
) -> Result<Buffer<f32>> {
    let window = (x * region_size.0, y * region_size.1);
    let window_size = (
        region_size.0.min(raster_size.0 - window.0),
        region_size.1.min(raster_size.1 - window.1),
    );

    let dataset = cache.get_dataset(&source.path)?;
    let dataset = dataset.lock();
    let band = dataset.rasterband(source.band)?;
    let nodata = band.no_data_value();

    let mut buffer = band.read_as::<f32>(
        (window.0 as isize, window.1 as isize),
        window_size,
        window_size,
        None,
    )?;
    for value in buffer.data_mut() {
        if is_missing(*value, nodata, fill) {
            *value = f32::NAN;
        }
    }
    Ok(buffer)
}

/// Trait for per-pixel band calculators
pub trait IndexCalculator: Send + Sync {
    /// Calculate the output plane from the provided input bands
    fn calculate(&self, inputs: &[TypedBuffer]) -> Result<TypedBuffer>;

    /// Return the number of required input bands
    fn required_bands(&self) -> usize;

    /// Return the name of the output band
    fn name(&self) -> &str;
}
