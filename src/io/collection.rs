//! Time-indexed collections of scene files.
//!
//! A scene is one raster of a product time series (for example one MOD11A2
//! 8-day composite converted to GeoTIFF). Its acquisition date comes from
//! the file name.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, info};

use crate::error::{LstError, Result};

/// `.A2025153.` style MODIS token: year and day of year.
static MODIS_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[._])A(\d{4})(\d{3})(?:[._]|$)").expect("valid regex"));
static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("valid regex"));
static COMPACT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(\d{4})(\d{2})(\d{2})(?:\D|$)").expect("valid regex"));

/// Acquisition date of a scene from its file name.
pub fn parse_scene_date(file_name: &str) -> Option<NaiveDate> {
    if let Some(caps) = MODIS_DATE.captures(file_name) {
        let year = caps[1].parse().ok()?;
        let day_of_year = caps[2].parse().ok()?;
        return NaiveDate::from_yo_opt(year, day_of_year);
    }

    [&*ISO_DATE, &*COMPACT_DATE].iter().find_map(|pattern| {
        let caps = pattern.captures(file_name)?;
        NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        )
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    pub path: PathBuf,
    pub date: NaiveDate,
}

impl Scene {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| LstError::InvalidDate(path.display().to_string()))?;
        let date = parse_scene_date(file_name)
            .ok_or_else(|| LstError::InvalidDate(path.display().to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            date,
        })
    }
}

/// Scenes ordered by acquisition date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneCollection {
    location: String,
    scenes: Vec<Scene>,
}

impl SceneCollection {
    /// Every `.tif` / `.tiff` file in `dir`.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_tiff = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff"));
            if path.is_file() && is_tiff {
                paths.push(path);
            }
        }

        let mut collection = Self::from_paths(&paths)?;
        collection.location = dir.display().to_string();
        info!(
            location = %collection.location,
            scenes = collection.len(),
            "loaded scene collection"
        );
        Ok(collection)
    }

    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut scenes = paths
            .iter()
            .map(Scene::from_path)
            .collect::<Result<Vec<_>>>()?;
        scenes.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.path.cmp(&b.path)));

        Ok(Self {
            location: "scene list".to_string(),
            scenes,
        })
    }

    /// Keep scenes with `start <= date < end`.
    pub fn filter_date(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let scenes: Vec<Scene> = self
            .scenes
            .iter()
            .filter(|scene| scene.date >= start && scene.date < end)
            .cloned()
            .collect();
        debug!(
            kept = scenes.len(),
            total = self.scenes.len(),
            %start,
            %end,
            "filtered collection by date"
        );

        Self {
            location: self.location.clone(),
            scenes,
        }
    }

    /// Like [`filter_date`](Self::filter_date), failing when nothing is left.
    pub fn require_window(&self, start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let filtered = self.filter_date(start, end);
        if filtered.is_empty() {
            return Err(LstError::EmptyCollection {
                location: self.location.clone(),
                start,
                end,
            });
        }
        Ok(filtered)
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn first(&self) -> Option<&Scene> {
        self.scenes.first()
    }
}
