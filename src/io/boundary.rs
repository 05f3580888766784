// src/io/boundary.rs
use std::path::Path;

use gdal::spatial_ref::SpatialRef;
use gdal::vector::{Geometry, LayerAccess};
use gdal::Dataset;
use tracing::{info, warn};

use crate::error::{LstError, Result};

/// One polygon of the boundary layer with its attributes.
#[derive(Clone)]
pub struct BoundaryFeature {
    /// Position in the layer, counting only features with a geometry.
    pub index: usize,
    /// Attribute values in layer field order; unset fields are empty.
    pub attributes: Vec<String>,
    pub geometry: Geometry,
}

/// Administrative boundary read from any OGR vector source (Shapefile,
/// GeoPackage, GeoJSON, ...). Only the first layer is used.
pub struct Boundary {
    name: String,
    field_names: Vec<String>,
    features: Vec<BoundaryFeature>,
    spatial_ref: Option<SpatialRef>,
}

impl Boundary {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let dataset = Dataset::open(path)?;
        let mut layer = dataset.layer(0)?;
        let spatial_ref = layer.spatial_ref();

        let mut field_names: Vec<String> = Vec::new();
        let mut features = Vec::new();

        for feature in layer.features() {
            let Some(geometry) = feature.geometry() else {
                warn!(fid = ?feature.fid(), "skipping boundary feature without geometry");
                continue;
            };

            let fields: Vec<(String, Option<String>)> = feature
                .fields()
                .map(|(name, value)| (name, value.and_then(|v| v.into_string())))
                .collect();
            if field_names.is_empty() {
                field_names = fields.iter().map(|(name, _)| name.clone()).collect();
            }

            features.push(BoundaryFeature {
                index: features.len(),
                attributes: fields
                    .into_iter()
                    .map(|(_, value)| value.unwrap_or_default())
                    .collect(),
                geometry: geometry.clone(),
            });
        }

        if features.is_empty() {
            return Err(LstError::EmptyRegion(path.display().to_string()));
        }

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        info!(
            boundary = %name,
            features = features.len(),
            fields = field_names.len(),
            "loaded boundary"
        );

        Ok(Self {
            name,
            field_names,
            features,
            spatial_ref,
        })
    }

    /// Layer name used in logs and errors (the file stem).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn features(&self) -> &[BoundaryFeature] {
        &self.features
    }

    pub fn spatial_ref(&self) -> Option<&SpatialRef> {
        self.spatial_ref.as_ref()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
