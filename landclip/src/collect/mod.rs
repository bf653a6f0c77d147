//! Loaders feeding the clipping stages from files.

use anyhow::Result;
use std::path::Path;

use crate::geometric::{CodeLookup, FeatureCollection, RasterGrid};

pub mod global_variables;
pub mod lookup;
pub mod raster;
pub mod vector;

pub use lookup::CsvLookupSource;
pub use raster::JsonRasterProvider;
pub use vector::GeoJsonProvider;

#[cfg(feature = "gdal")]
pub use raster::GdalRasterProvider;
#[cfg(feature = "gdal")]
pub use vector::GdalVectorProvider;

/// Supplies polygon features and their CRS
pub trait VectorProvider {
    fn load_features(&self, path: &Path) -> Result<FeatureCollection>;
}

/// Supplies a georeferenced categorical raster
pub trait RasterProvider {
    fn load_raster(&self, path: &Path) -> Result<RasterGrid>;
}

/// Supplies the code -> label table
pub trait LookupSource {
    fn load_lookup(&self, path: &Path) -> Result<CodeLookup>;
}
