use thiserror::Error;

use crate::geo_core::Crs;

/// Failures raised by the clipping and summary stages.
///
/// Every variant is an input-validation failure detected before the
/// offending stage produces anything, so none of them is worth retrying.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClipError {
    #[error("no feature has {attribute} = {value}")]
    EmptySelection { attribute: String, value: String },

    #[error("feature #{index} has no attribute named {attribute:?}")]
    MissingAttribute { attribute: String, index: usize },

    #[error("raster CRS {raster} does not match boundary CRS {boundary}")]
    CrsMismatch { raster: Crs, boundary: Crs },

    #[error("boundary geometry has zero area")]
    EmptyGeometry,

    #[error("category code {0} has no entry in the lookup table")]
    MissingCode(i32),

    #[error("category code {0} appears more than once in the lookup table")]
    DuplicateCode(i32),

    #[error("raster has {cells} cells, expected {width}x{height}")]
    InvalidGrid {
        width: usize,
        height: usize,
        cells: usize,
    },

    #[error("raster cell size {cell_width}x{cell_height} is not a finite, non-zero size")]
    InvalidTransform { cell_width: f64, cell_height: f64 },
}

pub type Result<T> = std::result::Result<T, ClipError>;
