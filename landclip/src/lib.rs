pub mod collect;
pub mod commons;
pub mod error;
pub mod geo_core;
pub mod geometric;
pub mod pipeline;

pub use error::ClipError;
pub use geo_core::{BoundingBox, Crs, GeoTransform};
pub use pipeline::{LandCoverReport, Pipeline, PipelineConfig};
