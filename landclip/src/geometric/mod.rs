pub mod clip;
pub mod feature;
pub mod raster;
pub mod resolve;
pub mod summary;

pub use clip::clip;
pub use feature::{select_boundary, select_features, Boundary, Feature, FeatureCollection};
pub use raster::{Legend, LegendEntry, RasterGrid};
pub use resolve::{resolve, CodeLookup, LabeledShare, MissingCodePolicy};
pub use summary::{summarize, summarize_owned, FrequencyRow, FrequencyTable};
