use crate::geo_core::Crs;

/// CRS assumed for GeoJSON input that declares none (RFC 7946)
pub const DEFAULT_GEOJSON_CRS: Crs = Crs::WGS84;

/// Sentinel written into masked cells when the source raster has no no-data value
pub const DEFAULT_NODATA: i32 = i32::MIN;

/// Field separator of code lookup files
pub const DEFAULT_LOOKUP_DELIMITER: u8 = b',';

/// Text encoding of code lookup files
pub const DEFAULT_LOOKUP_ENCODING: &str = "UTF-8";
