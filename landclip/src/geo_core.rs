use geo::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate reference system, identified by its EPSG code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Crs(i32);

impl Crs {
    /// WGS84, the implicit CRS of RFC 7946 GeoJSON
    pub const WGS84: Crs = Crs(4326);
    /// RGF93 / Lambert-93
    pub const LAMBERT_93: Crs = Crs(2154);

    pub fn from_epsg(epsg: i32) -> Self {
        Crs(epsg)
    }

    pub fn epsg(&self) -> i32 {
        self.0
    }

    /// Parse "EPSG:2154", "epsg:2154", "urn:ogc:def:crs:EPSG::2154" or a bare code
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        let code = match name.rsplit_once(':') {
            Some((authority, code)) => {
                if !authority.to_ascii_uppercase().contains("EPSG") {
                    return None;
                }
                code
            }
            None => name,
        };
        code.trim().parse::<i32>().ok().map(Crs)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

/// Bounding box structure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Whether the two boxes share some interior area
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

/// Affine georeferencing of a north-up grid.
///
/// `origin_x`/`origin_y` locate the outer corner of cell (0, 0). `cell_height`
/// is negative for the usual north-up layout where rows grow southwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub cell_width: f64,
    pub cell_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, cell_width: f64, cell_height: f64) -> Self {
        GeoTransform {
            origin_x,
            origin_y,
            cell_width,
            cell_height,
        }
    }

    /// Build from a GDAL geotransform, `None` if it carries a rotation
    pub fn from_gdal(gt: [f64; 6]) -> Option<Self> {
        if gt[2] != 0.0 || gt[4] != 0.0 {
            return None;
        }
        Some(GeoTransform::new(gt[0], gt[3], gt[1], gt[5]))
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.cell_width,
            0.0,
            self.origin_y,
            0.0,
            self.cell_height,
        ]
    }

    /// Area covered by one cell, in CRS units squared
    pub fn cell_area(&self) -> f64 {
        (self.cell_width * self.cell_height).abs()
    }

    /// World coordinates of the center of cell (`col`, `row`)
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.cell_width,
            self.origin_y + (row as f64 + 0.5) * self.cell_height,
        )
    }

    /// Fractional column/row of a world coordinate
    pub fn to_grid(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.cell_width,
            (y - self.origin_y) / self.cell_height,
        )
    }

    /// Same cell size, origin moved to the corner of cell (`col`, `row`)
    pub fn shifted(&self, col: usize, row: usize) -> Self {
        GeoTransform::new(
            self.origin_x + col as f64 * self.cell_width,
            self.origin_y + row as f64 * self.cell_height,
            self.cell_width,
            self.cell_height,
        )
    }

    /// Extent of a `width` x `height` grid laid out with this transform
    pub fn extent(&self, width: usize, height: usize) -> BoundingBox {
        let x0 = self.origin_x;
        let x1 = self.origin_x + width as f64 * self.cell_width;
        let y0 = self.origin_y;
        let y1 = self.origin_y + height as f64 * self.cell_height;
        BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

/// PROJ pipeline converting coordinates from `from` to `to`
#[cfg(feature = "proj")]
pub fn proj_between(from: Crs, to: Crs) -> anyhow::Result<proj::Proj> {
    use anyhow::Context;

    proj::Proj::new_known_crs(&from.to_string(), &to.to_string(), None)
        .with_context(|| format!("Failed to create Proj transformation {} -> {}", from, to))
}
