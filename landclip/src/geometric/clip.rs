use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{Coord, MultiPolygon};
use tracing::debug;

use crate::error::{ClipError, Result};
use crate::geo_core::BoundingBox;
use crate::geometric::feature::Boundary;
use crate::geometric::raster::RasterGrid;

/// Column/row window of a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub col_off: usize,
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

/// Clip `raster` to `boundary`.
///
/// The raster is first cropped to the cells overlapping the boundary
/// envelope, then every cell whose center falls outside the geometry is set
/// to the raster's no-data value. Centers lying exactly on an edge count as
/// inside. Both inputs must share a CRS; nothing is reprojected here.
///
/// A boundary that misses the raster entirely gives a 0x0 grid anchored at
/// the envelope's top-left corner.
pub fn clip(raster: &RasterGrid, boundary: &Boundary) -> Result<RasterGrid> {
    if raster.crs() != boundary.crs {
        return Err(ClipError::CrsMismatch {
            raster: raster.crs(),
            boundary: boundary.crs,
        });
    }

    let envelope = match boundary.envelope() {
        Some(envelope) if boundary.area() > 0.0 => envelope,
        _ => return Err(ClipError::EmptyGeometry),
    };

    let window = match crop_window(raster, &envelope) {
        Some(window) => window,
        None => {
            debug!("boundary {:?} does not overlap the raster", envelope);
            let transform = raster.transform();
            let origin_x = if transform.cell_width >= 0.0 {
                envelope.min_x
            } else {
                envelope.max_x
            };
            let origin_y = if transform.cell_height <= 0.0 {
                envelope.max_y
            } else {
                envelope.min_y
            };
            return Ok(raster.empty_like(origin_x, origin_y));
        }
    };
    debug!(
        "cropping {}x{} raster to {}x{} window at ({}, {})",
        raster.width(),
        raster.height(),
        window.width,
        window.height,
        window.col_off,
        window.row_off
    );

    let transform = raster.transform().shifted(window.col_off, window.row_off);
    let nodata = raster.nodata();
    let geometry = &boundary.geometry;

    Ok(raster.derive_window(
        window.col_off,
        window.row_off,
        window.width,
        window.height,
        |col, row, value| {
            if value == nodata {
                return value;
            }
            let (x, y) = transform.cell_center(col, row);
            if covers(geometry, &Coord { x, y }) {
                value
            } else {
                nodata
            }
        },
    ))
}

/// Inside or on the boundary of at least one part.
///
/// Parts are tested one by one: on a `MultiPolygon`, geo counts a point on
/// an edge shared by two parts as outside.
fn covers(geometry: &MultiPolygon<f64>, coord: &Coord<f64>) -> bool {
    geometry
        .iter()
        .any(|part| part.coordinate_position(coord) != CoordPos::Outside)
}

/// Cells of `raster` overlapping `envelope`, `None` when there are none
pub fn crop_window(raster: &RasterGrid, envelope: &BoundingBox) -> Option<Window> {
    if !raster.extent().overlaps(envelope) {
        return None;
    }
    let transform = raster.transform();
    let (c0, r0) = transform.to_grid(envelope.min_x, envelope.max_y);
    let (c1, r1) = transform.to_grid(envelope.max_x, envelope.min_y);

    let (col_min, col_max) = index_range(c0, c1, raster.width());
    let (row_min, row_max) = index_range(r0, r1, raster.height());
    if col_min >= col_max || row_min >= row_max {
        return None;
    }

    Some(Window {
        col_off: col_min,
        row_off: row_min,
        width: col_max - col_min,
        height: row_max - row_min,
    })
}

/// Half-open index range covering the fractional span [a, b], clamped to [0, len]
fn index_range(a: f64, b: f64, len: usize) -> (usize, usize) {
    let lo = a.min(b).floor().max(0.0);
    let hi = a.max(b).ceil().min(len as f64);
    // negative values saturate to 0
    (lo as usize, hi.max(0.0) as usize)
}
