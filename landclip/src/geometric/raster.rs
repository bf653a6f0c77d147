use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ClipError, Result};
use crate::geo_core::{BoundingBox, Crs, GeoTransform};

/// Display name and color of one raster category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub name: String,
    /// Hex color, e.g. "#006700"
    pub color: String,
}

/// Category code -> legend entry, carried unchanged through every transform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Legend(BTreeMap<i32, LegendEntry>);

impl Legend {
    pub fn new() -> Self {
        Legend(BTreeMap::new())
    }

    pub fn insert(&mut self, code: i32, name: impl Into<String>, color: impl Into<String>) {
        self.0.insert(
            code,
            LegendEntry {
                name: name.into(),
                color: color.into(),
            },
        );
    }

    pub fn get(&self, code: i32) -> Option<&LegendEntry> {
        self.0.get(&code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &LegendEntry)> {
        self.0.iter().map(|(code, entry)| (*code, entry))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Single-band categorical raster stored row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterGrid {
    width: usize,
    height: usize,
    cells: Vec<i32>,
    transform: GeoTransform,
    crs: Crs,
    nodata: i32,
    legend: Option<Legend>,
}

impl RasterGrid {
    /// Fails with `InvalidGrid` unless `cells.len() == width * height`, and
    /// with `InvalidTransform` when a cell side is zero or not finite
    pub fn new(
        width: usize,
        height: usize,
        cells: Vec<i32>,
        transform: GeoTransform,
        crs: Crs,
        nodata: i32,
    ) -> Result<Self> {
        let grid = RasterGrid {
            width,
            height,
            cells,
            transform,
            crs,
            nodata,
            legend: None,
        };
        grid.validate()?;
        Ok(grid)
    }

    pub fn with_legend(mut self, legend: Legend) -> Self {
        self.legend = Some(legend);
        self
    }

    /// Check the dimension invariant, used after deserializing
    pub fn validate(&self) -> Result<()> {
        match self.width.checked_mul(self.height) {
            Some(n) if n == self.cells.len() => {}
            _ => {
                return Err(ClipError::InvalidGrid {
                    width: self.width,
                    height: self.height,
                    cells: self.cells.len(),
                })
            }
        }

        let GeoTransform {
            origin_x,
            origin_y,
            cell_width,
            cell_height,
        } = self.transform;
        let usable = |side: f64| side.is_finite() && side != 0.0;
        if !usable(cell_width)
            || !usable(cell_height)
            || !origin_x.is_finite()
            || !origin_y.is_finite()
        {
            return Err(ClipError::InvalidTransform {
                cell_width,
                cell_height,
            });
        }
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[i32] {
        &self.cells
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn nodata(&self) -> i32 {
        self.nodata
    }

    pub fn legend(&self) -> Option<&Legend> {
        self.legend.as_ref()
    }

    pub fn extent(&self) -> BoundingBox {
        self.transform.extent(self.width, self.height)
    }

    /// Cell value at (`col`, `row`), `None` outside the grid
    pub fn get(&self, col: usize, row: usize) -> Option<i32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.cells.get(row * self.width + col).copied()
    }

    pub fn is_nodata(&self, value: i32) -> bool {
        value == self.nodata
    }

    /// Number of cells holding a real value
    pub fn valid_cells(&self) -> usize {
        self.cells.iter().filter(|v| !self.is_nodata(**v)).count()
    }

    /// New grid on a window of this one, keeping CRS, no-data and legend.
    /// `f` receives (col, row) in window coordinates plus the source value.
    pub(crate) fn derive_window<F>(
        &self,
        col_off: usize,
        row_off: usize,
        width: usize,
        height: usize,
        mut f: F,
    ) -> RasterGrid
    where
        F: FnMut(usize, usize, i32) -> i32,
    {
        let mut cells = Vec::with_capacity(width * height);
        for row in 0..height {
            let start = (row_off + row) * self.width + col_off;
            for (col, value) in self.cells[start..start + width].iter().enumerate() {
                cells.push(f(col, row, *value));
            }
        }

        RasterGrid {
            width,
            height,
            cells,
            transform: self.transform.shifted(col_off, row_off),
            crs: self.crs,
            nodata: self.nodata,
            legend: self.legend.clone(),
        }
    }

    /// 0x0 grid anchored at (`origin_x`, `origin_y`), keeping metadata
    pub(crate) fn empty_like(&self, origin_x: f64, origin_y: f64) -> RasterGrid {
        RasterGrid {
            width: 0,
            height: 0,
            cells: Vec::new(),
            transform: GeoTransform::new(
                origin_x,
                origin_y,
                self.transform.cell_width,
                self.transform.cell_height,
            ),
            crs: self.crs,
            nodata: self.nodata,
            legend: self.legend.clone(),
        }
    }
}
