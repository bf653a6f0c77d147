use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

use crate::collect::RasterProvider;
use crate::geometric::{Legend, RasterGrid};

/// Reads a raster previously dumped as JSON by [`write_raster_json`]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRasterProvider;

impl RasterProvider for JsonRasterProvider {
    fn load_raster(&self, path: &Path) -> Result<RasterGrid> {
        let file =
            File::open(path).with_context(|| format!("Failed to open raster file: {:?}", path))?;
        let grid: RasterGrid = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse raster file: {:?}", path))?;
        grid.validate()
            .with_context(|| format!("Inconsistent raster in {:?}", path))?;

        info!(
            "Loaded {}x{} raster ({}) from {:?}",
            grid.width(),
            grid.height(),
            grid.crs(),
            path
        );
        Ok(grid)
    }
}

/// Dump a raster as JSON
pub fn write_raster_json(grid: &RasterGrid, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }
    let file =
        File::create(path).with_context(|| format!("Failed to create raster file: {:?}", path))?;
    serde_json::to_writer(BufWriter::new(file), grid)
        .with_context(|| format!("Failed to write raster file: {:?}", path))?;
    Ok(())
}

/// Integer category code for a floating point no-data value
pub fn nodata_code(value: f64) -> Result<i32> {
    if !value.is_finite() || value.fract() != 0.0 {
        anyhow::bail!("no-data value {} is not an integer", value);
    }
    if value < i32::MIN as f64 || value > i32::MAX as f64 {
        anyhow::bail!("no-data value {} does not fit a 32-bit category code", value);
    }
    Ok(value as i32)
}

/// Legend built from a color palette.
///
/// Only codes present in `grid` are kept. Palettes carry no category names,
/// so entries have an empty name and [`CodeLookup::from_legend`] skips them.
///
/// [`CodeLookup::from_legend`]: crate::geometric::CodeLookup::from_legend
pub fn palette_legend(grid: &RasterGrid, palette: &[(i32, [u8; 3])]) -> Legend {
    let used: BTreeSet<i32> = grid
        .cells()
        .iter()
        .copied()
        .filter(|value| !grid.is_nodata(*value))
        .collect();

    let mut legend = Legend::new();
    for (code, [r, g, b]) in palette {
        if used.contains(code) {
            legend.insert(*code, "", format!("#{:02x}{:02x}{:02x}", r, g, b));
        }
    }
    legend
}

/// Reads one band of a GDAL raster (GeoTIFF...) as integer categories
#[cfg(feature = "gdal")]
#[derive(Debug, Clone)]
pub struct GdalRasterProvider {
    /// 1-based band index
    pub band: usize,
}

#[cfg(feature = "gdal")]
impl Default for GdalRasterProvider {
    fn default() -> Self {
        GdalRasterProvider { band: 1 }
    }
}

#[cfg(feature = "gdal")]
impl RasterProvider for GdalRasterProvider {
    fn load_raster(&self, path: &Path) -> Result<RasterGrid> {
        use crate::collect::global_variables::DEFAULT_NODATA;
        use crate::geo_core::{Crs, GeoTransform};
        use gdal::Dataset;

        let dataset =
            Dataset::open(path).with_context(|| format!("Failed to open raster: {:?}", path))?;
        let (width, height) = dataset.raster_size();

        let gt = dataset
            .geo_transform()
            .context("Failed to read geotransform")?;
        let transform =
            GeoTransform::from_gdal(gt).context("Rotated rasters are not supported")?;

        let epsg = dataset
            .spatial_ref()
            .context("Failed to read spatial reference")?
            .auth_code()
            .context("Raster spatial reference has no EPSG code")?;

        let band = dataset
            .rasterband(self.band)
            .with_context(|| format!("Failed to get band {}", self.band))?;
        let nodata = match band.no_data_value() {
            Some(value) => nodata_code(value)
                .with_context(|| format!("Unusable no-data value in {:?}", path))?,
            None => DEFAULT_NODATA,
        };

        let buffer = band
            .read_as::<i32>((0, 0), (width, height), (width, height), None)
            .context("Failed to read raster band")?;
        let (_, cells) = buffer.into_shape_and_vec();

        let mut grid = RasterGrid::new(
            width,
            height,
            cells,
            transform,
            Crs::from_epsg(epsg),
            nodata,
        )?;

        if let Some(table) = band.color_table() {
            let palette: Vec<(i32, [u8; 3])> = (0..table.entry_count())
                .filter_map(|index| {
                    table
                        .entry_as_rgb(index)
                        .map(|rgba| (index as i32, [rgba.r as u8, rgba.g as u8, rgba.b as u8]))
                })
                .collect();
            let legend = palette_legend(&grid, &palette);
            if !legend.is_empty() {
                grid = grid.with_legend(legend);
            }
        }

        info!(
            "Loaded {}x{} raster ({}) from {:?}",
            width,
            height,
            grid.crs(),
            path
        );
        Ok(grid)
    }
}
