use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::commons::basic_functions::percentage;
use crate::geometric::raster::RasterGrid;

/// Occurrences of one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyRow {
    pub code: i32,
    pub count: u64,
    /// Share of all valid cells, rounded to one decimal
    pub percentage: f64,
    /// Covered area in CRS units squared
    pub area: f64,
}

/// Per-category cell counts of a raster, ascending by code
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyTable {
    pub rows: Vec<FrequencyRow>,
    /// Number of cells holding a real value
    pub total: u64,
}

impl FrequencyTable {
    /// Build from raw counts. Zero counts are dropped.
    pub fn from_counts(counts: &BTreeMap<i32, u64>, cell_area: f64) -> Self {
        let total: u64 = counts.values().sum();
        let rows = counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(code, count)| FrequencyRow {
                code: *code,
                count: *count,
                percentage: percentage(*count, total),
                area: *count as f64 * cell_area,
            })
            .collect();

        FrequencyTable { rows, total }
    }

    pub fn get(&self, code: i32) -> Option<&FrequencyRow> {
        self.rows.iter().find(|row| row.code == code)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn percentage_sum(&self) -> f64 {
        self.rows.iter().map(|row| row.percentage).sum()
    }

    /// Convert to a polars DataFrame with code, count, percentage and area columns
    #[cfg(feature = "polars")]
    pub fn to_dataframe(&self) -> polars::prelude::PolarsResult<polars::prelude::DataFrame> {
        use polars::prelude::*;

        let codes: Vec<i32> = self.rows.iter().map(|r| r.code).collect();
        let counts: Vec<u64> = self.rows.iter().map(|r| r.count).collect();
        let percentages: Vec<f64> = self.rows.iter().map(|r| r.percentage).collect();
        let areas: Vec<f64> = self.rows.iter().map(|r| r.area).collect();

        df!(
            "code" => codes,
            "count" => counts,
            "percentage" => percentages,
            "area" => areas
        )
    }
}

/// Count every non-no-data value of `raster`
pub fn summarize(raster: &RasterGrid) -> FrequencyTable {
    let mut counts: BTreeMap<i32, u64> = BTreeMap::new();
    for value in raster.cells() {
        if !raster.is_nodata(*value) {
            *counts.entry(*value).or_insert(0) += 1;
        }
    }
    FrequencyTable::from_counts(&counts, raster.transform().cell_area())
}

/// Same as [`summarize`], releasing the cell buffer afterwards
pub fn summarize_owned(raster: RasterGrid) -> FrequencyTable {
    summarize(&raster)
}
