use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::collect::{CsvLookupSource, LookupSource, RasterProvider, VectorProvider};
use crate::error::Result;
use crate::geo_core::Crs;
use crate::geometric::{
    clip, resolve, select_boundary, summarize_owned, CodeLookup, FeatureCollection,
    FrequencyTable, LabeledShare, MissingCodePolicy, RasterGrid,
};

/// Settings for one clip-and-summarize run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Attribute used to pick the boundary feature(s)
    pub attribute: String,
    /// Value the attribute must equal
    pub value: Value,
    #[serde(default)]
    pub missing_code_policy: MissingCodePolicy,
    /// How the code lookup file is read
    #[serde(default)]
    pub lookup: CsvLookupSource,
}

impl PipelineConfig {
    pub fn new(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        PipelineConfig {
            attribute: attribute.into(),
            value: value.into(),
            missing_code_policy: MissingCodePolicy::default(),
            lookup: CsvLookupSource::default(),
        }
    }

    pub fn with_policy(mut self, policy: MissingCodePolicy) -> Self {
        self.missing_code_policy = policy;
        self
    }

    /// Load a config from a JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Failed to open config file: {:?}", path))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

/// Outcome of a run: what was clipped and how it breaks down
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandCoverReport {
    /// Attributes of the (first) selected boundary feature
    pub boundary: Map<String, Value>,
    pub crs: Crs,
    /// Dimensions of the clipped grid
    pub width: usize,
    pub height: usize,
    pub frequency: FrequencyTable,
    /// Sorted by descending percentage
    pub shares: Vec<LabeledShare>,
}

impl LandCoverReport {
    /// Write `code,label,count,percentage,area` rows in share order
    pub fn write_csv<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(["code", "label", "count", "percentage", "area"])?;
        for share in &self.shares {
            let area = self
                .frequency
                .get(share.code)
                .map(|row| row.area)
                .unwrap_or_default();
            wtr.write_record([
                share.code.to_string(),
                share.label.clone(),
                share.count.to_string(),
                format!("{:.1}", share.percentage),
                area.to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write the report as CSV, or as JSON when the extension is `.json`
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let file =
            File::create(path).with_context(|| format!("Failed to create report: {:?}", path))?;
        let writer = BufWriter::new(file);
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_writer_pretty(writer, self)
                .with_context(|| format!("Failed to write report: {:?}", path))?,
            _ => self
                .write_csv(writer)
                .with_context(|| format!("Failed to write report: {:?}", path))?,
        }
        info!("Report saved to: {:?}", path);
        Ok(())
    }
}

/// Select -> clip -> summarize -> resolve
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Pipeline { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage on in-memory inputs, stopping at the first failure
    pub fn run(
        &self,
        collection: &FeatureCollection,
        raster: &RasterGrid,
        lookup: &CodeLookup,
    ) -> Result<LandCoverReport> {
        let boundary = select_boundary(collection, &self.config.attribute, &self.config.value)?;
        info!(
            "Selected boundary {} = {} ({} part(s), area {:.1})",
            self.config.attribute,
            self.config.value,
            boundary.geometry.0.len(),
            boundary.area()
        );

        let clipped = clip(raster, &boundary)?;
        let (width, height) = (clipped.width(), clipped.height());
        info!(
            "Clipped {}x{} raster to {}x{} ({} valid cells)",
            raster.width(),
            raster.height(),
            width,
            height,
            clipped.valid_cells()
        );

        let frequency = summarize_owned(clipped);
        debug!("{} categories over {} cells", frequency.rows.len(), frequency.total);

        let shares = resolve(&frequency, lookup, self.config.missing_code_policy)?;

        Ok(LandCoverReport {
            boundary: boundary.attributes,
            crs: boundary.crs,
            width,
            height,
            frequency,
            shares,
        })
    }

    /// Load the three inputs with the given providers, then [`Pipeline::run`]
    pub fn run_paths(
        &self,
        vector: &dyn VectorProvider,
        boundaries: &Path,
        raster_provider: &dyn RasterProvider,
        raster: &Path,
        lookup: &Path,
    ) -> anyhow::Result<LandCoverReport> {
        let collection = vector.load_features(boundaries)?;
        let grid = raster_provider.load_raster(raster)?;
        let lookup = self.config.lookup.load_lookup(lookup)?;

        Ok(self.run(&collection, &grid, &lookup)?)
    }
}
