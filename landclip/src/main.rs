use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use landclip::collect::{GeoJsonProvider, JsonRasterProvider, RasterProvider, VectorProvider};
use landclip::geometric::MissingCodePolicy;
use landclip::{Crs, LandCoverReport, Pipeline, PipelineConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Boundary polygons (GeoJSON, or any OGR format with the gdal feature)
    #[arg(long, value_name = "FILE")]
    boundaries: PathBuf,

    /// Categorical raster (.json dump, or any GDAL format with the gdal feature)
    #[arg(long, value_name = "FILE")]
    raster: PathBuf,

    /// Two-column code,label table
    #[arg(long, value_name = "FILE")]
    lookup: PathBuf,

    /// JSON pipeline config; flags below override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Attribute used to select the boundary
    #[arg(short, long)]
    attribute: Option<String>,

    /// Attribute value to match. JSON literals keep their type, so 17300 only
    /// matches numeric attributes; quote it ('"17300"') for text codes
    #[arg(short, long)]
    value: Option<String>,

    /// EPSG code of the boundaries, overriding what the file declares
    #[arg(long)]
    crs: Option<i32>,

    /// Label unknown categories with their code instead of failing
    #[arg(long)]
    lenient: bool,

    /// Lookup field delimiter
    #[arg(long)]
    delimiter: Option<char>,

    /// Lookup text encoding (e.g. ISO-8859-1)
    #[arg(long)]
    encoding: Option<String>,

    /// Lookup file has no header row
    #[arg(long)]
    no_headers: bool,

    /// Write the report here (.csv or .json)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;
    info!(
        "Selecting {} = {} from {:?}",
        config.attribute, config.value, args.boundaries
    );

    let vector = vector_provider(&args.boundaries, args.crs.map(Crs::from_epsg))?;
    let raster = raster_provider(&args.raster)?;

    let report = Pipeline::new(config).run_paths(
        vector.as_ref(),
        &args.boundaries,
        raster.as_ref(),
        &args.raster,
        &args.lookup,
    )?;

    print_report(&report);

    if let Some(output) = &args.output {
        report.save(output)?;
    }

    Ok(())
}

fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => {
            let attribute = args
                .attribute
                .clone()
                .context("--attribute is required without --config")?;
            let value = args
                .value
                .as_deref()
                .context("--value is required without --config")?;
            PipelineConfig::new(attribute, parse_value(value))
        }
    };

    if let Some(attribute) = &args.attribute {
        config.attribute = attribute.clone();
    }
    if let Some(value) = &args.value {
        config.value = parse_value(value);
    }
    if args.lenient {
        config.missing_code_policy = MissingCodePolicy::Lenient;
    }
    if let Some(delimiter) = args.delimiter {
        if !delimiter.is_ascii() {
            anyhow::bail!("--delimiter must be an ASCII character, got {:?}", delimiter);
        }
        config.lookup.delimiter = delimiter as u8;
    }
    if let Some(encoding) = &args.encoding {
        config.lookup.encoding = encoding.clone();
    }
    if args.no_headers {
        config.lookup.has_headers = false;
    }

    Ok(config)
}

/// JSON literals keep their type, anything else is matched as a string
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

fn vector_provider(path: &Path, crs: Option<Crs>) -> Result<Box<dyn VectorProvider>> {
    if has_extension(path, &["geojson", "json"]) {
        return Ok(Box::new(GeoJsonProvider::new(crs)));
    }

    #[cfg(feature = "gdal")]
    {
        Ok(Box::new(landclip::collect::GdalVectorProvider { layer: 0, crs }))
    }
    #[cfg(not(feature = "gdal"))]
    {
        anyhow::bail!(
            "Cannot read {:?}: only GeoJSON is supported without the gdal feature",
            path
        )
    }
}

fn raster_provider(path: &Path) -> Result<Box<dyn RasterProvider>> {
    if has_extension(path, &["json"]) {
        return Ok(Box::new(JsonRasterProvider));
    }

    #[cfg(feature = "gdal")]
    {
        Ok(Box::new(landclip::collect::GdalRasterProvider::default()))
    }
    #[cfg(not(feature = "gdal"))]
    {
        anyhow::bail!(
            "Cannot read {:?}: only JSON rasters are supported without the gdal feature",
            path
        )
    }
}

fn print_report(report: &LandCoverReport) {
    println!(
        "{} valid cells in a {}x{} window ({})",
        report.frequency.total, report.width, report.height, report.crs
    );
    println!("{:>6}  {:<40} {:>10} {:>7}", "code", "label", "cells", "%");
    for share in &report.shares {
        println!(
            "{:>6}  {:<40} {:>10} {:>7.1}",
            share.code, share.label, share.count, share.percentage
        );
    }
}
