use anyhow::Result;
use geo::polygon;
use serde_json::{json, Map};

use landclip::geometric::{
    clip, resolve, select_boundary, summarize, CodeLookup, Feature, FeatureCollection, Legend,
    MissingCodePolicy, RasterGrid,
};
use landclip::{Crs, GeoTransform};

/// Example: land cover breakdown of one commune
/// Clips a small synthetic classification to a polygon and prints the shares
fn main() -> Result<()> {
    println!("=== Example: land cover summary ===\n");

    let mut attributes = Map::new();
    attributes.insert("nom".to_string(), json!("La Rochelle"));
    let communes = FeatureCollection::new(
        Crs::LAMBERT_93,
        vec![Feature::new(
            polygon![
                (x: 380010.0, y: 6570000.0),
                (x: 380080.0, y: 6570010.0),
                (x: 380060.0, y: 6570075.0),
                (x: 380000.0, y: 6570060.0),
                (x: 380010.0, y: 6570000.0),
            ],
            attributes,
        )],
    );

    // 8x8 grid of 10m cells, codes follow the LCZ table
    let cells = (0..64)
        .map(|i| match (i % 8, i / 8) {
            (c, _) if c < 2 => 17,
            (_, r) if r < 3 => 2,
            (c, r) if (c + r) % 3 == 0 => 11,
            _ => 14,
        })
        .collect();
    let mut legend = Legend::new();
    legend.insert(2, "LCZ 2: Compact mid-rise", "#cc0200");
    legend.insert(11, "LCZ A: Dense trees", "#006700");
    legend.insert(14, "LCZ D: Low plants", "#bbdb7a");
    legend.insert(17, "LCZ G: Water", "#6d67fd");
    let raster = RasterGrid::new(
        8,
        8,
        cells,
        GeoTransform::new(380000.0, 6570080.0, 10.0, -10.0),
        Crs::LAMBERT_93,
        0,
    )?
    .with_legend(legend);

    let boundary = select_boundary(&communes, "nom", &json!("La Rochelle"))?;
    println!("Boundary area: {:.0} m²", boundary.area());

    let clipped = clip(&raster, &boundary)?;
    println!(
        "Clipped to {}x{} cells, {} inside the boundary\n",
        clipped.width(),
        clipped.height(),
        clipped.valid_cells()
    );

    let lookup = CodeLookup::from_legend(clipped.legend().unwrap_or(&Legend::new()));
    let table = summarize(&clipped);
    drop(clipped);

    for share in resolve(&table, &lookup, MissingCodePolicy::Lenient)? {
        println!("  {:<28} {:>5.1}%", share.label, share.percentage);
    }

    Ok(())
}
