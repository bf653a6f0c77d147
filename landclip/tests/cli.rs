use std::process::Command;

use landclip::collect::raster::write_raster_json;
use landclip::geometric::RasterGrid;
use landclip::{Crs, GeoTransform};

const COMMUNES: &str = r#"{
    "type": "FeatureCollection",
    "crs": {"type": "name", "properties": {"name": "EPSG:2154"}},
    "features": [
        {
            "type": "Feature",
            "properties": {"INSEE_COM": "17300"},
            "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [20, 0], [20, 20], [0, 20], [0, 0]]]}
        }
    ]
}"#;

fn landclip() -> Command {
    Command::new(env!("CARGO_BIN_EXE_landclip"))
}

#[test]
fn test_cli_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let boundaries = dir.path().join("communes.geojson");
    let raster = dir.path().join("cosia.json");
    let lookup = dir.path().join("cosia_codes.csv");
    let output = dir.path().join("report.csv");

    std::fs::write(&boundaries, COMMUNES).unwrap();
    std::fs::write(&lookup, "code;label\n1;Bâtiment\n2;Feuillu\n").unwrap();
    let grid = RasterGrid::new(
        2,
        2,
        vec![1, 2, 2, 2],
        GeoTransform::new(0.0, 20.0, 10.0, -10.0),
        Crs::LAMBERT_93,
        0,
    )
    .unwrap();
    write_raster_json(&grid, &raster).unwrap();

    let status = landclip()
        .args(["--boundaries", boundaries.to_str().unwrap()])
        .args(["--raster", raster.to_str().unwrap()])
        .args(["--lookup", lookup.to_str().unwrap()])
        .args(["-a", "INSEE_COM", "-v", "\"17300\"", "--delimiter", ";"])
        .args(["-o", output.to_str().unwrap()])
        .status()
        .unwrap();
    assert!(status.success());

    let report = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines[1], "2,Feuillu,3,75.0,300");
    assert_eq!(lines[2], "1,Bâtiment,1,25.0,100");

    // unquoted, the code parses as a number and matches nothing
    let output = landclip()
        .args(["--boundaries", boundaries.to_str().unwrap()])
        .args(["--raster", raster.to_str().unwrap()])
        .args(["--lookup", lookup.to_str().unwrap()])
        .args(["-a", "INSEE_COM", "-v", "17300", "--delimiter", ";"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no feature has INSEE_COM = 17300"));
}
