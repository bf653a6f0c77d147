use anyhow::{Context, Result};
use geo::{Geometry as GeoGeometry, MultiPolygon};
use geojson::{GeoJson, JsonObject};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info};

use crate::collect::global_variables::DEFAULT_GEOJSON_CRS;
use crate::collect::VectorProvider;
use crate::geo_core::Crs;
use crate::geometric::{Feature, FeatureCollection};

/// Reads polygon features from a GeoJSON file
#[derive(Debug, Clone, Default)]
pub struct GeoJsonProvider {
    /// Overrides whatever CRS the file declares
    pub crs: Option<Crs>,
}

impl GeoJsonProvider {
    pub fn new(crs: Option<Crs>) -> Self {
        GeoJsonProvider { crs }
    }
}

impl VectorProvider for GeoJsonProvider {
    fn load_features(&self, path: &Path) -> Result<FeatureCollection> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read GeoJSON file: {:?}", path))?;
        let geojson: GeoJson = content
            .parse()
            .with_context(|| format!("Failed to parse GeoJSON file: {:?}", path))?;

        let collection = from_geojson(&geojson, self.crs)?;
        info!(
            "Loaded {} features ({}) from {:?}",
            collection.len(),
            collection.crs,
            path
        );
        Ok(collection)
    }
}

/// Convert parsed GeoJSON into a feature collection.
///
/// CRS resolution: `crs` if given, then the legacy `crs` member, then WGS84.
/// Features without geometry are skipped; non-polygonal geometries are an error.
pub fn from_geojson(geojson: &GeoJson, crs: Option<Crs>) -> Result<FeatureCollection> {
    let (declared, raw_features) = match geojson {
        GeoJson::FeatureCollection(fc) => (
            fc.foreign_members.as_ref().and_then(declared_crs),
            fc.features.iter().collect::<Vec<_>>(),
        ),
        GeoJson::Feature(f) => (f.foreign_members.as_ref().and_then(declared_crs), vec![f]),
        GeoJson::Geometry(g) => {
            let geometry = to_multi_polygon(g).context("Invalid GeoJSON geometry")?;
            let crs = crs
                .or_else(|| g.foreign_members.as_ref().and_then(declared_crs))
                .unwrap_or(DEFAULT_GEOJSON_CRS);
            return Ok(FeatureCollection::new(
                crs,
                vec![Feature::new(geometry, Map::new())],
            ));
        }
    };

    let mut features = Vec::with_capacity(raw_features.len());
    for (index, feature) in raw_features.into_iter().enumerate() {
        let Some(ref geometry) = feature.geometry else {
            debug!("Skipping feature #{} without geometry", index);
            continue;
        };
        let geometry = to_multi_polygon(geometry)
            .with_context(|| format!("Invalid geometry on feature #{}", index))?;
        let attributes = feature.properties.clone().unwrap_or_default();
        features.push(Feature::new(geometry, attributes));
    }

    let crs = crs.or(declared).unwrap_or(DEFAULT_GEOJSON_CRS);
    Ok(FeatureCollection::new(crs, features))
}

/// Legacy GeoJSON 2008 `"crs": {"type": "name", "properties": {"name": ...}}`
fn declared_crs(members: &JsonObject) -> Option<Crs> {
    let name = members
        .get("crs")?
        .get("properties")?
        .get("name")
        .and_then(Value::as_str)?;
    Crs::parse(name)
}

fn to_multi_polygon(geometry: &geojson::Geometry) -> Result<MultiPolygon<f64>> {
    let geo_geom: GeoGeometry<f64> = geometry
        .try_into()
        .context("Failed to convert GeoJSON geometry to geo geometry")?;

    match geo_geom {
        GeoGeometry::Polygon(p) => Ok(MultiPolygon::new(vec![p])),
        GeoGeometry::MultiPolygon(mp) => Ok(mp),
        GeoGeometry::Rect(r) => Ok(MultiPolygon::new(vec![r.to_polygon()])),
        other => anyhow::bail!("Expected polygon geometry, got {:?}", geometry_kind(&other)),
    }
}

fn geometry_kind(geometry: &GeoGeometry<f64>) -> &'static str {
    match geometry {
        GeoGeometry::Point(_) => "Point",
        GeoGeometry::Line(_) => "Line",
        GeoGeometry::LineString(_) => "LineString",
        GeoGeometry::MultiPoint(_) => "MultiPoint",
        GeoGeometry::MultiLineString(_) => "MultiLineString",
        GeoGeometry::GeometryCollection(_) => "GeometryCollection",
        _ => "Geometry",
    }
}

/// Reads polygon features from any OGR-supported vector file (shapefile, GeoPackage...)
#[cfg(feature = "gdal")]
#[derive(Debug, Clone, Default)]
pub struct GdalVectorProvider {
    /// Layer index inside the dataset
    pub layer: usize,
    /// Used when the layer carries no EPSG code
    pub crs: Option<Crs>,
}

#[cfg(feature = "gdal")]
impl VectorProvider for GdalVectorProvider {
    fn load_features(&self, path: &Path) -> Result<FeatureCollection> {
        use gdal::vector::LayerAccess;
        use gdal::Dataset;

        let dataset =
            Dataset::open(path).with_context(|| format!("Failed to open vector file: {:?}", path))?;
        let mut layer = dataset
            .layer(self.layer)
            .with_context(|| format!("Failed to access layer {}", self.layer))?;

        let crs = layer
            .spatial_ref()
            .and_then(|srs| srs.auth_code().ok())
            .map(Crs::from_epsg)
            .or(self.crs)
            .context("Vector layer has no EPSG code, set one explicitly")?;

        let mut features = Vec::new();
        for (index, feature) in layer.features().enumerate() {
            let Some(geometry) = feature.geometry() else {
                debug!("Skipping feature #{} without geometry", index);
                continue;
            };
            let geo_geom = geometry
                .to_geo()
                .with_context(|| format!("Failed to convert geometry of feature #{}", index))?;
            let geometry = match geo_geom {
                GeoGeometry::Polygon(p) => MultiPolygon::new(vec![p]),
                GeoGeometry::MultiPolygon(mp) => mp,
                other => anyhow::bail!(
                    "Feature #{}: expected polygon geometry, got {}",
                    index,
                    geometry_kind(&other)
                ),
            };

            let mut attributes = Map::new();
            for (name, value) in feature.fields() {
                attributes.insert(name, field_to_json(value));
            }
            features.push(Feature::new(geometry, attributes));
        }

        info!("Loaded {} features ({}) from {:?}", features.len(), crs, path);
        Ok(FeatureCollection::new(crs, features))
    }
}

#[cfg(feature = "gdal")]
fn field_to_json(value: Option<gdal::vector::FieldValue>) -> Value {
    use gdal::vector::FieldValue;

    match value {
        None => Value::Null,
        Some(FieldValue::IntegerValue(v)) => Value::from(v),
        Some(FieldValue::Integer64Value(v)) => Value::from(v),
        Some(FieldValue::RealValue(v)) => Value::from(v),
        Some(FieldValue::StringValue(v)) => Value::from(v),
        Some(other) => other.into_string().map(Value::from).unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const COMMUNES: &str = r#"{
        "type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::2154"}},
        "features": [
            {
                "type": "Feature",
                "properties": {"nom": "La Rochelle", "insee": 17300},
                "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]}
            },
            {
                "type": "Feature",
                "properties": {"nom": "Ile de Ré", "insee": null},
                "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[20, 0], [30, 0], [30, 5], [20, 0]]],
                    [[[40, 0], [50, 0], [50, 5], [40, 0]]]
                ]}
            },
            {
                "type": "Feature",
                "properties": {"nom": "nowhere"},
                "geometry": null
            }
        ]
    }"#;

    #[test]
    fn test_from_geojson_reads_polygons_and_crs() {
        let geojson: GeoJson = COMMUNES.parse().unwrap();
        let collection = from_geojson(&geojson, None).unwrap();

        assert_eq!(collection.crs, Crs::LAMBERT_93);
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.features[0].geometry.0.len(), 1);
        assert_eq!(collection.features[1].geometry.0.len(), 2);
        assert_eq!(
            collection.features[0].attribute("nom"),
            Some(&Value::from("La Rochelle"))
        );
        assert_eq!(collection.features[1].attribute("insee"), Some(&Value::Null));
    }

    #[test]
    fn test_from_geojson_crs_override_and_default() {
        let geojson: GeoJson = COMMUNES.parse().unwrap();
        let collection = from_geojson(&geojson, Some(Crs::from_epsg(32630))).unwrap();
        assert_eq!(collection.crs, Crs::from_epsg(32630));

        let plain: GeoJson = r#"{"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}"#
            .parse()
            .unwrap();
        let collection = from_geojson(&plain, None).unwrap();
        assert_eq!(collection.crs, Crs::WGS84);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_from_geojson_rejects_lines() {
        let lines: GeoJson = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}
            }]
        }"#
        .parse()
        .unwrap();
        assert!(from_geojson(&lines, None).is_err());
    }

    #[test]
    fn test_provider_loads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(COMMUNES.as_bytes()).unwrap();

        let collection = GeoJsonProvider::default()
            .load_features(file.path())
            .unwrap();
        assert_eq!(collection.len(), 2);

        let missing = GeoJsonProvider::default().load_features(Path::new("does/not/exist.geojson"));
        assert!(missing.is_err());
    }
}
