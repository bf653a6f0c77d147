use geo::{Area, BoundingRect, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ClipError, Result};
use crate::geo_core::{BoundingBox, Crs};

/// Polygon feature with its attribute table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub geometry: MultiPolygon<f64>,
    pub attributes: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: impl Into<MultiPolygon<f64>>, attributes: Map<String, Value>) -> Self {
        Feature {
            geometry: geometry.into(),
            attributes,
        }
    }

    /// Attribute value, `None` when the key is absent
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// Ordered polygon features sharing a single CRS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    pub crs: Crs,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(crs: Crs, features: Vec<Feature>) -> Self {
        FeatureCollection { crs, features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Distinct non-null values of an attribute, in first-seen order
    pub fn attribute_values(&self, name: &str) -> Vec<Value> {
        let mut values: Vec<Value> = Vec::new();
        for feature in &self.features {
            if let Some(value) = feature.attribute(name) {
                if !value.is_null() && !values.contains(value) {
                    values.push(value.clone());
                }
            }
        }
        values
    }
}

/// The polygon a raster gets clipped to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub geometry: MultiPolygon<f64>,
    pub crs: Crs,
    /// Attributes of the first selected feature
    pub attributes: Map<String, Value>,
}

impl Boundary {
    pub fn new(geometry: impl Into<MultiPolygon<f64>>, crs: Crs) -> Self {
        Boundary {
            geometry: geometry.into(),
            crs,
            attributes: Map::new(),
        }
    }

    /// Merge every feature of `collection` into one boundary.
    /// Fails with `EmptySelection` when the collection is empty.
    pub fn from_features(
        collection: FeatureCollection,
        attribute: &str,
        value: &Value,
    ) -> Result<Self> {
        let mut features = collection.features.into_iter();
        let first = features.next().ok_or_else(|| ClipError::EmptySelection {
            attribute: attribute.to_string(),
            value: display_value(value),
        })?;

        let mut polygons: Vec<Polygon<f64>> = first.geometry.0;
        for feature in features {
            polygons.extend(feature.geometry.0);
        }

        Ok(Boundary {
            geometry: MultiPolygon::new(polygons),
            crs: collection.crs,
            attributes: first.attributes,
        })
    }

    pub fn area(&self) -> f64 {
        self.geometry.unsigned_area()
    }

    /// Bounding envelope, `None` for an empty geometry
    pub fn envelope(&self) -> Option<BoundingBox> {
        self.geometry.bounding_rect().map(BoundingBox::from)
    }

    /// Reproject the boundary into `target`.
    /// The clipper never does this on its own.
    #[cfg(feature = "proj")]
    pub fn reproject(&self, target: Crs) -> anyhow::Result<Boundary> {
        use anyhow::Context;
        use geo::MapCoords;

        if target == self.crs {
            return Ok(self.clone());
        }

        let proj = crate::geo_core::proj_between(self.crs, target)?;

        let geometry = self
            .geometry
            .try_map_coords(|c| {
                proj.convert((c.x, c.y))
                    .map(|(x, y)| geo::coord! { x: x, y: y })
            })
            .with_context(|| format!("Failed to reproject boundary to {}", target))?;

        Ok(Boundary {
            geometry,
            crs: target,
            attributes: self.attributes.clone(),
        })
    }
}

/// Features whose `attribute` equals `value`, in input order.
///
/// Null attribute values never match. Every feature must carry the
/// attribute, otherwise `MissingAttribute` is returned.
pub fn select_features(
    collection: &FeatureCollection,
    attribute: &str,
    value: &Value,
) -> Result<FeatureCollection> {
    let mut selected = Vec::new();
    for (index, feature) in collection.features.iter().enumerate() {
        let actual = feature
            .attribute(attribute)
            .ok_or_else(|| ClipError::MissingAttribute {
                attribute: attribute.to_string(),
                index,
            })?;
        if attribute_matches(actual, value) {
            selected.push(feature.clone());
        }
    }

    Ok(FeatureCollection::new(collection.crs, selected))
}

/// Select features and merge them into the boundary used for clipping
pub fn select_boundary(
    collection: &FeatureCollection,
    attribute: &str,
    value: &Value,
) -> Result<Boundary> {
    let selected = select_features(collection, attribute, value)?;
    Boundary::from_features(selected, attribute, value)
}

fn attribute_matches(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => false,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use serde_json::json;

    fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ]
    }

    fn attrs(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn communes() -> FeatureCollection {
        FeatureCollection::new(
            Crs::LAMBERT_93,
            vec![
                Feature::new(square(0.0, 0.0, 10.0), attrs(json!({"name": "Aytré", "code": 17028}))),
                Feature::new(square(10.0, 0.0, 10.0), attrs(json!({"name": "Lagord", "code": 17200}))),
                Feature::new(square(20.0, 0.0, 10.0), attrs(json!({"name": null, "code": 17300}))),
                Feature::new(square(30.0, 0.0, 5.0), attrs(json!({"name": "Aytré", "code": 17028.0}))),
            ],
        )
    }

    #[test]
    fn test_select_features_by_string() {
        let collection = communes();
        let selected = select_features(&collection, "name", &json!("Aytré")).unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected.crs, Crs::LAMBERT_93);
        assert!(selected
            .features
            .iter()
            .all(|f| f.attribute("name") == Some(&json!("Aytré"))));
    }

    #[test]
    fn test_select_features_by_number() {
        let collection = communes();
        // integer and float representations compare equal
        let selected = select_features(&collection, "code", &json!(17028)).unwrap();
        assert_eq!(selected.len(), 2);
        // a string never matches a number
        let selected = select_features(&collection, "code", &json!("17028")).unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn test_select_features_skips_null() {
        let collection = communes();
        let selected = select_features(&collection, "name", &Value::Null).unwrap();
        assert!(selected.is_empty());
    }

    #[test]
    fn test_select_features_never_grows() {
        let collection = communes();
        for value in collection.attribute_values("name") {
            let selected = select_features(&collection, "name", &value).unwrap();
            assert!(selected.len() <= collection.len());
            assert!(selected.features.iter().all(|f| f.attribute("name") == Some(&value)));
        }
    }

    #[test]
    fn test_select_features_missing_attribute() {
        let collection = communes();
        let err = select_features(&collection, "population", &json!(10)).unwrap_err();
        assert_eq!(
            err,
            ClipError::MissingAttribute {
                attribute: "population".to_string(),
                index: 0
            }
        );
    }

    #[test]
    fn test_select_boundary_empty_selection() {
        let collection = communes();
        let err = select_boundary(&collection, "name", &json!("X")).unwrap_err();
        assert_eq!(
            err,
            ClipError::EmptySelection {
                attribute: "name".to_string(),
                value: "X".to_string()
            }
        );
    }

    #[test]
    fn test_select_boundary_merges_matches() {
        let collection = communes();
        let boundary = select_boundary(&collection, "name", &json!("Aytré")).unwrap();
        assert_eq!(boundary.geometry.0.len(), 2);
        assert_eq!(boundary.area(), 125.0);
        assert_eq!(boundary.attributes.get("code"), Some(&json!(17028)));
        assert_eq!(
            boundary.envelope(),
            Some(BoundingBox::new(0.0, 0.0, 35.0, 10.0))
        );
    }

    #[test]
    fn test_attribute_values() {
        let collection = communes();
        assert_eq!(
            collection.attribute_values("name"),
            vec![json!("Aytré"), json!("Lagord")]
        );
    }
}
