//! GeoJSON features carried by stored-feature layers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A GeoJSON FeatureCollection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            features,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// A GeoJSON Feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub geometry: Geometry,

    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            type_: "Feature".to_string(),
            id: None,
            geometry,
            properties: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// GeoJSON geometry types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
    MultiPoint { coordinates: Vec<[f64; 2]> },
    LineString { coordinates: Vec<[f64; 2]> },
    MultiLineString { coordinates: Vec<Vec<[f64; 2]>> },
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<[f64; 2]>>> },
}

impl Geometry {
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point { coordinates: [x, y] }
    }

    /// Well-known text, as used in WFS CQL filters.
    pub fn to_wkt(&self) -> String {
        fn coord(c: &[f64; 2]) -> String {
            format!("{} {}", c[0], c[1])
        }
        fn ring(cs: &[[f64; 2]]) -> String {
            format!("({})", cs.iter().map(coord).collect::<Vec<_>>().join(", "))
        }
        fn rings(rs: &[Vec<[f64; 2]>]) -> String {
            format!("({})", rs.iter().map(|r| ring(r)).collect::<Vec<_>>().join(", "))
        }

        match self {
            Geometry::Point { coordinates } => format!("POINT({})", coord(coordinates)),
            Geometry::MultiPoint { coordinates } => format!("MULTIPOINT{}", ring(coordinates)),
            Geometry::LineString { coordinates } => format!("LINESTRING{}", ring(coordinates)),
            Geometry::MultiLineString { coordinates } => {
                format!("MULTILINESTRING{}", rings(coordinates))
            }
            Geometry::Polygon { coordinates } => format!("POLYGON{}", rings(coordinates)),
            Geometry::MultiPolygon { coordinates } => format!(
                "MULTIPOLYGON({})",
                coordinates.iter().map(|p| rings(p)).collect::<Vec<_>>().join(", ")
            ),
        }
    }

    pub fn is_point(&self) -> bool {
        matches!(self, Geometry::Point { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_serializes_with_type_tag() {
        let json = serde_json::to_value(Geometry::point(1.5, -2.0)).unwrap();
        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"][0], 1.5);
    }

    #[test]
    fn test_polygon_wkt() {
        let poly = Geometry::Polygon {
            coordinates: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
        };
        assert_eq!(poly.to_wkt(), "POLYGON((0 0, 1 0, 1 1, 0 0))");
        assert_eq!(Geometry::point(3.0, 4.0).to_wkt(), "POINT(3 4)");
    }

    #[test]
    fn test_feature_properties_roundtrip() {
        let feature = Feature::new(Geometry::point(0.0, 0.0))
            .with_id("f1")
            .with_property("label", "Home");
        let json = serde_json::to_string(&feature).unwrap();
        let back: Feature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, feature);
    }
}
