//! Typed GeoJSON model shared by the feature store, the diff engine and the
//! renderer adapter.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Longitude/latitude pair.
pub type LngLat = [f64; 2];

/// GeoJSON `properties` object.
pub type Properties = serde_json::Map<String, Value>;

/// Identifier of a feature, unique within the feature store.
///
/// GeoJSON allows numeric ids; they are normalized to their string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FeatureId(String);

impl FeatureId {
    /// Create an id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read an id from a JSON value (string or number).
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }

    /// Get the id as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::String(self.0.clone())
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeatureId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for FeatureId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for FeatureId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for FeatureId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Str(String),
            Num(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Str(s) => FeatureId(s),
            RawId::Num(n) => FeatureId(n.to_string()),
        })
    }
}

/// GeoJSON geometry, tagged by its `type` member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: LngLat },
    MultiPoint { coordinates: Vec<LngLat> },
    LineString { coordinates: Vec<LngLat> },
    MultiLineString { coordinates: Vec<Vec<LngLat>> },
    Polygon { coordinates: Vec<Vec<LngLat>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<LngLat>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

/// Discriminant of a [`Geometry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
    GeometryCollection,
}

impl Geometry {
    /// Get the geometry type.
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point { .. } => GeometryType::Point,
            Geometry::MultiPoint { .. } => GeometryType::MultiPoint,
            Geometry::LineString { .. } => GeometryType::LineString,
            Geometry::MultiLineString { .. } => GeometryType::MultiLineString,
            Geometry::Polygon { .. } => GeometryType::Polygon,
            Geometry::MultiPolygon { .. } => GeometryType::MultiPolygon,
            Geometry::GeometryCollection { .. } => GeometryType::GeometryCollection,
        }
    }

    /// Visit every position of the geometry.
    pub fn for_each_position(&self, f: &mut impl FnMut(LngLat)) {
        match self {
            Geometry::Point { coordinates } => f(*coordinates),
            Geometry::MultiPoint { coordinates } | Geometry::LineString { coordinates } => {
                coordinates.iter().copied().for_each(f)
            }
            Geometry::MultiLineString { coordinates } | Geometry::Polygon { coordinates } => {
                coordinates.iter().flatten().copied().for_each(f)
            }
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().flatten().flatten().copied().for_each(f)
            }
            Geometry::GeometryCollection { geometries } => {
                for geometry in geometries {
                    geometry.for_each_position(f);
                }
            }
        }
    }

    /// Mutably visit every position of the geometry.
    fn for_each_position_mut(&mut self, f: &mut impl FnMut(&mut LngLat)) {
        match self {
            Geometry::Point { coordinates } => f(coordinates),
            Geometry::MultiPoint { coordinates } | Geometry::LineString { coordinates } => {
                coordinates.iter_mut().for_each(f)
            }
            Geometry::MultiLineString { coordinates } | Geometry::Polygon { coordinates } => {
                coordinates.iter_mut().flatten().for_each(f)
            }
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter_mut().flatten().flatten().for_each(f)
            }
            Geometry::GeometryCollection { geometries } => {
                for geometry in geometries {
                    geometry.for_each_position_mut(f);
                }
            }
        }
    }

    /// Shift every position by a longitude/latitude delta.
    pub fn translate(&mut self, d_lng: f64, d_lat: f64) {
        self.for_each_position_mut(&mut |position| {
            position[0] += d_lng;
            position[1] += d_lat;
        });
    }

    /// Bounding box as `[south-west, north-east]`, `None` for empty geometries.
    pub fn bounds(&self) -> Option<[LngLat; 2]> {
        let mut bounds: Option<[LngLat; 2]> = None;
        self.for_each_position(&mut |[lng, lat]| {
            bounds = Some(match bounds {
                None => [[lng, lat], [lng, lat]],
                Some([[w, s], [e, n]]) => [[w.min(lng), s.min(lat)], [e.max(lng), n.max(lat)]],
            });
        });
        bounds
    }
}

fn deserialize_properties<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Properties, D::Error> {
    Ok(Option::<Properties>::deserialize(deserializer)?.unwrap_or_default())
}

/// A GeoJSON feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct Feature {
    /// Top-level GeoJSON id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FeatureId>,
    /// Geometry.
    pub geometry: Geometry,
    /// Properties (`null` is read as an empty object).
    #[serde(default, deserialize_with = "deserialize_properties")]
    pub properties: Properties,
}

impl Feature {
    /// Create a feature without id and properties.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: None,
            geometry,
            properties: Properties::new(),
        }
    }

    /// Set a property (builder style).
    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Get a string property.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// Read an id stored in a property (string or number).
    pub fn property_id(&self, key: &str) -> Option<FeatureId> {
        self.properties.get(key).and_then(FeatureId::from_value)
    }
}

/// A GeoJSON feature collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct FeatureCollection {
    /// Member features.
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }
}

impl From<Vec<Feature>> for FeatureCollection {
    fn from(features: Vec<Feature>) -> Self {
        Self { features }
    }
}

/// Either a single feature or a collection, as accepted by imports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeoJson {
    FeatureCollection(FeatureCollection),
    Feature(Feature),
}

impl GeoJson {
    /// Parse GeoJSON text.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Flatten into a list of features.
    pub fn into_features(self) -> Vec<Feature> {
        match self {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
        }
    }
}

impl From<Feature> for GeoJson {
    fn from(feature: Feature) -> Self {
        GeoJson::Feature(feature)
    }
}

impl From<FeatureCollection> for GeoJson {
    fn from(collection: FeatureCollection) -> Self {
        GeoJson::FeatureCollection(collection)
    }
}
