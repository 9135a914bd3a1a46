//! Feature records, shape kinds and source names.

use super::geojson::{Feature, FeatureId, Geometry, GeometryType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Property holding the feature id inside stored GeoJSON.
pub const FEATURE_ID_PROPERTY: &str = "_fid";

/// Property holding the shape name inside stored GeoJSON.
pub const SHAPE_PROPERTY: &str = "shape";

/// A named backing collection feeding the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceName {
    /// Persistent features.
    Main,
    /// Features in the middle of an interaction (previews, dragged shapes).
    Temporary,
    /// Persistent features parked outside of the main source.
    Standby,
}

impl SourceName {
    /// All source names.
    pub const ALL: [SourceName; 3] = [SourceName::Main, SourceName::Temporary, SourceName::Standby];

    /// Features in persistent sources are exported.
    pub fn is_persistent(self) -> bool {
        matches!(self, SourceName::Main | SourceName::Standby)
    }

    /// Name used for the renderer source.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceName::Main => "mm_main",
            SourceName::Temporary => "mm_temporary",
            SourceName::Standby => "mm_standby",
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public shape kinds a user can draw or import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeName {
    Marker,
    Line,
    Polygon,
    Rectangle,
    TextMarker,
}

impl ShapeName {
    /// All public shapes.
    pub const ALL: [ShapeName; 5] = [
        ShapeName::Marker,
        ShapeName::Line,
        ShapeName::Polygon,
        ShapeName::Rectangle,
        ShapeName::TextMarker,
    ];

    /// Name stored in the `shape` property.
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeName::Marker => "marker",
            ShapeName::Line => "line",
            ShapeName::Polygon => "polygon",
            ShapeName::Rectangle => "rectangle",
            ShapeName::TextMarker => "text_marker",
        }
    }

    /// Parse a `shape` property value.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|shape| shape.as_str() == name)
    }

    /// Fallback shape for a geometry without an explicit `shape` property.
    pub fn from_geometry_type(geometry_type: GeometryType) -> Option<Self> {
        match geometry_type {
            GeometryType::Point => Some(ShapeName::Marker),
            GeometryType::LineString => Some(ShapeName::Line),
            GeometryType::Polygon | GeometryType::MultiPolygon => Some(ShapeName::Polygon),
            GeometryType::MultiPoint
            | GeometryType::MultiLineString
            | GeometryType::GeometryCollection => None,
        }
    }
}

/// Internal sub-shapes created by modes (vertex and edge handles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HelperShape {
    VertexMarker,
    EdgeMarker,
    CenterMarker,
}

impl HelperShape {
    /// All helper shapes.
    pub const ALL: [HelperShape; 3] = [
        HelperShape::VertexMarker,
        HelperShape::EdgeMarker,
        HelperShape::CenterMarker,
    ];

    /// Name stored in the `shape` property.
    pub fn as_str(self) -> &'static str {
        match self {
            HelperShape::VertexMarker => "vertex_marker",
            HelperShape::EdgeMarker => "edge_marker",
            HelperShape::CenterMarker => "center_marker",
        }
    }
}

/// Kind of child marker attached to a parent feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Vertex,
    Edge,
    Center,
}

impl From<MarkerKind> for HelperShape {
    fn from(kind: MarkerKind) -> Self {
        match kind {
            MarkerKind::Vertex => HelperShape::VertexMarker,
            MarkerKind::Edge => HelperShape::EdgeMarker,
            MarkerKind::Center => HelperShape::CenterMarker,
        }
    }
}

/// Shape of a stored feature: a public shape or an internal helper shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureShape {
    Shape(ShapeName),
    Helper(HelperShape),
}

impl FeatureShape {
    /// Name stored in the `shape` property.
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureShape::Shape(shape) => shape.as_str(),
            FeatureShape::Helper(helper) => helper.as_str(),
        }
    }

    /// Parse any known shape name.
    pub fn parse(name: &str) -> Option<Self> {
        ShapeName::parse(name).map(FeatureShape::Shape).or_else(|| {
            HelperShape::ALL
                .into_iter()
                .find(|helper| helper.as_str() == name)
                .map(FeatureShape::Helper)
        })
    }

    /// Get the public shape, if this is one.
    pub fn as_shape(self) -> Option<ShapeName> {
        match self {
            FeatureShape::Shape(shape) => Some(shape),
            FeatureShape::Helper(_) => None,
        }
    }
}

impl From<ShapeName> for FeatureShape {
    fn from(shape: ShapeName) -> Self {
        FeatureShape::Shape(shape)
    }
}

impl From<HelperShape> for FeatureShape {
    fn from(helper: HelperShape) -> Self {
        FeatureShape::Helper(helper)
    }
}

impl fmt::Display for FeatureShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve the shape of a GeoJSON feature.
///
/// A valid public `shape` property wins; otherwise the geometry type decides.
pub fn shape_of_geojson(feature: &Feature) -> Option<ShapeName> {
    feature
        .property_str(SHAPE_PROPERTY)
        .and_then(ShapeName::parse)
        .or_else(|| ShapeName::from_geometry_type(feature.geometry.geometry_type()))
}

/// One annotated shape tracked by the feature store.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureData {
    pub(crate) id: FeatureId,
    pub(crate) shape: FeatureShape,
    pub(crate) geojson: Feature,
    pub(crate) source: SourceName,
    pub(crate) parent: Option<FeatureId>,
}

impl FeatureData {
    pub(crate) fn new(
        id: FeatureId,
        shape: FeatureShape,
        mut geojson: Feature,
        source: SourceName,
        parent: Option<FeatureId>,
    ) -> Self {
        geojson.id = Some(id.clone());
        geojson
            .properties
            .insert(FEATURE_ID_PROPERTY.to_string(), id.to_value());
        geojson
            .properties
            .insert(SHAPE_PROPERTY.to_string(), Value::from(shape.as_str()));
        Self {
            id,
            shape,
            geojson,
            source,
            parent,
        }
    }

    /// Get the feature id.
    pub fn id(&self) -> &FeatureId {
        &self.id
    }

    /// Get the shape kind.
    pub fn shape(&self) -> FeatureShape {
        self.shape
    }

    /// Get the source this feature currently lives in.
    pub fn source(&self) -> SourceName {
        self.source
    }

    /// Temporary features are excluded from exports.
    pub fn temporary(&self) -> bool {
        self.source == SourceName::Temporary
    }

    /// Get the parent feature, for child markers.
    pub fn parent(&self) -> Option<&FeatureId> {
        self.parent.as_ref()
    }

    /// Get the stored GeoJSON (with id and shape properties).
    pub fn geojson(&self) -> &Feature {
        &self.geojson
    }

    /// Get the geometry.
    pub fn geometry(&self) -> &Geometry {
        &self.geojson.geometry
    }

    /// Take a snapshot for event payloads.
    pub fn snapshot(&self) -> FeatureSnapshot {
        FeatureSnapshot {
            id: self.id.clone(),
            shape: self.shape,
            source: self.source,
            geojson: self.geojson.clone(),
        }
    }
}

/// Owned copy of a feature carried by event payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSnapshot {
    pub id: FeatureId,
    pub shape: FeatureShape,
    pub source: SourceName,
    pub geojson: Feature,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> Feature {
        Feature::new(Geometry::Point { coordinates: [0.0, 0.0] })
    }

    #[test]
    fn test_shape_inference_table() {
        use GeometryType::*;
        assert_eq!(ShapeName::from_geometry_type(Point), Some(ShapeName::Marker));
        assert_eq!(ShapeName::from_geometry_type(LineString), Some(ShapeName::Line));
        assert_eq!(ShapeName::from_geometry_type(Polygon), Some(ShapeName::Polygon));
        assert_eq!(ShapeName::from_geometry_type(MultiPolygon), Some(ShapeName::Polygon));
        assert_eq!(ShapeName::from_geometry_type(MultiPoint), None);
        assert_eq!(ShapeName::from_geometry_type(MultiLineString), None);
        assert_eq!(ShapeName::from_geometry_type(GeometryCollection), None);
    }

    #[test]
    fn test_explicit_shape_property_wins() {
        let feature = point().with_property(SHAPE_PROPERTY, "text_marker");
        assert_eq!(shape_of_geojson(&feature), Some(ShapeName::TextMarker));
    }

    #[test]
    fn test_unknown_shape_property_falls_back_to_geometry() {
        let feature = point().with_property(SHAPE_PROPERTY, "vertex_marker");
        assert_eq!(shape_of_geojson(&feature), Some(ShapeName::Marker));
    }

    #[test]
    fn test_feature_data_embeds_id_and_shape() {
        let data = FeatureData::new(
            FeatureId::new("feature-1"),
            ShapeName::Marker.into(),
            point(),
            SourceName::Main,
            None,
        );
        assert_eq!(data.geojson().id, Some(FeatureId::new("feature-1")));
        assert_eq!(data.geojson().property_str(FEATURE_ID_PROPERTY), Some("feature-1"));
        assert_eq!(data.geojson().property_str(SHAPE_PROPERTY), Some("marker"));
        assert!(!data.temporary());
    }

    #[test]
    fn test_feature_shape_parse() {
        assert_eq!(FeatureShape::parse("line"), Some(FeatureShape::Shape(ShapeName::Line)));
        assert_eq!(
            FeatureShape::parse("edge_marker"),
            Some(FeatureShape::Helper(HelperShape::EdgeMarker))
        );
        assert_eq!(FeatureShape::parse("circle"), None);
    }
}
