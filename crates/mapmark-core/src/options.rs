//! Configuration: settings, default layer styles and mode relations.

use crate::adapter::{LayerType, PartialLayerStyle};
use crate::error::Result;
use crate::features::{Feature, FeatureId, FeatureShape, HelperShape, ShapeName, SourceName};
use crate::modes::{DrawModeName, EditModeName, HelperModeName, ModeName};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// How ids are assigned to features created without one.
#[derive(Clone, Default)]
pub enum IdGenerator {
    /// `feature-<n>`, skipping ids already in use.
    #[default]
    Counter,
    /// Random v4 UUIDs.
    Uuid,
    /// Caller-supplied generator.
    Custom(Rc<dyn Fn(&Feature) -> FeatureId>),
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdGenerator::Counter => f.write_str("Counter"),
            IdGenerator::Uuid => f.write_str("Uuid"),
            IdGenerator::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Sources created on init.
    pub sources: Vec<SourceName>,
    /// Source receiving imported and externally added features.
    pub default_source: SourceName,
    /// Create the layers of `layer_styles` on init.
    pub use_default_layers: bool,
    /// Upper bound of the generic layer name search.
    pub max_generic_layers: usize,
    #[serde(skip)]
    pub id_generator: IdGenerator,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sources: vec![SourceName::Main, SourceName::Temporary],
            default_source: SourceName::Main,
            use_default_layers: true,
            max_generic_layers: 100,
            id_generator: IdGenerator::default(),
        }
    }
}

/// A mode that needs another mode running alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeDependency {
    pub mode: ModeName,
    pub requires: ModeName,
}

/// Which modes end each other and which modes start together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeRelations {
    /// Groups whose members cannot run at the same time.
    pub exclusive: Vec<Vec<ModeName>>,
    /// Companion modes started after a mode starts.
    pub related: Vec<ModeDependency>,
}

impl Default for ModeRelations {
    fn default() -> Self {
        let mut group: Vec<ModeName> = DrawModeName::ALL.into_iter().map(ModeName::Draw).collect();
        group.extend(EditModeName::ALL.into_iter().map(ModeName::Edit));

        Self {
            exclusive: vec![group],
            related: vec![ModeDependency {
                mode: ModeName::Edit(EditModeName::Drag),
                requires: ModeName::Helper(HelperModeName::ShapeMarkers),
            }],
        }
    }
}

impl ModeRelations {
    /// Modes sharing an exclusive group with `mode`.
    pub fn exclusive_with(&self, mode: ModeName) -> Vec<ModeName> {
        let mut result: Vec<ModeName> = Vec::new();
        for group in self.exclusive.iter().filter(|group| group.contains(&mode)) {
            for other in group {
                if *other != mode && !result.contains(other) {
                    result.push(*other);
                }
            }
        }
        result
    }

    /// Companion modes of `mode`.
    pub fn requirements_of(&self, mode: ModeName) -> Vec<ModeName> {
        self.related
            .iter()
            .filter(|dependency| dependency.mode == mode)
            .map(|dependency| dependency.requires)
            .collect()
    }

    /// Modes needing `companion`.
    pub fn dependents_of(&self, companion: ModeName) -> Vec<ModeName> {
        self.related
            .iter()
            .filter(|dependency| dependency.requires == companion)
            .map(|dependency| dependency.mode)
            .collect()
    }
}

/// Layer styles per shape and source.
pub type LayerStyles = IndexMap<FeatureShape, IndexMap<SourceName, Vec<PartialLayerStyle>>>;

fn styles_for_all_sources(styles: Vec<PartialLayerStyle>) -> IndexMap<SourceName, Vec<PartialLayerStyle>> {
    SourceName::ALL
        .into_iter()
        .map(|source| (source, styles.clone()))
        .collect()
}

/// Built-in layer styles.
pub fn default_layer_styles() -> LayerStyles {
    let circle = |color: &str, radius: f64| {
        PartialLayerStyle::new(LayerType::Circle)
            .with_paint("circle-color", color)
            .with_paint("circle-radius", radius)
    };
    let line = PartialLayerStyle::new(LayerType::Line)
        .with_paint("line-color", "#278cda")
        .with_paint("line-width", 3);
    let fill = PartialLayerStyle::new(LayerType::Fill)
        .with_paint("fill-color", "#278cda")
        .with_paint("fill-opacity", 0.4);
    let symbol = PartialLayerStyle::new(LayerType::Symbol);

    let mut styles = LayerStyles::new();
    styles.insert(ShapeName::Marker.into(), styles_for_all_sources(vec![circle("#278cda", 6.0)]));
    styles.insert(ShapeName::Line.into(), styles_for_all_sources(vec![line.clone()]));
    styles.insert(ShapeName::Polygon.into(), styles_for_all_sources(vec![fill.clone(), line.clone()]));
    styles.insert(ShapeName::Rectangle.into(), styles_for_all_sources(vec![fill, line]));
    styles.insert(ShapeName::TextMarker.into(), styles_for_all_sources(vec![symbol]));
    for helper in HelperShape::ALL {
        styles.insert(helper.into(), styles_for_all_sources(vec![circle("#ffffff", 4.0)]));
    }
    styles
}

/// Complete configuration of a [`crate::MapMark`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub settings: Settings,
    pub layer_styles: LayerStyles,
    pub mode_relations: ModeRelations,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            layer_styles: default_layer_styles(),
            mode_relations: ModeRelations::default(),
        }
    }
}

impl Options {
    /// Load options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.settings.sources, vec![SourceName::Main, SourceName::Temporary]);
        assert_eq!(options.settings.default_source, SourceName::Main);
        assert_eq!(options.settings.max_generic_layers, 100);
        assert!(options.settings.use_default_layers);
        assert!(matches!(options.settings.id_generator, IdGenerator::Counter));
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{
            "settings": { "sources": ["main", "temporary", "standby"], "use_default_layers": false },
            "mode_relations": {
                "exclusive": [[{"draw": "line"}, {"draw": "polygon"}]],
                "related": []
            }
        }"#;
        let options = Options::from_json(json).unwrap();
        assert_eq!(options.settings.sources.len(), 3);
        assert!(!options.settings.use_default_layers);
        assert_eq!(options.settings.max_generic_layers, 100);
        assert!(options.mode_relations.related.is_empty());
        assert_eq!(
            options.mode_relations.exclusive_with(ModeName::Draw(DrawModeName::Line)),
            vec![ModeName::Draw(DrawModeName::Polygon)]
        );
        assert!(!options.layer_styles.is_empty());
    }

    #[test]
    fn test_layer_styles_from_json() {
        let json = r#"{ "layer_styles": { "marker": { "main": [ { "type": "circle" } ] } } }"#;
        let options = Options::from_json(json).unwrap();
        let marker = &options.layer_styles[&FeatureShape::Shape(ShapeName::Marker)];
        assert_eq!(marker[&SourceName::Main][0].layer_type, LayerType::Circle);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(matches!(
            Options::from_json("{ \"settings\": 3 }"),
            Err(crate::Error::Options(_))
        ));
    }

    #[test]
    fn test_default_relations() {
        let relations = ModeRelations::default();
        let drag = ModeName::Edit(EditModeName::Drag);
        let markers = ModeName::Helper(HelperModeName::ShapeMarkers);

        let exclusive = relations.exclusive_with(ModeName::Draw(DrawModeName::Polygon));
        assert!(exclusive.contains(&ModeName::Draw(DrawModeName::Line)));
        assert!(exclusive.contains(&drag));
        assert!(!exclusive.contains(&markers));
        assert_eq!(relations.requirements_of(drag), vec![markers]);
        assert_eq!(relations.dependents_of(markers), vec![drag]);
    }
}
