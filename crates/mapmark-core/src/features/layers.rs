//! Renderer layers for the feature sources.

use super::{FeatureShape, Features, SourceName};
use crate::adapter::{LayerId, LayerSpec, MapAdapter, PartialLayerStyle};
use crate::error::{Error, Result};
use crate::options::LayerStyles;

impl Features {
    /// Create one layer per style of every shape, for every created source.
    ///
    /// If one layer fails, the layers created before it are removed.
    pub fn create_layers(&self, adapter: &mut dyn MapAdapter, styles: &LayerStyles) -> Result<Vec<LayerId>> {
        let mut layers = Vec::new();

        for source in self.source_names() {
            for (shape, per_source) in styles {
                let Some(source_styles) = per_source.get(&source) else {
                    continue;
                };
                for style in source_styles {
                    match self.create_generic_layer(adapter, source, vec![*shape], style.clone()) {
                        Ok(layer) => layers.push(layer),
                        Err(err) => {
                            for layer in &layers {
                                adapter.remove_layer(layer);
                            }
                            return Err(err);
                        }
                    }
                }
            }
        }
        Ok(layers)
    }

    /// Create a layer rendering `shapes` of `source`.
    pub fn create_generic_layer(
        &self,
        adapter: &mut dyn MapAdapter,
        source: SourceName,
        shapes: Vec<FeatureShape>,
        style: PartialLayerStyle,
    ) -> Result<LayerId> {
        let id = self.generic_layer_name(&*adapter, source, &shapes, &style)?;
        let layer = LayerSpec {
            id: id.clone(),
            source,
            shapes,
            style,
        };
        adapter.add_layer(layer).ok_or(Error::LayerCreation(id))
    }

    /// First free id of the form `<source>-<shape|mixed>__<type>-layer-<i>`.
    ///
    /// Fails once `max_generic_layers` candidates are taken.
    pub fn generic_layer_name(
        &self,
        adapter: &dyn MapAdapter,
        source: SourceName,
        shapes: &[FeatureShape],
        style: &PartialLayerStyle,
    ) -> Result<String> {
        let shape = match shapes {
            [single] => single.as_str(),
            _ => "mixed",
        };

        (0..self.max_generic_layers)
            .map(|i| format!("{}-{}__{}-layer-{}", source, shape, style.layer_type.as_str(), i))
            .find(|id| adapter.get_layer(id).is_none())
            .ok_or_else(|| Error::LayerNamesExhausted {
                source_name: source,
                shape: shape.to_string(),
                limit: self.max_generic_layers,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{LayerType, MemoryAdapter};
    use crate::features::ShapeName;
    use crate::options::Options;

    fn setup(max_generic_layers: usize) -> (Features, MemoryAdapter) {
        let mut adapter = MemoryAdapter::new();
        let mut options = Options::default();
        options.settings.use_default_layers = false;
        options.settings.max_generic_layers = max_generic_layers;
        let mut features = Features::new();
        features.init(&mut adapter, &options).unwrap();
        (features, adapter)
    }

    #[test]
    fn test_layer_names_count_up() {
        let (features, mut adapter) = setup(100);
        let style = PartialLayerStyle::new(LayerType::Fill);
        let shapes = vec![FeatureShape::from(ShapeName::Polygon)];

        let first = features
            .create_generic_layer(&mut adapter, SourceName::Main, shapes.clone(), style.clone())
            .unwrap();
        let second = features
            .create_generic_layer(&mut adapter, SourceName::Main, shapes, style.clone())
            .unwrap();
        assert_eq!(first, "mm_main-polygon__fill-layer-0");
        assert_eq!(second, "mm_main-polygon__fill-layer-1");

        let mixed = features
            .generic_layer_name(
                &adapter,
                SourceName::Temporary,
                &[FeatureShape::from(ShapeName::Line), FeatureShape::from(ShapeName::Polygon)],
                &style,
            )
            .unwrap();
        assert_eq!(mixed, "mm_temporary-mixed__fill-layer-0");
    }

    #[test]
    fn test_layer_names_exhausted() {
        let (features, mut adapter) = setup(2);
        let style = PartialLayerStyle::new(LayerType::Line);
        let shapes = vec![FeatureShape::from(ShapeName::Line)];

        for _ in 0..2 {
            features
                .create_generic_layer(&mut adapter, SourceName::Main, shapes.clone(), style.clone())
                .unwrap();
        }
        let result = features.create_generic_layer(&mut adapter, SourceName::Main, shapes, style);
        assert!(matches!(result, Err(Error::LayerNamesExhausted { limit: 2, .. })));
    }

    #[test]
    fn test_default_layers_cover_every_source() {
        let mut adapter = MemoryAdapter::new();
        let mut features = Features::new();
        features.init(&mut adapter, &Options::default()).unwrap();

        let ids = adapter.layer_ids();
        assert_eq!(ids.len(), features.layers().len());
        assert!(ids.contains(&"mm_main-marker__circle-layer-0".to_string()));
        assert!(ids.contains(&"mm_temporary-polygon__line-layer-0".to_string()));
        assert!(ids.iter().all(|id| !id.starts_with("mm_standby")));
    }
}
