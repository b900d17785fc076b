//! Map surface: the collection of renderable layers the engine drives.
//!
//! The engine never owns a renderer. It creates, configures and removes
//! [`RenderLayer`] recipes through the [`MapSurface`] trait and refers to them
//! by [`LayerHandle`]. [`LayerRegistry`] is the in-process implementation,
//! keyed by layer name so a layer is never added twice.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use toc_common::{
    Feature, LayerHandle, RebuildParams, RenderProperties, SourceType, TocError, TocResult,
};
use wms_protocol::FeatureInfoQuery;

/// A renderable layer as held by the map surface.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderLayer {
    pub rebuild: RebuildParams,
    pub visible: bool,
    pub opacity: f64,
    pub z_index: i64,
    pub properties: RenderProperties,
    /// Features carried by vector layers
    pub features: Vec<Feature>,
}

impl RenderLayer {
    pub fn new(rebuild: RebuildParams) -> Self {
        let properties = RenderProperties {
            name: rebuild.name.clone(),
            ..RenderProperties::default()
        };
        Self {
            rebuild,
            visible: true,
            opacity: 1.0,
            z_index: 0,
            properties,
            features: Vec::new(),
        }
    }

    /// Layer name used for registry lookups.
    pub fn name(&self) -> &str {
        &self.properties.name
    }
}

/// Outcome of [`MapSurface::get_or_create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquired {
    Created(LayerHandle),
    Reused(LayerHandle),
}

impl Acquired {
    pub fn handle(&self) -> LayerHandle {
        match self {
            Acquired::Created(h) | Acquired::Reused(h) => *h,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Acquired::Created(_))
    }
}

/// Operations the engine needs from a map.
pub trait MapSurface {
    /// Add a layer and return its handle.
    fn add_layer(&mut self, layer: RenderLayer) -> LayerHandle;

    /// Remove a layer, returning it if it existed.
    fn remove_layer(&mut self, handle: LayerHandle) -> Option<RenderLayer>;

    fn layer(&self, handle: LayerHandle) -> Option<&RenderLayer>;

    fn layer_mut(&mut self, handle: LayerHandle) -> Option<&mut RenderLayer>;

    /// Find a layer by its `name` property.
    fn find_by_name(&self, name: &str) -> Option<LayerHandle>;

    /// All handles in insertion order.
    fn handles(&self) -> Vec<LayerHandle>;

    /// Existing layer with this name, or a new one built by `create`.
    fn get_or_create<F>(&mut self, name: &str, create: F) -> Acquired
    where
        Self: Sized,
        F: FnOnce() -> RenderLayer,
    {
        match self.find_by_name(name) {
            Some(handle) => Acquired::Reused(handle),
            None => Acquired::Created(self.add_layer(create())),
        }
    }

    fn len(&self) -> usize {
        self.handles().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_visible(&self, handle: LayerHandle) -> Option<bool> {
        self.layer(handle).map(|l| l.visible)
    }

    fn set_visible(&mut self, handle: LayerHandle, visible: bool) -> TocResult<()> {
        existing(self.layer_mut(handle), handle)?.visible = visible;
        Ok(())
    }

    fn get_opacity(&self, handle: LayerHandle) -> Option<f64> {
        self.layer(handle).map(|l| l.opacity)
    }

    /// Set opacity, clamped to [0, 1].
    fn set_opacity(&mut self, handle: LayerHandle, opacity: f64) -> TocResult<()> {
        existing(self.layer_mut(handle), handle)?.opacity = opacity.clamp(0.0, 1.0);
        Ok(())
    }

    fn set_z_index(&mut self, handle: LayerHandle, z_index: i64) -> TocResult<()> {
        existing(self.layer_mut(handle), handle)?.z_index = z_index;
        Ok(())
    }

    fn set_properties(&mut self, handle: LayerHandle, properties: RenderProperties) -> TocResult<()> {
        existing(self.layer_mut(handle), handle)?.properties = properties;
        Ok(())
    }

    /// Replace the source recipe the layer is rebuilt from.
    fn set_rebuild(&mut self, handle: LayerHandle, rebuild: RebuildParams) -> TocResult<()> {
        existing(self.layer_mut(handle), handle)?.rebuild = rebuild;
        Ok(())
    }

    /// Replace the features of a vector layer.
    fn set_features(&mut self, handle: LayerHandle, features: Vec<Feature>) -> TocResult<()> {
        existing(self.layer_mut(handle), handle)?.features = features;
        Ok(())
    }

    fn features(&self, handle: LayerHandle) -> Option<&[Feature]> {
        self.layer(handle).map(|l| l.features.as_slice())
    }

    /// GetFeatureInfo URL for a WMS-backed layer; `None` for other sources.
    fn feature_info_url(&self, handle: LayerHandle, query: &FeatureInfoQuery) -> Option<String> {
        let rebuild = &self.layer(handle)?.rebuild;
        match rebuild.source_type {
            SourceType::ImageWms | SourceType::TileWms => {
                Some(query.url(rebuild.url.as_deref()?, rebuild.layer_name.as_deref()?))
            }
            SourceType::Vector | SourceType::Xyz => None,
        }
    }
}

fn existing(layer: Option<&mut RenderLayer>, handle: LayerHandle) -> TocResult<&mut RenderLayer> {
    layer.ok_or_else(|| TocError::LayerNotFound(handle.to_string()))
}

/// Name-keyed layer registry.
#[derive(Debug, Default)]
pub struct LayerRegistry {
    next_id: u64,
    layers: BTreeMap<LayerHandle, RenderLayer>,
    by_name: HashMap<String, LayerHandle>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (LayerHandle, &RenderLayer)> {
        self.layers.iter().map(|(h, l)| (*h, l))
    }
}

impl MapSurface for LayerRegistry {
    fn add_layer(&mut self, layer: RenderLayer) -> LayerHandle {
        self.next_id += 1;
        let handle = LayerHandle(self.next_id);
        debug!(handle = %handle, name = %layer.name(), "Adding layer to map");
        self.by_name.insert(layer.name().to_string(), handle);
        self.layers.insert(handle, layer);
        handle
    }

    fn remove_layer(&mut self, handle: LayerHandle) -> Option<RenderLayer> {
        let layer = self.layers.remove(&handle)?;
        if self.by_name.get(layer.name()) == Some(&handle) {
            self.by_name.remove(layer.name());
        }
        debug!(handle = %handle, name = %layer.name(), "Removed layer from map");
        Some(layer)
    }

    fn layer(&self, handle: LayerHandle) -> Option<&RenderLayer> {
        self.layers.get(&handle)
    }

    fn layer_mut(&mut self, handle: LayerHandle) -> Option<&mut RenderLayer> {
        self.layers.get_mut(&handle)
    }

    fn find_by_name(&self, name: &str) -> Option<LayerHandle> {
        self.by_name.get(name).copied()
    }

    fn handles(&self) -> Vec<LayerHandle> {
        self.layers.keys().copied().collect()
    }

    fn len(&self) -> usize {
        self.layers.len()
    }

    // Keeps the name index in step when a layer is renamed
    fn set_properties(&mut self, handle: LayerHandle, properties: RenderProperties) -> TocResult<()> {
        let layer = existing(self.layers.get_mut(&handle), handle)?;
        if layer.properties.name != properties.name {
            if self.by_name.get(&layer.properties.name) == Some(&handle) {
                self.by_name.remove(&layer.properties.name);
            }
            self.by_name.insert(properties.name.clone(), handle);
        }
        layer.properties = properties;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wms_layer(name: &str) -> RenderLayer {
        RenderLayer::new(RebuildParams::image_wms(
            "https://opengis.example.ca/geoserver/wms",
            name,
            name,
        ))
    }

    #[test]
    fn test_get_or_create_reuses_by_name() {
        let mut registry = LayerRegistry::new();
        let first = registry.get_or_create("simcoe:Parcels", || wms_layer("simcoe:Parcels"));
        let second = registry.get_or_create("simcoe:Parcels", || wms_layer("simcoe:Parcels"));
        assert!(first.is_new());
        assert_eq!(second, Acquired::Reused(first.handle()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_setters_and_missing_handles() {
        let mut registry = LayerRegistry::new();
        let h = registry.add_layer(wms_layer("a"));
        registry.set_visible(h, false).unwrap();
        registry.set_opacity(h, 3.0).unwrap();
        registry.set_z_index(h, 104).unwrap();
        assert_eq!(registry.get_visible(h), Some(false));
        assert_eq!(registry.get_opacity(h), Some(1.0));
        assert_eq!(registry.layer(h).unwrap().z_index, 104);

        let gone = LayerHandle(42);
        assert!(matches!(registry.set_visible(gone, true), Err(TocError::LayerNotFound(_))));
        assert_eq!(registry.get_visible(gone), None);
    }

    #[test]
    fn test_remove_clears_name_index() {
        let mut registry = LayerRegistry::new();
        let h = registry.add_layer(wms_layer("a"));
        assert!(registry.remove_layer(h).is_some());
        assert!(registry.remove_layer(h).is_none());
        assert_eq!(registry.find_by_name("a"), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_rename_through_properties() {
        let mut registry = LayerRegistry::new();
        let h = registry.add_layer(wms_layer("a"));
        let props = RenderProperties {
            name: "b".to_string(),
            ..RenderProperties::default()
        };
        registry.set_properties(h, props).unwrap();
        assert_eq!(registry.find_by_name("a"), None);
        assert_eq!(registry.find_by_name("b"), Some(h));
    }

    #[test]
    fn test_feature_info_only_for_wms_sources() {
        let mut registry = LayerRegistry::new();
        let wms = registry.add_layer(wms_layer("simcoe:Parcels"));
        let vector = registry.add_layer(RenderLayer::new(RebuildParams::stored_features("myMaps")));
        let query = FeatureInfoQuery::new([-8875141.0, 5543492.0], 2.0, "EPSG:3857");

        let url = registry.feature_info_url(wms, &query).unwrap();
        assert!(url.starts_with("https://opengis.example.ca/geoserver/wms?"));
        assert!(url.contains("QUERY_LAYERS=simcoe%3AParcels"));
        assert_eq!(registry.feature_info_url(vector, &query), None);
    }
}
