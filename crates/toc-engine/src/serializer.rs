//! Storable layer and group records.
//!
//! A stored layer is the descriptor plus everything needed to rebuild its
//! renderable layer: source recipe, map-side visibility and opacity, render
//! properties and, for layers flagged [`STORED_FEATURES`](toc_common::STORED_FEATURES),
//! the features themselves as GeoJSON.

use serde::{Deserialize, Serialize};
use tracing::debug;

use toc_common::{
    FeatureCollection, GroupDescriptor, LayerDescriptor, LayerType, RebuildParams,
    RenderProperties, SourceType, TocError, TocResult,
};

use crate::surface::{MapSurface, RenderLayer};

/// One layer in storable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredLayer {
    #[serde(flatten)]
    pub descriptor: LayerDescriptor,
    pub layer_type: LayerType,
    pub source_type: SourceType,
    /// Visibility of the renderable layer when stored
    pub map_visible: bool,
    /// Opacity of the renderable layer when stored
    pub map_opacity: f64,
    pub properties: RenderProperties,
    pub rebuild: RebuildParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureCollection>,
}

/// Capture a bound descriptor and its renderable layer.
pub fn to_storable<S: MapSurface>(surface: &S, layer: &LayerDescriptor) -> TocResult<StoredLayer> {
    let handle = layer.handle()?;
    let render = surface
        .layer(handle)
        .ok_or_else(|| TocError::LayerNotFound(layer.name.clone()))?;

    let features = render
        .rebuild
        .has_stored_features()
        .then(|| FeatureCollection::new(render.features.clone()));

    Ok(StoredLayer {
        descriptor: layer.clone(),
        layer_type: render.rebuild.source_type.layer_type(),
        source_type: render.rebuild.source_type,
        map_visible: render.visible,
        map_opacity: render.opacity,
        properties: render.properties.clone(),
        rebuild: render.rebuild.clone(),
        features,
    })
}

/// Recreate (or reuse) the renderable layer of a stored record and return
/// its descriptor bound to it.
///
/// The renderable layer takes the stored recipe, map visibility, opacity and
/// properties, and its z-index is the descriptor's draw index.
pub fn from_storable<S: MapSurface>(surface: &mut S, stored: &StoredLayer) -> TocResult<LayerDescriptor> {
    let name = &stored.descriptor.name;
    if name.is_empty() {
        return Err(TocError::skippable("<unnamed>", "stored layer has no name"));
    }

    let acquired = surface.get_or_create(name, || RenderLayer::new(stored.rebuild.clone()));
    let handle = acquired.handle();
    if !acquired.is_new() {
        surface.set_rebuild(handle, stored.rebuild.clone())?;
    }
    surface.set_properties(handle, stored.properties.clone())?;
    surface.set_visible(handle, stored.map_visible)?;
    surface.set_opacity(handle, stored.map_opacity)?;
    surface.set_z_index(handle, stored.descriptor.draw_index)?;
    if stored.rebuild.has_stored_features() {
        let features = stored
            .features
            .as_ref()
            .map(|c| c.features.clone())
            .unwrap_or_default();
        surface.set_features(handle, features)?;
    }

    debug!(
        layer = %name,
        handle = %handle,
        created = acquired.is_new(),
        "Restored stored layer"
    );
    let mut descriptor = stored.descriptor.clone();
    descriptor.layer = Some(handle);
    Ok(descriptor)
}

/// One group in storable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredGroup {
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub default_group: bool,
    pub url: Option<String>,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub visible_layers: Vec<String>,
    pub wms_group_url: Option<String>,
    pub custom_rest_url: Option<String>,
    #[serde(default)]
    pub layers: Vec<StoredLayer>,
}

impl StoredGroup {
    /// Capture a resolved group and all its bound layers.
    pub fn capture<S: MapSurface>(surface: &S, group: &GroupDescriptor) -> TocResult<Self> {
        let layers = group
            .layers
            .iter()
            .map(|l| to_storable(surface, l))
            .collect::<TocResult<Vec<_>>>()?;
        Ok(Self {
            value: group.value.clone(),
            label: group.label.clone(),
            default_group: group.default_group,
            url: group.url.clone(),
            prefix: group.prefix.clone(),
            visible_layers: group.visible_layers.clone(),
            wms_group_url: group.wms_group_url.clone(),
            custom_rest_url: group.custom_rest_url.clone(),
            layers,
        })
    }

    /// The group without its layers.
    pub fn descriptor(&self) -> GroupDescriptor {
        let mut group = GroupDescriptor::new(&self.value, &self.label);
        group.default_group = self.default_group;
        group.url = self.url.clone();
        group.prefix = self.prefix.clone();
        group.visible_layers = self.visible_layers.clone();
        group.wms_group_url = self.wms_group_url.clone();
        group.custom_rest_url = self.custom_rest_url.clone();
        group
    }
}

/// Capture every group as JSON.
pub fn groups_to_json<S: MapSurface>(surface: &S, groups: &[GroupDescriptor]) -> TocResult<String> {
    let stored = groups
        .iter()
        .map(|g| StoredGroup::capture(surface, g))
        .collect::<TocResult<Vec<_>>>()?;
    Ok(serde_json::to_string_pretty(&stored)?)
}

/// Parse groups written by [`groups_to_json`].
pub fn groups_from_json(json: &str) -> TocResult<Vec<StoredGroup>> {
    serde_json::from_str(json).map_err(|e| TocError::MalformedSource(format!("stored groups: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::make_layer;
    use crate::surface::LayerRegistry;
    use toc_common::{Feature, Geometry};

    fn drawings(surface: &mut LayerRegistry) -> LayerDescriptor {
        let mut render = RenderLayer::new(RebuildParams::stored_features("myMaps"));
        render.features = vec![
            Feature::new(Geometry::point(-8875141.0, 5543492.0)).with_property("label", "Home"),
        ];
        render.opacity = 0.7;
        let group = GroupDescriptor::new("myMaps", "My Maps");
        make_layer(surface, &group, "myMaps", "My Drawings", 150, render).unwrap()
    }

    #[test]
    fn test_round_trip_keeps_descriptor_and_features() {
        let mut surface = LayerRegistry::new();
        let layer = drawings(&mut surface);
        let stored = to_storable(&surface, &layer).unwrap();
        assert_eq!(stored.layer_type, LayerType::Vector);
        assert_eq!(stored.features.as_ref().map(|f| f.features.len()), Some(1));

        let json = serde_json::to_string(&stored).unwrap();
        let parsed: StoredLayer = serde_json::from_str(&json).unwrap();

        let mut fresh = LayerRegistry::new();
        let restored = from_storable(&mut fresh, &parsed).unwrap();
        assert_eq!(restored, layer);

        let render = fresh.layer(restored.handle().unwrap()).unwrap();
        assert_eq!(render.features.len(), 1);
        assert_eq!(render.opacity, 0.7);
        assert_eq!(render.z_index, 150);
        assert_eq!(render.properties.display_name, "My Drawings");
    }

    #[test]
    fn test_restoring_into_same_surface_reuses_layer() {
        let mut surface = LayerRegistry::new();
        let layer = drawings(&mut surface);
        let stored = to_storable(&surface, &layer).unwrap();
        let restored = from_storable(&mut surface, &stored).unwrap();
        assert_eq!(restored.layer, layer.layer);
        assert_eq!(surface.len(), 1);
        assert_eq!(surface.features(restored.handle().unwrap()).unwrap().len(), 1);
    }

    #[test]
    fn test_reused_layer_takes_stored_recipe() {
        let mut surface = LayerRegistry::new();
        let layer = drawings(&mut surface);
        let mut stored = to_storable(&surface, &layer).unwrap();
        stored.rebuild.projection = Some("EPSG:3857".to_string());
        stored.rebuild.extent = Some([-8900000.0, 5500000.0, -8850000.0, 5580000.0]);

        let restored = from_storable(&mut surface, &stored).unwrap();
        assert_eq!(surface.len(), 1);
        let render = surface.layer(restored.handle().unwrap()).unwrap();
        assert_eq!(render.rebuild, stored.rebuild);
        assert_eq!(render.rebuild.projection.as_deref(), Some("EPSG:3857"));
    }

    #[test]
    fn test_wms_layers_carry_no_features() {
        let mut surface = LayerRegistry::new();
        let group = GroupDescriptor::new("simcoe:Public", "Public");
        let render = RenderLayer::new(RebuildParams::image_wms(
            "https://opengis.example.ca/geoserver/wms",
            "simcoe:Parcels",
            "simcoe:Parcels",
        ));
        let layer = make_layer(&mut surface, &group, "simcoe:Parcels", "Parcels", 101, render).unwrap();
        let stored = to_storable(&surface, &layer).unwrap();
        assert!(stored.features.is_none());
        assert!(!serde_json::to_string(&stored).unwrap().contains("\"features\""));
    }

    #[test]
    fn test_unbound_layer_cannot_be_stored() {
        let surface = LayerRegistry::new();
        let mut surface_layer = LayerRegistry::new();
        let mut layer = drawings(&mut surface_layer);
        layer.layer = None;
        assert!(matches!(to_storable(&surface, &layer), Err(TocError::LayerNotFound(_))));
    }

    #[test]
    fn test_group_json_round_trip() {
        let mut surface = LayerRegistry::new();
        let layer = drawings(&mut surface);
        let mut group = GroupDescriptor::new("myMaps", "My Maps");
        group.default_group = true;
        group.layers.push(layer);

        let json = groups_to_json(&surface, &[group.clone()]).unwrap();
        let stored = groups_from_json(&json).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].descriptor().value, "myMaps");
        assert!(stored[0].default_group);
        assert_eq!(stored[0].layers[0].descriptor, group.layers[0]);

        assert!(matches!(groups_from_json("{"), Err(TocError::MalformedSource(_))));
    }
}
