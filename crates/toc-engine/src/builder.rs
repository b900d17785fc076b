//! Layer descriptor construction.
//!
//! Combines one source record, its group context and any persisted state into
//! a [`LayerDescriptor`], and creates (or reuses) the matching renderable
//! layer on the map surface.

use tracing::debug;

use storage::{GroupLayerState, PersistedLayerState};
use toc_common::{
    Geometry, GroupDescriptor, LayerDescriptor, RebuildParams, RenderProperties, TocError,
    TocResult,
};
use wms_protocol::urls::{
    geoserver_root, https_upgrade, legend_graphic_url, rest_metadata_url, rest_root_info_url,
    server_from_rest_href, wfs_feature_url, wfs_intersects_url, wms_endpoint,
};
use wms_protocol::{CapabilityLayer, PublishedLayer};

use crate::keywords::LayerKeywords;
use crate::surface::{Acquired, MapSurface, RenderLayer};

/// Where a record came from; decides how its legend is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOrigin {
    /// GetCapabilities `<Layer>`; legend comes from its style
    Capabilities,
    /// REST listing entry; legend is requested from GetLegendGraphic
    Rest,
}

/// Source-neutral view of one layer record.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRecord {
    pub name: Option<String>,
    pub title: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub min_scale: Option<f64>,
    pub max_scale: Option<f64>,
    pub legend_url: Option<String>,
    pub queryable: bool,
    pub opaque: bool,
    /// Server URL of this record when it differs per record (REST listings)
    pub server_url: Option<String>,
    pub origin: RecordOrigin,
}

impl LayerRecord {
    pub fn from_capability(layer: &CapabilityLayer) -> Self {
        Self {
            name: layer.name.clone(),
            title: layer.title.clone(),
            keywords: layer.keywords.clone(),
            min_scale: layer.min_scale,
            max_scale: layer.max_scale,
            legend_url: layer.legend_url.clone(),
            queryable: layer.queryable,
            opaque: layer.opaque,
            server_url: None,
            origin: RecordOrigin::Capabilities,
        }
    }

    pub fn from_published(layer: &PublishedLayer) -> Self {
        Self {
            name: layer.name.clone(),
            title: layer.title().map(str::to_string),
            keywords: layer.keywords(),
            min_scale: None,
            max_scale: None,
            legend_url: None,
            queryable: false,
            opaque: false,
            server_url: layer
                .href
                .as_deref()
                .map(|href| server_from_rest_href(href).to_string()),
            origin: RecordOrigin::Rest,
        }
    }

    /// Non-empty layer name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }
}

/// Builds the descriptors of one group.
#[derive(Debug)]
pub struct LayerDescriptorBuilder<'a> {
    group: &'a GroupDescriptor,
    saved: Option<&'a GroupLayerState>,
    server_url: Option<String>,
}

impl<'a> LayerDescriptorBuilder<'a> {
    pub fn new(group: &'a GroupDescriptor, persisted: &'a PersistedLayerState) -> Self {
        let server_url = group
            .wms_group_url
            .as_deref()
            .or(group.url.as_deref())
            .map(geoserver_root);
        Self {
            group,
            saved: persisted.group(&group.value),
            server_url,
        }
    }

    /// GeoServer root serving `record`: its own, else the group's.
    pub fn server_for<'r>(&'r self, record: &'r LayerRecord) -> Option<&'r str> {
        record.server_url.as_deref().or(self.server_url.as_deref())
    }

    /// Build one descriptor and bind it to a renderable layer.
    ///
    /// Records without a name or without a resolvable server are rejected
    /// with [`TocError::SkippableRecord`].
    pub fn build<S: MapSurface>(
        &self,
        surface: &mut S,
        record: &LayerRecord,
        draw_index: i64,
    ) -> TocResult<LayerDescriptor> {
        let name = record
            .name()
            .ok_or_else(|| TocError::skippable("<unnamed>", "layer record has no Name"))?;
        let server = self
            .server_for(record)
            .ok_or_else(|| TocError::skippable(name, "no server URL for layer"))?;

        let keywords = LayerKeywords::parse(record.keywords.as_deref());
        let title = record
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(name);
        let display_name = if keywords.display_name.is_empty() {
            title.to_string()
        } else {
            keywords.display_name.clone()
        };
        let display_name = if self.group.prefix.is_empty() {
            display_name
        } else {
            format!("{} - {}", self.group.prefix, display_name)
        };

        let saved = self.saved.and_then(|g| g.get(name));
        let visible = match saved {
            Some(state) => state.visible,
            None => self.group.is_default_visible(name),
        };
        let opacity = saved
            .and_then(|s| s.opacity)
            .unwrap_or(keywords.opacity)
            .clamp(0.0, 1.0);

        let style_url = match (&record.legend_url, record.origin) {
            (Some(legend), _) => https_upgrade(legend),
            (None, RecordOrigin::Rest) => legend_graphic_url(server, name),
            (None, RecordOrigin::Capabilities) => String::new(),
        };
        let wfs_url = wfs_feature_url(server, name);

        let descriptor = LayerDescriptor {
            name: name.to_string(),
            display_name,
            identify_display_name: keywords.display_name.clone(),
            style_url,
            draw_index,
            visible,
            opacity,
            min_scale: record.min_scale,
            max_scale: record.max_scale,
            live_layer: keywords.live_layer,
            can_download: keywords.can_download,
            identify: keywords.identify_columns(),
            disclaimer: keywords.disclaimer(),
            group: self.group.value.clone(),
            group_name: self.group.label.clone(),
            metadata_url: Some(rest_metadata_url(server, name)),
            wfs_url: Some(wfs_url),
            show_legend: false,
            queryable: record.queryable,
            opaque: record.opaque,
            layer: None,
        };

        let properties = RenderProperties {
            root_info_url: Some(rest_root_info_url(server, name)),
            ..descriptor.render_properties()
        };
        let rebuild = RebuildParams::image_wms(wms_endpoint(server), name, name);
        bind(surface, descriptor, properties, || RenderLayer::new(rebuild))
    }
}

/// Bind a descriptor to a client-side layer such as user drawings.
///
/// The layer is created from `render` unless one with the same name already
/// exists, in which case that one is reused.
pub fn make_layer<S: MapSurface>(
    surface: &mut S,
    group: &GroupDescriptor,
    name: &str,
    display_name: &str,
    draw_index: i64,
    render: RenderLayer,
) -> TocResult<LayerDescriptor> {
    let descriptor = LayerDescriptor {
        name: name.to_string(),
        display_name: display_name.to_string(),
        identify_display_name: String::new(),
        style_url: String::new(),
        draw_index,
        visible: render.visible,
        opacity: render.opacity,
        min_scale: None,
        max_scale: None,
        live_layer: false,
        can_download: false,
        identify: Default::default(),
        disclaimer: None,
        group: group.value.clone(),
        group_name: group.label.clone(),
        metadata_url: None,
        wfs_url: None,
        show_legend: false,
        queryable: false,
        opaque: false,
        layer: None,
    };
    let properties = descriptor.render_properties();
    bind(surface, descriptor, properties, || render)
}

/// WFS query for the features of `layer` intersecting `geometry`.
///
/// `None` for layers without a WFS endpoint, such as user drawings.
pub fn wfs_intersects_query(layer: &LayerDescriptor, geometry: &Geometry) -> Option<String> {
    let wfs_url = layer.wfs_url.as_deref()?;
    Some(wfs_intersects_url(wfs_url, &geometry.to_wkt()))
}

/// Acquire the renderable layer for `descriptor` and apply its state.
fn bind<S: MapSurface, F: FnOnce() -> RenderLayer>(
    surface: &mut S,
    mut descriptor: LayerDescriptor,
    properties: RenderProperties,
    create: F,
) -> TocResult<LayerDescriptor> {
    let acquired = surface.get_or_create(&descriptor.name, create);
    let handle = acquired.handle();
    surface.set_properties(handle, properties)?;
    surface.set_visible(handle, descriptor.visible)?;
    surface.set_opacity(handle, descriptor.opacity)?;
    surface.set_z_index(handle, descriptor.draw_index)?;

    debug!(
        layer = %descriptor.name,
        handle = %handle,
        created = matches!(acquired, Acquired::Created(_)),
        draw_index = descriptor.draw_index,
        visible = descriptor.visible,
        "Bound layer descriptor"
    );
    descriptor.layer = Some(handle);
    Ok(descriptor)
}
