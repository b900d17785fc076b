//! Layer descriptors and the renderable-layer recipe types.

use serde::{Deserialize, Serialize};

/// File marker for layers whose features are stored alongside the layer
/// instead of being fetched from a service.
pub const STORED_FEATURES: &str = "STORED FEATURES";

/// Opaque reference to a renderable layer owned by the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerHandle(pub u64);

impl std::fmt::Display for LayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Licence notice a user must accept before the layer may be shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disclaimer {
    pub title: String,
    pub url: String,
}

/// Columns used by the Identify collaborator to label query results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyColumns {
    pub title_column: Option<String>,
    pub id_column: Option<String>,
}

impl IdentifyColumns {
    /// Build from raw keyword values, treating empty strings as absent.
    pub fn from_keywords(title_column: &str, id_column: &str) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            title_column: non_empty(title_column),
            id_column: non_empty(id_column),
        }
    }
}

/// Kind of data source backing a renderable layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceType {
    ImageWms,
    TileWms,
    Vector,
    Xyz,
}

/// Kind of renderable layer, derived from its source type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayerType {
    Image,
    Tile,
    Vector,
}

impl SourceType {
    pub fn layer_type(&self) -> LayerType {
        match self {
            SourceType::ImageWms => LayerType::Image,
            SourceType::TileWms | SourceType::Xyz => LayerType::Tile,
            SourceType::Vector => LayerType::Vector,
        }
    }
}

/// Recipe sufficient to recreate a renderable layer later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildParams {
    pub source_type: SourceType,
    /// Source family label (e.g. "WMS")
    pub source: String,
    pub projection: Option<String>,
    /// Layer name on the remote service
    pub layer_name: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub tiled: bool,
    /// File marker; [`STORED_FEATURES`] means features travel with the layer
    pub file: Option<String>,
    /// [min_x, min_y, max_x, max_y]
    pub extent: Option<[f64; 4]>,
    pub name: String,
}

impl RebuildParams {
    /// Recipe for an untiled WMS image layer.
    pub fn image_wms(url: impl Into<String>, layer_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source_type: SourceType::ImageWms,
            source: "WMS".to_string(),
            projection: None,
            layer_name: Some(layer_name.into()),
            url: Some(url.into()),
            tiled: false,
            file: None,
            extent: None,
            name: name.into(),
        }
    }

    /// Recipe for a vector layer whose features are stored with it.
    pub fn stored_features(name: impl Into<String>) -> Self {
        Self {
            source_type: SourceType::Vector,
            source: "Vector".to_string(),
            projection: Some("EPSG:3857".to_string()),
            layer_name: None,
            url: None,
            tiled: false,
            file: Some(STORED_FEATURES.to_string()),
            extent: None,
            name: name.into(),
        }
    }

    pub fn has_stored_features(&self) -> bool {
        self.file.as_deref() == Some(STORED_FEATURES)
    }
}

/// Named properties set on the renderable layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderProperties {
    pub name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wfs_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_info_url: Option<String>,
    #[serde(default)]
    pub disable_parcel_click: bool,
    #[serde(default)]
    pub live_layer: bool,
    #[serde(default)]
    pub queryable: bool,
    #[serde(default)]
    pub opaque: bool,
}

/// Canonical in-memory record for one map layer in the table of contents.
///
/// Equality compares the described state only; two descriptors bound to
/// different renderable handles are equal if everything else matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    /// Stable layer name, unique within the map
    pub name: String,

    /// Display name after keyword resolution and group prefixing
    pub display_name: String,

    /// Raw DISPLAY_NAME keyword, used by Identify
    #[serde(default)]
    pub identify_display_name: String,

    /// Legend swatch URL
    #[serde(default)]
    pub style_url: String,

    /// Stacking order; higher draws on top
    pub draw_index: i64,

    pub visible: bool,

    /// Opacity in [0, 1]
    pub opacity: f64,

    pub min_scale: Option<f64>,
    pub max_scale: Option<f64>,

    #[serde(default)]
    pub live_layer: bool,

    #[serde(default)]
    pub can_download: bool,

    #[serde(default)]
    pub identify: IdentifyColumns,

    pub disclaimer: Option<Disclaimer>,

    /// Owning group identity
    pub group: String,

    /// Owning group label
    pub group_name: String,

    pub metadata_url: Option<String>,
    pub wfs_url: Option<String>,

    /// Legend expanded in the TOC
    #[serde(default)]
    pub show_legend: bool,

    #[serde(default)]
    pub queryable: bool,

    #[serde(default)]
    pub opaque: bool,

    /// Renderable layer on the map surface; `None` until bound
    #[serde(skip)]
    pub layer: Option<LayerHandle>,
}

impl LayerDescriptor {
    /// Handle of the bound renderable layer.
    pub fn handle(&self) -> crate::TocResult<LayerHandle> {
        self.layer
            .ok_or_else(|| crate::TocError::LayerNotFound(self.name.clone()))
    }

    pub fn has_disclaimer(&self) -> bool {
        self.disclaimer.is_some()
    }

    /// Properties to set on the renderable layer for this descriptor.
    pub fn render_properties(&self) -> RenderProperties {
        RenderProperties {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            wfs_url: self.wfs_url.clone(),
            root_info_url: None,
            disable_parcel_click: self.live_layer,
            live_layer: self.live_layer,
            queryable: self.queryable,
            opaque: self.opaque,
        }
    }
}

impl PartialEq for LayerDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.display_name == other.display_name
            && self.identify_display_name == other.identify_display_name
            && self.style_url == other.style_url
            && self.draw_index == other.draw_index
            && self.visible == other.visible
            && self.opacity == other.opacity
            && self.min_scale == other.min_scale
            && self.max_scale == other.max_scale
            && self.live_layer == other.live_layer
            && self.can_download == other.can_download
            && self.identify == other.identify
            && self.disclaimer == other.disclaimer
            && self.group == other.group
            && self.group_name == other.group_name
            && self.metadata_url == other.metadata_url
            && self.wfs_url == other.wfs_url
            && self.show_legend == other.show_legend
            && self.queryable == other.queryable
            && self.opaque == other.opaque
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> LayerDescriptor {
        LayerDescriptor {
            name: name.to_string(),
            display_name: "Parcels".to_string(),
            identify_display_name: String::new(),
            style_url: String::new(),
            draw_index: 101,
            visible: false,
            opacity: 1.0,
            min_scale: None,
            max_scale: None,
            live_layer: false,
            can_download: false,
            identify: IdentifyColumns::default(),
            disclaimer: None,
            group: "simcoe:Public".to_string(),
            group_name: "Public".to_string(),
            metadata_url: None,
            wfs_url: None,
            show_legend: false,
            queryable: true,
            opaque: false,
            layer: Some(LayerHandle(1)),
        }
    }

    #[test]
    fn test_equality_ignores_handle() {
        let a = descriptor("simcoe:Parcels");
        let mut b = a.clone();
        b.layer = Some(LayerHandle(99));
        assert_eq!(a, b);

        b.visible = true;
        assert_ne!(a, b);
    }

    #[test]
    fn test_unbound_handle_is_an_error() {
        let mut d = descriptor("simcoe:Parcels");
        d.layer = None;
        assert!(d.handle().is_err());
    }

    #[test]
    fn test_identify_columns_drop_empty_values() {
        let cols = IdentifyColumns::from_keywords("", "OBJECTID");
        assert_eq!(cols.title_column, None);
        assert_eq!(cols.id_column.as_deref(), Some("OBJECTID"));
    }

    #[test]
    fn test_stored_features_marker() {
        assert!(RebuildParams::stored_features("myMaps").has_stored_features());
        assert!(!RebuildParams::image_wms("https://x/wms", "a:b", "B").has_stored_features());
        assert_eq!(SourceType::Vector.layer_type(), LayerType::Vector);
    }
}
