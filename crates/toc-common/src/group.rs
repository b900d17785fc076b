//! Layer groups as shown in the table of contents.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::LayerDescriptor;

/// A named collection of layers sharing a server origin and a default
/// visibility policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDescriptor {
    /// Group identity
    pub value: String,

    /// Display label
    pub label: String,

    #[serde(default)]
    pub default_group: bool,

    /// Base capability URL of the group
    pub url: Option<String>,

    /// Prefix prepended to layer display names
    #[serde(default)]
    pub prefix: String,

    /// Layers visible when no persisted state exists
    #[serde(default)]
    pub visible_layers: Vec<String>,

    pub wms_group_url: Option<String>,

    pub custom_rest_url: Option<String>,

    #[serde(default)]
    pub layers: Vec<LayerDescriptor>,
}

impl GroupDescriptor {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            default_group: false,
            url: None,
            prefix: String::new(),
            visible_layers: Vec::new(),
            wms_group_url: None,
            custom_rest_url: None,
            layers: Vec::new(),
        }
    }

    /// Group with a generated identity, for client-side collections such as
    /// user drawings.
    pub fn ad_hoc(label: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), label)
    }

    /// Whether a layer is in the default-visible list.
    pub fn is_default_visible(&self, layer_name: &str) -> bool {
        self.visible_layers.iter().any(|l| l == layer_name)
    }

    /// Find a resolved layer by name.
    pub fn layer(&self, name: &str) -> Option<&LayerDescriptor> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }
}
