//! Table-of-contents configuration.
//!
//! Loads the static group list and engine settings from a YAML or JSON file.
//! The JSON form matches the `TOCConfig.json` files web clients ship with.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::{GroupDescriptor, TocError, TocResult};

/// Index where the TOC layers start drawing.
pub const DEFAULT_LAYER_INDEX_START: i64 = 100;

/// Reserved name of the client-side drawing layer.
pub const MY_MAPS_LAYER_NAME: &str = "local:myMaps";

/// Environment override for [`TocConfig::layer_index_start`].
pub const LAYER_INDEX_START_ENV: &str = "GEOTOC_LAYER_INDEX_START";

fn default_layer_index_start() -> i64 {
    DEFAULT_LAYER_INDEX_START
}

fn default_excluded_layers() -> Vec<String> {
    vec![MY_MAPS_LAYER_NAME.to_string()]
}

/// Engine settings plus the statically configured layer groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TocConfig {
    /// Draw index base; a group of N layers uses `start + N ..= start + 1`
    #[serde(default = "default_layer_index_start")]
    pub layer_index_start: i64,

    /// Load group layers from the custom REST endpoint instead of WMS
    #[serde(default)]
    pub use_custom_rest_url: bool,

    #[serde(default)]
    pub layer_groups: Vec<GroupConfig>,

    /// Layer names never shown in the TOC
    #[serde(default = "default_excluded_layers")]
    pub excluded_layers: Vec<String>,
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            layer_index_start: DEFAULT_LAYER_INDEX_START,
            use_custom_rest_url: false,
            layer_groups: Vec::new(),
            excluded_layers: default_excluded_layers(),
        }
    }
}

/// One statically configured group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupConfig {
    pub name: String,
    pub display_name: String,
    pub wms_url: Option<String>,
    pub custom_rest_url: Option<String>,
    #[serde(default)]
    pub default_group: bool,
    #[serde(default)]
    pub visible_layers: Vec<String>,
}

impl GroupConfig {
    /// Empty group descriptor for this entry; layers are resolved later.
    pub fn to_descriptor(&self) -> GroupDescriptor {
        let mut group = GroupDescriptor::new(&self.name, &self.display_name);
        group.default_group = self.default_group;
        group.visible_layers = self.visible_layers.clone();
        group.wms_group_url = self.wms_url.clone();
        group.url = self.wms_url.clone();
        group.custom_rest_url = self.custom_rest_url.clone();
        group
    }

    /// URL the group's layer list is fetched from.
    pub fn source_url(&self, use_custom_rest_url: bool) -> Option<&str> {
        if use_custom_rest_url {
            self.custom_rest_url.as_deref()
        } else {
            self.wms_url.as_deref()
        }
    }
}

impl TocConfig {
    /// Load from a file, choosing the format by extension (`.json` or YAML).
    pub fn load<P: AsRef<Path>>(path: P) -> TocResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| TocError::Config(format!("Failed to read {:?}: {}", path, e)))?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let mut config = if is_json {
            Self::from_json_str(&contents)?
        } else {
            Self::from_yaml_str(&contents)?
        };
        config.apply_env_overrides();
        config.validate()?;

        info!(
            path = ?path,
            groups = config.layer_groups.len(),
            layer_index_start = config.layer_index_start,
            "Loaded TOC configuration"
        );
        Ok(config)
    }

    pub fn from_yaml_str(contents: &str) -> TocResult<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn from_json_str(contents: &str) -> TocResult<Self> {
        serde_json::from_str(contents)
            .map_err(|e| TocError::Config(format!("JSON error: {}", e)))
    }

    /// Apply environment variable overrides.
    ///
    /// Environment variable: GEOTOC_LAYER_INDEX_START
    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var(LAYER_INDEX_START_ENV) {
            match raw.parse() {
                Ok(start) => self.layer_index_start = start,
                Err(_) => warn!(value = %raw, "Ignoring invalid {}", LAYER_INDEX_START_ENV),
            }
        }
    }

    /// Reject configurations the resolver cannot work with.
    pub fn validate(&self) -> TocResult<()> {
        if self.layer_index_start < 0 {
            return Err(TocError::Config(format!(
                "layerIndexStart must be non-negative, got {}",
                self.layer_index_start
            )));
        }

        let mut seen = HashSet::new();
        for group in &self.layer_groups {
            if group.name.trim().is_empty() {
                return Err(TocError::Config("layer group with empty name".to_string()));
            }
            if !seen.insert(group.name.as_str()) {
                return Err(TocError::Config(format!(
                    "duplicate layer group '{}'",
                    group.name
                )));
            }
            if group.source_url(self.use_custom_rest_url).is_none() {
                warn!(group = %group.name, "Layer group has no source URL and will resolve empty");
            }
        }
        Ok(())
    }

    pub fn is_excluded(&self, layer_name: &str) -> bool {
        self.excluded_layers.iter().any(|l| l == layer_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const JSON_CONFIG: &str = r#"{
        "useCustomRestUrl": false,
        "layerGroups": [
            {
                "name": "simcoe:Public",
                "displayName": "Public",
                "wmsUrl": "https://opengis.example.ca/geoserver/simcoe/Public/ows?service=wms&version=1.3.0&request=GetCapabilities",
                "customRestUrl": "https://opengis.example.ca/geoserver/rest/workspaces/simcoe/layergroups/Public.json",
                "defaultGroup": true,
                "visibleLayers": ["simcoe:Parcels"]
            }
        ]
    }"#;

    #[test]
    fn test_json_defaults() {
        let config = TocConfig::from_json_str(JSON_CONFIG).unwrap();
        assert_eq!(config.layer_index_start, DEFAULT_LAYER_INDEX_START);
        assert_eq!(config.excluded_layers, vec![MY_MAPS_LAYER_NAME.to_string()]);
        assert_eq!(config.layer_groups.len(), 1);
        assert!(config.layer_groups[0].default_group);
    }

    #[test]
    fn test_group_config_to_descriptor() {
        let config = TocConfig::from_json_str(JSON_CONFIG).unwrap();
        let group = config.layer_groups[0].to_descriptor();
        assert_eq!(group.value, "simcoe:Public");
        assert_eq!(group.label, "Public");
        assert!(group.default_group);
        assert!(group.wms_group_url.is_some());
        assert!(group.layers.is_empty());
    }

    #[test]
    fn test_source_url_selection() {
        let config = TocConfig::from_json_str(JSON_CONFIG).unwrap();
        let group = &config.layer_groups[0];
        assert!(group.source_url(false).unwrap().contains("GetCapabilities"));
        assert!(group.source_url(true).unwrap().ends_with("Public.json"));
    }

    #[test]
    fn test_yaml_load_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "layerIndexStart: 200\nlayerGroups:\n  - name: a\n    displayName: A\n    wmsUrl: https://x/geoserver/a/ows"
        )
        .unwrap();

        let config = TocConfig::load(file.path()).unwrap();
        assert_eq!(config.layer_groups[0].display_name, "A");
        assert!(!config.use_custom_rest_url);
    }

    #[test]
    fn test_duplicate_group_rejected() {
        let yaml = "layerGroups:\n  - {name: a, displayName: A}\n  - {name: a, displayName: B}\n";
        let config = TocConfig::from_yaml_str(yaml).unwrap();
        assert!(matches!(config.validate(), Err(TocError::Config(_))));
    }
}
