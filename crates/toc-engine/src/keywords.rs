//! Keyword-encoded layer and group metadata.
//!
//! Capability documents carry behavioural flags as free-text keywords of the
//! form `KEY=value` (or a bare `KEY` for flags). The list is scanned once;
//! keys must match exactly up to the `=`, so `IDENTIFY_ID_COLUMN=x` never
//! satisfies a lookup for a shorter key sharing its prefix. The first entry
//! for each key wins.

use std::collections::HashMap;
use tracing::trace;

use storage::MapViewport;
use toc_common::{Disclaimer, IdentifyColumns};

/// Recognised keyword keys.
pub mod keys {
    pub const DEFAULT_GROUP: &str = "DEFAULT_GROUP";
    pub const LIVE_LAYER: &str = "LIVE_LAYER";
    pub const GROUP_PREFIX: &str = "GROUP_PREFIX";
    pub const DISPLAY_NAME: &str = "DISPLAY_NAME";
    pub const IDENTIFY_TITLE_COLUMN: &str = "IDENTIFY_TITLE_COLUMN";
    pub const IDENTIFY_ID_COLUMN: &str = "IDENTIFY_ID_COLUMN";
    pub const DISCLAIMER_URL: &str = "DISCLAIMER_URL";
    pub const DISCLAIMER_TITLE: &str = "DISCLAIMER_TITLE";
    pub const VISIBLE_LAYERS: &str = "VISIBLE_LAYERS";
    pub const MAP_CENTER: &str = "MAP_CENTER";
    pub const MAP_ZOOM: &str = "MAP_ZOOM";
    pub const OPACITY: &str = "OPACITY";
    pub const DOWNLOAD: &str = "DOWNLOAD";

    pub const ALL: [&str; 13] = [
        DEFAULT_GROUP,
        LIVE_LAYER,
        GROUP_PREFIX,
        DISPLAY_NAME,
        IDENTIFY_TITLE_COLUMN,
        IDENTIFY_ID_COLUMN,
        DISCLAIMER_URL,
        DISCLAIMER_TITLE,
        VISIBLE_LAYERS,
        MAP_CENTER,
        MAP_ZOOM,
        OPACITY,
        DOWNLOAD,
    ];
}

const CURLY_QUOTES: [char; 4] = ['\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

/// Typed metadata extracted from one keyword list.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerKeywords {
    pub default_group: String,
    pub live_layer: bool,
    pub group_prefix: String,
    pub display_name: String,
    pub identify_title_column: String,
    pub identify_id_column: String,
    pub disclaimer_url: String,
    pub disclaimer_title: String,
    pub visible_layers: Vec<String>,
    pub map_center: Vec<String>,
    pub map_zoom: i64,
    /// Always within [0, 1]
    pub opacity: f64,
    pub can_download: bool,
}

impl Default for LayerKeywords {
    fn default() -> Self {
        Self {
            default_group: String::new(),
            live_layer: false,
            group_prefix: String::new(),
            display_name: String::new(),
            identify_title_column: String::new(),
            identify_id_column: String::new(),
            disclaimer_url: String::new(),
            disclaimer_title: String::new(),
            visible_layers: Vec::new(),
            map_center: Vec::new(),
            map_zoom: 0,
            opacity: 1.0,
            can_download: false,
        }
    }
}

impl LayerKeywords {
    /// Extract from an optional keyword list; `None` yields all defaults.
    pub fn parse<S: AsRef<str>>(keywords: Option<&[S]>) -> Self {
        match keywords {
            Some(list) => Self::from_list(list),
            None => Self::default(),
        }
    }

    /// Extract from a keyword list in a single pass.
    pub fn from_list<S: AsRef<str>>(keywords: &[S]) -> Self {
        // key -> value of the first matching entry; bare keys map to ""
        let mut found: HashMap<&'static str, &str> = HashMap::new();
        for raw in keywords {
            let raw = raw.as_ref();
            let (key, value) = match raw.split_once('=') {
                Some((key, value)) => (key.trim(), value),
                None => (raw.trim(), ""),
            };
            match keys::ALL.iter().find(|k| **k == key) {
                Some(known) => {
                    found.entry(*known).or_insert(value);
                }
                None => trace!(keyword = %raw, "Ignoring unrecognised keyword"),
            }
        }

        let text = |key: &str| found.get(key).map(|v| v.to_string()).unwrap_or_default();
        let unquoted = |key: &str| {
            found
                .get(key)
                .map(|v| v.chars().filter(|c| !CURLY_QUOTES.contains(c)).collect())
                .unwrap_or_default()
        };
        let list = |key: &str| -> Vec<String> {
            found
                .get(key)
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };

        let opacity = found
            .get(keys::OPACITY)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 1.0))
            .unwrap_or(1.0);

        let map_zoom = found
            .get(keys::MAP_ZOOM)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0);

        Self {
            default_group: text(keys::DEFAULT_GROUP),
            live_layer: found.contains_key(keys::LIVE_LAYER),
            group_prefix: text(keys::GROUP_PREFIX),
            display_name: text(keys::DISPLAY_NAME),
            identify_title_column: text(keys::IDENTIFY_TITLE_COLUMN),
            identify_id_column: text(keys::IDENTIFY_ID_COLUMN),
            disclaimer_url: unquoted(keys::DISCLAIMER_URL),
            disclaimer_title: unquoted(keys::DISCLAIMER_TITLE),
            visible_layers: list(keys::VISIBLE_LAYERS),
            map_center: list(keys::MAP_CENTER),
            map_zoom,
            opacity,
            can_download: found.contains_key(keys::DOWNLOAD),
        }
    }

    /// Disclaimer, present when either its title or URL is set.
    pub fn disclaimer(&self) -> Option<Disclaimer> {
        if self.disclaimer_url.is_empty() && self.disclaimer_title.is_empty() {
            return None;
        }
        Some(Disclaimer {
            title: self.disclaimer_title.clone(),
            url: self.disclaimer_url.clone(),
        })
    }

    pub fn identify_columns(&self) -> IdentifyColumns {
        IdentifyColumns::from_keywords(&self.identify_title_column, &self.identify_id_column)
    }

    /// `MAP_CENTER` as numbers; empty when any component is not a number.
    pub fn map_center_coordinates(&self) -> Vec<f64> {
        self.map_center
            .iter()
            .map(|c| c.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .unwrap_or_default()
    }

    /// Default viewport announced by `MAP_CENTER` + `MAP_ZOOM`.
    pub fn viewport(&self) -> Option<MapViewport> {
        MapViewport::from_parts(&self.map_center_coordinates(), self.map_zoom)
    }

    /// Case-insensitive match against the `DEFAULT_GROUP` marker.
    pub fn is_default_group(&self, group_name: &str) -> bool {
        !self.default_group.is_empty() && self.default_group.eq_ignore_ascii_case(group_name)
    }
}
