//! Persisted layer visibility and opacity.
//!
//! Stored under the `"Layers"` key as `{group: {layer: {visible, opacity, ...}}}`.
//! A missing key, group or layer is a persistence miss: callers fall back to
//! defaults and nothing is reported as an error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

use toc_common::TocResult;

use crate::{KeyValueStore, KeyValueStoreExt, LAYERS_KEY};

/// State saved for one layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedLayerState {
    #[serde(default)]
    pub visible: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draw_index: Option<i64>,

    /// Fields written by other clients, kept on rewrite
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SavedLayerState {
    pub fn new(visible: bool, opacity: f64) -> Self {
        Self {
            visible,
            opacity: Some(opacity),
            draw_index: None,
            extra: Map::new(),
        }
    }
}

/// Saved state of every layer in one group, keyed by layer name.
pub type GroupLayerState = HashMap<String, SavedLayerState>;

/// Saved layer state for all groups, keyed by group identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedLayerState {
    groups: HashMap<String, GroupLayerState>,
}

impl PersistedLayerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the store. Absent or unreadable state yields an empty value.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> TocResult<Self> {
        match store.get_json::<Self>(LAYERS_KEY) {
            Ok(Some(state)) => {
                debug!(groups = state.groups.len(), "Loaded persisted layer state");
                Ok(state)
            }
            Ok(None) => {
                debug!("No persisted layer state, using defaults");
                Ok(Self::default())
            }
            Err(e) => {
                warn!(error = %e, "Discarding unreadable persisted layer state");
                Ok(Self::default())
            }
        }
    }

    /// Write the whole state to the store.
    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> TocResult<()> {
        store.set_json(LAYERS_KEY, self)
    }

    pub fn group(&self, group: &str) -> Option<&GroupLayerState> {
        self.groups.get(group)
    }

    pub fn layer(&self, group: &str, layer: &str) -> Option<&SavedLayerState> {
        self.groups.get(group)?.get(layer)
    }

    /// Replace the saved state of one group.
    pub fn set_group(&mut self, group: impl Into<String>, layers: GroupLayerState) {
        self.groups.insert(group.into(), layers);
    }

    /// Update or insert the saved state of one layer.
    pub fn set_layer(
        &mut self,
        group: impl Into<String>,
        layer: impl Into<String>,
        state: SavedLayerState,
    ) {
        self.groups
            .entry(group.into())
            .or_default()
            .insert(layer.into(), state);
    }

    pub fn remove_group(&mut self, group: &str) -> Option<GroupLayerState> {
        self.groups.remove(group)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
