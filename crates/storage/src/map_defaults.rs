//! Default viewport handling.
//!
//! A capabilities document may announce a default map centre and zoom. It is
//! always remembered under `"Map Defaults"`, but only applied when the user
//! has no stored extent of their own.

use serde::{Deserialize, Serialize};
use tracing::debug;

use toc_common::TocResult;

use crate::{KeyValueStore, KeyValueStoreExt, MAP_DEFAULTS_KEY, MAP_EXTENT_KEY};

/// Map centre and zoom level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapViewport {
    pub center: [f64; 2],
    pub zoom: i64,
}

impl MapViewport {
    /// Build from keyword values; needs a two-value centre and a positive zoom.
    pub fn from_parts(center: &[f64], zoom: i64) -> Option<Self> {
        match center {
            [x, y] if zoom > 0 => Some(Self {
                center: [*x, *y],
                zoom,
            }),
            _ => None,
        }
    }
}

/// Remember the announced viewport and return it if it should be applied.
///
/// Returns `None` when a stored extent exists; persisted state always wins.
pub fn apply_map_defaults<S: KeyValueStore + ?Sized>(
    store: &mut S,
    viewport: &MapViewport,
) -> TocResult<Option<MapViewport>> {
    store.remove(MAP_DEFAULTS_KEY)?;
    store.set_json(MAP_DEFAULTS_KEY, viewport)?;

    if store.contains(MAP_EXTENT_KEY)? {
        debug!("Stored map extent present, keeping user viewport");
        return Ok(None);
    }
    debug!(zoom = viewport.zoom, "Applying default viewport");
    Ok(Some(viewport.clone()))
}

/// The viewport last announced by a capabilities document.
pub fn stored_map_defaults<S: KeyValueStore + ?Sized>(store: &S) -> TocResult<Option<MapViewport>> {
    store.get_json(MAP_DEFAULTS_KEY)
}

/// Remember the user's current extent ([min_x, min_y, max_x, max_y]).
pub fn save_map_extent<S: KeyValueStore + ?Sized>(store: &mut S, extent: [f64; 4]) -> TocResult<()> {
    store.set_json(MAP_EXTENT_KEY, &extent)
}
