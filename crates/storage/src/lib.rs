//! Persistence abstractions for the layer table of contents.
//!
//! Provides:
//! - A key-value blob store interface (`get`/`set`) with in-memory and
//!   JSON-file backends
//! - Persisted per-group layer visibility/opacity state
//! - Default viewport and stored extent handling

pub mod file_store;
pub mod kv;
pub mod layer_state;
pub mod map_defaults;

pub use file_store::JsonFileStore;
pub use kv::{KeyValueStore, KeyValueStoreExt, MemoryStore};
pub use layer_state::{GroupLayerState, PersistedLayerState, SavedLayerState};
pub use map_defaults::{apply_map_defaults, save_map_extent, stored_map_defaults, MapViewport};

/// Key holding [`PersistedLayerState`].
pub const LAYERS_KEY: &str = "Layers";

/// Key holding the default viewport announced by the capabilities document.
pub const MAP_DEFAULTS_KEY: &str = "Map Defaults";

/// Key holding the user's last map extent.
pub const MAP_EXTENT_KEY: &str = "Map Extent";
