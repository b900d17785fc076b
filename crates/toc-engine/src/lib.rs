//! Layer/group resolution and reconciliation engine.
//!
//! Turns capability documents (WMS GetCapabilities, GeoServer REST listings,
//! static configuration, previously stored groups) into an ordered,
//! deduplicated list of layer groups ready for a table of contents, and keeps
//! the renderable layers on the map surface in step with it.
//!
//! All shared mutable state (map surface, accepted disclaimers, generation
//! counter) lives in an explicit [`TocContext`] passed to every operation.

pub mod builder;
pub mod context;
pub mod disclaimer;
pub mod generation;
pub mod keywords;
pub mod layer_info;
pub mod loader;
pub mod reconcile;
pub mod resolver;
pub mod serializer;
pub mod surface;

pub use builder::{
    make_layer, wfs_intersects_query, LayerDescriptorBuilder, LayerRecord, RecordOrigin,
};
pub use context::TocContext;
pub use disclaimer::{DisclaimerGate, DisclaimerPrompt, DisclaimerState};
pub use generation::{GenerationToken, ResolutionTracker};
pub use keywords::LayerKeywords;
pub use layer_info::{layer_info, LayerInfo};
pub use loader::{CapabilityFetcher, TocLoader};
pub use resolver::{ConfiguredGroup, GroupResolver, Resolution, SourceDocument};
pub use serializer::{from_storable, to_storable, StoredGroup, StoredLayer};
pub use surface::{Acquired, LayerRegistry, MapSurface, RenderLayer};
