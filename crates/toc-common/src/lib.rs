//! Common types shared across the geotoc crates.

pub mod config;
pub mod error;
pub mod feature;
pub mod group;
pub mod layer;

pub use config::{GroupConfig, TocConfig, DEFAULT_LAYER_INDEX_START, MY_MAPS_LAYER_NAME};
pub use error::{TocError, TocResult};
pub use feature::{Feature, FeatureCollection, Geometry};
pub use group::GroupDescriptor;
pub use layer::{
    Disclaimer, IdentifyColumns, LayerDescriptor, LayerHandle, LayerType, RebuildParams,
    RenderProperties, SourceType, STORED_FEATURES,
};
