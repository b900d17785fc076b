//! OGC WMS/WFS and GeoServer REST protocol plumbing.
//!
//! Supports:
//! - WMS 1.1.1 and 1.3.0 GetCapabilities documents (layer tree only)
//! - GeoServer layer-group REST listings
//! - Derived WFS, REST metadata and legend URL templates
//! - GetFeatureInfo request URLs for untiled WMS image sources

pub mod capabilities;
pub mod getfeatureinfo;
pub mod rest;
pub mod urls;

pub use capabilities::{CapabilitiesDocument, CapabilitiesScope, CapabilityLayer};
pub use getfeatureinfo::{FeatureInfoQuery, InfoFormat};
pub use rest::{PublishedLayer, RestLayerListing};
