//! Layer details from the GeoServer REST API.
//!
//! A layer's REST metadata document only points at the resource describing
//! it; the feature type lives behind that second link.

use serde::Deserialize;
use tracing::{debug, instrument};

use toc_common::{LayerDescriptor, TocError, TocResult};
use wms_protocol::urls::https_upgrade;

use crate::loader::CapabilityFetcher;

#[derive(Debug, Deserialize)]
struct LayerMetadata {
    layer: MetadataLayer,
}

#[derive(Debug, Deserialize)]
struct MetadataLayer {
    resource: ResourceLink,
}

#[derive(Debug, Deserialize)]
struct ResourceLink {
    href: String,
}

/// Full REST description of a layer's feature type.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerInfo {
    /// URL the feature type was read from
    pub full_url: String,
    /// The `featureType` object as served
    pub feature_type: serde_json::Value,
}

/// Resolve `layer`'s REST metadata into its feature type description.
///
/// Returns `Ok(None)` for layers without a metadata URL.
#[instrument(skip(fetcher, layer), fields(layer = %layer.name))]
pub async fn layer_info<F>(fetcher: &F, layer: &LayerDescriptor) -> TocResult<Option<LayerInfo>>
where
    F: CapabilityFetcher + ?Sized,
{
    let Some(metadata_url) = layer.metadata_url.as_deref() else {
        return Ok(None);
    };

    let text = fetcher.fetch_text(&https_upgrade(metadata_url)).await?;
    let metadata: LayerMetadata = serde_json::from_str(&text)
        .map_err(|e| TocError::MalformedSource(format!("layer metadata: {}", e)))?;

    let full_url = https_upgrade(&metadata.layer.resource.href).replace('+', "%20");
    debug!(url = %full_url, "Following layer resource link");

    let text = fetcher.fetch_text(&full_url).await?;
    let mut document: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| TocError::MalformedSource(format!("layer resource: {}", e)))?;
    let feature_type = document
        .get_mut("featureType")
        .map(serde_json::Value::take)
        .ok_or_else(|| TocError::MalformedSource("layer resource has no featureType".to_string()))?;

    Ok(Some(LayerInfo {
        full_url,
        feature_type,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use test_utils::fixtures::descriptor;

    #[derive(Default)]
    struct RecordingFetcher {
        docs: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    impl RecordingFetcher {
        fn with(mut self, url: &str, body: &str) -> Self {
            self.docs.insert(url.to_string(), body.to_string());
            self
        }
    }

    #[async_trait]
    impl CapabilityFetcher for RecordingFetcher {
        async fn fetch_text(&self, url: &str) -> TocResult<String> {
            self.requested.lock().unwrap().push(url.to_string());
            self.docs.get(url).cloned().ok_or_else(|| TocError::Fetch {
                url: url.to_string(),
                message: "404 Not Found".to_string(),
            })
        }
    }

    const METADATA: &str = r#"{
        "layer": {
            "name": "Bus Stops",
            "resource": {
                "@class": "featureType",
                "name": "simcoe:Bus Stops",
                "href": "http://opengis.example.ca/geoserver/rest/workspaces/simcoe/datastores/transit/featuretypes/Bus+Stops.json"
            }
        }
    }"#;

    const RESOURCE_URL: &str = "https://opengis.example.ca/geoserver/rest/workspaces/simcoe/datastores/transit/featuretypes/Bus%20Stops.json";

    fn bus_stops() -> LayerDescriptor {
        let mut layer = descriptor("simcoe:Bus Stops", 101);
        layer.metadata_url =
            Some("http://opengis.example.ca/geoserver/rest/layers/simcoe:Bus%20Stops.json".to_string());
        layer
    }

    #[tokio::test]
    async fn test_follows_resource_link() {
        let fetcher = RecordingFetcher::default()
            .with(
                "https://opengis.example.ca/geoserver/rest/layers/simcoe:Bus%20Stops.json",
                METADATA,
            )
            .with(
                RESOURCE_URL,
                r#"{"featureType": {"name": "Bus Stops", "srs": "EPSG:26917"}}"#,
            );

        let info = layer_info(&fetcher, &bus_stops()).await.unwrap().unwrap();
        assert_eq!(info.full_url, RESOURCE_URL);
        assert_eq!(info.feature_type["srs"], "EPSG:26917");
        assert_eq!(fetcher.requested.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_layer_without_metadata_url() {
        let fetcher = RecordingFetcher::default();
        let info = layer_info(&fetcher, &descriptor("simcoe:Parcels", 101)).await.unwrap();
        assert!(info.is_none());
        assert!(fetcher.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_metadata_without_resource_is_malformed() {
        let fetcher = RecordingFetcher::default().with(
            "https://opengis.example.ca/geoserver/rest/layers/simcoe:Bus%20Stops.json",
            r#"{"layer": {"name": "Bus Stops"}}"#,
        );
        let result = layer_info(&fetcher, &bus_stops()).await;
        assert!(matches!(result, Err(TocError::MalformedSource(_))));
    }
}
