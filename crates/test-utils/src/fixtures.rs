//! Common test fixtures for geotoc tests.
//!
//! This module provides pre-defined source documents that represent the
//! scenarios a table of contents has to cope with: nested groups, duplicate
//! layers, nameless records, excluded layers and licence disclaimers.

use std::path::PathBuf;
use tempfile::TempDir;

use toc_common::{GroupConfig, IdentifyColumns, LayerDescriptor};

/// Server URLs used across fixtures.
pub mod urls {
    /// Server-wide GetCapabilities URL
    pub const ROOT_CAPABILITIES: &str =
        "https://opengis.example.ca/geoserver/ows?service=wms&version=1.3.0&request=GetCapabilities";

    /// Per-group GetCapabilities URL for `simcoe:Public_Layers`
    pub const PUBLIC_CAPABILITIES: &str =
        "https://opengis.example.ca/geoserver/simcoe/Public_Layers/ows?service=wms&version=1.3.0&request=GetCapabilities";

    /// Per-group GetCapabilities URL for `simcoe:Base`
    pub const BASE_CAPABILITIES: &str =
        "https://opengis.example.ca/geoserver/simcoe/Base/ows?service=wms&version=1.3.0&request=GetCapabilities";

    /// REST layer-group listing for `simcoe:Public_Layers`
    pub const PUBLIC_REST: &str =
        "https://opengis.example.ca/geoserver/rest/workspaces/simcoe/layergroups/Public_Layers.json";

    /// Server root every derived URL starts with
    pub const GEOSERVER: &str = "https://opengis.example.ca/geoserver";
}

/// Layer and group names appearing in the fixtures.
pub mod names {
    pub const PUBLIC_GROUP: &str = "simcoe:Public_Layers";
    pub const BASE_GROUP: &str = "simcoe:Base";
    pub const EMPTY_GROUP: &str = "simcoe:Empty";
    pub const PARCELS: &str = "simcoe:Parcels";
    pub const BUS_STOPS: &str = "simcoe:Bus Stops";
    pub const ORTHOS: &str = "simcoe:Orthos 2018";
    pub const ROADS: &str = "simcoe:Roads";
    pub const MY_MAPS: &str = "local:myMaps";
}

/// GetCapabilities documents.
pub mod capabilities {
    /// Server-wide document.
    ///
    /// - Top-level keywords: `DEFAULT_GROUP` (lower-cased), `MAP_CENTER`, `MAP_ZOOM`
    /// - `simcoe:Base`: one layer
    /// - `simcoe:Public_Layers`: Parcels, Bus Stops, a duplicate Parcels, a
    ///   nested Imagery subgroup holding Orthos, a nameless layer and the
    ///   excluded `local:myMaps`
    /// - `simcoe:Empty`: only the excluded layer
    /// - `simcoe:Loose`: a leaf at group level
    pub const ROOT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms" xmlns:xlink="http://www.w3.org/1999/xlink">
  <Service><Name>WMS</Name><Title>Simcoe County GeoServer</Title></Service>
  <Capability>
    <Layer>
      <Title>Simcoe County</Title>
      <KeywordList>
        <Keyword>DEFAULT_GROUP=simcoe:public_layers</Keyword>
        <Keyword>MAP_CENTER=-8875141.45,5543492.45</Keyword>
        <Keyword>MAP_ZOOM=10</Keyword>
      </KeywordList>
      <Layer>
        <Name>simcoe:Base</Name>
        <Title>Base_Data</Title>
        <Layer queryable="1">
          <Name>simcoe:Roads</Name>
          <Title>Roads</Title>
        </Layer>
      </Layer>
      <Layer>
        <Name>simcoe:Public_Layers</Name>
        <Title>Public_Layers</Title>
        <KeywordList>
          <Keyword>VISIBLE_LAYERS=simcoe:Parcels</Keyword>
          <Keyword>GROUP_PREFIX=[Public]</Keyword>
        </KeywordList>
        <Layer queryable="1">
          <Name>simcoe:Parcels</Name>
          <Title>Parcels</Title>
          <KeywordList>
            <Keyword>DISPLAY_NAME=Property Parcels</Keyword>
            <Keyword>OPACITY=0.8</Keyword>
            <Keyword>IDENTIFY_TITLE_COLUMN=ARN</Keyword>
            <Keyword>DOWNLOAD</Keyword>
          </KeywordList>
          <MaxScaleDenominator>50000</MaxScaleDenominator>
          <Style>
            <Name>parcels</Name>
            <LegendURL width="20" height="20">
              <OnlineResource xlink:type="simple" xlink:href="http://opengis.example.ca/geoserver/ows?service=WMS&amp;request=GetLegendGraphic&amp;layer=simcoe%3AParcels"/>
            </LegendURL>
          </Style>
        </Layer>
        <Layer queryable="1">
          <Name>simcoe:Bus Stops</Name>
          <Title>Bus Stops</Title>
          <KeywordList><Keyword>LIVE_LAYER</Keyword></KeywordList>
        </Layer>
        <Layer queryable="1">
          <Name>simcoe:Parcels</Name>
          <Title>Parcels (duplicate)</Title>
        </Layer>
        <Layer>
          <Name>simcoe:Imagery</Name>
          <Title>Imagery</Title>
          <Layer opaque="1">
            <Name>simcoe:Orthos 2018</Name>
            <Title>Orthos 2018</Title>
            <KeywordList>
              <Keyword>DISCLAIMER_TITLE=Imagery Licence</Keyword>
              <Keyword>DISCLAIMER_URL=“https://opengis.example.ca/licence.pdf”</Keyword>
            </KeywordList>
          </Layer>
        </Layer>
        <Layer>
          <Title>Nameless</Title>
        </Layer>
        <Layer>
          <Name>local:myMaps</Name>
          <Title>My Maps</Title>
        </Layer>
      </Layer>
      <Layer>
        <Name>simcoe:Empty</Name>
        <Title>Empty</Title>
        <Layer>
          <Name>local:myMaps</Name>
          <Title>My Maps</Title>
        </Layer>
      </Layer>
      <Layer>
        <Name>simcoe:Loose</Name>
        <Title>Loose</Title>
      </Layer>
    </Layer>
  </Capability>
</WMS_Capabilities>"#;

    /// Group-scoped document for `simcoe:Public_Layers`, as served from the
    /// group's own `ows` endpoint.
    pub const PUBLIC_GROUP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms" xmlns:xlink="http://www.w3.org/1999/xlink">
  <Capability>
    <Layer>
      <Title>Simcoe County</Title>
      <Layer>
        <Name>simcoe:Public_Layers</Name>
        <Title>Public_Layers</Title>
        <Layer queryable="1">
          <Name>simcoe:Parcels</Name>
          <Title>Parcels</Title>
          <KeywordList><Keyword>OPACITY=0.8</Keyword></KeywordList>
        </Layer>
        <Layer queryable="1">
          <Name>simcoe:Bus Stops</Name>
          <Title>Bus Stops</Title>
        </Layer>
        <Layer queryable="1">
          <Name>simcoe:Bus Stops</Name>
          <Title>Bus Stops (duplicate)</Title>
        </Layer>
      </Layer>
    </Layer>
  </Capability>
</WMS_Capabilities>"#;

    /// Group-scoped document for `simcoe:Base`.
    pub const BASE_GROUP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms">
  <Capability>
    <Layer>
      <Title>Simcoe County</Title>
      <Layer>
        <Name>simcoe:Base</Name>
        <Title>Base</Title>
        <Layer queryable="1"><Name>simcoe:Roads</Name><Title>Roads</Title></Layer>
      </Layer>
    </Layer>
  </Capability>
</WMS_Capabilities>"#;
}

/// GeoServer REST layer-group listings.
pub mod rest {
    /// Listing for `simcoe:Public_Layers` with wrapped keyword lists.
    pub const PUBLIC_GROUP: &str = r#"{"layerGroup": {"name": "Public_Layers", "publishables": {"published": [
        {"name": "simcoe:Parcels",
         "href": "https://opengis.example.ca/geoserver/rest/layers/simcoe:Parcels.json",
         "layerDetails": {"featureType": {"title": "Parcels",
            "keywords": {"string": ["DISPLAY_NAME=Property Parcels", "OPACITY=0.6"]}}}},
        {"name": "simcoe:Bus Stops",
         "href": "https://opengis.example.ca/geoserver/rest/layers/simcoe:Bus%20Stops.json",
         "layerDetails": {"featureType": {"title": ["Bus Stops"], "keywords": [{"string": "LIVE_LAYER"}]}}},
        {"name": "simcoe:Parcels",
         "href": "https://opengis.example.ca/geoserver/rest/layers/simcoe:Parcels.json"}
    ]}}}"#;
}

/// Configuration files.
pub mod config {
    /// Two WMS-backed groups; `simcoe:Base` is the configured default.
    pub const STATIC_JSON: &str = r#"{
    "layerIndexStart": 100,
    "useCustomRestUrl": false,
    "layerGroups": [
        {
            "name": "simcoe:Public_Layers",
            "displayName": "Public Layers",
            "wmsUrl": "https://opengis.example.ca/geoserver/simcoe/Public_Layers/ows?service=wms&version=1.3.0&request=GetCapabilities",
            "customRestUrl": "https://opengis.example.ca/geoserver/rest/workspaces/simcoe/layergroups/Public_Layers.json",
            "visibleLayers": ["simcoe:Bus Stops"]
        },
        {
            "name": "simcoe:Base",
            "displayName": "Base",
            "wmsUrl": "https://opengis.example.ca/geoserver/simcoe/Base/ows?service=wms&version=1.3.0&request=GetCapabilities",
            "defaultGroup": true
        },
        {
            "name": "simcoe:Unreachable",
            "displayName": "Unreachable",
            "wmsUrl": "https://offline.example.ca/geoserver/simcoe/Unreachable/ows"
        }
    ]
}"#;

    /// One REST-backed group.
    pub const REST_YAML: &str = "layerIndexStart: 200
useCustomRestUrl: true
layerGroups:
  - name: simcoe:Public_Layers
    displayName: Public Layers
    customRestUrl: https://opengis.example.ca/geoserver/rest/workspaces/simcoe/layergroups/Public_Layers.json
";
}

/// A bare descriptor, unbound and hidden, in group `simcoe:Public_Layers`.
pub fn descriptor(name: &str, draw_index: i64) -> LayerDescriptor {
    LayerDescriptor {
        name: name.to_string(),
        display_name: name.to_string(),
        identify_display_name: String::new(),
        style_url: String::new(),
        draw_index,
        visible: false,
        opacity: 1.0,
        min_scale: None,
        max_scale: None,
        live_layer: false,
        can_download: false,
        identify: IdentifyColumns::default(),
        disclaimer: None,
        group: names::PUBLIC_GROUP.to_string(),
        group_name: "Public Layers".to_string(),
        metadata_url: None,
        wfs_url: None,
        show_legend: false,
        queryable: true,
        opaque: false,
        layer: None,
    }
}

/// Statically configured WMS group.
pub fn group_config(name: &str, wms_url: &str) -> GroupConfig {
    GroupConfig {
        name: name.to_string(),
        display_name: name.to_string(),
        wms_url: Some(wms_url.to_string()),
        custom_rest_url: None,
        default_group: false,
        visible_layers: Vec::new(),
    }
}

/// Path for a JSON file store inside a fresh temporary directory.
///
/// Keep the returned `TempDir` alive for as long as the path is used.
pub fn temp_store_path() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("geotoc-state.json");
    (dir, path)
}
