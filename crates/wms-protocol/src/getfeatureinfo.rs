//! WMS GetFeatureInfo request URLs
//!
//! Builds the feature-info URL an untiled WMS image source answers for a
//! clicked map coordinate. The request covers a small image centred on the
//! coordinate so the server only has to render a 101x101 pixel window.

use serde::{Deserialize, Serialize};
use url::form_urlencoded::byte_serialize;

/// Width and height of the virtual image queried around the coordinate.
pub const FEATURE_INFO_IMAGE_SIZE: u32 = 101;

/// Supported GetFeatureInfo response formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub enum InfoFormat {
    /// application/json - Machine-readable JSON
    #[serde(rename = "application/json")]
    #[default]
    Json,
    /// text/html - Human-readable HTML for popups
    #[serde(rename = "text/html")]
    Html,
    /// text/xml - OGC-compliant XML
    #[serde(rename = "text/xml")]
    Xml,
    /// text/plain - Simple text format
    #[serde(rename = "text/plain")]
    Text,
}

impl InfoFormat {
    /// Parse from MIME type string
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.to_lowercase().as_str() {
            "application/json" => Some(InfoFormat::Json),
            "text/html" => Some(InfoFormat::Html),
            "text/xml" => Some(InfoFormat::Xml),
            "text/plain" => Some(InfoFormat::Text),
            _ => None,
        }
    }

    /// Get MIME type string
    pub fn to_mime(&self) -> &'static str {
        match self {
            InfoFormat::Json => "application/json",
            InfoFormat::Html => "text/html",
            InfoFormat::Xml => "text/xml",
            InfoFormat::Text => "text/plain",
        }
    }
}

/// A feature-info query at one map coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInfoQuery {
    /// Clicked coordinate in `projection` units
    pub coordinate: [f64; 2],
    /// Map units per pixel
    pub resolution: f64,
    /// CRS code, e.g. "EPSG:3857"
    pub projection: String,
    pub info_format: InfoFormat,
    /// Appended as `&feature_count=N`
    pub feature_count: Option<u32>,
    /// WMS version; "1.3.0" unless the source says otherwise
    pub version: String,
}

impl FeatureInfoQuery {
    pub fn new(coordinate: [f64; 2], resolution: f64, projection: impl Into<String>) -> Self {
        Self {
            coordinate,
            resolution,
            projection: projection.into(),
            info_format: InfoFormat::Json,
            feature_count: None,
            version: "1.3.0".to_string(),
        }
    }

    pub fn with_format(mut self, info_format: InfoFormat) -> Self {
        self.info_format = info_format;
        self
    }

    pub fn with_feature_count(mut self, count: u32) -> Self {
        self.feature_count = Some(count);
        self
    }

    fn is_v13(&self) -> bool {
        self.version.starts_with("1.3")
    }

    /// Extent of the queried image: [min_x, min_y, max_x, max_y].
    pub fn extent(&self) -> [f64; 4] {
        let half = self.resolution * FEATURE_INFO_IMAGE_SIZE as f64 / 2.0;
        let [x, y] = self.coordinate;
        [x - half, y - half, x + half, y + half]
    }

    /// Pixel offset of the coordinate inside the queried image.
    pub fn pixel(&self) -> (u32, u32) {
        let [min_x, _, _, max_y] = self.extent();
        let i = ((self.coordinate[0] - min_x) / self.resolution).floor();
        let j = ((max_y - self.coordinate[1]) / self.resolution).floor();
        (i.max(0.0) as u32, j.max(0.0) as u32)
    }

    /// Build the request URL against `base_url` for the given WMS layers.
    pub fn url(&self, base_url: &str, layers: &str) -> String {
        let (i, j) = self.pixel();
        let extent = self.extent();
        // WMS 1.3.0 uses lat/lon axis order for EPSG:4326
        let bbox = if self.is_v13() && self.projection == "EPSG:4326" {
            [extent[1], extent[0], extent[3], extent[2]]
        } else {
            extent
        };
        let bbox = bbox.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",");

        let (x_key, y_key, crs_key) = if self.is_v13() {
            ("I", "J", "CRS")
        } else {
            ("X", "Y", "SRS")
        };
        let size = FEATURE_INFO_IMAGE_SIZE.to_string();

        let params: Vec<(&str, String)> = vec![
            ("SERVICE", "WMS".to_string()),
            ("VERSION", self.version.clone()),
            ("REQUEST", "GetFeatureInfo".to_string()),
            ("FORMAT", "image/png".to_string()),
            ("TRANSPARENT", "true".to_string()),
            ("QUERY_LAYERS", layers.to_string()),
            ("LAYERS", layers.to_string()),
            ("INFO_FORMAT", self.info_format.to_mime().to_string()),
            (x_key, i.to_string()),
            (y_key, j.to_string()),
            ("WIDTH", size.clone()),
            ("HEIGHT", size),
            (crs_key, self.projection.clone()),
            ("STYLES", String::new()),
            ("BBOX", bbox),
        ];

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, byte_serialize(v.as_bytes()).collect::<String>()))
            .collect::<Vec<_>>()
            .join("&");

        let separator = if base_url.contains('?') { '&' } else { '?' };
        let mut url = format!("{}{}{}", base_url, separator, query);
        if let Some(count) = self.feature_count {
            url.push_str(&format!("&feature_count={}", count));
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_format_parsing() {
        assert_eq!(
            InfoFormat::from_mime("application/json"),
            Some(InfoFormat::Json)
        );
        assert_eq!(InfoFormat::from_mime("TEXT/HTML"), Some(InfoFormat::Html));
        assert_eq!(InfoFormat::from_mime("image/png"), None);
    }

    #[test]
    fn test_pixel_is_image_centre() {
        let query = FeatureInfoQuery::new([-8875141.45, 5543492.45], 2.0, "EPSG:3857");
        assert_eq!(query.pixel(), (50, 50));
        let extent = query.extent();
        assert!((extent[2] - extent[0] - 202.0).abs() < 1e-6);
    }

    #[test]
    fn test_url_contains_query_params() {
        let query = FeatureInfoQuery::new([0.0, 0.0], 1.0, "EPSG:3857")
            .with_format(InfoFormat::Html)
            .with_feature_count(1000000);
        let url = query.url("https://x/geoserver/wms?layers=simcoe:Parcels", "simcoe:Parcels");

        assert!(url.starts_with("https://x/geoserver/wms?layers=simcoe:Parcels&SERVICE=WMS"));
        assert!(url.contains("REQUEST=GetFeatureInfo"));
        assert!(url.contains("QUERY_LAYERS=simcoe%3AParcels"));
        assert!(url.contains("INFO_FORMAT=text%2Fhtml"));
        assert!(url.contains("I=50&J=50"));
        assert!(url.contains("CRS=EPSG%3A3857"));
        assert!(url.contains("BBOX=-50.5%2C-50.5%2C50.5%2C50.5"));
        assert!(url.ends_with("&feature_count=1000000"));
    }

    #[test]
    fn test_wms_111_uses_srs_and_xy() {
        let mut query = FeatureInfoQuery::new([0.0, 0.0], 1.0, "EPSG:4326");
        query.version = "1.1.1".to_string();
        let url = query.url("https://x/wms", "a");
        assert!(url.contains("X=50&Y=50"));
        assert!(url.contains("SRS=EPSG%3A4326"));
    }

    #[test]
    fn test_layer_names_are_form_encoded() {
        let query = FeatureInfoQuery::new([0.0, 0.0], 1.0, "EPSG:3857");
        let url = query.url("https://x/wms", "simcoe:Bus Stops,simcoe:Roads/Major");
        assert!(url.contains("LAYERS=simcoe%3ABus+Stops%2Csimcoe%3ARoads%2FMajor"));
        assert!(url.contains("STYLES=&"));
    }
}
