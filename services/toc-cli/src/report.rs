//! JSON report of a resolution pass.

use serde::Serialize;

use storage::MapViewport;
use toc_common::GroupDescriptor;
use toc_engine::Resolution;

/// What `geotoc` prints on stdout.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report<'a> {
    pub generation: u64,
    pub default_group: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport: Option<&'a MapViewport>,
    pub skipped: usize,
    pub layer_count: usize,
    pub groups: &'a [GroupDescriptor],
}

impl<'a> Report<'a> {
    pub fn new(resolution: &'a Resolution) -> Self {
        Self {
            generation: resolution.generation,
            default_group: resolution.default_group().map(|g| g.value.as_str()),
            viewport: resolution.viewport.as_ref(),
            skipped: resolution.skipped,
            layer_count: resolution.layer_count(),
            groups: &resolution.groups,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures::descriptor;

    #[test]
    fn test_report_shape() {
        let mut group = GroupDescriptor::new("simcoe:Public_Layers", "Public Layers");
        group.default_group = true;
        group.layers.push(descriptor("simcoe:Parcels", 101));
        let resolution = Resolution {
            groups: vec![group],
            default_index: Some(0),
            viewport: None,
            skipped: 2,
            generation: 7,
        };

        let json = serde_json::to_value(Report::new(&resolution)).unwrap();
        assert_eq!(json["defaultGroup"], "simcoe:Public_Layers");
        assert_eq!(json["layerCount"], 1);
        assert_eq!(json["skipped"], 2);
        assert!(json.get("viewport").is_none());
        assert_eq!(json["groups"][0]["layers"][0]["drawIndex"], 101);
    }
}
