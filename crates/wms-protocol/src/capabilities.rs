//! WMS GetCapabilities layer tree reader.
//!
//! Only the `Capability/Layer` tree is read; service metadata, CRS lists and
//! bounding boxes are not needed to build a table of contents.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::str::FromStr;
use tracing::debug;

use toc_common::{TocError, TocResult};

/// One `<Layer>` node of a capabilities document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilityLayer {
    pub name: Option<String>,
    pub title: Option<String>,
    /// `None` when the node has no `KeywordList`
    pub keywords: Option<Vec<String>>,
    pub min_scale: Option<f64>,
    pub max_scale: Option<f64>,
    /// First `Style/LegendURL/OnlineResource` href
    pub legend_url: Option<String>,
    pub queryable: bool,
    pub opaque: bool,
    /// Nested `<Layer>` children in document order
    pub layers: Vec<CapabilityLayer>,
}

impl CapabilityLayer {
    /// A node with child layers is a group, not a renderable leaf.
    pub fn is_group(&self) -> bool {
        !self.layers.is_empty()
    }

    pub fn keywords(&self) -> Option<&[String]> {
        self.keywords.as_deref()
    }
}

/// Which level of the tree holds the groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapabilitiesScope {
    /// Server-wide document: groups are children of `Capability/Layer[0]`
    #[default]
    Root,
    /// Single-group document: groups are children of `Capability/Layer[0]/Layer[0]`
    Group,
}

impl FromStr for CapabilitiesScope {
    type Err = TocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "root" => Ok(CapabilitiesScope::Root),
            "group" => Ok(CapabilitiesScope::Group),
            other => Err(TocError::Config(format!("unknown capabilities scope '{}'", other))),
        }
    }
}

/// Parsed capabilities document.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilitiesDocument {
    /// `version` attribute of the root element
    pub version: Option<String>,
    /// `Capability/Layer[0]`
    pub root: CapabilityLayer,
}

impl CapabilitiesDocument {
    /// Parse GetCapabilities XML text.
    pub fn parse(xml: &str) -> TocResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut path: Vec<String> = Vec::new();
        let mut stack: Vec<CapabilityLayer> = Vec::new();
        let mut root: Option<CapabilityLayer> = None;
        let mut version: Option<String> = None;
        let mut saw_document = false;
        let mut text = String::new();

        loop {
            let event = reader.read_event().map_err(|e| {
                TocError::MalformedSource(format!(
                    "XML parsing error at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?;

            match event {
                Event::Start(e) => {
                    let name = local_name(&e);
                    if path.is_empty() {
                        saw_document = is_capabilities_root(&name);
                        version = attribute(&e, b"version")?;
                    }
                    if name == "Layer" && in_capability(&path) {
                        stack.push(layer_from_attributes(&e)?);
                    } else if name == "OnlineResource" {
                        apply_legend(&path, &e, &mut stack)?;
                    }
                    path.push(name);
                    text.clear();
                }
                Event::Empty(e) => {
                    let name = local_name(&e);
                    if path.is_empty() {
                        saw_document = is_capabilities_root(&name);
                    }
                    if name == "Layer" && in_capability(&path) {
                        let layer = layer_from_attributes(&e)?;
                        attach(layer, &mut stack, &mut root);
                    } else if name == "OnlineResource" {
                        apply_legend(&path, &e, &mut stack)?;
                    }
                }
                Event::Text(t) => {
                    let unescaped = t
                        .unescape()
                        .map_err(|e| TocError::MalformedSource(format!("Bad text node: {}", e)))?;
                    text.push_str(&unescaped);
                }
                Event::CData(c) => {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
                Event::End(_) => {
                    let Some(name) = path.pop() else {
                        return Err(TocError::MalformedSource("unbalanced end tag".to_string()));
                    };
                    if name == "Layer" && in_capability(&path) {
                        if let Some(layer) = stack.pop() {
                            attach(layer, &mut stack, &mut root);
                        }
                    } else if let Some(layer) = stack.last_mut() {
                        apply_text(layer, &name, &path, text.trim());
                    }
                    text.clear();
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_document {
            return Err(TocError::MalformedSource(
                "missing WMS_Capabilities root element".to_string(),
            ));
        }
        let root = root.ok_or_else(|| {
            TocError::MalformedSource("missing Capability/Layer element".to_string())
        })?;

        debug!(
            version = ?version,
            top_level_layers = root.layers.len(),
            "Parsed capabilities document"
        );
        Ok(Self { version, root })
    }

    /// The nodes that hold the groups for the given scope.
    pub fn scoped_nodes(&self, scope: CapabilitiesScope) -> TocResult<&[CapabilityLayer]> {
        match scope {
            CapabilitiesScope::Root => Ok(&self.root.layers),
            CapabilitiesScope::Group => self
                .root
                .layers
                .first()
                .map(|group| group.layers.as_slice())
                .ok_or_else(|| {
                    TocError::MalformedSource("missing Capability/Layer/Layer element".to_string())
                }),
        }
    }

    /// The container whose keywords carry document-level settings.
    ///
    /// This is the top-level layer, or its first child when the top level
    /// carries no keyword list.
    pub fn settings_node(&self) -> &CapabilityLayer {
        match (&self.root.keywords, self.root.layers.first()) {
            (Some(k), _) if !k.is_empty() => &self.root,
            (_, Some(first)) => first,
            _ => &self.root,
        }
    }
}

fn is_capabilities_root(name: &str) -> bool {
    name == "WMS_Capabilities" || name == "WMT_MS_Capabilities"
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn in_capability(path: &[String]) -> bool {
    path.iter().any(|p| p == "Capability")
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> TocResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| TocError::MalformedSource(format!("Bad attribute: {}", e)))?;
        if attr.key.local_name().as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|e| TocError::MalformedSource(format!("Bad attribute: {}", e)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn layer_from_attributes(e: &BytesStart<'_>) -> TocResult<CapabilityLayer> {
    let flag = |v: Option<String>| v.map(|v| v == "1" || v == "true").unwrap_or(false);
    Ok(CapabilityLayer {
        queryable: flag(attribute(e, b"queryable")?),
        opaque: flag(attribute(e, b"opaque")?),
        ..CapabilityLayer::default()
    })
}

fn attach(
    layer: CapabilityLayer,
    stack: &mut [CapabilityLayer],
    root: &mut Option<CapabilityLayer>,
) {
    if let Some(parent) = stack.last_mut() {
        parent.layers.push(layer);
    } else if root.is_none() {
        *root = Some(layer);
    }
}

fn apply_legend(
    path: &[String],
    e: &BytesStart<'_>,
    stack: &mut [CapabilityLayer],
) -> TocResult<()> {
    let n = path.len();
    let under_legend = n >= 3
        && path[n - 1] == "LegendURL"
        && path[n - 2] == "Style"
        && path[n - 3] == "Layer";
    if !under_legend {
        return Ok(());
    }
    if let Some(layer) = stack.last_mut() {
        if layer.legend_url.is_none() {
            layer.legend_url = attribute(e, b"href")?;
        }
    }
    Ok(())
}

/// Commit the text of a just-closed element to the innermost layer.
/// `path` no longer contains the closed element.
fn apply_text(layer: &mut CapabilityLayer, element: &str, path: &[String], text: &str) {
    let parent = path.last().map(String::as_str);
    let grandparent = path.len().checked_sub(2).map(|i| path[i].as_str());

    match (element, parent) {
        ("Name", Some("Layer")) => layer.name = Some(text.to_string()),
        ("Title", Some("Layer")) => layer.title = Some(text.to_string()),
        ("MinScaleDenominator", Some("Layer")) => layer.min_scale = text.parse().ok(),
        ("MaxScaleDenominator", Some("Layer")) => layer.max_scale = text.parse().ok(),
        ("KeywordList", Some("Layer")) => {
            layer.keywords.get_or_insert_with(Vec::new);
        }
        ("Keyword", Some("KeywordList")) if grandparent == Some("Layer") => {
            layer
                .keywords
                .get_or_insert_with(Vec::new)
                .push(text.to_string());
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms" xmlns:xlink="http://www.w3.org/1999/xlink">
  <Service><Name>WMS</Name><Title>GeoServer</Title></Service>
  <Capability>
    <Layer>
      <Title>Root</Title>
      <KeywordList><Keyword>MAP_ZOOM=10</Keyword></KeywordList>
      <Layer queryable="1">
        <Name>simcoe:Public</Name>
        <Title>Public_Layers</Title>
        <Layer queryable="1" opaque="0">
          <Name>simcoe:Parcels</Name>
          <Title>Parcels</Title>
          <KeywordList><Keyword>DISPLAY_NAME=Parcel Fabric</Keyword><Keyword>OPACITY=0.5</Keyword></KeywordList>
          <MinScaleDenominator>100</MinScaleDenominator>
          <Style>
            <Name>default</Name>
            <LegendURL width="20" height="20">
              <OnlineResource xlink:type="simple" xlink:href="http://x/legend?a=1&amp;b=2"/>
            </LegendURL>
          </Style>
        </Layer>
      </Layer>
    </Layer>
  </Capability>
</WMS_Capabilities>"#;

    #[test]
    fn test_parse_nested_tree() {
        let doc = CapabilitiesDocument::parse(NESTED).unwrap();
        assert_eq!(doc.version.as_deref(), Some("1.3.0"));
        assert_eq!(doc.root.title.as_deref(), Some("Root"));
        assert_eq!(doc.root.layers.len(), 1);

        let group = &doc.root.layers[0];
        assert!(group.is_group());
        assert_eq!(group.name.as_deref(), Some("simcoe:Public"));

        let leaf = &group.layers[0];
        assert!(!leaf.is_group());
        assert!(leaf.queryable);
        assert!(!leaf.opaque);
        assert_eq!(leaf.title.as_deref(), Some("Parcels"));
        assert_eq!(leaf.min_scale, Some(100.0));
        assert_eq!(leaf.max_scale, None);
        assert_eq!(leaf.keywords().unwrap().len(), 2);
        assert_eq!(leaf.legend_url.as_deref(), Some("http://x/legend?a=1&b=2"));
    }

    #[test]
    fn test_style_name_does_not_override_layer_name() {
        let doc = CapabilitiesDocument::parse(NESTED).unwrap();
        let leaf = &doc.root.layers[0].layers[0];
        assert_eq!(leaf.name.as_deref(), Some("simcoe:Parcels"));
    }

    #[test]
    fn test_scoped_nodes() {
        let doc = CapabilitiesDocument::parse(NESTED).unwrap();
        assert_eq!(doc.scoped_nodes(CapabilitiesScope::Root).unwrap().len(), 1);
        let group_scope = doc.scoped_nodes(CapabilitiesScope::Group).unwrap();
        assert_eq!(group_scope[0].name.as_deref(), Some("simcoe:Parcels"));
    }

    #[test]
    fn test_settings_node_prefers_top_level_keywords() {
        let doc = CapabilitiesDocument::parse(NESTED).unwrap();
        assert_eq!(doc.settings_node().title.as_deref(), Some("Root"));
    }

    #[test]
    fn test_missing_capability_is_malformed() {
        let xml = r#"<WMS_Capabilities version="1.3.0"><Service/></WMS_Capabilities>"#;
        assert!(matches!(
            CapabilitiesDocument::parse(xml),
            Err(TocError::MalformedSource(_))
        ));
    }

    #[test]
    fn test_wrong_root_is_malformed() {
        let xml = r#"<ExceptionReport><Exception/></ExceptionReport>"#;
        assert!(matches!(
            CapabilitiesDocument::parse(xml),
            Err(TocError::MalformedSource(_))
        ));
    }

    #[test]
    fn test_scope_from_str() {
        assert_eq!("ROOT".parse::<CapabilitiesScope>().unwrap(), CapabilitiesScope::Root);
        assert_eq!("group".parse::<CapabilitiesScope>().unwrap(), CapabilitiesScope::Group);
        assert!("other".parse::<CapabilitiesScope>().is_err());
    }
}
