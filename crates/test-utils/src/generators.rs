//! Synthetic source document generators.
//!
//! These build capability documents of arbitrary size for tests that check
//! properties over many layers rather than specific fixture values.

/// Build a server-wide GetCapabilities document.
///
/// Each entry of `groups` is `(group_name, layer_names)`. Layer names may
/// repeat to exercise deduplication.
///
/// # Example
///
/// ```
/// use test_utils::create_capabilities;
///
/// let xml = create_capabilities(&[("ws:g", &["ws:a", "ws:b"])]);
/// assert!(xml.contains("<Name>ws:a</Name>"));
/// ```
pub fn create_capabilities(groups: &[(&str, &[&str])]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms">
  <Capability>
    <Layer>
      <Title>Generated</Title>
"#,
    );
    for (group, layers) in groups {
        xml.push_str(&format!(
            "      <Layer>\n        <Name>{}</Name>\n        <Title>{}</Title>\n",
            escape(group),
            escape(group)
        ));
        for layer in layers.iter() {
            xml.push_str(&layer_element(layer, &[]));
        }
        xml.push_str("      </Layer>\n");
    }
    xml.push_str("    </Layer>\n  </Capability>\n</WMS_Capabilities>\n");
    xml
}

/// Build a single group with `count` uniquely named layers `{prefix}{i}`.
pub fn create_numbered_group(group: &str, prefix: &str, count: usize) -> String {
    let names: Vec<String> = (0..count).map(|i| format!("{}{}", prefix, i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    create_capabilities(&[(group, &refs)])
}

/// One `<Layer>` element with optional keywords.
pub fn layer_element(name: &str, keywords: &[&str]) -> String {
    let mut xml = format!(
        "        <Layer queryable=\"1\">\n          <Name>{}</Name>\n          <Title>{}</Title>\n",
        escape(name),
        escape(name)
    );
    if !keywords.is_empty() {
        xml.push_str("          <KeywordList>");
        for keyword in keywords {
            xml.push_str(&format!("<Keyword>{}</Keyword>", escape(keyword)));
        }
        xml.push_str("</KeywordList>\n");
    }
    xml.push_str("        </Layer>\n");
    xml
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_capabilities_nests_layers() {
        let xml = create_capabilities(&[("ws:g", &["ws:a", "ws:a"])]);
        assert_eq!(xml.matches("<Name>ws:a</Name>").count(), 2);
        assert!(xml.contains("<Name>ws:g</Name>"));
    }

    #[test]
    fn test_numbered_group() {
        let xml = create_numbered_group("ws:g", "ws:layer", 3);
        assert!(xml.contains("<Name>ws:layer2</Name>"));
        assert!(!xml.contains("<Name>ws:layer3</Name>"));
    }

    #[test]
    fn test_keywords_are_escaped() {
        let xml = layer_element("a", &["DISCLAIMER_URL=https://x?a=1&b=2"]);
        assert!(xml.contains("a=1&amp;b=2"));
    }
}
