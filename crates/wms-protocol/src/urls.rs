//! Derived request URL templates.
//!
//! These are reproduced byte-for-byte from what GeoServer-backed clients
//! expect; only spaces in layer names are encoded (as `%20`).

/// Path segment separating a GeoServer host from its workspaces.
const GEOSERVER_SEGMENT: &str = "/geoserver/";

/// Encode spaces in a layer name as `%20`.
pub fn encode_spaces(s: &str) -> String {
    s.replace(' ', "%20")
}

/// WFS GetFeature endpoint; callers append a CQL filter.
pub fn wfs_feature_url(server: &str, layer: &str) -> String {
    format!(
        "{}/wfs?service=wfs&version=2.0.0&request=GetFeature&typeNames={}&outputFormat=application/json&cql_filter=",
        server,
        encode_spaces(layer)
    )
}

/// REST metadata endpoint for a layer.
pub fn rest_metadata_url(server: &str, layer: &str) -> String {
    format!("{}/rest/layers/{}.json", server, encode_spaces(layer))
}

/// REST workspace-scoped layer endpoint (`ws:name` → `/workspaces/ws/layers/name`).
pub fn rest_root_info_url(server: &str, layer: &str) -> String {
    let (workspace, name) = match layer.split_once(':') {
        Some((ws, name)) => (ws, name),
        None => (layer, layer),
    };
    format!(
        "{}/rest/workspaces/{}/layers/{}.json",
        server,
        encode_spaces(workspace),
        encode_spaces(name)
    )
}

/// 20x20 PNG legend swatch.
pub fn legend_graphic_url(server: &str, layer: &str) -> String {
    format!(
        "{}/wms?REQUEST=GetLegendGraphic&VERSION=1.0.0&FORMAT=image/png&WIDTH=20&HEIGHT=20&LAYER={}",
        server,
        encode_spaces(layer)
    )
}

/// Legend swatch for an explicit style.
pub fn legend_graphic_url_with_style(server: &str, layer: &str, style: &str) -> String {
    format!("{}&STYLE={}", legend_graphic_url(server, layer), encode_spaces(style))
}

/// WMS endpoint of a server, used as an image source URL.
pub fn wms_endpoint(server: &str) -> String {
    format!("{}/wms", server.trim_end_matches('/'))
}

/// WFS query restricted to features intersecting a WKT geometry.
pub fn wfs_intersects_url(wfs_url: &str, wkt: &str) -> String {
    format!("{}INTERSECTS(geom,{})", wfs_url, wkt)
}

/// Host part of a GeoServer URL, before `/geoserver/`.
///
/// URLs without the segment lose only their query string.
pub fn geoserver_host(url: &str) -> &str {
    match url.find(GEOSERVER_SEGMENT) {
        Some(idx) => &url[..idx],
        None => url.split('?').next().unwrap_or(url).trim_end_matches('/'),
    }
}

/// `{host}/geoserver`, the server URL layer templates are built from.
pub fn geoserver_root(url: &str) -> String {
    let host = geoserver_host(url);
    if host.ends_with("/geoserver") {
        host.to_string()
    } else {
        format!("{}/geoserver", host)
    }
}

/// Server URL of a REST listing entry: its `href` up to `/rest/`.
pub fn server_from_rest_href(href: &str) -> &str {
    href.split("/rest/").next().unwrap_or(href)
}

/// Per-group GetCapabilities URL (`ws:group` → `/geoserver/ws/group/ows?...`).
pub fn group_capabilities_url(capabilities_url: &str, group_name: &str) -> String {
    format!(
        "{}/{}/ows?service=wms&version=1.3.0&request=GetCapabilities",
        geoserver_root(capabilities_url),
        group_name.replace(':', "/")
    )
}

/// Upgrade a plain-http URL to https.
pub fn https_upgrade(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}
