//! GeoServer layer-group REST listing.
//!
//! Shape: `{"layerGroup": {"publishables": {"published": [...] | {...}}}}`
//! where each published entry carries `name`, `href` and
//! `layerDetails.featureType.{title, keywords}`.

use serde::Deserialize;

use toc_common::{TocError, TocResult};

/// GeoServer serializes single-element lists as bare objects.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }

    pub fn first(&self) -> Option<&T> {
        match self {
            OneOrMany::Many(items) => items.first(),
            OneOrMany::One(item) => Some(item),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestDocument {
    layer_group: RestLayerGroup,
}

#[derive(Debug, Deserialize)]
struct RestLayerGroup {
    #[serde(default)]
    name: Option<String>,
    publishables: RestPublishables,
}

#[derive(Debug, Deserialize)]
struct RestPublishables {
    #[serde(default)]
    published: Option<OneOrMany<PublishedLayer>>,
}

/// One `published` entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedLayer {
    pub name: Option<String>,
    pub href: Option<String>,
    #[serde(default)]
    pub layer_details: Option<LayerDetails>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDetails {
    pub feature_type: Option<FeatureTypeDetails>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeatureTypeDetails {
    #[serde(default)]
    pub title: Option<OneOrMany<String>>,
    #[serde(default)]
    pub keywords: Option<Keywords>,
}

/// Keyword lists appear as plain arrays or as `{"string": [...]}` wrappers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Keywords {
    Plain(Vec<String>),
    Wrapped(OneOrMany<KeywordStrings>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KeywordStrings {
    pub string: OneOrMany<String>,
}

impl Keywords {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Keywords::Plain(items) => items.clone(),
            Keywords::Wrapped(wrapped) => wrapped
                .first()
                .map(|k| k.string.clone().into_vec())
                .unwrap_or_default(),
        }
    }
}

impl PublishedLayer {
    fn feature_type(&self) -> Option<&FeatureTypeDetails> {
        self.layer_details.as_ref()?.feature_type.as_ref()
    }

    pub fn title(&self) -> Option<&str> {
        self.feature_type()?.title.as_ref()?.first().map(String::as_str)
    }

    /// `None` when the entry has no keyword list at all.
    pub fn keywords(&self) -> Option<Vec<String>> {
        self.feature_type()?.keywords.as_ref().map(Keywords::to_vec)
    }
}

/// Parsed layer-group listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RestLayerListing {
    pub group_name: Option<String>,
    pub published: Vec<PublishedLayer>,
}

impl RestLayerListing {
    /// Parse listing JSON text.
    pub fn parse(json: &str) -> TocResult<Self> {
        let doc: RestDocument = serde_json::from_str(json).map_err(|e| {
            TocError::MalformedSource(format!("layer group listing: {}", e))
        })?;
        Ok(Self {
            group_name: doc.layer_group.name,
            published: doc
                .layer_group
                .publishables
                .published
                .map(OneOrMany::into_vec)
                .unwrap_or_default(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.published.is_empty()
    }
}
