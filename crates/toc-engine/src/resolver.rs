//! Group resolution.
//!
//! Every strategy ends in the same shape: an ordered list of groups, each
//! holding deduplicated layer descriptors whose draw indices count down from
//! `layer_count + layer_index_start`, plus the index of the single default
//! group. Groups that end up with no layers are dropped.

use std::collections::HashSet;
use tracing::{debug, info, warn};

use storage::{MapViewport, PersistedLayerState};
use toc_common::{GroupConfig, GroupDescriptor, LayerDescriptor, TocResult};
use wms_protocol::urls::group_capabilities_url;
use wms_protocol::{CapabilitiesDocument, CapabilitiesScope, CapabilityLayer, RestLayerListing};

use crate::builder::{LayerDescriptorBuilder, LayerRecord};
use crate::context::TocContext;
use crate::keywords::LayerKeywords;
use crate::serializer::{from_storable, StoredGroup};
use crate::surface::MapSurface;

/// A configured group paired with the document its layers come from.
#[derive(Debug, Clone)]
pub struct ConfiguredGroup<T> {
    pub config: GroupConfig,
    /// `None` when the group has no source URL or its fetch failed
    pub document: Option<T>,
}

/// Input of one resolution pass.
#[derive(Debug, Clone)]
pub enum SourceDocument {
    /// Groups are the container layers of a GetCapabilities document
    Capabilities {
        document: CapabilitiesDocument,
        url: String,
        scope: CapabilitiesScope,
    },
    /// Statically configured groups, layers from per-group GetCapabilities
    StaticConfig {
        groups: Vec<ConfiguredGroup<CapabilitiesDocument>>,
    },
    /// Statically configured groups, layers from GeoServer REST listings
    CustomRest {
        groups: Vec<ConfiguredGroup<RestLayerListing>>,
    },
    /// Groups previously written by the serializer
    Stored { groups: Vec<StoredGroup> },
}

impl SourceDocument {
    pub fn strategy(&self) -> &'static str {
        match self {
            SourceDocument::Capabilities { .. } => "capabilities",
            SourceDocument::StaticConfig { .. } => "static_config",
            SourceDocument::CustomRest { .. } => "custom_rest",
            SourceDocument::Stored { .. } => "stored",
        }
    }
}

/// Result of one resolution pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub groups: Vec<GroupDescriptor>,
    /// Index into `groups` of the default group; `None` only when empty
    pub default_index: Option<usize>,
    /// Default viewport announced by the source. After a
    /// [`TocLoader`](crate::TocLoader) pass it is only set when it should
    /// be applied, i.e. no user extent is stored.
    pub viewport: Option<MapViewport>,
    /// Records dropped because they could not be built
    pub skipped: usize,
    /// Generation of the pass that produced this result
    pub generation: u64,
}

impl Resolution {
    pub fn default_group(&self) -> Option<&GroupDescriptor> {
        self.groups.get(self.default_index?)
    }

    pub fn layer_count(&self) -> usize {
        self.groups.iter().map(|g| g.layers.len()).sum()
    }

    pub fn layers(&self) -> impl Iterator<Item = &LayerDescriptor> {
        self.groups.iter().flat_map(|g| g.layers.iter())
    }

    pub fn group(&self, value: &str) -> Option<&GroupDescriptor> {
        self.groups.iter().find(|g| g.value == value)
    }
}

/// Resolves groups and their layers from any supported source.
#[derive(Debug)]
pub struct GroupResolver<'a> {
    persisted: &'a PersistedLayerState,
}

impl<'a> GroupResolver<'a> {
    pub fn new(persisted: &'a PersistedLayerState) -> Self {
        Self { persisted }
    }

    /// Run one resolution pass against `source`.
    ///
    /// Unparseable documents fail the whole pass; records that cannot be
    /// built are skipped and counted.
    pub fn resolve<S: MapSurface>(
        &self,
        ctx: &mut TocContext<S>,
        source: &SourceDocument,
    ) -> TocResult<Resolution> {
        let mut skipped = 0;
        let (groups, viewport) = match source {
            SourceDocument::Capabilities {
                document,
                url,
                scope,
            } => self.from_capabilities(ctx, document, url, *scope, &mut skipped)?,
            SourceDocument::StaticConfig { groups } => {
                (self.from_static_config(ctx, groups, &mut skipped)?, None)
            }
            SourceDocument::CustomRest { groups } => {
                (self.from_custom_rest(ctx, groups, &mut skipped)?, None)
            }
            SourceDocument::Stored { groups } => (self.from_stored(ctx, groups, &mut skipped)?, None),
        };

        let resolution = finish(groups, viewport, skipped);
        info!(
            strategy = source.strategy(),
            groups = resolution.groups.len(),
            layers = resolution.layer_count(),
            skipped = resolution.skipped,
            default_group = resolution.default_group().map(|g| g.value.as_str()).unwrap_or(""),
            "Resolved table of contents"
        );
        Ok(resolution)
    }

    fn from_capabilities<S: MapSurface>(
        &self,
        ctx: &mut TocContext<S>,
        document: &CapabilitiesDocument,
        url: &str,
        scope: CapabilitiesScope,
        skipped: &mut usize,
    ) -> TocResult<(Vec<GroupDescriptor>, Option<MapViewport>)> {
        let settings = LayerKeywords::parse(document.settings_node().keywords());
        let viewport = settings.viewport();
        let mut groups = Vec::new();

        for node in document.scoped_nodes(scope)? {
            if !node.is_group() {
                debug!(layer = ?node.name, "Ignoring leaf layer at group level");
                continue;
            }
            let Some(name) = node.name.as_deref().filter(|n| !n.is_empty()) else {
                warn!(title = ?node.title, "Skipping group without a Name");
                *skipped += 1;
                continue;
            };
            let keywords = LayerKeywords::parse(node.keywords());
            let title = node.title.as_deref().filter(|t| !t.is_empty()).unwrap_or(name);
            let group_url = group_capabilities_url(url, name);

            let mut group = GroupDescriptor::new(name, title.replace('_', " "));
            group.default_group = settings.is_default_group(name);
            group.url = Some(group_url.clone());
            group.wms_group_url = Some(group_url);
            group.prefix = keywords.group_prefix;
            group.visible_layers = keywords.visible_layers;

            let records = capability_records(node.layers.iter());
            group.layers = self.build_layers(ctx, &group, records, skipped)?;
            groups.push(group);
        }
        Ok((groups, viewport))
    }

    fn from_static_config<S: MapSurface>(
        &self,
        ctx: &mut TocContext<S>,
        sources: &[ConfiguredGroup<CapabilitiesDocument>],
        skipped: &mut usize,
    ) -> TocResult<Vec<GroupDescriptor>> {
        let mut groups = Vec::with_capacity(sources.len());
        for source in sources {
            let mut group = source.config.to_descriptor();
            let Some(document) = &source.document else {
                debug!(group = %group.value, "No capabilities for configured group");
                continue;
            };
            let nodes = document.scoped_nodes(CapabilitiesScope::Group)?;
            let records = capability_records(nodes.iter());
            group.layers = self.build_layers(ctx, &group, records, skipped)?;
            groups.push(group);
        }
        Ok(groups)
    }

    fn from_custom_rest<S: MapSurface>(
        &self,
        ctx: &mut TocContext<S>,
        sources: &[ConfiguredGroup<RestLayerListing>],
        skipped: &mut usize,
    ) -> TocResult<Vec<GroupDescriptor>> {
        let mut groups = Vec::with_capacity(sources.len());
        for source in sources {
            let mut group = source.config.to_descriptor();
            let Some(listing) = &source.document else {
                debug!(group = %group.value, "No REST listing for configured group");
                continue;
            };
            let records = listing
                .published
                .iter()
                .map(LayerRecord::from_published)
                .collect();
            group.layers = self.build_layers(ctx, &group, records, skipped)?;
            groups.push(group);
        }
        Ok(groups)
    }

    fn from_stored<S: MapSurface>(
        &self,
        ctx: &mut TocContext<S>,
        stored: &[StoredGroup],
        skipped: &mut usize,
    ) -> TocResult<Vec<GroupDescriptor>> {
        let start = ctx.layer_index_start();
        let mut groups = Vec::with_capacity(stored.len());

        for source in stored {
            let mut group = source.descriptor();
            let mut seen = HashSet::new();
            let layers: Vec<_> = source
                .layers
                .iter()
                .filter(|l| !ctx.config.is_excluded(&l.descriptor.name))
                .filter(|l| seen.insert(l.descriptor.name.as_str()))
                .collect();

            let watermark = layers.len() as i64 + start;
            for (offset, stored_layer) in layers.into_iter().enumerate() {
                let mut stored_layer = stored_layer.clone();
                stored_layer.descriptor.draw_index = watermark - offset as i64;
                match from_storable(&mut ctx.surface, &stored_layer) {
                    Ok(layer) => group.layers.push(layer),
                    Err(e) if e.is_recoverable() => {
                        warn!(layer = %stored_layer.descriptor.name, error = %e, "Skipping stored layer");
                        *skipped += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
            groups.push(group);
        }
        Ok(groups)
    }

    /// Dedup, exclude, assign draw indices and build each record.
    fn build_layers<S: MapSurface>(
        &self,
        ctx: &mut TocContext<S>,
        group: &GroupDescriptor,
        records: Vec<LayerRecord>,
        skipped: &mut usize,
    ) -> TocResult<Vec<LayerDescriptor>> {
        let builder = LayerDescriptorBuilder::new(group, self.persisted);
        let mut seen = HashSet::new();
        let mut leaves = Vec::with_capacity(records.len());
        for record in records {
            let Some(name) = record.name() else {
                warn!(group = %group.value, title = ?record.title, "Skipping layer without a Name");
                *skipped += 1;
                continue;
            };
            if ctx.config.is_excluded(name) {
                debug!(layer = %name, "Layer excluded by configuration");
                continue;
            }
            if !seen.insert(name.to_string()) {
                debug!(group = %group.value, layer = %name, "Dropping duplicate layer");
                continue;
            }
            if builder.server_for(&record).is_none() {
                warn!(group = %group.value, layer = %name, "Skipping layer without a server URL");
                *skipped += 1;
                continue;
            }
            leaves.push(record);
        }

        let watermark = leaves.len() as i64 + ctx.layer_index_start();
        let mut layers = Vec::with_capacity(leaves.len());
        for (offset, record) in leaves.iter().enumerate() {
            match builder.build(&mut ctx.surface, record, watermark - offset as i64) {
                Ok(layer) => layers.push(layer),
                Err(e) if e.is_recoverable() => {
                    warn!(group = %group.value, error = %e, "Skipping layer");
                    *skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(layers)
    }
}

/// Flatten capability nodes into leaf records, descending into subgroups.
fn capability_records<'d>(nodes: impl Iterator<Item = &'d CapabilityLayer>) -> Vec<LayerRecord> {
    let mut out = Vec::new();
    for node in nodes {
        collect_leaves(node, &mut out);
    }
    out
}

fn collect_leaves(node: &CapabilityLayer, out: &mut Vec<LayerRecord>) {
    if node.is_group() {
        for child in &node.layers {
            collect_leaves(child, out);
        }
    } else {
        out.push(LayerRecord::from_capability(node));
    }
}

/// Drop empty groups and settle on exactly one default group.
fn finish(groups: Vec<GroupDescriptor>, viewport: Option<MapViewport>, skipped: usize) -> Resolution {
    let mut groups: Vec<_> = groups
        .into_iter()
        .filter(|g| {
            if g.layers.is_empty() {
                debug!(group = %g.value, "Dropping group with no layers");
            }
            !g.layers.is_empty()
        })
        .collect();

    let default_index = if groups.is_empty() {
        None
    } else {
        Some(groups.iter().position(|g| g.default_group).unwrap_or(0))
    };
    for (idx, group) in groups.iter_mut().enumerate() {
        group.default_group = Some(idx) == default_index;
    }

    Resolution {
        groups,
        default_index,
        viewport,
        skipped,
        generation: 0,
    }
}
