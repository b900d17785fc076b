//! Fetching sources and running resolution passes.
//!
//! The loader fetches every document a pass needs concurrently, then resolves
//! once all of them have arrived. Results of a pass that was superseded by a
//! newer one while fetching are discarded.

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, instrument, warn};

use storage::{apply_map_defaults, KeyValueStore, PersistedLayerState};
use toc_common::{GroupConfig, TocResult};
use wms_protocol::{CapabilitiesDocument, CapabilitiesScope, RestLayerListing};

use crate::context::TocContext;
use crate::generation::GenerationToken;
use crate::resolver::{ConfiguredGroup, GroupResolver, Resolution, SourceDocument};
use crate::surface::MapSurface;

/// Fetches source documents as text.
#[async_trait]
pub trait CapabilityFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> TocResult<String>;
}

/// Drives resolution passes over fetched documents.
#[derive(Debug)]
pub struct TocLoader<F> {
    fetcher: F,
}

impl<F: CapabilityFetcher> TocLoader<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Resolve groups from one GetCapabilities document.
    ///
    /// Returns `Ok(None)` when a newer pass started while fetching.
    #[instrument(skip(self, ctx, store))]
    pub async fn load_capabilities<S, K>(
        &self,
        ctx: &mut TocContext<S>,
        store: &mut K,
        url: &str,
        scope: CapabilitiesScope,
    ) -> TocResult<Option<Resolution>>
    where
        S: MapSurface,
        K: KeyValueStore + ?Sized,
    {
        let token = ctx.generations.begin();
        let text = self.fetcher.fetch_text(url).await?;
        if is_superseded(&token) {
            return Ok(None);
        }

        let document = CapabilitiesDocument::parse(&text)?;
        let source = SourceDocument::Capabilities {
            document,
            url: url.to_string(),
            scope,
        };
        self.finish(ctx, store, &token, &source).map(Some)
    }

    /// Resolve the statically configured groups, fetching each group's
    /// layer list from its WMS or custom REST URL.
    ///
    /// A group whose fetch fails is left out; an unparseable document fails
    /// the pass.
    #[instrument(skip(self, ctx, store))]
    pub async fn load_configured<S, K>(
        &self,
        ctx: &mut TocContext<S>,
        store: &mut K,
    ) -> TocResult<Option<Resolution>>
    where
        S: MapSurface,
        K: KeyValueStore + ?Sized,
    {
        let token = ctx.generations.begin();
        let use_rest = ctx.config.use_custom_rest_url;
        let configs = ctx.config.layer_groups.clone();

        let texts = self.fetch_all(&configs, use_rest).await;
        if is_superseded(&token) {
            return Ok(None);
        }

        let source = if use_rest {
            SourceDocument::CustomRest {
                groups: pair_documents(configs, texts, RestLayerListing::parse)?,
            }
        } else {
            SourceDocument::StaticConfig {
                groups: pair_documents(configs, texts, CapabilitiesDocument::parse)?,
            }
        };
        self.finish(ctx, store, &token, &source).map(Some)
    }

    /// Fetch every group's source; results keep the order of `configs`.
    async fn fetch_all(&self, configs: &[GroupConfig], use_rest: bool) -> Vec<Option<String>> {
        let fetches = configs.iter().map(|config| async move {
            let url = config.source_url(use_rest)?;
            match self.fetcher.fetch_text(url).await {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!(group = %config.name, error = %e, "Group source fetch failed");
                    None
                }
            }
        });
        join_all(fetches).await
    }

    fn finish<S, K>(
        &self,
        ctx: &mut TocContext<S>,
        store: &mut K,
        token: &GenerationToken,
        source: &SourceDocument,
    ) -> TocResult<Resolution>
    where
        S: MapSurface,
        K: KeyValueStore + ?Sized,
    {
        let persisted = PersistedLayerState::load(store)?;
        let mut resolution = GroupResolver::new(&persisted).resolve(ctx, source)?;
        resolution.generation = token.id();
        if let Some(viewport) = resolution.viewport.take() {
            resolution.viewport = apply_map_defaults(store, &viewport)?;
        }
        Ok(resolution)
    }
}

fn is_superseded(token: &GenerationToken) -> bool {
    if token.is_stale() {
        debug!(generation = token.id(), "Discarding superseded resolution pass");
        return true;
    }
    false
}

fn pair_documents<T>(
    configs: Vec<GroupConfig>,
    texts: Vec<Option<String>>,
    parse: impl Fn(&str) -> TocResult<T>,
) -> TocResult<Vec<ConfiguredGroup<T>>> {
    configs
        .into_iter()
        .zip(texts)
        .map(|(config, text)| {
            let document = text.as_deref().map(&parse).transpose()?;
            Ok(ConfiguredGroup { config, document })
        })
        .collect()
}
