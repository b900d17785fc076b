//! Explicit state shared by every engine operation.

use tracing::debug;

use toc_common::{GroupDescriptor, LayerDescriptor, TocConfig};

use crate::disclaimer::DisclaimerGate;
use crate::generation::ResolutionTracker;
use crate::surface::{LayerRegistry, MapSurface};

/// Map surface, disclaimer acceptances, resolution generations and
/// configuration for one table of contents.
#[derive(Debug)]
pub struct TocContext<S: MapSurface = LayerRegistry> {
    pub surface: S,
    pub disclaimers: DisclaimerGate,
    pub generations: ResolutionTracker,
    pub config: TocConfig,
}

impl TocContext<LayerRegistry> {
    /// Context over an empty in-process [`LayerRegistry`].
    pub fn new(config: TocConfig) -> Self {
        Self::with_surface(config, LayerRegistry::new())
    }
}

impl<S: MapSurface> TocContext<S> {
    pub fn with_surface(config: TocConfig, surface: S) -> Self {
        Self {
            surface,
            disclaimers: DisclaimerGate::new(),
            generations: ResolutionTracker::new(),
            config,
        }
    }

    pub fn layer_index_start(&self) -> i64 {
        self.config.layer_index_start
    }

    /// Remove the renderable layers bound to `layers` from the surface.
    ///
    /// Returns how many were removed; unbound descriptors are ignored.
    pub fn release_layers(&mut self, layers: &[LayerDescriptor]) -> usize {
        let removed = layers
            .iter()
            .filter_map(|l| l.layer)
            .filter(|h| self.surface.remove_layer(*h).is_some())
            .count();
        debug!(removed, "Released layers");
        removed
    }

    /// Remove every layer of every group from the surface.
    pub fn release_groups(&mut self, groups: &[GroupDescriptor]) -> usize {
        groups.iter().map(|g| self.release_layers(&g.layers)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RenderLayer;
    use test_utils::fixtures::descriptor;
    use toc_common::RebuildParams;

    #[test]
    fn test_release_layers() {
        let mut ctx = TocContext::new(TocConfig::default());
        let handle = ctx
            .surface
            .add_layer(RenderLayer::new(RebuildParams::stored_features("myMaps")));
        let mut bound = descriptor("myMaps", 100);
        bound.layer = Some(handle);
        let unbound = descriptor("other", 99);

        assert_eq!(ctx.release_layers(&[bound.clone(), unbound]), 1);
        assert!(ctx.surface.is_empty());
        assert_eq!(ctx.release_layers(&[bound]), 0);
        assert_eq!(ctx.layer_index_start(), 100);
    }
}
