//! Reconciliation between descriptors and renderable layers.
//!
//! Every operation takes a layer list and returns a new list of the same
//! length and order; the input is never mutated. A descriptor whose
//! renderable layer has gone missing is updated anyway and the miss is
//! logged.

use tracing::{debug, warn};

use storage::{GroupLayerState, KeyValueStore, PersistedLayerState, SavedLayerState};
use toc_common::{LayerDescriptor, LayerHandle, TocResult};

use crate::context::TocContext;
use crate::surface::MapSurface;

/// Push each descriptor's visibility onto its renderable layer.
pub fn apply_visible<S: MapSurface>(
    ctx: &mut TocContext<S>,
    layers: &[LayerDescriptor],
) -> Vec<LayerDescriptor> {
    layers
        .iter()
        .map(|layer| {
            sync(&mut ctx.surface, layer, |s, h| s.set_visible(h, layer.visible));
            layer.clone()
        })
        .collect()
}

/// Hide every layer.
pub fn hide<S: MapSurface>(ctx: &mut TocContext<S>, layers: &[LayerDescriptor]) -> Vec<LayerDescriptor> {
    layers
        .iter()
        .map(|layer| {
            sync(&mut ctx.surface, layer, |s, h| s.set_visible(h, false));
            LayerDescriptor {
                visible: false,
                ..layer.clone()
            }
        })
        .collect()
}

/// Show every layer, except those whose disclaimer is not yet accepted.
///
/// Gated layers stay hidden and a prompt is queued on the context's
/// disclaimer gate.
pub fn show<S: MapSurface>(ctx: &mut TocContext<S>, layers: &[LayerDescriptor]) -> Vec<LayerDescriptor> {
    layers
        .iter()
        .map(|layer| {
            let allowed = ctx.disclaimers.request_visible(layer);
            if !allowed {
                debug!(layer = %layer.name, "Show deferred until disclaimer is accepted");
            }
            sync(&mut ctx.surface, layer, |s, h| s.set_visible(h, allowed));
            LayerDescriptor {
                visible: allowed,
                ..layer.clone()
            }
        })
        .collect()
}

/// Hide every layer and collapse every legend. Draw order is left alone.
pub fn reset_defaults<S: MapSurface>(
    ctx: &mut TocContext<S>,
    layers: &[LayerDescriptor],
) -> Vec<LayerDescriptor> {
    layers
        .iter()
        .map(|layer| {
            sync(&mut ctx.surface, layer, |s, h| s.set_visible(h, false));
            LayerDescriptor {
                visible: false,
                show_legend: false,
                ..layer.clone()
            }
        })
        .collect()
}

/// Reassign draw indices from list order: the first layer gets
/// `len + layer_index_start` and each following layer one less.
pub fn reindex<S: MapSurface>(ctx: &mut TocContext<S>, layers: &[LayerDescriptor]) -> Vec<LayerDescriptor> {
    let watermark = layers.len() as i64 + ctx.layer_index_start();
    layers
        .iter()
        .enumerate()
        .map(|(offset, layer)| {
            let draw_index = watermark - offset as i64;
            sync(&mut ctx.surface, layer, |s, h| s.set_z_index(h, draw_index));
            LayerDescriptor {
                draw_index,
                ..layer.clone()
            }
        })
        .collect()
}

/// Set one layer's opacity (clamped to [0, 1]).
pub fn set_opacity<S: MapSurface>(
    ctx: &mut TocContext<S>,
    layers: &[LayerDescriptor],
    name: &str,
    opacity: f64,
) -> Vec<LayerDescriptor> {
    let opacity = opacity.clamp(0.0, 1.0);
    layers
        .iter()
        .map(|layer| {
            if layer.name != name {
                return layer.clone();
            }
            sync(&mut ctx.surface, layer, |s, h| s.set_opacity(h, opacity));
            LayerDescriptor {
                opacity,
                ..layer.clone()
            }
        })
        .collect()
}

/// Current visibility, opacity and draw index of every layer, as persisted.
pub fn capture(layers: &[LayerDescriptor]) -> GroupLayerState {
    layers
        .iter()
        .map(|layer| {
            let mut state = SavedLayerState::new(layer.visible, layer.opacity);
            state.draw_index = Some(layer.draw_index);
            (layer.name.clone(), state)
        })
        .collect()
}

/// Capture a group's layers into `persisted` and write it to `store`.
pub fn persist<K: KeyValueStore + ?Sized>(
    store: &mut K,
    persisted: &mut PersistedLayerState,
    group: &str,
    layers: &[LayerDescriptor],
) -> TocResult<()> {
    persisted.set_group(group, capture(layers));
    persisted.save(store)?;
    debug!(group = %group, layers = layers.len(), "Persisted layer state");
    Ok(())
}

/// Apply `op` to the renderable layer of `layer`, logging any miss.
fn sync<S, F>(surface: &mut S, layer: &LayerDescriptor, op: F)
where
    S: MapSurface,
    F: FnOnce(&mut S, LayerHandle) -> TocResult<()>,
{
    let result = layer.handle().and_then(|h| op(surface, h));
    if let Err(e) = result {
        warn!(layer = %layer.name, error = %e, "Renderable layer out of sync");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RenderLayer;
    use storage::MemoryStore;
    use test_utils::fixtures::descriptor;
    use toc_common::{Disclaimer, RebuildParams, TocConfig};

    fn bound(ctx: &mut TocContext, names: &[&str]) -> Vec<LayerDescriptor> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let handle = ctx.surface.add_layer(RenderLayer::new(RebuildParams::image_wms(
                    "https://x/geoserver/wms",
                    *name,
                    *name,
                )));
                let mut layer = descriptor(name, 100 + i as i64);
                layer.layer = Some(handle);
                layer
            })
            .collect()
    }

    #[test]
    fn test_empty_lists_are_identity() {
        let mut ctx = TocContext::new(TocConfig::default());
        assert!(apply_visible(&mut ctx, &[]).is_empty());
        assert!(hide(&mut ctx, &[]).is_empty());
        assert!(show(&mut ctx, &[]).is_empty());
        assert!(reset_defaults(&mut ctx, &[]).is_empty());
        assert!(reindex(&mut ctx, &[]).is_empty());
    }

    #[test]
    fn test_hide_then_show() {
        let mut ctx = TocContext::new(TocConfig::default());
        let layers = bound(&mut ctx, &["a", "b"]);

        let hidden = hide(&mut ctx, &layers);
        assert!(hidden.iter().all(|l| !l.visible));
        assert!(hidden
            .iter()
            .all(|l| ctx.surface.get_visible(l.layer.unwrap()) == Some(false)));

        let shown = show(&mut ctx, &hidden);
        assert!(shown.iter().all(|l| l.visible));
        assert!(shown
            .iter()
            .all(|l| ctx.surface.get_visible(l.layer.unwrap()) == Some(true)));
    }

    #[test]
    fn test_show_is_gated_by_disclaimer() {
        let mut ctx = TocContext::new(TocConfig::default());
        let mut layers = bound(&mut ctx, &["open", "licensed"]);
        layers[1].disclaimer = Some(Disclaimer {
            title: "Licence".to_string(),
            url: String::new(),
        });
        let layers = hide(&mut ctx, &layers);

        let shown = show(&mut ctx, &layers);
        assert!(shown[0].visible);
        assert!(!shown[1].visible);
        assert_eq!(ctx.surface.get_visible(shown[1].layer.unwrap()), Some(false));
        assert_eq!(ctx.disclaimers.pending().len(), 1);

        ctx.disclaimers.accept("licensed");
        let shown = show(&mut ctx, &layers);
        assert!(shown[1].visible);
    }

    #[test]
    fn test_reset_defaults_hides_everything() {
        let mut ctx = TocContext::new(TocConfig::default());
        let mut layers = bound(&mut ctx, &["a", "b", "c"]);
        layers[0].show_legend = true;
        let layers = show(&mut ctx, &layers);
        assert!(layers.iter().all(|l| l.visible));

        let reset = reset_defaults(&mut ctx, &layers);
        assert!(reset.iter().all(|l| !l.visible));
        assert!(reset.iter().all(|l| !l.show_legend));
        assert!(reset
            .iter()
            .all(|l| ctx.surface.get_visible(l.layer.unwrap()) == Some(false)));
        let indices: Vec<_> = reset.iter().map(|l| l.draw_index).collect();
        assert_eq!(indices, vec![100, 101, 102]);
        // Input untouched
        assert!(layers[1].visible);
    }

    #[test]
    fn test_reindex_counts_down_from_watermark() {
        let mut ctx = TocContext::new(TocConfig::default());
        let layers = bound(&mut ctx, &["a", "b", "c"]);
        let mut reordered = layers.clone();
        reordered.reverse();

        let reindexed = reindex(&mut ctx, &reordered);
        let indices: Vec<_> = reindexed.iter().map(|l| l.draw_index).collect();
        assert_eq!(indices, vec![103, 102, 101]);
        assert_eq!(reindexed[0].name, "c");
        assert_eq!(ctx.surface.layer(reindexed[0].layer.unwrap()).unwrap().z_index, 103);
        // Input untouched
        assert_eq!(layers[0].draw_index, 100);
    }

    #[test]
    fn test_missing_renderable_layer_is_tolerated() {
        let mut ctx = TocContext::new(TocConfig::default());
        let layers = bound(&mut ctx, &["a"]);
        ctx.release_layers(&layers);
        let hidden = hide(&mut ctx, &layers);
        assert_eq!(hidden.len(), 1);
        assert!(!hidden[0].visible);
    }

    #[test]
    fn test_set_opacity_targets_one_layer() {
        let mut ctx = TocContext::new(TocConfig::default());
        let layers = bound(&mut ctx, &["a", "b"]);
        let updated = set_opacity(&mut ctx, &layers, "b", 1.5);
        assert_eq!(updated[0].opacity, layers[0].opacity);
        assert_eq!(updated[1].opacity, 1.0);
        let updated = set_opacity(&mut ctx, &updated, "b", 0.3);
        assert_eq!(ctx.surface.get_opacity(updated[1].layer.unwrap()), Some(0.3));
    }

    #[test]
    fn test_persist_round_trip() {
        let mut ctx = TocContext::new(TocConfig::default());
        let layers = bound(&mut ctx, &["a", "b"]);
        let layers = show(&mut ctx, &layers[..1])
            .into_iter()
            .chain(hide(&mut ctx, &layers[1..]))
            .collect::<Vec<_>>();

        let mut store = MemoryStore::new();
        let mut persisted = PersistedLayerState::new();
        persist(&mut store, &mut persisted, "simcoe:Public", &layers).unwrap();

        let reloaded = PersistedLayerState::load(&store).unwrap();
        assert!(reloaded.layer("simcoe:Public", "a").unwrap().visible);
        assert!(!reloaded.layer("simcoe:Public", "b").unwrap().visible);
        assert_eq!(reloaded.layer("simcoe:Public", "b").unwrap().draw_index, Some(101));
    }
}
