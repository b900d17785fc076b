//! Licence disclaimer gate.
//!
//! A layer carrying a disclaimer may only become visible once the user has
//! accepted it. Asking to show such a layer queues a prompt instead and
//! leaves the layer hidden; the decision comes back through [`DisclaimerGate::accept`]
//! or [`DisclaimerGate::decline`]. Acceptance lasts for the lifetime of the gate.

use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::{debug, info};

use toc_common::LayerDescriptor;

/// Message shown with every disclaimer prompt.
pub const DISCLAIMER_MESSAGE: &str = "The layer you are about to view contains data which is subject to a licence agreement. Before turning on this layer, you must review the agreement and click 'Accept' or 'Decline'.";

/// A pending request for the user to accept a licence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisclaimerPrompt {
    pub layer_name: String,
    pub title: String,
    pub url: String,
    pub message: String,
}

/// Acceptance state of one layer's disclaimer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisclaimerState {
    Unseen,
    Pending,
    Accepted,
}

#[derive(Debug, Default)]
pub struct DisclaimerGate {
    accepted: HashSet<String>,
    pending: Vec<DisclaimerPrompt>,
    notifier: Option<mpsc::UnboundedSender<DisclaimerPrompt>>,
}

impl DisclaimerGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive prompts as they are raised. A later call replaces the
    /// previous subscriber.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<DisclaimerPrompt> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.notifier = Some(tx);
        rx
    }

    pub fn state(&self, layer_name: &str) -> DisclaimerState {
        if self.accepted.contains(layer_name) {
            DisclaimerState::Accepted
        } else if self.pending.iter().any(|p| p.layer_name == layer_name) {
            DisclaimerState::Pending
        } else {
            DisclaimerState::Unseen
        }
    }

    /// Whether `layer` may become visible now.
    ///
    /// Returns `false` and raises a prompt (once per layer until decided)
    /// when the layer has a disclaimer that has not been accepted.
    pub fn request_visible(&mut self, layer: &LayerDescriptor) -> bool {
        let Some(disclaimer) = &layer.disclaimer else {
            return true;
        };
        match self.state(&layer.name) {
            DisclaimerState::Accepted => true,
            DisclaimerState::Pending => false,
            DisclaimerState::Unseen => {
                let prompt = DisclaimerPrompt {
                    layer_name: layer.name.clone(),
                    title: disclaimer.title.clone(),
                    url: disclaimer.url.clone(),
                    message: DISCLAIMER_MESSAGE.to_string(),
                };
                info!(layer = %layer.name, title = %prompt.title, "Layer requires disclaimer acceptance");
                if let Some(tx) = &self.notifier {
                    if tx.send(prompt.clone()).is_err() {
                        debug!("Disclaimer subscriber dropped");
                        self.notifier = None;
                    }
                }
                self.pending.push(prompt);
                false
            }
        }
    }

    /// Record acceptance; returns the prompt that was pending, if any.
    pub fn accept(&mut self, layer_name: &str) -> Option<DisclaimerPrompt> {
        info!(layer = %layer_name, "Disclaimer accepted");
        self.accepted.insert(layer_name.to_string());
        self.take_prompt(layer_name)
    }

    /// Drop the pending prompt; the layer stays hidden and may prompt again.
    pub fn decline(&mut self, layer_name: &str) -> Option<DisclaimerPrompt> {
        info!(layer = %layer_name, "Disclaimer declined");
        self.take_prompt(layer_name)
    }

    pub fn is_accepted(&self, layer_name: &str) -> bool {
        self.accepted.contains(layer_name)
    }

    pub fn pending(&self) -> &[DisclaimerPrompt] {
        &self.pending
    }

    /// Drain all pending prompts.
    pub fn take_pending(&mut self) -> Vec<DisclaimerPrompt> {
        std::mem::take(&mut self.pending)
    }

    fn take_prompt(&mut self, layer_name: &str) -> Option<DisclaimerPrompt> {
        let idx = self.pending.iter().position(|p| p.layer_name == layer_name)?;
        Some(self.pending.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures::descriptor;
    use toc_common::Disclaimer;

    fn licensed() -> LayerDescriptor {
        licensed_named("simcoe:Orthos")
    }

    fn licensed_named(name: &str) -> LayerDescriptor {
        let mut layer = descriptor(name, 101);
        layer.disclaimer = Some(Disclaimer {
            title: "Imagery Licence".to_string(),
            url: "https://example.ca/licence.pdf".to_string(),
        });
        layer
    }

    #[test]
    fn test_layers_without_disclaimer_pass() {
        let mut gate = DisclaimerGate::new();
        assert!(gate.request_visible(&descriptor("simcoe:Parcels", 101)));
        assert!(gate.pending().is_empty());
    }

    #[test]
    fn test_prompt_raised_once_until_decided() {
        let mut gate = DisclaimerGate::new();
        let layer = licensed();
        assert!(!gate.request_visible(&layer));
        assert!(!gate.request_visible(&layer));
        assert_eq!(gate.pending().len(), 1);
        assert_eq!(gate.state(&layer.name), DisclaimerState::Pending);
        assert_eq!(gate.pending()[0].message, DISCLAIMER_MESSAGE);
    }

    #[test]
    fn test_accept_is_sticky() {
        let mut gate = DisclaimerGate::new();
        let layer = licensed();
        gate.request_visible(&layer);
        let prompt = gate.accept(&layer.name).unwrap();
        assert_eq!(prompt.title, "Imagery Licence");
        assert!(gate.request_visible(&layer));
        assert!(gate.pending().is_empty());
    }

    #[test]
    fn test_acceptance_is_per_layer() {
        let mut gate = DisclaimerGate::new();
        let a = licensed_named("simcoe:Orthos_2018");
        let b = licensed_named("simcoe:Orthos_2023");
        assert!(!gate.request_visible(&a));
        gate.accept(&a.name);
        assert!(gate.request_visible(&a));

        assert!(!gate.request_visible(&b));
        assert_eq!(gate.state(&b.name), DisclaimerState::Pending);
        assert!(!gate.is_accepted(&b.name));
        assert_eq!(gate.pending().len(), 1);
        assert_eq!(gate.pending()[0].layer_name, "simcoe:Orthos_2023");
    }

    #[test]
    fn test_decline_allows_prompting_again() {
        let mut gate = DisclaimerGate::new();
        let layer = licensed();
        gate.request_visible(&layer);
        assert!(gate.decline(&layer.name).is_some());
        assert_eq!(gate.state(&layer.name), DisclaimerState::Unseen);
        assert!(!gate.request_visible(&layer));
        assert_eq!(gate.take_pending().len(), 1);
        assert!(gate.pending().is_empty());
    }

    #[tokio::test]
    async fn test_subscriber_receives_prompts() {
        let mut gate = DisclaimerGate::new();
        let mut rx = gate.subscribe();
        gate.request_visible(&licensed());
        let prompt = rx.recv().await.unwrap();
        assert_eq!(prompt.layer_name, "simcoe:Orthos");
    }
}
