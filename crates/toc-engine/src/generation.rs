//! Generation tokens for discarding superseded resolution passes.
//!
//! Every resolution pass takes a token when it starts. Starting a newer pass
//! makes older tokens stale, and a stale pass must not publish its result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use toc_common::{TocError, TocResult};

/// Hands out generation tokens; clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct ResolutionTracker {
    current: Arc<AtomicU64>,
}

impl ResolutionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new pass, superseding every earlier token.
    pub fn begin(&self) -> GenerationToken {
        let id = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        GenerationToken {
            id,
            current: Arc::clone(&self.current),
        }
    }

    /// Generation of the latest pass; 0 before any pass started.
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

/// Identity of one resolution pass.
#[derive(Debug, Clone)]
pub struct GenerationToken {
    id: u64,
    current: Arc<AtomicU64>,
}

impl GenerationToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.id
    }

    pub fn is_stale(&self) -> bool {
        !self.is_current()
    }

    /// `Err(StaleGeneration)` once a newer pass has started.
    pub fn ensure_current(&self) -> TocResult<()> {
        if self.is_current() {
            Ok(())
        } else {
            Err(TocError::StaleGeneration(self.id))
        }
    }
}
