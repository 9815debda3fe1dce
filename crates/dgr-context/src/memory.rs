//! In-memory context registry.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::{ContextError, ContextHandle, RenderContexts};

/// Snapshot of a [`MemoryContexts`] registry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContextStats {
    /// Contexts acquired since creation.
    pub acquired: usize,
    /// Contexts released since creation.
    pub released: usize,
    /// Contexts currently live.
    pub live: usize,
}

#[derive(Debug, Default)]
struct Registry {
    live: HashSet<String>,
    acquired: usize,
    released: usize,
}

/// [`RenderContexts`] backed by an in-memory set of identifiers.
///
/// Suitable for engines that don't need a filesystem target (e.g. Kroki).
/// [`stats`](Self::stats) makes acquire/release balance observable.
#[derive(Debug, Default)]
pub struct MemoryContexts {
    registry: Mutex<Registry>,
}

impl MemoryContexts {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current acquire/release counters.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn stats(&self) -> ContextStats {
        let registry = self.registry.lock().unwrap();
        ContextStats {
            acquired: registry.acquired,
            released: registry.released,
            live: registry.live.len(),
        }
    }
}

impl RenderContexts for MemoryContexts {
    fn acquire(&self) -> Result<ContextHandle, ContextError> {
        let handle = ContextHandle::generate();
        let mut registry = self.registry.lock().unwrap();
        registry.live.insert(handle.id().to_owned());
        registry.acquired += 1;
        Ok(handle)
    }

    fn release(&self, handle: &ContextHandle) {
        let mut registry = self.registry.lock().unwrap();
        if registry.live.remove(handle.id()) {
            registry.released += 1;
        } else {
            tracing::warn!(context = %handle, "release of unknown render context ignored");
        }
    }

    fn live(&self) -> usize {
        self.registry.lock().unwrap().live.len()
    }
}
