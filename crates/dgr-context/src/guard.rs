//! Scoped context acquisition.

use crate::{ContextError, ContextHandle, RenderContexts};

/// An acquired context that is released when the guard goes away.
///
/// Release happens in [`Drop`], so it runs on normal return, on early return
/// through `?`, during panic unwinding, and when an async task holding the
/// guard is dropped mid-flight. Ownership guarantees the handle is released
/// exactly once.
pub struct ContextGuard<'a> {
    contexts: &'a dyn RenderContexts,
    handle: ContextHandle,
}

impl<'a> ContextGuard<'a> {
    /// Acquire a context from `contexts`.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError`] if the backend cannot create a context.
    pub fn acquire(contexts: &'a dyn RenderContexts) -> Result<Self, ContextError> {
        let handle = contexts.acquire()?;
        tracing::trace!(context = %handle, "acquired render context");
        Ok(Self { contexts, handle })
    }

    /// The acquired handle.
    #[must_use]
    pub fn handle(&self) -> &ContextHandle {
        &self.handle
    }

    /// Release the context now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.contexts.release(&self.handle);
        tracing::trace!(context = %self.handle, "released render context");
    }
}

impl std::fmt::Debug for ContextGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextGuard")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}
