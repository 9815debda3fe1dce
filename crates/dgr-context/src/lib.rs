//! Ephemeral render contexts for dgr.
//!
//! A render context is a short-lived, uniquely named scratch target that the
//! render engine may use for a single attempt. This crate decouples the
//! renderer from where those targets live:
//!
//! - [`RenderContexts`]: Acquire/release factory for contexts
//! - [`ContextGuard`]: Scoped acquisition, released exactly once on every exit path
//!
//! # Implementations
//!
//! - [`MemoryContexts`]: In-memory registry with acquire/release counters
//! - [`ScratchDirContexts`]: One scratch subdirectory per context
//!
//! # Example
//!
//! ```
//! use dgr_context::{ContextGuard, MemoryContexts};
//!
//! let contexts = MemoryContexts::new();
//! {
//!     let guard = ContextGuard::acquire(&contexts).unwrap();
//!     assert!(guard.handle().id().starts_with("dgr-render-"));
//!     assert_eq!(contexts.stats().live, 1);
//! }
//! assert_eq!(contexts.stats().live, 0);
//! ```

mod guard;
mod memory;
mod scratch;

use std::path::{Path, PathBuf};

pub use guard::ContextGuard;
pub use memory::{ContextStats, MemoryContexts};
pub use scratch::ScratchDirContexts;

/// Prefix for generated context identifiers.
const CONTEXT_ID_PREFIX: &str = "dgr-render-";

/// Handle to an acquired render context.
///
/// Identifiers are unique per acquisition. A handle is only meaningful to the
/// [`RenderContexts`] that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContextHandle {
    id: String,
    scratch: Option<PathBuf>,
}

impl ContextHandle {
    /// Create a handle with a freshly generated identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            id: format!("{CONTEXT_ID_PREFIX}{}", uuid::Uuid::new_v4().simple()),
            scratch: None,
        }
    }

    /// Attach a scratch directory to the handle.
    #[must_use]
    pub fn with_scratch(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch = Some(dir.into());
        self
    }

    /// Unique context identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Scratch directory owned by this context, if the backend provides one.
    #[must_use]
    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch.as_deref()
    }
}

impl std::fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

/// Error acquiring a render context.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// The scratch directory for a context could not be created.
    #[error("failed to create scratch directory {}: {source}", path.display())]
    Scratch {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Factory for ephemeral render contexts.
///
/// Every handle returned by [`acquire`](Self::acquire) must be passed to
/// [`release`](Self::release) exactly once. Use [`ContextGuard`] rather than
/// calling these methods directly; it releases on drop.
pub trait RenderContexts: Send + Sync {
    /// Create a new, isolated context.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError`] if the backing resource cannot be created.
    fn acquire(&self) -> Result<ContextHandle, ContextError>;

    /// Destroy a context.
    ///
    /// Releasing an unknown or already released handle is a no-op.
    fn release(&self, handle: &ContextHandle);

    /// Number of contexts acquired and not yet released.
    fn live(&self) -> usize;
}
