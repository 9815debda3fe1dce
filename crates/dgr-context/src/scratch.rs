//! Filesystem scratch contexts.
//!
//! [`ScratchDirContexts`] gives every context its own directory under a root:
//!
//! ```text
//! {root}/
//! +-- dgr-render-1f0c.../    # live context
//! +-- dgr-render-9a7e.../    # live context
//! ```
//!
//! Directories are removed on release. The root itself is created on demand
//! and never removed.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::{ContextError, ContextHandle, RenderContexts};

/// [`RenderContexts`] backed by per-context scratch directories.
#[derive(Debug)]
pub struct ScratchDirContexts {
    root: PathBuf,
    live: Mutex<HashSet<String>>,
}

impl ScratchDirContexts {
    /// Create a scratch context factory rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            live: Mutex::new(HashSet::new()),
        }
    }

    /// Root directory containing context subdirectories.
    #[must_use]
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl RenderContexts for ScratchDirContexts {
    fn acquire(&self) -> Result<ContextHandle, ContextError> {
        let handle = ContextHandle::generate();
        let dir = self.root.join(handle.id());

        fs::create_dir_all(&dir).map_err(|source| ContextError::Scratch {
            path: dir.clone(),
            source,
        })?;
        tracing::debug!(context = %handle, dir = %dir.display(), "created scratch context");

        self.live.lock().unwrap().insert(handle.id().to_owned());
        Ok(handle.with_scratch(dir))
    }

    fn release(&self, handle: &ContextHandle) {
        if !self.live.lock().unwrap().remove(handle.id()) {
            tracing::warn!(context = %handle, "release of unknown scratch context ignored");
            return;
        }

        let dir = self.root.join(handle.id());
        if let Err(e) = fs::remove_dir_all(&dir) {
            tracing::warn!(dir = %dir.display(), "failed to remove scratch context: {e}");
        }
    }

    fn live(&self) -> usize {
        self.live.lock().unwrap().len()
    }
}
