//! Render engine backends for dgr.
//!
//! The render engine is an external, fallible capability: given a context
//! handle and diagram source it produces an SVG document or a [`RenderError`]
//! carrying a free-text detail message.
//!
//! # Architecture
//!
//! - [`RenderEngine`]: The capability trait consumed by the tiered renderer
//! - [`KrokiEngine`]: Renders through a Kroki HTTP service
//! - [`CommandEngine`]: Runs a local renderer (e.g. `mmdc`) inside a scratch context
//! - [`AnyEngine`]: Runtime choice between the two
//! - [`MockEngine`]: Scripted engine for tests (behind `mock` feature flag)
//!
//! Engines receive their configuration at construction. There is no shared
//! engine state between instances.

mod command;
mod consts;
mod error;
mod kroki;
#[cfg(feature = "mock")]
mod mock;
mod svg;

use std::future::Future;
use std::sync::Arc;

use dgr_context::ContextHandle;

pub use command::CommandEngine;
pub use consts::DEFAULT_TIMEOUT;
pub use error::{RenderError, RenderErrorKind};
pub use kroki::KrokiEngine;
#[cfg(feature = "mock")]
pub use mock::{MockCall, MockEngine, MockResponse};
pub use svg::{Svg, strip_google_fonts_import};

/// External diagram render capability.
///
/// One call is one render invocation. Implementations must not retry
/// internally; escalation is the caller's job.
pub trait RenderEngine: Send + Sync {
    /// Render `source` using the scratch target identified by `context`.
    fn render(
        &self,
        context: &ContextHandle,
        source: &str,
    ) -> impl Future<Output = Result<Svg, RenderError>> + Send;
}

impl<E: RenderEngine> RenderEngine for Arc<E> {
    fn render(
        &self,
        context: &ContextHandle,
        source: &str,
    ) -> impl Future<Output = Result<Svg, RenderError>> + Send {
        (**self).render(context, source)
    }
}

/// Engine selected at runtime from configuration.
#[derive(Debug)]
pub enum AnyEngine {
    Kroki(KrokiEngine),
    Command(CommandEngine),
}

impl AnyEngine {
    /// Short backend name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Kroki(_) => "kroki",
            Self::Command(_) => "command",
        }
    }
}

impl RenderEngine for AnyEngine {
    async fn render(&self, context: &ContextHandle, source: &str) -> Result<Svg, RenderError> {
        match self {
            Self::Kroki(engine) => engine.render(context, source).await,
            Self::Command(engine) => engine.render(context, source).await,
        }
    }
}
