//! Tiered render controller.
//!
//! One request walks this state machine:
//!
//! ```text
//! Idle -> [Canary] -> Attempt1 -> Success
//!                        |
//!                        v
//!                     Attempt2 -> Degraded
//!                        |
//!                        v
//!                     Attempt3 -> Failed (error diagram) | Failed (no artifact)
//! ```
//!
//! Attempts run strictly in sequence. Each one acquires its own context
//! through a [`ContextGuard`], so the context is released on every exit path,
//! including when the request future is dropped mid-render.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dgr_context::{ContextGuard, RenderContexts};
use dgr_engine::{RenderEngine, RenderError, RenderErrorKind, Svg};

use crate::classify::ErrorKind;
use crate::normalize::normalize;
use crate::outcome::RenderOutcome;
use crate::placeholder::{
    DEFAULT_FALLBACK_LABEL, DEFAULT_TOPIC_KEYWORDS, canary_diagram, error_diagram,
    placeholder_diagram,
};

#[derive(Clone, Copy, Debug)]
enum Tier {
    Canary,
    Primary,
    Placeholder,
    ErrorDiagram,
}

impl Tier {
    fn as_str(self) -> &'static str {
        match self {
            Self::Canary => "canary",
            Self::Primary => "primary",
            Self::Placeholder => "placeholder",
            Self::ErrorDiagram => "error-diagram",
        }
    }
}

/// Renders diagrams with escalating fallbacks.
///
/// Engine configuration lives in `E`; the renderer holds no global state, so
/// any number of renderers with different engines can coexist.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use dgr_context::MemoryContexts;
/// use dgr_diagrams::{RenderStatus, TieredRenderer};
/// use dgr_engine::MockEngine;
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let renderer = TieredRenderer::new(MockEngine::succeeding(), Arc::new(MemoryContexts::new()));
/// let outcome = renderer.render("A-->B").await;
/// assert_eq!(outcome.status, RenderStatus::Success);
/// # });
/// ```
pub struct TieredRenderer<E> {
    engine: E,
    contexts: Arc<dyn RenderContexts>,
    prime: bool,
    primed: AtomicBool,
    topic_keywords: Vec<String>,
    fallback_label: String,
}

impl<E: RenderEngine> TieredRenderer<E> {
    /// Create a renderer with priming enabled and the built-in keywords.
    #[must_use]
    pub fn new(engine: E, contexts: Arc<dyn RenderContexts>) -> Self {
        Self {
            engine,
            contexts,
            prime: true,
            primed: AtomicBool::new(false),
            topic_keywords: DEFAULT_TOPIC_KEYWORDS.iter().map(|&k| k.to_owned()).collect(),
            fallback_label: DEFAULT_FALLBACK_LABEL.to_owned(),
        }
    }

    /// Render the canary diagram until it has succeeded once.
    #[must_use]
    pub fn prime(mut self, prime: bool) -> Self {
        self.prime = prime;
        self
    }

    /// Keywords used to label the placeholder diagram.
    #[must_use]
    pub fn topic_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topic_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Placeholder label when no keyword matches.
    #[must_use]
    pub fn fallback_label(mut self, label: impl Into<String>) -> Self {
        self.fallback_label = label.into();
        self
    }

    /// Keywords searched for the placeholder label.
    #[must_use]
    pub fn placeholder_keywords(&self) -> &[String] {
        &self.topic_keywords
    }

    /// Placeholder label used when no keyword matches.
    #[must_use]
    pub fn placeholder_fallback(&self) -> &str {
        &self.fallback_label
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Normalize `raw` and render it.
    pub async fn render(&self, raw: &str) -> RenderOutcome {
        let source = normalize(raw);
        self.render_normalized(&source).await
    }

    /// Render `source` as is.
    pub async fn render_normalized(&self, source: &str) -> RenderOutcome {
        if let Err(e) = self.ensure_primed().await {
            let detail = e.detail();
            tracing::warn!(detail = %detail, "canary render failed, engine unavailable");
            return RenderOutcome::engine_unavailable(detail);
        }

        let first_error = match self.attempt(Tier::Primary, source).await {
            Ok(svg) => {
                tracing::info!(status = "success", "diagram rendered");
                return RenderOutcome::success(svg);
            }
            Err(e) => e,
        };

        // Only the first failure is classified; later tiers never change it.
        let detail = first_error.detail();
        let kind = ErrorKind::classify(&detail);
        tracing::warn!(
            tier = Tier::Primary.as_str(),
            kind = %kind,
            detail = %detail,
            "render failed, trying placeholder"
        );

        let placeholder = placeholder_diagram(source, &self.topic_keywords, &self.fallback_label);
        match self.attempt(Tier::Placeholder, &placeholder).await {
            Ok(svg) => {
                tracing::info!(status = "degraded", kind = %kind, "placeholder rendered");
                return RenderOutcome::degraded(svg, kind, detail);
            }
            Err(e) => {
                tracing::warn!(
                    tier = Tier::Placeholder.as_str(),
                    error = %e,
                    "placeholder render failed, trying error diagram"
                );
            }
        }

        match self.attempt(Tier::ErrorDiagram, error_diagram()).await {
            Ok(svg) => {
                tracing::info!(status = "failed", kind = %kind, "error diagram rendered");
                RenderOutcome::failed(Some(svg), kind, detail)
            }
            Err(e) => {
                tracing::warn!(
                    tier = Tier::ErrorDiagram.as_str(),
                    error = %e,
                    "error diagram render failed"
                );
                RenderOutcome::failed(None, kind, detail)
            }
        }
    }

    /// Render the canary until it succeeds once.
    ///
    /// A canary context that cannot be acquired also reports the engine as
    /// unavailable.
    async fn ensure_primed(&self) -> Result<(), RenderError> {
        if !self.prime || self.primed.load(Ordering::Acquire) {
            return Ok(());
        }
        self.attempt(Tier::Canary, canary_diagram()).await?;
        self.primed.store(true, Ordering::Release);
        Ok(())
    }

    /// One engine invocation in a fresh context.
    ///
    /// A context that cannot be acquired fails the attempt like an engine
    /// error would.
    async fn attempt(&self, tier: Tier, source: &str) -> Result<Svg, RenderError> {
        let guard = ContextGuard::acquire(self.contexts.as_ref()).map_err(|e| {
            RenderError::new(RenderErrorKind::ContextUnavailable(e.to_string()))
        })?;
        tracing::debug!(tier = tier.as_str(), context = %guard.handle(), "render attempt");

        let result = self.engine.render(guard.handle(), source).await;
        guard.release();
        result
    }
}

impl<E: std::fmt::Debug> std::fmt::Debug for TieredRenderer<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredRenderer")
            .field("engine", &self.engine)
            .field("live_contexts", &self.contexts.live())
            .field("prime", &self.prime)
            .field("primed", &self.primed.load(Ordering::Relaxed))
            .field("topic_keywords", &self.topic_keywords)
            .field("fallback_label", &self.fallback_label)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dgr_context::{ContextStats, MemoryContexts, ScratchDirContexts};
    use dgr_engine::{MockEngine, MockResponse};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::outcome::{GENERIC_FAILURE_MESSAGE, RenderStatus};

    fn renderer(engine: MockEngine, contexts: &Arc<MemoryContexts>) -> TieredRenderer<MockEngine> {
        TieredRenderer::new(engine, Arc::clone(contexts) as Arc<dyn RenderContexts>).prime(false)
    }

    fn stats(acquired: usize) -> ContextStats {
        ContextStats {
            acquired,
            released: acquired,
            live: 0,
        }
    }

    #[tokio::test]
    async fn test_success_uses_one_context() {
        let contexts = Arc::new(MemoryContexts::new());
        let renderer = renderer(MockEngine::succeeding(), &contexts);

        let outcome = renderer.render("A-->B").await;

        assert_eq!(outcome.status, RenderStatus::Success);
        assert_eq!(outcome.message, None);
        assert_eq!(outcome.classification, None);
        assert!(outcome.artifact.unwrap().as_str().contains("A --&gt; B"));
        assert_eq!(contexts.stats(), stats(1));
        assert_eq!(renderer.engine().calls()[0].source, "graph TD\nA --> B");
    }

    #[tokio::test]
    async fn test_degraded_uses_two_contexts() {
        let contexts = Arc::new(MemoryContexts::new());
        let engine = MockEngine::succeeding().fail_when_contains("broken", "Parse error on line 2");
        let renderer = renderer(engine, &contexts);

        let outcome = renderer.render("graph TD\n  db[Database] --> broken").await;

        assert_eq!(outcome.status, RenderStatus::Degraded);
        assert!(outcome.message.as_deref().unwrap().contains("simplified"));
        assert_eq!(outcome.classification, Some(ErrorKind::SyntaxError));
        assert_eq!(outcome.detail.as_deref(), Some("Parse error on line 2"));
        assert!(outcome.artifact.unwrap().as_str().contains("Database"));
        assert_eq!(contexts.stats(), stats(2));
    }

    #[tokio::test]
    async fn test_dead_engine_fails_without_artifact() {
        let contexts = Arc::new(MemoryContexts::new());
        let renderer = renderer(MockEngine::failing("B is not defined"), &contexts);

        let outcome = renderer.render("graph TD\n  A --> B").await;

        assert_eq!(outcome.status, RenderStatus::Failed);
        assert_eq!(outcome.artifact, None);
        assert_eq!(outcome.message.as_deref(), Some(GENERIC_FAILURE_MESSAGE));
        assert_eq!(outcome.classification, Some(ErrorKind::UndefinedReferenceError));
        assert_eq!(renderer.engine().call_count(), 3);
        assert_eq!(contexts.stats(), stats(3));
    }

    #[tokio::test]
    async fn test_crippled_engine_renders_error_diagram() {
        let contexts = Arc::new(MemoryContexts::new());
        let engine = MockEngine::succeeding()
            .fail_when_contains("broken", "Syntax error in text")
            .fail_when_contains("Overview", "engine crashed");
        let renderer = renderer(engine, &contexts);

        let outcome = renderer.render("A --> broken").await;

        assert_eq!(outcome.status, RenderStatus::Failed);
        assert!(outcome.artifact.unwrap().as_str().contains("Could Not Render"));
        assert_eq!(
            outcome.message.as_deref(),
            Some(ErrorKind::SyntaxError.user_message())
        );
        assert_eq!(contexts.stats(), stats(3));
    }

    #[tokio::test]
    async fn test_placeholder_failure_not_classified() {
        let contexts = Arc::new(MemoryContexts::new());
        let engine = MockEngine::succeeding()
            .then_respond(MockResponse::Fail("boom".to_owned()))
            .then_respond(MockResponse::Fail("Parse error in placeholder".to_owned()));
        let renderer = renderer(engine, &contexts);

        let outcome = renderer.render("graph TD\n  A --> B").await;

        assert_eq!(outcome.status, RenderStatus::Failed);
        assert!(outcome.has_artifact());
        assert_eq!(outcome.classification, Some(ErrorKind::GenericRenderError));
        assert_eq!(outcome.detail.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_failed_canary_short_circuits() {
        let contexts = Arc::new(MemoryContexts::new());
        let renderer = renderer(MockEngine::failing("connection refused"), &contexts).prime(true);

        let outcome = renderer.render("graph TD\n  A --> B").await;

        assert_eq!(outcome.status, RenderStatus::Failed);
        assert_eq!(outcome.classification, Some(ErrorKind::EngineUnavailable));
        assert_eq!(outcome.artifact, None);
        assert_eq!(renderer.engine().call_count(), 1);
        assert_eq!(renderer.engine().calls()[0].source, canary_diagram());
        assert_eq!(contexts.stats(), stats(1));
    }

    #[tokio::test]
    async fn test_canary_success_is_remembered() {
        let contexts = Arc::new(MemoryContexts::new());
        let renderer = renderer(MockEngine::succeeding(), &contexts).prime(true);

        renderer.render("A --> B").await;
        renderer.render("B --> C").await;

        let sources: Vec<String> = renderer
            .engine()
            .calls()
            .into_iter()
            .map(|call| call.source)
            .collect();
        assert_eq!(
            sources,
            vec![
                canary_diagram().to_owned(),
                "graph TD\nA --> B".to_owned(),
                "graph TD\nB --> C".to_owned(),
            ]
        );
        assert_eq!(contexts.stats(), stats(3));
    }

    #[tokio::test]
    async fn test_canary_retried_after_failure() {
        let contexts = Arc::new(MemoryContexts::new());
        let engine =
            MockEngine::succeeding().then_respond(MockResponse::Fail("starting up".to_owned()));
        let renderer = renderer(engine, &contexts).prime(true);

        let first = renderer.render("A --> B").await;
        let second = renderer.render("A --> B").await;

        assert_eq!(first.classification, Some(ErrorKind::EngineUnavailable));
        assert_eq!(second.status, RenderStatus::Success);
        assert_eq!(renderer.engine().call_count(), 3);
    }

    #[tokio::test]
    async fn test_context_acquire_failure_escalates() {
        let tmp = tempfile::TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let contexts = Arc::new(ScratchDirContexts::new(blocker.join("scratch")));
        let shared = Arc::clone(&contexts) as Arc<dyn RenderContexts>;
        let renderer = TieredRenderer::new(MockEngine::succeeding(), shared).prime(false);

        let outcome = renderer.render("A --> B").await;

        assert_eq!(outcome.status, RenderStatus::Failed);
        assert_eq!(outcome.artifact, None);
        assert_eq!(outcome.classification, Some(ErrorKind::GenericRenderError));
        assert!(outcome.detail.unwrap().starts_with("render context unavailable"));
        assert_eq!(renderer.engine().call_count(), 0);
        assert_eq!(contexts.live(), 0);
    }

    #[tokio::test]
    async fn test_canary_context_failure_reports_engine_unavailable() {
        let tmp = tempfile::TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let contexts = Arc::new(ScratchDirContexts::new(blocker.join("scratch")));
        let shared = Arc::clone(&contexts) as Arc<dyn RenderContexts>;
        let renderer = TieredRenderer::new(MockEngine::succeeding(), shared);

        let outcome = renderer.render("A --> B").await;

        assert_eq!(outcome.status, RenderStatus::Failed);
        assert_eq!(outcome.classification, Some(ErrorKind::EngineUnavailable));
        assert_eq!(outcome.artifact, None);
        assert!(outcome.detail.unwrap().starts_with("render context unavailable"));
        assert_eq!(renderer.engine().call_count(), 0);
        assert_eq!(contexts.live(), 0);
    }

    #[tokio::test]
    async fn test_dropped_request_releases_context() {
        let contexts = Arc::new(MemoryContexts::new());
        let engine = MockEngine::succeeding().delay_when_contains("slow", Duration::from_secs(30));
        let renderer = renderer(engine, &contexts);

        let result =
            tokio::time::timeout(Duration::from_millis(20), renderer.render("A --> slow")).await;

        assert!(result.is_err());
        assert_eq!(contexts.stats(), stats(1));
    }

    #[tokio::test]
    async fn test_no_contexts_leak_across_requests() {
        let contexts = Arc::new(MemoryContexts::new());
        let engine = MockEngine::succeeding()
            .fail_when_contains("bad", "Parse error")
            .fail_when_contains("Examples", "engine crashed")
            .fail_when_contains("Please Try Again", "engine crashed");
        let renderer = renderer(engine, &contexts);

        for i in 0..12 {
            let source = if i % 3 == 0 { "A --> bad" } else { "A --> B" };
            renderer.render(source).await;
        }

        let stats = contexts.stats();
        assert_eq!(stats.live, 0);
        assert_eq!(stats.acquired, stats.released);
        assert_eq!(stats.acquired, 4 * 3 + 8);
    }
}
