//! Live preview sessions.

use tokio::sync::watch;

use dgr_engine::RenderEngine;

use crate::controller::TieredRenderer;
use crate::outcome::RenderOutcome;
use crate::projector::{Published, RequestTicket, ResultProjector};

/// A renderer bound to a projector.
///
/// Each [`update`](Self::update) is one request. Updates may run
/// concurrently (share the preview through an `Arc`); only the outcome of
/// the most recently started update is published.
#[derive(Debug)]
pub struct Preview<E> {
    renderer: TieredRenderer<E>,
    projector: ResultProjector,
}

impl<E: RenderEngine> Preview<E> {
    /// Create a preview session around `renderer`.
    #[must_use]
    pub fn new(renderer: TieredRenderer<E>) -> Self {
        Self {
            renderer,
            projector: ResultProjector::new(),
        }
    }

    /// Render `raw` as a new request.
    ///
    /// The ticket is taken before rendering starts, so a later call always
    /// supersedes this one. Returns the ticket, the outcome, and whether it
    /// was published.
    pub async fn update(&self, raw: &str) -> Update {
        let ticket = self.projector.issue();
        tracing::debug!(request = ticket.seq(), "preview update");

        let outcome = self.renderer.render(raw).await;
        let published = self.projector.publish(ticket, outcome.clone());
        Update {
            ticket,
            outcome,
            published,
        }
    }

    /// Receive published outcomes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Published>> {
        self.projector.subscribe()
    }

    /// The last published outcome.
    #[must_use]
    pub fn latest(&self) -> Option<Published> {
        self.projector.latest()
    }

    /// The underlying renderer.
    pub fn renderer(&self) -> &TieredRenderer<E> {
        &self.renderer
    }
}

/// Result of one [`Preview::update`].
#[derive(Clone, Debug)]
pub struct Update {
    pub ticket: RequestTicket,
    pub outcome: RenderOutcome,
    /// Whether the outcome reached subscribers.
    pub published: bool,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use dgr_context::{ContextStats, MemoryContexts, RenderContexts};
    use dgr_engine::MockEngine;

    use super::*;
    use crate::outcome::RenderStatus;

    fn preview(engine: MockEngine, contexts: &Arc<MemoryContexts>) -> Preview<MockEngine> {
        let shared = Arc::clone(contexts) as Arc<dyn RenderContexts>;
        Preview::new(TieredRenderer::new(engine, shared).prime(false))
    }

    #[tokio::test]
    async fn test_update_publishes() {
        let contexts = Arc::new(MemoryContexts::new());
        let preview = preview(MockEngine::succeeding(), &contexts);

        let update = preview.update("A --> B").await;

        assert!(update.published);
        assert_eq!(update.outcome.status, RenderStatus::Success);
        assert_eq!(preview.latest().unwrap().ticket, update.ticket);
    }

    #[tokio::test]
    async fn test_slow_earlier_request_is_superseded() {
        let contexts = Arc::new(MemoryContexts::new());
        let engine = MockEngine::succeeding().delay_when_contains("first", Duration::from_millis(100));
        let preview = preview(engine, &contexts);
        let mut rx = preview.subscribe();

        let (r1, r2) = tokio::join!(preview.update("A --> first"), preview.update("A --> second"));

        assert!(!r1.published);
        assert!(r2.published);
        assert!(r1.ticket < r2.ticket);
        assert_eq!(r1.outcome.status, RenderStatus::Success);

        let seen = rx.borrow_and_update().clone().unwrap();
        assert_eq!(seen.ticket, r2.ticket);
        assert!(seen.outcome.artifact.as_ref().unwrap().as_str().contains("second"));
        assert_eq!(
            contexts.stats(),
            ContextStats {
                acquired: 2,
                released: 2,
                live: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_spawned_updates() {
        let contexts = Arc::new(MemoryContexts::new());
        let preview = Arc::new(preview(MockEngine::succeeding(), &contexts));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let preview = Arc::clone(&preview);
                tokio::spawn(async move { preview.update(&format!("A --> N{i}")).await })
            })
            .collect();
        let mut published = 0;
        for handle in handles {
            if handle.await.unwrap().published {
                published += 1;
            }
        }

        assert!(published >= 1);
        let latest = preview.latest().unwrap();
        assert_eq!(latest.ticket.seq(), 8);
        assert_eq!(contexts.live(), 0);
    }
}
