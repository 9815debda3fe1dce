//! Latest-wins publication of render outcomes.
//!
//! Every request takes a [`RequestTicket`] before it starts rendering. When it
//! finishes, [`ResultProjector::publish`] compares the ticket against the most
//! recently issued one; only the newest request gets through. Older outcomes
//! are dropped, and whatever they allocated has already been cleaned up by
//! the renderer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::outcome::RenderOutcome;

/// Sequence number handed out per request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    /// Position of this request in issue order, starting at 1.
    #[must_use]
    pub fn seq(self) -> u64 {
        self.0
    }
}

/// An outcome that made it to consumers.
#[derive(Clone, Debug)]
pub struct Published {
    pub ticket: RequestTicket,
    pub outcome: Arc<RenderOutcome>,
}

/// Surfaces only the latest request's outcome.
#[derive(Debug)]
pub struct ResultProjector {
    issued: AtomicU64,
    sender: watch::Sender<Option<Published>>,
}

impl ResultProjector {
    /// Create a projector with nothing published.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            issued: AtomicU64::new(0),
            sender,
        }
    }

    /// Start a new request, superseding all earlier ones.
    pub fn issue(&self) -> RequestTicket {
        RequestTicket(self.issued.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Most recently issued sequence number (0 before the first request).
    #[must_use]
    pub fn latest_issued(&self) -> u64 {
        self.issued.load(Ordering::Acquire)
    }

    /// Whether `ticket` belongs to the most recent request.
    #[must_use]
    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.0 == self.latest_issued()
    }

    /// Publish `outcome` if `ticket` is still the latest request.
    ///
    /// Returns `false` and discards the outcome when a newer request has
    /// been issued since.
    pub fn publish(&self, ticket: RequestTicket, outcome: RenderOutcome) -> bool {
        let mut outcome = Some(outcome);
        let published = self.sender.send_if_modified(|current| {
            if !self.is_current(ticket) {
                return false;
            }
            if current.as_ref().is_some_and(|p| p.ticket >= ticket) {
                return false;
            }
            *current = outcome.take().map(|outcome| Published {
                ticket,
                outcome: Arc::new(outcome),
            });
            current.is_some()
        });

        if published {
            tracing::debug!(request = ticket.seq(), "published render outcome");
        } else {
            tracing::debug!(
                request = ticket.seq(),
                latest = self.latest_issued(),
                "discarded superseded render outcome"
            );
        }
        published
    }

    /// Receive every newly published outcome.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Published>> {
        self.sender.subscribe()
    }

    /// The last published outcome.
    #[must_use]
    pub fn latest(&self) -> Option<Published> {
        self.sender.borrow().clone()
    }
}

impl Default for ResultProjector {
    fn default() -> Self {
        Self::new()
    }
}
