//! Scripted render engine for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use dgr_context::ContextHandle;

use crate::RenderEngine;
use crate::error::RenderError;
use crate::svg::Svg;

/// What the mock answers for one call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockResponse {
    /// Succeed with an SVG that embeds the escaped source in `<desc>`.
    Echo,
    /// Succeed with the given markup.
    Svg(String),
    /// Fail with an engine error carrying this detail.
    Fail(String),
}

/// A recorded render call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockCall {
    pub context_id: String,
    pub source: String,
}

/// Render engine with scripted responses.
///
/// Responses are chosen in order: queued one-shot responses first, then the
/// first `*_when_contains` rule whose needle occurs in the source, then the
/// default.
///
/// # Example
///
/// ```
/// use dgr_engine::{MockEngine, MockResponse};
///
/// let engine = MockEngine::succeeding()
///     .fail_when_contains("-->|", "Parse error on line 2");
/// # let _ = engine;
/// ```
#[derive(Debug)]
pub struct MockEngine {
    default: MockResponse,
    rules: Vec<(String, MockResponse)>,
    delays: Vec<(String, Duration)>,
    queue: Mutex<VecDeque<MockResponse>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockEngine {
    fn with_default(default: MockResponse) -> Self {
        Self {
            default,
            rules: Vec::new(),
            delays: Vec::new(),
            queue: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Engine that renders every source.
    #[must_use]
    pub fn succeeding() -> Self {
        Self::with_default(MockResponse::Echo)
    }

    /// Engine that rejects every source with `detail`.
    #[must_use]
    pub fn failing(detail: impl Into<String>) -> Self {
        Self::with_default(MockResponse::Fail(detail.into()))
    }

    /// Fail sources containing `needle`.
    #[must_use]
    pub fn fail_when_contains(mut self, needle: impl Into<String>, detail: impl Into<String>) -> Self {
        self.rules
            .push((needle.into(), MockResponse::Fail(detail.into())));
        self
    }

    /// Render sources containing `needle`.
    #[must_use]
    pub fn succeed_when_contains(mut self, needle: impl Into<String>) -> Self {
        self.rules.push((needle.into(), MockResponse::Echo));
        self
    }

    /// Queue a one-shot response for the next unanswered call.
    #[must_use]
    pub fn then_respond(self, response: MockResponse) -> Self {
        self.queue.lock().unwrap().push_back(response);
        self
    }

    /// Sleep before answering sources containing `needle`.
    #[must_use]
    pub fn delay_when_contains(mut self, needle: impl Into<String>, delay: Duration) -> Self {
        self.delays.push((needle.into(), delay));
        self
    }

    /// All calls received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn respond(&self, source: &str) -> MockResponse {
        if let Some(queued) = self.queue.lock().unwrap().pop_front() {
            return queued;
        }
        self.rules
            .iter()
            .find(|(needle, _)| source.contains(needle.as_str()))
            .map_or_else(|| self.default.clone(), |(_, response)| response.clone())
    }
}

fn echo_svg(source: &str) -> String {
    let escaped = source
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!("<svg xmlns=\"http://www.w3.org/2000/svg\"><desc>{escaped}</desc></svg>")
}

impl RenderEngine for MockEngine {
    async fn render(&self, context: &ContextHandle, source: &str) -> Result<Svg, RenderError> {
        self.calls.lock().unwrap().push(MockCall {
            context_id: context.id().to_owned(),
            source: source.to_owned(),
        });
        let response = self.respond(source);

        let delay = self
            .delays
            .iter()
            .find(|(needle, _)| source.contains(needle.as_str()))
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match response {
            MockResponse::Echo => Svg::parse(&echo_svg(source)),
            MockResponse::Svg(markup) => Svg::parse(&markup),
            MockResponse::Fail(detail) => Err(RenderError::engine(detail)),
        }
    }
}
