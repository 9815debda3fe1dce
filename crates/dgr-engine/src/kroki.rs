//! Kroki HTTP rendering.
//!
//! Sends diagram source to a Kroki server (`POST {url}/mermaid/svg`) using a
//! pooled [`ureq::Agent`]. The blocking request runs on tokio's blocking pool
//! so the caller's task only suspends.
//!
//! Kroki reports diagram problems as HTTP 4xx/5xx with the engine's message in
//! the body. Those bodies become [`RenderErrorKind::Engine`] so that messages
//! like "Parse error on line 2" survive for classification.

use std::time::Duration;

use dgr_context::ContextHandle;
use ureq::Agent;

use crate::RenderEngine;
use crate::consts::{DEFAULT_TIMEOUT, KROKI_ENDPOINT};
use crate::error::{RenderError, RenderErrorKind};
use crate::svg::Svg;

/// Header prefix Kroki reads diagram options from.
const OPTION_HEADER_PREFIX: &str = "Kroki-Diagram-Options-";

/// [`RenderEngine`] backed by a Kroki server.
#[derive(Debug)]
pub struct KrokiEngine {
    /// Server URL without trailing slash.
    server_url: String,
    /// Engine theme passed as a diagram option.
    theme: Option<String>,
    /// HTTP agent for connection pooling (reused across render calls).
    agent: Agent,
}

impl KrokiEngine {
    /// Create a Kroki engine for the given server URL.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let engine = KrokiEngine::new("https://kroki.io");
    /// ```
    #[must_use]
    pub fn new(server_url: impl Into<String>) -> Self {
        let server_url: String = server_url.into();
        Self {
            server_url: server_url.trim_end_matches('/').to_owned(),
            theme: None,
            agent: create_agent(DEFAULT_TIMEOUT),
        }
    }

    /// Set the HTTP timeout for render requests.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.agent = create_agent(timeout);
        self
    }

    /// Set the engine theme.
    #[must_use]
    pub fn theme(mut self, theme: Option<String>) -> Self {
        self.theme = theme;
        self
    }

    /// Full render URL.
    #[must_use]
    pub fn render_url(&self) -> String {
        format!("{}/{KROKI_ENDPOINT}/svg", self.server_url)
    }
}

impl RenderEngine for KrokiEngine {
    async fn render(&self, context: &ContextHandle, source: &str) -> Result<Svg, RenderError> {
        let agent = self.agent.clone();
        let url = self.render_url();
        let theme = self.theme.clone();
        let source = source.to_owned();

        tracing::debug!(context = %context, url = %url, "sending diagram to Kroki");

        tokio::task::spawn_blocking(move || {
            send_render_request(&agent, &url, theme.as_deref(), &source)
        })
        .await
        .map_err(|e| RenderError::engine(format!("render task failed: {e}")))?
    }
}

/// Create HTTP agent with the specified timeout.
fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Send a diagram to Kroki and return the rendered SVG.
///
/// Handles HTTP errors by reading the response body for error details.
fn send_render_request(
    agent: &Agent,
    url: &str,
    theme: Option<&str>,
    source: &str,
) -> Result<Svg, RenderError> {
    let mut request = agent.post(url).header("Content-Type", "text/plain");
    if let Some(theme) = theme {
        request = request.header(format!("{OPTION_HEADER_PREFIX}theme"), theme);
    }

    let response = request
        .send(source.as_bytes())
        .map_err(|e| RenderError::new(RenderErrorKind::Http(e.to_string())))?;

    let status = response.status().as_u16();
    let mut body = response.into_body();

    if status >= 400 {
        let error_body = body
            .read_to_string()
            .unwrap_or_else(|_| String::from("(unable to read error body)"));
        return Err(engine_error_from_status(status, &error_body));
    }

    let text = body
        .read_to_string()
        .map_err(|e| RenderError::new(RenderErrorKind::Io(e.to_string())))?;
    Svg::parse(&text)
}

/// Map a failed Kroki response to a render error.
///
/// Client errors (4xx) carry the engine's diagram message. Server errors keep
/// the status so that outages are distinguishable from bad input.
fn engine_error_from_status(status: u16, body: &str) -> RenderError {
    let body = body.trim();
    if (400..500).contains(&status) && !body.is_empty() {
        RenderError::engine(body)
    } else {
        RenderError::new(RenderErrorKind::Http(format!("HTTP {status}: {body}")))
    }
}
