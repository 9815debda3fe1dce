//! Render error types.

/// Error returned by a [`RenderEngine`](crate::RenderEngine).
///
/// The display text is the free-form detail used downstream for
/// classification, so engine messages are kept verbatim.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct RenderError {
    pub kind: RenderErrorKind,
}

/// Kind of render error.
#[derive(Debug, thiserror::Error)]
pub enum RenderErrorKind {
    /// The engine rejected the diagram (message from the engine).
    #[error("{0}")]
    Engine(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("I/O error: {0}")]
    Io(String),
    /// The engine answered, but not with an SVG document.
    #[error("invalid SVG output: {0}")]
    InvalidOutput(String),
    #[error("render context unavailable: {0}")]
    ContextUnavailable(String),
}

impl RenderError {
    /// Create a new render error.
    #[must_use]
    pub fn new(kind: RenderErrorKind) -> Self {
        Self { kind }
    }

    /// Create an engine error carrying the engine's own message.
    #[must_use]
    pub fn engine(detail: impl Into<String>) -> Self {
        Self::new(RenderErrorKind::Engine(detail.into()))
    }

    /// Create an I/O error.
    #[must_use]
    pub fn io(err: &std::io::Error) -> Self {
        Self::new(RenderErrorKind::Io(err.to_string()))
    }

    /// Free-text detail of this error.
    #[must_use]
    pub fn detail(&self) -> String {
        self.to_string()
    }
}

impl From<RenderErrorKind> for RenderError {
    fn from(kind: RenderErrorKind) -> Self {
        Self::new(kind)
    }
}
