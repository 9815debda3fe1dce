//! Render failure classification.

use serde::Serialize;

const SYNTAX_MARKERS: [&str; 2] = ["syntax error", "parse error"];
const UNDEFINED_MARKERS: [&str; 2] = ["undefined", "not defined"];

/// Kind of render failure reported to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The engine could not parse the diagram.
    SyntaxError,
    /// The diagram refers to something that doesn't exist.
    UndefinedReferenceError,
    /// Any other render failure.
    GenericRenderError,
    /// The priming canary failed; the engine itself is not working.
    EngineUnavailable,
}

impl ErrorKind {
    /// Classify a free-text engine error detail.
    ///
    /// Matching is case-insensitive. Syntax markers win over
    /// undefined-reference markers.
    ///
    /// # Example
    ///
    /// ```
    /// use dgr_diagrams::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::classify("Parse error on line 2"), ErrorKind::SyntaxError);
    /// assert_eq!(ErrorKind::classify("timeout"), ErrorKind::GenericRenderError);
    /// ```
    #[must_use]
    pub fn classify(detail: &str) -> Self {
        let detail = detail.to_lowercase();
        if SYNTAX_MARKERS.iter().any(|m| detail.contains(m)) {
            Self::SyntaxError
        } else if UNDEFINED_MARKERS.iter().any(|m| detail.contains(m)) {
            Self::UndefinedReferenceError
        } else {
            Self::GenericRenderError
        }
    }

    /// Message shown to the user for a failure of this kind.
    #[must_use]
    pub fn user_message(self) -> &'static str {
        match self {
            Self::SyntaxError => {
                "The diagram has a syntax error. Check arrows, brackets and node names."
            }
            Self::UndefinedReferenceError => {
                "The diagram refers to a node or style that is not defined."
            }
            Self::GenericRenderError => "The diagram could not be rendered.",
            Self::EngineUnavailable => "The diagram renderer is unavailable right now.",
        }
    }

    /// Stable snake_case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SyntaxError => "syntax_error",
            Self::UndefinedReferenceError => "undefined_reference_error",
            Self::GenericRenderError => "generic_render_error",
            Self::EngineUnavailable => "engine_unavailable",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
