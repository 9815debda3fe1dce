//! Render request results.

use dgr_engine::Svg;
use serde::{Serialize, Serializer};

use crate::classify::ErrorKind;

/// Message attached to degraded outcomes.
pub const DEGRADED_MESSAGE: &str =
    "The diagram could not be rendered as written; a simplified version shown.";

/// Message attached to failed outcomes without an artifact.
pub const GENERIC_FAILURE_MESSAGE: &str = "Unable to render diagram.";

/// Final state of a render request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStatus {
    /// The diagram rendered as given.
    Success,
    /// A simplified placeholder rendered instead.
    Degraded,
    /// Only the static error diagram rendered, or nothing did.
    Failed,
}

/// Result of one render request.
///
/// The renderer never returns an error: every failure is folded into
/// an outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenderOutcome {
    pub status: RenderStatus,
    #[serde(serialize_with = "serialize_artifact")]
    pub artifact: Option<Svg>,
    pub message: Option<String>,
    pub classification: Option<ErrorKind>,
    /// Engine error detail of the first attempt (or the canary).
    pub detail: Option<String>,
}

impl RenderOutcome {
    /// The diagram rendered on the first attempt.
    #[must_use]
    pub fn success(artifact: Svg) -> Self {
        Self {
            status: RenderStatus::Success,
            artifact: Some(artifact),
            message: None,
            classification: None,
            detail: None,
        }
    }

    /// The placeholder rendered after the first attempt failed.
    #[must_use]
    pub fn degraded(artifact: Svg, kind: ErrorKind, detail: String) -> Self {
        Self {
            status: RenderStatus::Degraded,
            artifact: Some(artifact),
            message: Some(DEGRADED_MESSAGE.to_owned()),
            classification: Some(kind),
            detail: Some(detail),
        }
    }

    /// Both the diagram and its placeholder failed.
    ///
    /// `artifact` is the rendered error diagram, if the engine managed that.
    #[must_use]
    pub fn failed(artifact: Option<Svg>, kind: ErrorKind, detail: String) -> Self {
        let message = if artifact.is_some() {
            kind.user_message()
        } else {
            GENERIC_FAILURE_MESSAGE
        };
        Self {
            status: RenderStatus::Failed,
            artifact,
            message: Some(message.to_owned()),
            classification: Some(kind),
            detail: Some(detail),
        }
    }

    /// The priming canary failed.
    #[must_use]
    pub fn engine_unavailable(detail: String) -> Self {
        let kind = ErrorKind::EngineUnavailable;
        Self {
            status: RenderStatus::Failed,
            artifact: None,
            message: Some(kind.user_message().to_owned()),
            classification: Some(kind),
            detail: Some(detail),
        }
    }

    /// Whether the diagram rendered as given.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RenderStatus::Success
    }

    /// Whether there is something to display.
    #[must_use]
    pub fn has_artifact(&self) -> bool {
        self.artifact.is_some()
    }
}

#[allow(clippy::ref_option)]
fn serialize_artifact<S: Serializer>(artifact: &Option<Svg>, serializer: S) -> Result<S::Ok, S::Error> {
    match artifact {
        Some(svg) => serializer.serialize_some(svg.as_str()),
        None => serializer.serialize_none(),
    }
}
