//! Resilient diagram rendering.
//!
//! Turns loosely written diagram text into an SVG through an external
//! [`RenderEngine`](dgr_engine::RenderEngine), always producing a viewable
//! result or an explicit failure value.
//!
//! # Architecture
//!
//! - [`normalize`]: Pure, idempotent repair of common syntax defects
//! - [`TieredRenderer`]: Up to three render attempts (diagram, placeholder,
//!   static error diagram) plus an optional priming canary
//! - [`ErrorKind`]: Classification of the first attempt's failure
//! - [`ResultProjector`]: Latest-wins publication across concurrent requests
//! - [`Preview`]: A renderer and a projector bound together
//! - [`export_svg`]: Writes `diagram-<epoch-ms>.svg`
//!
//! Every attempt runs in its own ephemeral context from
//! [`dgr_context`], released on every exit path.

mod classify;
mod controller;
mod export;
pub mod normalize;
mod outcome;
mod placeholder;
mod preview;
mod projector;

pub use classify::ErrorKind;
pub use controller::TieredRenderer;
pub use export::{ExportError, export_file_name, export_svg, export_svg_at};
pub use normalize::normalize;
pub use outcome::{DEGRADED_MESSAGE, GENERIC_FAILURE_MESSAGE, RenderOutcome, RenderStatus};
pub use placeholder::{
    CANARY_DIAGRAM, DEFAULT_FALLBACK_LABEL, DEFAULT_TOPIC_KEYWORDS, ERROR_DIAGRAM,
    canary_diagram, error_diagram, placeholder_diagram, topic_label,
};
pub use preview::{Preview, Update};
pub use projector::{Published, RequestTicket, ResultProjector};
