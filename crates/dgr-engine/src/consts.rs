//! Internal constants for engine backends.

use std::time::Duration;

/// Default timeout for a single render invocation (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Kroki endpoint for the diagram notation.
pub const KROKI_ENDPOINT: &str = "mermaid";

/// Input file written into a scratch context by the command backend.
pub const INPUT_FILE: &str = "input.mmd";

/// Output file the command backend expects the renderer to produce.
pub const OUTPUT_FILE: &str = "output.svg";
