//! Local command-line rendering.
//!
//! Runs an external renderer in the context's scratch directory:
//!
//! ```text
//! {program} {args...} -i {scratch}/input.mmd -o {scratch}/output.svg [-t {theme}]
//! ```
//!
//! The flags match `mmdc` (mermaid-cli). A non-zero exit turns the trimmed
//! stderr into an engine error.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use dgr_context::ContextHandle;

use crate::RenderEngine;
use crate::consts::{DEFAULT_TIMEOUT, INPUT_FILE, OUTPUT_FILE};
use crate::error::{RenderError, RenderErrorKind};
use crate::svg::Svg;

/// [`RenderEngine`] that shells out to a local renderer.
///
/// Requires contexts that carry a scratch directory
/// (e.g. [`ScratchDirContexts`](dgr_context::ScratchDirContexts)).
#[derive(Debug)]
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
    theme: Option<String>,
    timeout: Duration,
}

impl CommandEngine {
    /// Create a command engine for `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            theme: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Arguments passed before the input/output flags.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the engine theme (`-t`).
    #[must_use]
    pub fn theme(mut self, theme: Option<String>) -> Self {
        self.theme = theme;
        self
    }

    /// Set the per-invocation timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl RenderEngine for CommandEngine {
    async fn render(&self, context: &ContextHandle, source: &str) -> Result<Svg, RenderError> {
        let dir = context.scratch_dir().ok_or_else(|| {
            RenderError::new(RenderErrorKind::ContextUnavailable(format!(
                "context {context} has no scratch directory"
            )))
        })?;
        let input = dir.join(INPUT_FILE);
        let output = dir.join(OUTPUT_FILE);

        tokio::fs::write(&input, source)
            .await
            .map_err(|e| RenderError::io(&e))?;

        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.args)
            .arg("-i")
            .arg(&input)
            .arg("-o")
            .arg(&output)
            .current_dir(dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(theme) = &self.theme {
            command.arg("-t").arg(theme);
        }

        tracing::debug!(
            context = %context,
            program = %self.program.display(),
            "running local renderer"
        );

        let result = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                RenderError::engine(format!(
                    "renderer timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| RenderError::io(&e))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let detail = stderr.trim();
            return Err(if detail.is_empty() {
                RenderError::engine(format!("renderer exited with {}", result.status))
            } else {
                RenderError::engine(detail)
            });
        }

        let text = tokio::fs::read_to_string(&output)
            .await
            .map_err(|e| RenderError::io(&e))?;
        Svg::parse(&text)
    }
}
