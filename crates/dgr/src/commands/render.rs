//! `dgr render` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use dgr_diagrams::{RenderOutcome, export_svg};
use serde::Serialize;

use super::{EngineArgs, build_preview, read_source, report};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Diagram source file, or `-` to read stdin.
    input: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Print the outcome as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Don't write the SVG file.
    #[arg(long)]
    no_export: bool,
}

/// JSON report printed with `--json`.
#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    outcome: &'a RenderOutcome,
    file: Option<&'a Path>,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// A failed render is reported, not returned as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, reading the source, or writing the
    /// SVG fails.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.engine.load_config()?;
        let source = read_source(&self.input)?;

        let preview = build_preview(&config);
        let update = preview.update(&source).await;

        let exported = if self.no_export {
            None
        } else {
            export_svg(&update.outcome, &config.export_resolved.output_dir)?
        };

        if self.json {
            let report = Report {
                outcome: &update.outcome,
                file: exported.as_deref(),
            };
            output.print(&serde_json::to_string_pretty(&report)?)?;
        } else {
            report(&output, &update.outcome, exported.as_deref());
        }
        Ok(())
    }
}
