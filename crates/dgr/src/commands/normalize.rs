//! `dgr normalize` command implementation.

use std::path::PathBuf;

use clap::Args;

use super::read_source;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the normalize command.
#[derive(Args)]
pub(crate) struct NormalizeArgs {
    /// Diagram source file, or `-` to read stdin.
    input: PathBuf,
}

impl NormalizeArgs {
    /// Execute the normalize command.
    ///
    /// # Errors
    ///
    /// Returns an error if the source can't be read.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let source = read_source(&self.input)?;
        Output::new().print(&dgr_diagrams::normalize(&source))?;
        Ok(())
    }
}
