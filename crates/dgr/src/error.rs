//! CLI error types.

use dgr_config::ConfigError;
use dgr_diagrams::ExportError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Export(#[from] ExportError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("file watcher failed: {0}")]
    Watch(#[from] notify::Error),

    #[error("{0}")]
    Validation(String),
}
