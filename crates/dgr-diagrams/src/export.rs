//! Writing rendered artifacts to disk.

use std::path::{Path, PathBuf};

use crate::outcome::RenderOutcome;

/// Error writing an exported diagram.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// File name for an export taken at `epoch_millis`.
///
/// ```
/// assert_eq!(dgr_diagrams::export_file_name(1_700_000_000_000), "diagram-1700000000000.svg");
/// ```
#[must_use]
pub fn export_file_name(epoch_millis: i64) -> String {
    format!("diagram-{epoch_millis}.svg")
}

/// Write the outcome's artifact to `dir` under a timestamped name.
///
/// Returns `Ok(None)` without touching the filesystem when the outcome has
/// no artifact.
pub fn export_svg(outcome: &RenderOutcome, dir: &Path) -> Result<Option<PathBuf>, ExportError> {
    export_svg_at(outcome, dir, chrono::Utc::now().timestamp_millis())
}

/// [`export_svg`] with an explicit timestamp.
pub fn export_svg_at(
    outcome: &RenderOutcome,
    dir: &Path,
    epoch_millis: i64,
) -> Result<Option<PathBuf>, ExportError> {
    let Some(artifact) = &outcome.artifact else {
        tracing::debug!("nothing to export");
        return Ok(None);
    };

    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(export_file_name(epoch_millis));
    std::fs::write(&path, artifact.as_str()).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;

    tracing::info!(path = %path.display(), "exported diagram");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use dgr_engine::Svg;
    use tempfile::TempDir;

    use super::*;
    use crate::classify::ErrorKind;

    #[test]
    fn test_export_writes_artifact() {
        let tmp = TempDir::new().unwrap();
        let outcome = RenderOutcome::success(Svg::parse("<svg>ok</svg>").unwrap());

        let path = export_svg_at(&outcome, &tmp.path().join("out"), 42).unwrap().unwrap();

        assert_eq!(path, tmp.path().join("out").join("diagram-42.svg"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<svg>ok</svg>");
    }

    #[test]
    fn test_export_without_artifact_is_noop() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("out");
        let outcome = RenderOutcome::failed(None, ErrorKind::GenericRenderError, "boom".to_owned());

        assert!(export_svg(&outcome, &dir).unwrap().is_none());
        assert!(!dir.exists());
    }

    #[test]
    fn test_export_uses_current_time() {
        let tmp = TempDir::new().unwrap();
        let outcome = RenderOutcome::success(Svg::parse("<svg/>").unwrap());

        let path = export_svg(&outcome, tmp.path()).unwrap().unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        let millis: i64 = name
            .strip_prefix("diagram-")
            .and_then(|rest| rest.strip_suffix(".svg"))
            .unwrap()
            .parse()
            .unwrap();
        assert!(millis > 1_600_000_000_000);
    }
}
