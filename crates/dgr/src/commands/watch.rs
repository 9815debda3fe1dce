//! `dgr watch` command implementation.
//!
//! Each change to the watched file starts a new render request on its own
//! task. Requests may overlap; only the most recently started one is
//! exported, so a slow earlier render never overwrites a newer diagram.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use dgr_diagrams::{Preview, export_svg};
use dgr_engine::AnyEngine;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::{EngineArgs, build_preview, report};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the watch command.
#[derive(Args)]
pub(crate) struct WatchArgs {
    /// Diagram source file to watch.
    input: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs,
}

impl WatchArgs {
    /// Execute the watch command.
    ///
    /// Runs until interrupted with Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the file can't be watched.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.engine.load_config()?;

        let path = std::fs::canonicalize(&self.input)?;
        let dir = path
            .parent()
            .ok_or_else(|| CliError::Validation(format!("cannot watch {}", path.display())))?
            .to_path_buf();
        let preview = Arc::new(build_preview(&config));

        let mut published = preview.subscribe();
        let output_dir = config.export_resolved.output_dir.clone();
        let subscriber = tokio::spawn(async move {
            let output = Output::new();
            while published.changed().await.is_ok() {
                let Some(latest) = published.borrow_and_update().clone() else {
                    continue;
                };
                match export_svg(&latest.outcome, &output_dir) {
                    Ok(file) => report(&output, &latest.outcome, file.as_deref()),
                    Err(e) => output.error(&format!("Error: {e}")),
                }
            }
        });

        // Capacity 1: a pending signal already covers any later change.
        let (tx, mut changes) = mpsc::channel::<()>(1);
        let target = path.clone();
        let mut watcher =
            notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
                Ok(event) if is_change_to(&event, &target) => {
                    let _ = tx.try_send(());
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("file watcher error: {e}"),
            })?;
        // Watch the directory: editors often replace the file on save.
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        output.info(&format!("Watching {} (Ctrl-C to stop)", path.display()));
        spawn_update(&preview, &path);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                result = &mut shutdown => {
                    result?;
                    break;
                }
                Some(()) = changes.recv() => spawn_update(&preview, &path),
            }
        }

        drop(watcher);
        subscriber.abort();
        output.info("Stopped watching");
        Ok(())
    }
}

/// Whether `event` creates or modifies `target`.
fn is_change_to(event: &Event, target: &Path) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event.paths.iter().any(|p| p == target)
}

/// Read the file and render it as a new request in the background.
fn spawn_update(preview: &Arc<Preview<AnyEngine>>, path: &Path) {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            tracing::warn!(path = %path.display(), "failed to read diagram: {e}");
            return;
        }
    };

    let preview = Arc::clone(preview);
    tokio::spawn(async move {
        let update = preview.update(&source).await;
        if !update.published {
            tracing::debug!(request = update.ticket.seq(), "render superseded by a newer change");
        }
    });
}
