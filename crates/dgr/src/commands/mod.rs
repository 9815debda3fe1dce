//! CLI command implementations.

pub(crate) mod normalize;
pub(crate) mod render;
pub(crate) mod watch;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use dgr_config::{CliSettings, Config, ContextsBackend, EngineBackend};
use dgr_context::{MemoryContexts, RenderContexts, ScratchDirContexts};
use dgr_diagrams::{Preview, RenderOutcome, RenderStatus, TieredRenderer};
use dgr_engine::{AnyEngine, CommandEngine, KrokiEngine};

use crate::error::CliError;
use crate::output::Output;

pub(crate) use normalize::NormalizeArgs;
pub(crate) use render::RenderArgs;
pub(crate) use watch::WatchArgs;

/// Engine and configuration arguments shared by rendering commands.
#[derive(Args)]
pub(crate) struct EngineArgs {
    /// Path to configuration file (default: auto-discover dgr.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Kroki server URL (overrides config).
    #[arg(long, env = "DGR_KROKI_URL")]
    kroki_url: Option<String>,

    /// Render backend: kroki or command (overrides config).
    #[arg(long, value_parser = parse_backend)]
    backend: Option<EngineBackend>,

    /// Engine theme (overrides config).
    #[arg(long)]
    theme: Option<String>,

    /// Skip the canary render before the first diagram.
    #[arg(long)]
    no_prime: bool,

    /// Directory for exported SVG files (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Enable verbose output (render tiers and context lifecycle).
    #[arg(short, long)]
    pub verbose: bool,
}

impl EngineArgs {
    /// Load configuration with CLI overrides applied.
    pub(crate) fn load_config(&self) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            kroki_url: self.kroki_url.clone(),
            backend: self.backend,
            theme: self.theme.clone(),
            prime: self.no_prime.then_some(false),
            output_dir: self.output_dir.clone(),
        };
        Ok(Config::load(self.config.as_deref(), Some(&cli_settings))?)
    }
}

fn parse_backend(value: &str) -> Result<EngineBackend, String> {
    EngineBackend::parse(value)
        .ok_or_else(|| format!("unknown backend `{value}` (expected kroki or command)"))
}

/// Read diagram source from a file, or stdin when `input` is `-`.
pub(crate) fn read_source(input: &Path) -> Result<String, CliError> {
    if input == Path::new("-") {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        return Ok(source);
    }
    Ok(std::fs::read_to_string(input)?)
}

/// Build the engine selected by configuration.
pub(crate) fn build_engine(config: &Config) -> AnyEngine {
    let engine = &config.engine;
    match engine.backend {
        EngineBackend::Kroki => AnyEngine::Kroki(
            KrokiEngine::new(engine.kroki_url.as_str())
                .timeout(engine.timeout())
                .theme(engine.theme.clone()),
        ),
        EngineBackend::Command => AnyEngine::Command(
            CommandEngine::new(&engine.command)
                .args(engine.args.iter().cloned())
                .timeout(engine.timeout())
                .theme(engine.theme.clone()),
        ),
    }
}

/// Build the context factory selected by configuration.
///
/// The command backend always needs scratch directories.
pub(crate) fn build_contexts(config: &Config) -> Arc<dyn RenderContexts> {
    let contexts = &config.contexts_resolved;
    let scratch = contexts.backend == ContextsBackend::Scratch
        || config.engine.backend == EngineBackend::Command;
    if scratch {
        if contexts.backend == ContextsBackend::Memory {
            tracing::debug!("command backend selected, using scratch contexts");
        }
        Arc::new(ScratchDirContexts::new(&contexts.scratch_dir))
    } else {
        Arc::new(MemoryContexts::new())
    }
}

/// Build a preview session from configuration.
pub(crate) fn build_preview(config: &Config) -> Preview<AnyEngine> {
    let engine = build_engine(config);
    tracing::debug!(backend = engine.name(), "render engine ready");

    let mut renderer =
        TieredRenderer::new(engine, build_contexts(config)).prime(config.render.prime);
    if let Some(keywords) = &config.render.topic_keywords {
        renderer = renderer.topic_keywords(keywords.iter().cloned());
    }
    if let Some(label) = &config.render.fallback_label {
        renderer = renderer.fallback_label(label.as_str());
    }
    Preview::new(renderer)
}

/// Print a human-readable summary of `outcome`.
pub(crate) fn report(output: &Output, outcome: &RenderOutcome, exported: Option<&Path>) {
    let message = outcome.message.as_deref().unwrap_or_default();
    match outcome.status {
        RenderStatus::Success => output.success("Diagram rendered"),
        RenderStatus::Degraded => output.warning(message),
        RenderStatus::Failed => output.error(message),
    }
    if outcome.status != RenderStatus::Success
        && let Some(detail) = &outcome.detail
    {
        output.detail(&format!("Engine said: {detail}"));
    }
    match exported {
        Some(path) => output.info(&format!("Wrote {}", path.display())),
        None if outcome.has_artifact() => {}
        None => output.info("Nothing to export"),
    }
}
