//! Configuration management for dgr.
//!
//! Parses `dgr.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! Engine settings are plain values handed to the engine and renderer
//! constructors. Nothing here is process-global, so several renderers with
//! different settings can coexist.
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `engine.kroki_url`
//! - `engine.command`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override Kroki URL.
    pub kroki_url: Option<String>,
    /// Override render backend.
    pub backend: Option<EngineBackend>,
    /// Override engine theme.
    pub theme: Option<String>,
    /// Override the canary render flag.
    pub prime: Option<bool>,
    /// Override export output directory.
    pub output_dir: Option<PathBuf>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "dgr.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Render engine configuration.
    pub engine: EngineConfig,
    /// Tiered renderer configuration.
    pub render: RenderConfig,
    /// Render context configuration (paths are relative strings from TOML).
    contexts: ContextsConfigRaw,
    /// Export configuration (paths are relative strings from TOML).
    export: ExportConfigRaw,

    /// Resolved contexts configuration (set after loading).
    #[serde(skip)]
    pub contexts_resolved: ContextsConfig,
    /// Resolved export configuration (set after loading).
    #[serde(skip)]
    pub export_resolved: ExportConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Which external renderer backs the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineBackend {
    /// Kroki HTTP service.
    #[default]
    Kroki,
    /// Local command-line renderer (e.g. `mmdc`).
    Command,
}

impl EngineBackend {
    /// Parse a backend name (`kroki` or `command`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "kroki" => Some(Self::Kroki),
            "command" | "cmd" => Some(Self::Command),
            _ => None,
        }
    }

    /// Backend name as written in `dgr.toml`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kroki => "kroki",
            Self::Command => "command",
        }
    }
}

/// Render engine configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Backend used for rendering.
    pub backend: EngineBackend,
    /// Kroki server URL.
    pub kroki_url: String,
    /// Per-invocation timeout in seconds.
    pub timeout_secs: u64,
    /// Executable for the command backend.
    pub command: String,
    /// Arguments placed before the input/output flags of the command backend.
    pub args: Vec<String>,
    /// Optional engine theme (e.g. "dark", "forest").
    pub theme: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: EngineBackend::Kroki,
            kroki_url: "https://kroki.io".to_owned(),
            timeout_secs: 30,
            command: "mmdc".to_owned(),
            args: Vec::new(),
            theme: None,
        }
    }
}

impl EngineConfig {
    /// Per-invocation timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Tiered renderer configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Render a minimal canary diagram before the first primary attempt.
    pub prime: bool,
    /// Keywords searched for when building the simplified placeholder.
    ///
    /// `None` keeps the renderer's built-in list.
    pub topic_keywords: Option<Vec<String>>,
    /// Placeholder subject label when no keyword matches.
    ///
    /// `None` keeps the renderer's built-in label.
    pub fallback_label: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            prime: true,
            topic_keywords: None,
            fallback_label: None,
        }
    }
}

/// Where render contexts live.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextsBackend {
    /// In-memory registry.
    #[default]
    Memory,
    /// One scratch subdirectory per context.
    Scratch,
}

/// Raw contexts configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ContextsConfigRaw {
    backend: Option<ContextsBackend>,
    scratch_dir: Option<String>,
}

/// Resolved render context configuration with absolute paths.
#[derive(Debug, Default)]
pub struct ContextsConfig {
    /// Context backend.
    pub backend: ContextsBackend,
    /// Root for scratch contexts.
    pub scratch_dir: PathBuf,
}

/// Raw export configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ExportConfigRaw {
    output_dir: Option<String>,
}

/// Resolved export configuration with absolute paths.
#[derive(Debug, Default)]
pub struct ExportConfig {
    /// Directory receiving `diagram-<millis>.svg` files.
    pub output_dir: PathBuf,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`engine.kroki_url`").
        field: String,
        /// Error message (e.g., "${`KROKI_URL`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `dgr.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(kroki_url) = &settings.kroki_url {
            self.engine.kroki_url.clone_from(kroki_url);
        }
        if let Some(backend) = settings.backend {
            self.engine.backend = backend;
        }
        if let Some(theme) = &settings.theme {
            self.engine.theme = Some(theme.clone());
        }
        if let Some(prime) = settings.prime {
            self.render.prime = prime;
        }
        if let Some(output_dir) = &settings.output_dir {
            self.export_resolved.output_dir.clone_from(output_dir);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            engine: EngineConfig::default(),
            render: RenderConfig::default(),
            contexts: ContextsConfigRaw::default(),
            export: ExportConfigRaw::default(),
            contexts_resolved: ContextsConfig {
                backend: ContextsBackend::Memory,
                scratch_dir: base.join(".dgr").join("scratch"),
            },
            export_resolved: ExportConfig {
                output_dir: base.to_path_buf(),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_engine()?;
        self.validate_render()?;
        Ok(())
    }

    /// Validate engine configuration.
    fn validate_engine(&self) -> Result<(), ConfigError> {
        const MAX_TIMEOUT_SECS: u64 = 600;

        match self.engine.backend {
            EngineBackend::Kroki => {
                require_non_empty(&self.engine.kroki_url, "engine.kroki_url")?;
                require_http_url(&self.engine.kroki_url, "engine.kroki_url")?;
            }
            EngineBackend::Command => {
                require_non_empty(&self.engine.command, "engine.command")?;
            }
        }

        let timeout = self.engine.timeout_secs;
        if timeout == 0 {
            return Err(ConfigError::Validation(
                "engine.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        if timeout > MAX_TIMEOUT_SECS {
            return Err(ConfigError::Validation(format!(
                "engine.timeout_secs cannot exceed {MAX_TIMEOUT_SECS}"
            )));
        }

        Ok(())
    }

    /// Validate renderer configuration.
    fn validate_render(&self) -> Result<(), ConfigError> {
        if let Some(label) = &self.render.fallback_label {
            require_non_empty(label, "render.fallback_label")?;
        }
        if self
            .render
            .topic_keywords
            .iter()
            .flatten()
            .any(|k| k.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "render.topic_keywords cannot contain empty entries".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.engine.kroki_url = expand::expand_env(&self.engine.kroki_url, "engine.kroki_url")?;
        self.engine.command = expand::expand_env(&self.engine.command, "engine.command")?;
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.contexts_resolved = ContextsConfig {
            backend: self.contexts.backend.unwrap_or_default(),
            scratch_dir: resolve(self.contexts.scratch_dir.as_deref(), ".dgr/scratch"),
        };
        self.export_resolved = ExportConfig {
            output_dir: resolve(self.export.output_dir.as_deref(), "."),
        };
    }
}
