//! Runner configuration.
//!
//! Loads the optional user config, fills defaults for omitted fields, and
//! validates the result before any engine is created.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;
const CONFIG_DIR_NAME: &str = "kata-runner";
const CONFIG_FILE_NAME: &str = "config.json";

fn default_schema_version() -> u32 {
    CONFIG_SCHEMA_VERSION
}

fn default_go_command() -> String {
    "go".to_string()
}

fn default_build_timeout_seconds() -> f64 {
    60.0
}

fn default_run_timeout_seconds() -> f64 {
    10.0
}

fn default_max_output_bytes() -> usize {
    64 * 1024
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Catalog used when `--catalog` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
    /// Go toolchain command line; the first word is resolved on `PATH`.
    #[serde(default = "default_go_command")]
    pub go_command: String,
    #[serde(default = "default_build_timeout_seconds")]
    pub build_timeout_seconds: f64,
    #[serde(default = "default_run_timeout_seconds")]
    pub run_timeout_seconds: f64,
    /// Cap on captured program output; longer output is truncated.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            catalog: None,
            go_command: default_go_command(),
            build_timeout_seconds: default_build_timeout_seconds(),
            run_timeout_seconds: default_run_timeout_seconds(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

/// Location of the implicit per-user config file, if a config dir exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load config from `explicit`, else the per-user file if present, else defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<RunnerConfig> {
    let config = match explicit {
        Some(path) => read_config(path)?,
        None => match default_config_path().filter(|path| path.is_file()) {
            Some(path) => read_config(&path)?,
            None => RunnerConfig::default(),
        },
    };
    validate_config(&config)?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<RunnerConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: RunnerConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(config)
}

pub fn validate_config(config: &RunnerConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    validate_timeout("build_timeout_seconds", config.build_timeout_seconds)?;
    validate_timeout("run_timeout_seconds", config.run_timeout_seconds)?;
    if config.max_output_bytes == 0 {
        return Err(anyhow!("max_output_bytes must be greater than 0"));
    }
    let words = shell_words::split(&config.go_command)
        .with_context(|| format!("parse go_command: {}", config.go_command))?;
    if words.is_empty() {
        return Err(anyhow!("go_command is empty"));
    }
    Ok(())
}

fn validate_timeout(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(anyhow!("{field} must be a positive number of seconds"));
    }
    Ok(())
}
