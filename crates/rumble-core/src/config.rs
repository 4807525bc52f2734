use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "rumble.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RumbleConfig {
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default = "default_archive_root")]
    pub root: PathBuf,
    /// Channel IDs in processing priority order.
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            root: default_archive_root(),
            channels: default_channels(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_bot_author_id")]
    pub author_id: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            author_id: default_bot_author_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Load `rumble.toml` from `project_root`, or defaults when the file is absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(project_root: &Path) -> Result<RumbleConfig> {
    load_config_file(&project_root.join(CONFIG_FILE_NAME), false)
}

/// Load a config file from an explicit path.
///
/// When `required` is false a missing file yields defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or is missing while
/// `required` is set.
pub fn load_config_file(path: &Path, required: bool) -> Result<RumbleConfig> {
    if !path.exists() {
        if required {
            anyhow::bail!("config file {} does not exist", path.display());
        }
        return Ok(RumbleConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<RumbleConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Pick the output mode: `--json` flag, then `FORMAT`, then config, then TTY.
#[must_use]
pub fn resolve_output(cli_json: bool, config: &RumbleConfig) -> String {
    resolve_output_from(cli_json, config.output.clone(), env::var("FORMAT").ok())
}

fn resolve_output_from(
    cli_json: bool,
    config_output: Option<String>,
    env_format: Option<String>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = config_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

fn default_archive_root() -> PathBuf {
    PathBuf::from("discord-exports")
}

fn default_channels() -> Vec<String> {
    vec![
        "1224017701744410695".to_string(),
        "1224009923457847428".to_string(),
    ]
}

fn default_bot_author_id() -> String {
    "693167035068317736".to_string()
}

fn default_store_path() -> PathBuf {
    PathBuf::from("main.db")
}
