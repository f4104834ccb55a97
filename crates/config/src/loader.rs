use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    Error, Result, channels::parse_channel_list, env_subst::substitute_env,
    schema::StreamhookConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "streamhook.toml",
    "streamhook.yaml",
    "streamhook.yml",
    "streamhook.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<StreamhookConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./streamhook.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/streamhook/streamhook.{toml,yaml,yml,json}` (user-global)
///
/// Returns `StreamhookConfig::default()` if no config file is found. A file
/// that exists but does not parse is an error.
pub fn discover_and_load() -> Result<StreamhookConfig> {
    match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path)
        },
        None => {
            debug!("no config file found, using defaults");
            Ok(StreamhookConfig::default())
        },
    }
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists());
    if local.is_some() {
        return local;
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/streamhook/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "streamhook").map(|d| d.config_dir().to_path_buf())
}

/// Overlay `STREAMHOOK_*` environment variables onto a loaded config.
pub fn apply_env_overrides(config: &mut StreamhookConfig) {
    apply_overrides_with(config, |name| std::env::var(name).ok());
}

pub(crate) fn apply_overrides_with(
    config: &mut StreamhookConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("STREAMHOOK_TWITCH_CLIENT_ID") {
        config.twitch.client_id = v;
    }
    if let Some(v) = get("STREAMHOOK_TWITCH_CLIENT_SECRET") {
        config.twitch.client_secret = Secret::new(v);
    }
    if let Some(v) = get("STREAMHOOK_WEBHOOK_SECRET") {
        config.twitch.webhook_secret = Secret::new(v);
    }
    if let Some(v) = get("STREAMHOOK_CALLBACK_URL") {
        config.twitch.callback_url = v;
    }
    if let Some(v) = get("STREAMHOOK_DISCORD_WEBHOOK_URL") {
        config.discord.webhook_url = Secret::new(v);
    }
    if let Some(v) = get("STREAMHOOK_CHANNELS") {
        config.channels = parse_channel_list(&v.replace(',', "\n"));
    }
    if let Some(v) = get("STREAMHOOK_PORT") {
        match v.parse() {
            Ok(port) => config.server.port = port,
            Err(_) => warn!(value = %v, "ignoring invalid STREAMHOOK_PORT"),
        }
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<StreamhookConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}
