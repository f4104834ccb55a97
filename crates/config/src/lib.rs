//! Configuration loading, env substitution, and validation.
//!
//! Config files: `streamhook.toml`, `streamhook.yaml`, or `streamhook.json`
//! Searched in `./` then `~/.config/streamhook/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values, and a fixed set
//! of `STREAMHOOK_*` variables that override individual fields.

pub mod channels;
pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    channels::{merge_channels, parse_channel_list, read_channels_file},
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, find_config_file, load_config},
    schema::{
        DiscordConfig, EventSubConfig, HttpConfig, ServerConfig, StreamhookConfig, TwitchConfig,
    },
    validate::{Diagnostic, Severity, validate},
};
