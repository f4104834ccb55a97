//! Channel list handling: inline `channels`, the optional channels file,
//! and `STREAMHOOK_CHANNELS`.

use std::{collections::HashSet, path::Path};

use crate::{Error, Result};

/// Parse one login per line. Blank lines and `#` comments are skipped,
/// logins are lowercased, and duplicates keep their first position.
pub fn parse_channel_list(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|login| !login.is_empty())
        .map(str::to_lowercase)
        .filter(|login| seen.insert(login.clone()))
        .collect()
}

/// Read a channels file (see [`parse_channel_list`]).
pub fn read_channels_file(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_channel_list(&raw))
}

/// Combine configured channels with file-sourced ones, preserving order.
pub fn merge_channels(inline: &[String], from_file: &[String]) -> Vec<String> {
    parse_channel_list(
        &inline
            .iter()
            .chain(from_file)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n"),
    )
}
