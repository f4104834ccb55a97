use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result},
    streamhook_config::{
        Diagnostic, Severity, StreamhookConfig, apply_env_overrides, discover_and_load,
        find_config_file, load_config, merge_channels, read_channels_file, validate,
    },
    tracing::warn,
};

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub channels_file: Option<PathBuf>,
}

/// Fully resolved configuration plus the merged channel list.
pub struct Settings {
    pub config: StreamhookConfig,
    pub channels: Vec<String>,
    /// The file the config came from, if any.
    pub source: Option<PathBuf>,
}

impl Settings {
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        validate(&self.config, &self.channels)
    }
}

/// Load config (explicit path or discovery), apply `STREAMHOOK_*` env
/// overrides, then CLI overrides, then read the channel list file.
pub fn load_settings(overrides: &Overrides) -> Result<Settings> {
    let (mut config, source) = match &overrides.config {
        Some(path) => (load_config(path)?, Some(path.clone())),
        None => (discover_and_load()?, find_config_file()),
    };
    apply_env_overrides(&mut config);

    if let Some(bind) = &overrides.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = overrides.port {
        config.server.port = port;
    }

    let channels_file = overrides
        .channels_file
        .as_ref()
        .or(config.channels_file.as_ref());
    let from_file = match channels_file {
        Some(path) => read_channels_file(path)
            .with_context(|| format!("failed to read channel list {}", path.display()))?,
        None => Vec::new(),
    };
    let channels = merge_channels(&config.channels, &from_file);

    Ok(Settings {
        config,
        channels,
        source,
    })
}

/// Log warnings and fail on any error diagnostic.
pub fn ensure_valid(settings: &Settings) -> Result<()> {
    let diagnostics = settings.diagnostics();
    for d in diagnostics.iter().filter(|d| d.severity == Severity::Warning) {
        warn!(path = d.path, "{}", d.message);
    }
    let errors: Vec<String> = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .map(|d| format!("{}: {}", d.path, d.message))
        .collect();
    if !errors.is_empty() {
        anyhow::bail!(
            "invalid configuration ({} error(s)):\n  {}",
            errors.len(),
            errors.join("\n  ")
        );
    }
    Ok(())
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// `streamhook check-config`
pub fn check(overrides: &Overrides) -> Result<()> {
    let settings = load_settings(overrides)?;

    match settings.source {
        Some(ref path) => eprintln!("Checking {}\n", path.display()),
        None => eprintln!("No config file found; checking defaults and environment.\n"),
    }

    let diagnostics = settings.diagnostics();
    for d in &diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
    }

    let errors = count(&diagnostics, Severity::Error);
    let warnings = count(&diagnostics, Severity::Warning);
    if !diagnostics.is_empty() {
        eprintln!();
    }
    eprintln!("{} channel(s) configured", settings.channels.len());
    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn count(diagnostics: &[Diagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}

/// Read a request body for `sign`, accepting `-` for stdin.
pub fn read_body(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::Read::read_to_end(&mut std::io::stdin(), &mut buf)
            .context("failed to read body from stdin")?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}
