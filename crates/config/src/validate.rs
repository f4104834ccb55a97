//! Configuration validation.
//!
//! Checks a loaded [`StreamhookConfig`] for missing credentials, secrets the
//! platform would refuse, and settings that are legal but likely mistakes.

use {secrecy::ExposeSecret, url::Url};

use crate::schema::StreamhookConfig;

/// Longest a notification may spend on enrichment plus the chat post
/// before it is acknowledged. EventSub retries slower deliveries.
const ACK_BUDGET_SECS: u64 = 5;

/// EventSub accepts webhook secrets of 10 to 100 ASCII characters.
const SECRET_MIN_LEN: usize = 10;
const SECRET_MAX_LEN: usize = 100;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "twitch.callback_url"
    pub path: &'static str,
    pub message: String,
}

impl Diagnostic {
    fn error(path: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            path,
            message: message.into(),
        }
    }

    fn warning(path: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            path,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.path, self.message)
    }
}

/// Validate a config, returning every problem found.
///
/// `channels` is the merged channel list (inline plus file), since the file
/// is read separately from the config.
pub fn validate(config: &StreamhookConfig, channels: &[String]) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let twitch = &config.twitch;

    if twitch.client_id.trim().is_empty() {
        out.push(Diagnostic::error("twitch.client_id", "missing application ID"));
    }
    if twitch.client_secret.expose_secret().trim().is_empty() {
        out.push(Diagnostic::error(
            "twitch.client_secret",
            "missing application secret",
        ));
    }

    let secret_len = twitch.webhook_secret.expose_secret().len();
    if secret_len == 0 {
        out.push(Diagnostic::error("twitch.webhook_secret", "missing webhook secret"));
    } else if !(SECRET_MIN_LEN..=SECRET_MAX_LEN).contains(&secret_len) {
        out.push(Diagnostic::error(
            "twitch.webhook_secret",
            format!("must be {SECRET_MIN_LEN}-{SECRET_MAX_LEN} characters, got {secret_len}"),
        ));
    }

    check_callback_url(&twitch.callback_url, &mut out);

    let webhook = config.discord.webhook_url.expose_secret();
    if webhook.trim().is_empty() {
        out.push(Diagnostic::error("discord.webhook_url", "missing webhook URL"));
    } else if Url::parse(webhook).is_err() {
        out.push(Diagnostic::error("discord.webhook_url", "not a valid URL"));
    }

    if !config.server.callback_path.starts_with('/') {
        out.push(Diagnostic::error(
            "server.callback_path",
            "must start with '/'",
        ));
    }

    let http = &config.http;
    for (path, secs) in [
        ("http.timeout_secs", http.timeout_secs),
        ("http.enrichment_timeout_secs", http.enrichment_timeout_secs),
        ("http.notify_timeout_secs", http.notify_timeout_secs),
    ] {
        if secs == 0 {
            out.push(Diagnostic::error(path, "must be greater than 0"));
        }
    }
    let ack_secs = http.enrichment_timeout_secs.saturating_add(http.notify_timeout_secs);
    if ack_secs > ACK_BUDGET_SECS {
        out.push(Diagnostic::error(
            "http.notify_timeout_secs",
            format!(
                "enrichment_timeout_secs + notify_timeout_secs is {ack_secs}s, \
                 deliveries must be acknowledged within {ACK_BUDGET_SECS}s"
            ),
        ));
    }
    if config.http.subscribe_concurrency == 0 {
        out.push(Diagnostic::error(
            "http.subscribe_concurrency",
            "must be greater than 0",
        ));
    }

    if channels.is_empty() {
        out.push(Diagnostic::warning(
            "channels",
            "no channels configured, nothing will be subscribed",
        ));
    }

    out
}

fn check_callback_url(raw: &str, out: &mut Vec<Diagnostic>) {
    if raw.trim().is_empty() {
        out.push(Diagnostic::error("twitch.callback_url", "missing callback URL"));
        return;
    }
    match Url::parse(raw) {
        Ok(url) if url.scheme() != "https" => out.push(Diagnostic::warning(
            "twitch.callback_url",
            "EventSub only delivers to https callbacks on port 443",
        )),
        Ok(_) => {},
        Err(e) => out.push(Diagnostic::error(
            "twitch.callback_url",
            format!("invalid URL: {e}"),
        )),
    }
}
