//! Config schema types (server, twitch, discord, outbound HTTP, eventsub).
use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration for the relay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamhookConfig {
    pub server: ServerConfig,
    pub twitch: TwitchConfig,
    pub discord: DiscordConfig,
    pub http: HttpConfig,
    pub eventsub: EventSubConfig,
    /// Channel logins to subscribe to at startup.
    pub channels: Vec<String>,
    /// Optional file with one channel login per line, merged with `channels`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels_file: Option<PathBuf>,
}

/// Inbound HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "0.0.0.0" since the platform must reach it.
    pub bind: String,
    pub port: u16,
    /// Route that receives EventSub deliveries.
    pub callback_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8000,
            callback_path: "/callback".into(),
        }
    }
}

/// Twitch application credentials and endpoints.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitchConfig {
    /// Application (client) ID from the Twitch developer console.
    pub client_id: String,

    #[serde(serialize_with = "serialize_secret")]
    pub client_secret: Secret<String>,

    /// Shared secret handed to EventSub and used to sign every delivery.
    #[serde(serialize_with = "serialize_secret")]
    pub webhook_secret: Secret<String>,

    /// Public HTTPS URL the platform delivers to (must route to `server.callback_path`).
    pub callback_url: String,

    /// Helix API root.
    pub api_base_url: String,

    /// OAuth root for the client-credentials exchange.
    pub auth_base_url: String,

    /// Prefix for the public channel link in notifications.
    pub channel_base_url: String,
}

impl std::fmt::Debug for TwitchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitchConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("callback_url", &self.callback_url)
            .field("api_base_url", &self.api_base_url)
            .field("auth_base_url", &self.auth_base_url)
            .field("channel_base_url", &self.channel_base_url)
            .finish()
    }
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: Secret::new(String::new()),
            webhook_secret: Secret::new(String::new()),
            callback_url: String::new(),
            api_base_url: "https://api.twitch.tv/helix".into(),
            auth_base_url: "https://id.twitch.tv".into(),
            channel_base_url: "https://twitch.tv".into(),
        }
    }
}

/// Discord incoming-webhook target for live notifications.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// The webhook URL embeds its own token, so it is treated as a secret.
    #[serde(serialize_with = "serialize_secret")]
    pub webhook_url: Secret<String>,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            webhook_url: Secret::new(String::new()),
        }
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("webhook_url", &"[REDACTED]")
            .finish()
    }
}

/// Outbound HTTP limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Timeout applied to every outbound request.
    pub timeout_secs: u64,
    /// Upper bound on the stream + category lookups for one notification.
    pub enrichment_timeout_secs: u64,
    /// Upper bound on the chat post for one notification.
    pub notify_timeout_secs: u64,
    /// Channels resolved and subscribed in parallel at startup.
    pub subscribe_concurrency: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            enrichment_timeout_secs: 2,
            notify_timeout_secs: 2,
            subscribe_concurrency: 4,
        }
    }
}

/// Inbound message policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSubConfig {
    /// Reject verified messages whose timestamp is older than this many seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_message_age_secs: Option<u64>,
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
