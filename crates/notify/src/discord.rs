use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    tracing::debug,
};

use crate::{ChatNotifier, Error, Result};

/// Discord incoming webhook.
///
/// Posts `{"content": text}`. A single attempt is made; failures are returned
/// to the caller, which decides whether they matter.
#[derive(Clone)]
pub struct DiscordWebhook {
    http: reqwest::Client,
    url: Secret<String>,
}

impl std::fmt::Debug for DiscordWebhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordWebhook")
            .field("url", &"[REDACTED]")
            .finish()
    }
}

impl DiscordWebhook {
    pub fn new(http: reqwest::Client, url: Secret<String>) -> Self {
        Self { http, url }
    }
}

#[async_trait]
impl ChatNotifier for DiscordWebhook {
    async fn send_text(&self, text: &str) -> Result<()> {
        let resp = self
            .http
            .post(self.url.expose_secret())
            .json(&serde_json::json!({ "content": text }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Delivery { status, body });
        }

        debug!(chars = text.chars().count(), "chat notification delivered");
        Ok(())
    }
}
