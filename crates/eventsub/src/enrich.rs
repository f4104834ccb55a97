//! Best-effort stream metadata lookup for notifications.

use std::{sync::Arc, time::Duration};

use {
    streamhook_helix::HelixApi,
    tracing::{debug, warn},
};

/// Title and category of a live stream. Either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamDetails {
    pub title: Option<String>,
    pub category: Option<String>,
}

/// Looks up stream title and category through Helix.
#[derive(Clone)]
pub struct Enricher {
    api: Arc<dyn HelixApi>,
    timeout: Duration,
}

impl Enricher {
    pub fn new(api: Arc<dyn HelixApi>, timeout: Duration) -> Self {
        Self { api, timeout }
    }

    /// Fetch title and category for a broadcaster.
    ///
    /// Returns `None` when the stream lookup fails, times out, or reports the
    /// channel offline. A failed category lookup keeps the title.
    pub async fn fetch_stream_info(&self, channel_id: &str) -> Option<StreamDetails> {
        match tokio::time::timeout(self.timeout, self.lookup(channel_id)).await {
            Ok(details) => details,
            Err(_) => {
                warn!(channel_id, timeout = ?self.timeout, "stream lookup timed out");
                None
            },
        }
    }

    async fn lookup(&self, channel_id: &str) -> Option<StreamDetails> {
        let stream = match self.api.stream_info(channel_id).await {
            Ok(Some(stream)) => stream,
            Ok(None) => {
                debug!(channel_id, "no live stream listed yet");
                return None;
            },
            Err(e) => {
                warn!(channel_id, error = %e, timeout = e.is_timeout(), "stream lookup failed");
                return None;
            },
        };

        let fallback_category = non_empty(stream.game_name);
        let category = if stream.game_id.is_empty() {
            fallback_category
        } else {
            match self.api.game_name(&stream.game_id).await {
                Ok(Some(name)) => non_empty(name).or(fallback_category),
                Ok(None) => fallback_category,
                Err(e) => {
                    warn!(game_id = %stream.game_id, error = %e, "category lookup failed");
                    fallback_category
                },
            }
        };

        Some(StreamDetails {
            title: non_empty(stream.title),
            category,
        })
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}
