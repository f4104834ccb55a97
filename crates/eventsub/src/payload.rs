//! Rendering of the chat announcement for a stream going live.

use serde::Serialize;

/// Shown when enrichment could not find a stream title.
pub const UNTITLED_STREAM: &str = "Untitled stream";

/// Discord rejects `content` longer than this many characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// What gets announced for one "went live" notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub channel_name: String,
    pub channel_url: String,
    pub title: Option<String>,
    pub category: Option<String>,
}

impl NotificationPayload {
    /// Build the payload for a broadcaster. `base_url` is the public channel
    /// root, e.g. `https://twitch.tv`.
    pub fn new(base_url: &str, display_name: &str, login: &str) -> Self {
        Self {
            channel_name: display_name.to_string(),
            channel_url: format!("{}/{login}", base_url.trim_end_matches('/')),
            title: None,
            category: None,
        }
    }

    /// Title to display, falling back to [`UNTITLED_STREAM`].
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNTITLED_STREAM)
    }

    /// Chat message text.
    pub fn render(&self) -> String {
        let mut text = format!(
            "{} is live! {}\n{}",
            self.channel_name,
            self.channel_url,
            self.display_title()
        );
        if let Some(category) = self.category.as_deref().filter(|c| !c.trim().is_empty()) {
            text.push_str("\nPlaying ");
            text.push_str(category);
        }
        truncate_chars(text, MAX_CONTENT_CHARS)
    }
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => {
            let mut truncated = text[..cut].to_string();
            // Keep the limit when replacing the last char with an ellipsis.
            truncated.pop();
            truncated.push('…');
            truncated
        },
        None => text,
    }
}
