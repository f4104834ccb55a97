//! Outbound chat notifications.
//!
//! The relay only ever posts plain text, so the collaborator surface is a
//! single [`ChatNotifier::send_text`].

pub mod discord;
pub mod error;

use async_trait::async_trait;

pub use {
    discord::DiscordWebhook,
    error::{Error, Result},
};

/// Delivers a text message to a chat channel.
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    async fn send_text(&self, text: &str) -> Result<()>;
}
