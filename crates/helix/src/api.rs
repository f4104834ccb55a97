use async_trait::async_trait;

use crate::{
    Result,
    types::{HelixStream, HelixUser, SubscriptionCreated, SubscriptionRequest},
};

/// The Helix calls the relay depends on.
///
/// [`crate::HelixClient`] is the production implementation; the subscriber
/// and enrichment code only see this trait.
#[async_trait]
pub trait HelixApi: Send + Sync {
    /// Resolve a login to its stable user ID and display name.
    async fn resolve_channel(&self, login: &str) -> Result<HelixUser>;

    /// Register an EventSub subscription.
    async fn create_subscription(&self, request: &SubscriptionRequest)
    -> Result<SubscriptionCreated>;

    /// Current stream for a broadcaster, `None` when offline.
    async fn stream_info(&self, user_id: &str) -> Result<Option<HelixStream>>;

    /// Display name of a game / category ID.
    async fn game_name(&self, game_id: &str) -> Result<Option<String>>;
}
