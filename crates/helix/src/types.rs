use serde::{Deserialize, Serialize};

/// EventSub subscription type for "broadcaster went live".
pub const STREAM_ONLINE: &str = "stream.online";

/// Helix wraps every list response in `{"data": [...]}`.
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// A row of `GET /users`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HelixUser {
    pub id: String,
    pub login: String,
    pub display_name: String,
}

/// A row of `GET /streams`. Only present while the channel is live.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HelixStream {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub game_id: String,
    #[serde(default)]
    pub game_name: String,
}

/// A row of `GET /games`.
#[derive(Debug, Deserialize)]
pub(crate) struct HelixGame {
    pub name: String,
}

/// Body of `POST /eventsub/subscriptions` for a webhook transport.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
    pub condition: Condition,
    pub transport: Transport,
}

#[derive(Debug, Clone, Serialize)]
pub struct Condition {
    pub broadcaster_user_id: String,
}

#[derive(Clone, Serialize)]
pub struct Transport {
    pub method: String,
    pub callback: String,
    pub secret: String,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("method", &self.method)
            .field("callback", &self.callback)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl SubscriptionRequest {
    /// A `stream.online` webhook subscription for one broadcaster.
    pub fn stream_online(
        broadcaster_user_id: impl Into<String>,
        callback: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            kind: STREAM_ONLINE.into(),
            version: "1".into(),
            condition: Condition {
                broadcaster_user_id: broadcaster_user_id.into(),
            },
            transport: Transport {
                method: "webhook".into(),
                callback: callback.into(),
                secret: secret.into(),
            },
        }
    }
}

/// Result of a subscription create call that the relay treats as success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionCreated {
    /// 202 Accepted: the platform will send a verification challenge.
    Created { id: Option<String> },
    /// 409 Conflict: an identical subscription already exists.
    AlreadyExists,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedSubscription {
    pub id: String,
}
