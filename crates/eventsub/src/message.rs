//! Inbound EventSub delivery model.

use {http::HeaderMap, serde::Deserialize, streamhook_helix::STREAM_ONLINE};

use crate::signature::{MESSAGE_ID, MESSAGE_SIGNATURE, MESSAGE_TIMESTAMP, MESSAGE_TYPE, header_str};

/// Value of the `Twitch-Eventsub-Message-Type` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    ChallengeVerification,
    Notification,
    Revocation,
    Other(String),
}

impl MessageType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "webhook_callback_verification" => Self::ChallengeVerification,
            "notification" => Self::Notification,
            "revocation" => Self::Revocation,
            other => Self::Other(other.to_string()),
        }
    }
}

/// `subscription.type` of a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionType {
    StreamOnline,
    Other(String),
}

impl SubscriptionType {
    pub fn parse(raw: &str) -> Self {
        if raw == STREAM_ONLINE {
            Self::StreamOnline
        } else {
            Self::Other(raw.to_string())
        }
    }
}

impl std::fmt::Display for SubscriptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StreamOnline => f.write_str(STREAM_ONLINE),
            Self::Other(other) => f.write_str(other),
        }
    }
}

/// Borrowed request body; `Debug` prints the length only.
#[derive(Clone, Copy)]
pub struct RawBody<'a>(pub &'a [u8]);

impl std::fmt::Debug for RawBody<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawBody({} bytes)", self.0.len())
    }
}

/// One inbound delivery, as received. The body stays raw until the
/// signature has been checked.
#[derive(Debug, Clone)]
pub struct InboundWebhookMessage<'a> {
    pub message_id: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    pub signature: Option<&'a str>,
    pub message_type: Option<MessageType>,
    pub raw_body: RawBody<'a>,
}

impl<'a> InboundWebhookMessage<'a> {
    pub fn from_parts(headers: &'a HeaderMap, body: &'a [u8]) -> Self {
        Self {
            message_id: header_str(headers, MESSAGE_ID),
            timestamp: header_str(headers, MESSAGE_TIMESTAMP),
            signature: header_str(headers, MESSAGE_SIGNATURE),
            message_type: header_str(headers, MESSAGE_TYPE).map(MessageType::parse),
            raw_body: RawBody(body),
        }
    }

    /// Parse the JSON body. Only meaningful after verification.
    pub fn parse_body(&self) -> serde_json::Result<DeliveryBody> {
        serde_json::from_slice(self.raw_body.0)
    }
}

/// The JSON body shared by challenge, notification, and revocation deliveries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryBody {
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub subscription: Option<SubscriptionInfo>,
    #[serde(default)]
    pub event: Option<serde_json::Value>,
}

impl DeliveryBody {
    pub fn subscription_type(&self) -> Option<SubscriptionType> {
        self.subscription
            .as_ref()
            .map(|s| SubscriptionType::parse(&s.kind))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionInfo {
    #[serde(rename = "type")]
    pub kind: String,
    /// Set on revocations, e.g. `user_removed` or `authorization_revoked`.
    #[serde(default)]
    pub status: Option<String>,
}

/// Fields of a `stream.online` event used to build the notification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamOnlineEvent {
    #[serde(default)]
    pub broadcaster_user_id: Option<String>,
    #[serde(default)]
    pub broadcaster_user_login: Option<String>,
    #[serde(default)]
    pub broadcaster_user_name: Option<String>,
}
