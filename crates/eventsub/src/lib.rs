//! EventSub webhook handling: signature verification, delivery
//! classification, notification dispatch and subscription setup.

pub mod dispatch;
pub mod enrich;
pub mod message;
pub mod payload;
pub mod signature;
pub mod subscriber;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod testing;

pub use {
    dispatch::{DispatchOptions, Dispatcher, Outcome},
    enrich::{Enricher, StreamDetails},
    message::{InboundWebhookMessage, MessageType, SubscriptionType},
    payload::NotificationPayload,
    signature::{
        RejectReason, VerifiedHeaders, check_headers, compute_signature, verify, verify_headers,
    },
    subscriber::{ChannelSubscription, SubscriptionReport, SubscriptionStatus, subscribe_all},
};
