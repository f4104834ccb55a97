//! Twitch Helix API client.
//!
//! Covers the client-credentials token exchange and the handful of Helix
//! endpoints the relay needs: user lookup, EventSub subscription creation,
//! stream info and game lookup.

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use {
    api::HelixApi,
    auth::{AppToken, acquire_token},
    client::{HelixClient, HelixEndpoints},
    error::{Error, Result},
    types::{
        HelixStream, HelixUser, STREAM_ONLINE, SubscriptionCreated, SubscriptionRequest,
    },
};
