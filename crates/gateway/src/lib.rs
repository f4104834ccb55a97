//! Gateway: the inbound HTTP server for EventSub deliveries.
//!
//! Lifecycle:
//! 1. Build the HTTP client and acquire the app access token (fatal on failure)
//! 2. Wire the Helix client, enrichment, Discord notifier, and dispatcher
//! 3. Bind and serve `POST {callback_path}` and `GET /health`
//! 4. Subscribe configured channels while serving
//!
//! Verification and event handling live in `streamhook-eventsub`; this
//! crate only adapts them to axum.

pub mod relay;
pub mod server;
pub mod state;

pub use {
    relay::{assemble, bootstrap, run_subscriptions},
    server::{build_app, start_gateway},
    state::{GatewayState, Relay},
};
