use std::sync::Arc;

use {
    secrecy::Secret,
    streamhook_eventsub::Dispatcher,
    streamhook_helix::HelixApi,
};

/// Per-request state shared by the HTTP handlers.
pub struct GatewayState {
    pub dispatcher: Dispatcher,
    /// Path the platform POSTs deliveries to, e.g. `/callback`.
    pub callback_path: String,
    pub version: &'static str,
}

impl GatewayState {
    pub fn new(dispatcher: Dispatcher, callback_path: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            dispatcher,
            callback_path: callback_path.into(),
            version: env!("CARGO_PKG_VERSION"),
        })
    }
}

/// Everything built once at startup: the serving state plus what the
/// subscription batch needs.
pub struct Relay {
    pub state: Arc<GatewayState>,
    pub helix: Arc<dyn HelixApi>,
    pub callback_url: String,
    pub webhook_secret: Secret<String>,
    pub subscribe_concurrency: usize,
}
