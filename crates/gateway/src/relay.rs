//! Startup wiring: token, Helix client, dispatcher, subscription batch.

use std::{sync::Arc, time::Duration};

use {
    anyhow::Context,
    streamhook_config::StreamhookConfig,
    streamhook_eventsub::{
        DispatchOptions, Dispatcher, Enricher, SubscriptionReport, SubscriptionStatus,
        subscribe_all,
    },
    streamhook_helix::{HelixApi, HelixClient, HelixEndpoints, acquire_token},
    streamhook_notify::{ChatNotifier, DiscordWebhook},
    tracing::{info, warn},
};

use crate::state::{GatewayState, Relay};

/// Build the relay from configuration.
///
/// Acquires the app access token first; failure there is fatal and
/// nothing else is constructed.
pub async fn bootstrap(config: &StreamhookConfig) -> anyhow::Result<Relay> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let endpoints = HelixEndpoints {
        api_base: config.twitch.api_base_url.clone(),
        auth_base: config.twitch.auth_base_url.clone(),
    };
    // Not refreshed; a restart is needed once `expires_in` elapses.
    let token = acquire_token(
        &http,
        &endpoints,
        &config.twitch.client_id,
        &config.twitch.client_secret,
    )
    .await
    .context("could not obtain a Twitch app access token")?;

    let helix: Arc<dyn HelixApi> = Arc::new(HelixClient::new(
        http.clone(),
        endpoints,
        config.twitch.client_id.clone(),
        token,
    ));
    let notifier: Arc<dyn ChatNotifier> = Arc::new(DiscordWebhook::new(
        http,
        config.discord.webhook_url.clone(),
    ));

    Ok(assemble(config, helix, notifier))
}

/// Wire a relay around already-built collaborators.
pub fn assemble(
    config: &StreamhookConfig,
    helix: Arc<dyn HelixApi>,
    notifier: Arc<dyn ChatNotifier>,
) -> Relay {
    let enricher = Enricher::new(
        Arc::clone(&helix),
        Duration::from_secs(config.http.enrichment_timeout_secs),
    );
    let dispatcher = Dispatcher::new(
        config.twitch.webhook_secret.clone(),
        Some(enricher),
        notifier,
        DispatchOptions {
            channel_base_url: config.twitch.channel_base_url.clone(),
            max_message_age: config.eventsub.max_message_age_secs.map(Duration::from_secs),
            notify_timeout: Duration::from_secs(config.http.notify_timeout_secs),
        },
    );

    Relay {
        state: GatewayState::new(dispatcher, config.server.callback_path.clone()),
        helix,
        callback_url: config.twitch.callback_url.clone(),
        webhook_secret: config.twitch.webhook_secret.clone(),
        subscribe_concurrency: config.http.subscribe_concurrency,
    }
}

/// Subscribe every configured channel and log the outcome of each.
pub async fn run_subscriptions(relay: &Relay, channels: &[String]) -> Vec<SubscriptionReport> {
    if channels.is_empty() {
        warn!("no channels configured, nothing to subscribe");
        return Vec::new();
    }

    let reports = subscribe_all(
        relay.helix.as_ref(),
        channels,
        &relay.callback_url,
        &relay.webhook_secret,
        relay.subscribe_concurrency,
    )
    .await;

    for report in &reports {
        match &report.status {
            SubscriptionStatus::Created(sub) => info!(
                channel = %report.login,
                channel_id = %sub.channel_id,
                display_name = %sub.display_name,
                "subscribed to {}", sub.event_type
            ),
            SubscriptionStatus::AlreadySubscribed(sub) => info!(
                channel = %report.login,
                channel_id = %sub.channel_id,
                "already subscribed"
            ),
            SubscriptionStatus::Failed(reason) => warn!(
                channel = %report.login,
                reason = %reason,
                "subscription failed"
            ),
        }
    }

    let failed = reports.iter().filter(|r| !r.status.is_success()).count();
    info!(
        total = reports.len(),
        ok = reports.len() - failed,
        failed,
        "subscription batch finished"
    );
    reports
}
