use std::sync::Arc;

use {
    anyhow::Context,
    axum::{
        Json, Router,
        body::Bytes,
        extract::State,
        http::{HeaderMap, header},
        response::{IntoResponse, Response},
        routing::{get, post},
    },
    streamhook_config::StreamhookConfig,
    tokio::net::TcpListener,
    tower_http::trace::TraceLayer,
    tracing::{debug, info, warn},
};

use crate::{
    relay::{bootstrap, run_subscriptions},
    state::GatewayState,
};

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the router (shared between production startup and tests).
pub fn build_app(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(&state.callback_path, post(callback_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bootstrap, bind, and serve until Ctrl-C.
///
/// The subscription batch runs alongside the server: the platform sends
/// its verification challenge to the callback while each subscription
/// request is still in flight.
pub async fn start_gateway(config: StreamhookConfig, channels: Vec<String>) -> anyhow::Result<()> {
    let relay = Arc::new(bootstrap(&config).await?);

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        address = %addr,
        callback_path = %relay.state.callback_path,
        callback_url = %relay.callback_url,
        "listening for EventSub deliveries"
    );

    let app = build_app(Arc::clone(&relay.state));
    let subscriptions = tokio::spawn({
        let relay = Arc::clone(&relay);
        async move {
            run_subscriptions(&relay, &channels).await;
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    subscriptions.abort();
    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("received shutdown signal");
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
    }))
}

async fn callback_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let outcome = state.dispatcher.dispatch(&headers, &body).await;
    debug!(status = %outcome.status(), ?outcome, "delivery handled");

    let content_type = if outcome.is_plain_text() {
        "text/plain; charset=utf-8"
    } else {
        "application/json"
    };
    (
        outcome.status(),
        [(header::CONTENT_TYPE, content_type)],
        outcome.body(),
    )
        .into_response()
}
