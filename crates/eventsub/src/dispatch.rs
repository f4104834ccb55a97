//! Per-delivery state machine: verify, classify, act, acknowledge.
//!
//! ```text
//! Unverified ─ bad/missing signature ─────────────▶ Rejected
//!     │
//!     ▼ verified
//! challenge ─────────────────────────────────────▶ ChallengeEcho
//! notification + stream.online ──────────────────▶ NotifyDispatched
//! notification + other type / unknown message ───▶ Ignored
//! revocation ────────────────────────────────────▶ Revoked
//! ```
//!
//! Nothing here is shared across requests except the read-only secret,
//! enricher, and notifier, so concurrent deliveries are independent.

use std::{sync::Arc, time::Duration};

use {
    chrono::{DateTime, Utc},
    http::{HeaderMap, StatusCode},
    secrecy::{ExposeSecret, Secret},
    serde_json::json,
    streamhook_notify::ChatNotifier,
    tracing::{debug, info, warn},
};

use crate::{
    enrich::Enricher,
    message::{InboundWebhookMessage, MessageType, StreamOnlineEvent, SubscriptionType},
    payload::NotificationPayload,
    signature::{self, RejectReason},
};

/// Terminal state of one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Rejected(RejectReason),
    /// Respond with exactly this string.
    ChallengeEcho(String),
    NotifyDispatched(NotificationPayload),
    Revoked {
        subscription_type: String,
        status: Option<String>,
    },
    Ignored(String),
    /// Authentic but unusable (bad JSON, missing fields).
    Malformed(String),
}

impl Outcome {
    /// HTTP status to acknowledge with. Never 5xx: the platform retries
    /// those, and none of these outcomes would change on retry.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Rejected(_) => StatusCode::FORBIDDEN,
            Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::ChallengeEcho(_)
            | Self::NotifyDispatched(_)
            | Self::Revoked { .. }
            | Self::Ignored(_) => StatusCode::OK,
        }
    }

    /// Response body: the raw challenge for echoes, a small JSON ack otherwise.
    pub fn body(&self) -> String {
        match self {
            Self::ChallengeEcho(challenge) => challenge.clone(),
            Self::Rejected(_) => json!({ "status": "unauthorized" }).to_string(),
            Self::Malformed(_) => json!({ "status": "bad_request" }).to_string(),
            Self::NotifyDispatched(_) | Self::Revoked { .. } | Self::Ignored(_) => {
                json!({ "ok": true }).to_string()
            },
        }
    }

    /// Whether [`Outcome::body`] is plain text rather than JSON.
    pub fn is_plain_text(&self) -> bool {
        matches!(self, Self::ChallengeEcho(_))
    }
}

/// Settings for a [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Public channel root used to build the notification link.
    pub channel_base_url: String,
    /// Reject verified messages older than this, when set. Timestamps
    /// further than this in the future are rejected too.
    pub max_message_age: Option<Duration>,
    /// Upper bound on the chat post; the acknowledgement waits at most this long for it.
    pub notify_timeout: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            channel_base_url: "https://twitch.tv".into(),
            max_message_age: None,
            notify_timeout: Duration::from_secs(2),
        }
    }
}

/// Handles verified EventSub deliveries.
#[derive(Clone)]
pub struct Dispatcher {
    secret: Secret<String>,
    enricher: Option<Enricher>,
    notifier: Arc<dyn ChatNotifier>,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(
        secret: Secret<String>,
        enricher: Option<Enricher>,
        notifier: Arc<dyn ChatNotifier>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            secret,
            enricher,
            notifier,
            options,
        }
    }

    /// Run one delivery through the state machine.
    pub async fn dispatch(&self, headers: &HeaderMap, body: &[u8]) -> Outcome {
        let secret = self.secret.expose_secret().as_bytes();
        let verified = match signature::check_headers(headers, body, secret) {
            Ok(verified) => verified,
            Err(reason) => {
                warn!(?reason, "rejecting unverified delivery");
                return Outcome::Rejected(reason);
            },
        };
        let (id, timestamp) = (verified.message_id, verified.timestamp);
        if let Some(max_age) = self.options.max_message_age
            && !is_fresh(timestamp, max_age)
        {
            warn!(message_id = id, timestamp, "rejecting stale delivery");
            return Outcome::Rejected(RejectReason::Stale);
        }

        let msg = InboundWebhookMessage::from_parts(headers, body);
        let Some(message_type) = msg.message_type.clone() else {
            return Outcome::Malformed("missing message type".into());
        };
        let parsed = match msg.parse_body() {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(message_id = id, error = %e, "verified delivery has invalid JSON");
                return Outcome::Malformed(format!("invalid JSON body: {e}"));
            },
        };

        match message_type {
            MessageType::ChallengeVerification => match parsed.challenge {
                Some(challenge) => {
                    info!(
                        message_id = id,
                        subscription_type = ?parsed.subscription.as_ref().map(|s| &s.kind),
                        "answering subscription challenge"
                    );
                    Outcome::ChallengeEcho(challenge)
                },
                None => Outcome::Malformed("challenge message without challenge".into()),
            },
            MessageType::Notification => match parsed.subscription_type() {
                Some(SubscriptionType::StreamOnline) => {
                    let event = parsed
                        .event
                        .and_then(|v| serde_json::from_value::<StreamOnlineEvent>(v).ok())
                        .unwrap_or_default();
                    self.stream_online(id, event).await
                },
                Some(other) => {
                    debug!(message_id = id, subscription_type = %other, "ignoring notification");
                    Outcome::Ignored(format!("unhandled subscription type {other}"))
                },
                None => Outcome::Malformed("notification without subscription".into()),
            },
            MessageType::Revocation => {
                let (subscription_type, status) = parsed
                    .subscription
                    .map(|s| (s.kind, s.status))
                    .unwrap_or_default();
                warn!(
                    message_id = id,
                    subscription_type = %subscription_type,
                    status = ?status,
                    "subscription revoked by platform"
                );
                Outcome::Revoked {
                    subscription_type,
                    status,
                }
            },
            MessageType::Other(kind) => {
                debug!(message_id = id, message_type = %kind, "ignoring unknown message type");
                Outcome::Ignored(format!("unknown message type {kind}"))
            },
        }
    }

    async fn stream_online(&self, message_id: &str, event: StreamOnlineEvent) -> Outcome {
        let login = event
            .broadcaster_user_login
            .filter(|l| !l.is_empty())
            .or_else(|| event.broadcaster_user_name.as_ref().map(|n| n.to_lowercase()));
        let Some(login) = login else {
            warn!(message_id, "stream.online notification without broadcaster");
            return Outcome::Ignored("notification without broadcaster".into());
        };
        let display_name = event
            .broadcaster_user_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| login.clone());

        let mut payload =
            NotificationPayload::new(&self.options.channel_base_url, &display_name, &login);

        if let (Some(enricher), Some(channel_id)) = (&self.enricher, &event.broadcaster_user_id)
            && let Some(details) = enricher.fetch_stream_info(channel_id).await
        {
            payload.title = details.title;
            payload.category = details.category;
        }

        info!(message_id, channel = %login, "stream went live, notifying chat");
        let text = payload.render();
        match tokio::time::timeout(self.options.notify_timeout, self.notifier.send_text(&text))
            .await
        {
            Ok(Ok(())) => {},
            Ok(Err(e)) => {
                warn!(message_id, channel = %login, error = %e, "chat notification failed");
            },
            Err(_) => warn!(
                message_id,
                channel = %login,
                timeout = ?self.options.notify_timeout,
                "chat notification timed out"
            ),
        }

        Outcome::NotifyDispatched(payload)
    }
}

/// Whether `timestamp` lies within `max_age` of now, in either direction.
fn is_fresh(timestamp: &str, max_age: Duration) -> bool {
    let Ok(sent) = DateTime::parse_from_rfc3339(timestamp) else {
        return false;
    };
    let age = Utc::now().signed_duration_since(sent);
    chrono::Duration::from_std(max_age)
        .ok()
        .is_none_or(|window| age.abs() <= window)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            payload::UNTITLED_STREAM,
            signature::{MESSAGE_ID, MESSAGE_SIGNATURE, MESSAGE_TIMESTAMP, MESSAGE_TYPE},
            testing::{FakeHelix, RecordingNotifier, SlowNotifier},
        },
        http::HeaderValue,
        streamhook_helix::{Error, HelixStream},
    };

    const SECRET: &str = "supersecret";
    const TS: &str = "2024-01-01T00:00:00Z";
    const ONLINE: &str =
        r#"{"subscription":{"type":"stream.online"},"event":{"broadcaster_user_login":"alice"}}"#;

    fn signed(message_type: &str, id: &str, ts: &str, body: &str) -> HeaderMap {
        let sig = signature::compute_signature(SECRET.as_bytes(), id, ts, body.as_bytes());
        let mut headers = HeaderMap::new();
        headers.insert(MESSAGE_ID, HeaderValue::from_str(id).unwrap());
        headers.insert(MESSAGE_TIMESTAMP, HeaderValue::from_str(ts).unwrap());
        headers.insert(MESSAGE_SIGNATURE, HeaderValue::from_str(&sig).unwrap());
        headers.insert(MESSAGE_TYPE, HeaderValue::from_str(message_type).unwrap());
        headers
    }

    fn dispatcher(notifier: &RecordingNotifier, enricher: Option<Enricher>) -> Dispatcher {
        Dispatcher::new(
            Secret::new(SECRET.into()),
            enricher,
            Arc::new(notifier.clone()),
            DispatchOptions::default(),
        )
    }

    #[tokio::test]
    async fn stream_online_dispatches_once() {
        let notifier = RecordingNotifier::default();
        let headers = signed("notification", "abc", TS, ONLINE);

        let outcome = dispatcher(&notifier, None)
            .dispatch(&headers, ONLINE.as_bytes())
            .await;

        let Outcome::NotifyDispatched(payload) = &outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(payload.channel_url, "https://twitch.tv/alice");
        assert_eq!(payload.channel_name, "alice");
        assert_eq!(outcome.status(), StatusCode::OK);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("https://twitch.tv/alice"));
        assert!(sent[0].contains(UNTITLED_STREAM));
    }

    #[tokio::test]
    async fn challenge_echoes_raw_value_without_notifying() {
        let notifier = RecordingNotifier::default();
        for body in [
            r#"{"challenge":"xyz123"}"#,
            r#"{"challenge":"xyz123","subscription":{"type":"stream.online"}}"#,
            r#"{"challenge":"xyz123","subscription":{"type":"channel.follow"}}"#,
        ] {
            let headers = signed("webhook_callback_verification", "c1", TS, body);
            let outcome = dispatcher(&notifier, None)
                .dispatch(&headers, body.as_bytes())
                .await;
            assert_eq!(outcome, Outcome::ChallengeEcho("xyz123".into()));
        }
        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn outcome_bodies() {
        let echo = Outcome::ChallengeEcho("xyz123".into());
        assert_eq!(echo.body(), "xyz123");
        assert!(echo.is_plain_text());

        let rejected = Outcome::Rejected(RejectReason::Stale);
        assert_eq!(rejected.body(), r#"{"status":"unauthorized"}"#);
        assert!(!rejected.is_plain_text());

        assert_eq!(
            Outcome::Malformed("x".into()).body(),
            r#"{"status":"bad_request"}"#
        );
        assert_eq!(Outcome::Ignored("x".into()).body(), r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn other_subscription_type_is_ignored() {
        let notifier = RecordingNotifier::default();
        let body = r#"{"subscription":{"type":"channel.follow"},"event":{"user_login":"bob"}}"#;
        let headers = signed("notification", "n1", TS, body);

        let outcome = dispatcher(&notifier, None)
            .dispatch(&headers, body.as_bytes())
            .await;

        assert!(matches!(outcome, Outcome::Ignored(_)));
        assert_eq!(outcome.status(), StatusCode::OK);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn bad_signature_is_rejected_before_parsing() {
        let notifier = RecordingNotifier::default();
        let mut headers = signed("notification", "abc", TS, ONLINE);
        headers.insert(
            MESSAGE_SIGNATURE,
            HeaderValue::from_static(
                "sha256=0000000000000000000000000000000000000000000000000000000000000000",
            ),
        );

        let outcome = dispatcher(&notifier, None)
            .dispatch(&headers, ONLINE.as_bytes())
            .await;

        assert_eq!(outcome, Outcome::Rejected(RejectReason::InvalidSignature));
        assert_eq!(outcome.status(), StatusCode::FORBIDDEN);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn tampered_body_is_rejected() {
        let notifier = RecordingNotifier::default();
        let headers = signed("notification", "abc", TS, ONLINE);
        let tampered = ONLINE.replace("alice", "mallory");

        let outcome = dispatcher(&notifier, None)
            .dispatch(&headers, tampered.as_bytes())
            .await;
        assert_eq!(outcome, Outcome::Rejected(RejectReason::InvalidSignature));
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let notifier = RecordingNotifier::default();
        for name in [MESSAGE_ID, MESSAGE_TIMESTAMP, MESSAGE_SIGNATURE] {
            let mut headers = signed("notification", "abc", TS, ONLINE);
            headers.remove(name);
            let outcome = dispatcher(&notifier, None)
                .dispatch(&headers, ONLINE.as_bytes())
                .await;
            assert_eq!(outcome, Outcome::Rejected(RejectReason::MissingHeader));
        }
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn verified_but_unusable_is_malformed() {
        let notifier = RecordingNotifier::default();

        let mut headers = signed("notification", "abc", TS, ONLINE);
        headers.remove(MESSAGE_TYPE);
        let outcome = dispatcher(&notifier, None)
            .dispatch(&headers, ONLINE.as_bytes())
            .await;
        assert!(matches!(outcome, Outcome::Malformed(_)));
        assert_eq!(outcome.status(), StatusCode::BAD_REQUEST);

        let headers = signed("notification", "abc", TS, "not json");
        let outcome = dispatcher(&notifier, None)
            .dispatch(&headers, b"not json")
            .await;
        assert!(matches!(outcome, Outcome::Malformed(_)));

        let headers = signed("webhook_callback_verification", "abc", TS, "{}");
        let outcome = dispatcher(&notifier, None).dispatch(&headers, b"{}").await;
        assert!(matches!(outcome, Outcome::Malformed(_)));

        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn revocation_is_acknowledged_without_notifying() {
        let notifier = RecordingNotifier::default();
        let body = r#"{"subscription":{"type":"stream.online","status":"user_removed"}}"#;
        let headers = signed("revocation", "r1", TS, body);

        let outcome = dispatcher(&notifier, None)
            .dispatch(&headers, body.as_bytes())
            .await;
        assert_eq!(outcome, Outcome::Revoked {
            subscription_type: "stream.online".into(),
            status: Some("user_removed".into()),
        });
        assert_eq!(outcome.status(), StatusCode::OK);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn notifier_failure_still_acknowledges() {
        let notifier = RecordingNotifier::failing();
        let headers = signed("notification", "abc", TS, ONLINE);

        let outcome = dispatcher(&notifier, None)
            .dispatch(&headers, ONLINE.as_bytes())
            .await;
        assert!(matches!(outcome, Outcome::NotifyDispatched(_)));
        assert_eq!(outcome.status(), StatusCode::OK);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn enrichment_fills_title_and_category() {
        let body = r#"{"subscription":{"type":"stream.online"},"event":{"broadcaster_user_id":"42","broadcaster_user_login":"alice","broadcaster_user_name":"Alice"}}"#;
        let fake = FakeHelix::default()
            .with_stream("42", HelixStream {
                title: "any% attempts".into(),
                game_id: "7".into(),
                game_name: String::new(),
            })
            .with_game("7", "Celeste");
        let notifier = RecordingNotifier::default();
        let enricher = Enricher::new(Arc::new(fake), Duration::from_secs(1));
        let headers = signed("notification", "abc", TS, body);

        let outcome = dispatcher(&notifier, Some(enricher))
            .dispatch(&headers, body.as_bytes())
            .await;

        let Outcome::NotifyDispatched(payload) = outcome else {
            panic!("expected dispatch");
        };
        assert_eq!(payload.channel_name, "Alice");
        assert_eq!(payload.title.as_deref(), Some("any% attempts"));
        assert_eq!(payload.category.as_deref(), Some("Celeste"));
        assert_eq!(notifier.sent(), vec![
            "Alice is live! https://twitch.tv/alice\nany% attempts\nPlaying Celeste".to_string()
        ]);
    }

    #[tokio::test]
    async fn enrichment_failure_falls_back_to_placeholder() {
        let body = r#"{"subscription":{"type":"stream.online"},"event":{"broadcaster_user_id":"42","broadcaster_user_login":"alice","broadcaster_user_name":"Alice"}}"#;
        let fake = FakeHelix::default().failing_streams(|| Error::Status {
            status: 500,
            body: "oops".into(),
        });
        let notifier = RecordingNotifier::default();
        let enricher = Enricher::new(Arc::new(fake), Duration::from_secs(1));
        let headers = signed("notification", "abc", TS, body);

        let outcome = dispatcher(&notifier, Some(enricher))
            .dispatch(&headers, body.as_bytes())
            .await;

        assert!(matches!(outcome, Outcome::NotifyDispatched(ref p) if p.title.is_none()));
        assert_eq!(notifier.sent(), vec![format!(
            "Alice is live! https://twitch.tv/alice\n{UNTITLED_STREAM}"
        )]);
    }

    #[tokio::test]
    async fn enrichment_timeout_still_notifies() {
        let body = r#"{"subscription":{"type":"stream.online"},"event":{"broadcaster_user_id":"42","broadcaster_user_login":"alice"}}"#;
        let fake = FakeHelix::default()
            .with_stream("42", HelixStream::default())
            .with_delay(Duration::from_secs(5));
        let notifier = RecordingNotifier::default();
        let enricher = Enricher::new(Arc::new(fake), Duration::from_millis(20));
        let headers = signed("notification", "abc", TS, body);

        let outcome = dispatcher(&notifier, Some(enricher))
            .dispatch(&headers, body.as_bytes())
            .await;
        assert!(matches!(outcome, Outcome::NotifyDispatched(_)));
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn login_falls_back_to_lowercased_name() {
        let body = r#"{"subscription":{"type":"stream.online"},"event":{"broadcaster_user_name":"Alice"}}"#;
        let notifier = RecordingNotifier::default();
        let headers = signed("notification", "abc", TS, body);
        let outcome = dispatcher(&notifier, None)
            .dispatch(&headers, body.as_bytes())
            .await;
        assert!(matches!(
            outcome,
            Outcome::NotifyDispatched(ref p) if p.channel_url == "https://twitch.tv/alice"
        ));
    }

    #[tokio::test]
    async fn replay_window_rejects_old_messages() {
        let notifier = RecordingNotifier::default();
        let dispatcher = Dispatcher::new(
            Secret::new(SECRET.into()),
            None,
            Arc::new(notifier.clone()),
            DispatchOptions {
                max_message_age: Some(Duration::from_secs(600)),
                ..DispatchOptions::default()
            },
        );

        let old = signed("notification", "abc", TS, ONLINE);
        assert_eq!(
            dispatcher.dispatch(&old, ONLINE.as_bytes()).await,
            Outcome::Rejected(RejectReason::Stale)
        );

        let now = Utc::now().to_rfc3339();
        let fresh = signed("notification", "abc", &now, ONLINE);
        assert!(matches!(
            dispatcher.dispatch(&fresh, ONLINE.as_bytes()).await,
            Outcome::NotifyDispatched(_)
        ));
        assert_eq!(notifier.sent().len(), 1);
    }

    #[test]
    fn freshness_parsing() {
        let window = Duration::from_secs(600);
        assert!(!is_fresh("yesterday", window));
        assert!(!is_fresh(TS, window));
        assert!(is_fresh(&Utc::now().to_rfc3339(), window));
        // Slightly in the future (clock skew) is accepted, far ahead is not.
        let ahead = (Utc::now() + chrono::Duration::seconds(30)).to_rfc3339();
        assert!(is_fresh(&ahead, window));
        let far_ahead = (Utc::now() + chrono::Duration::days(365)).to_rfc3339();
        assert!(!is_fresh(&far_ahead, window));
    }

    #[tokio::test]
    async fn replay_window_rejects_future_dated_messages() {
        let notifier = RecordingNotifier::default();
        let dispatcher = Dispatcher::new(
            Secret::new(SECRET.into()),
            None,
            Arc::new(notifier.clone()),
            DispatchOptions {
                max_message_age: Some(Duration::from_secs(600)),
                ..DispatchOptions::default()
            },
        );

        let future = (Utc::now() + chrono::Duration::hours(2)).to_rfc3339();
        let headers = signed("notification", "abc", &future, ONLINE);
        assert_eq!(
            dispatcher.dispatch(&headers, ONLINE.as_bytes()).await,
            Outcome::Rejected(RejectReason::Stale)
        );
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn slow_chat_post_does_not_hold_acknowledgement() {
        let notifier = SlowNotifier::new(Duration::from_secs(3));
        let dispatcher = Dispatcher::new(
            Secret::new(SECRET.into()),
            None,
            Arc::new(notifier.clone()),
            DispatchOptions {
                notify_timeout: Duration::from_millis(100),
                ..DispatchOptions::default()
            },
        );
        let headers = signed("notification", "abc", TS, ONLINE);

        let started = std::time::Instant::now();
        let outcome = dispatcher.dispatch(&headers, ONLINE.as_bytes()).await;
        let elapsed = started.elapsed();

        assert!(matches!(outcome, Outcome::NotifyDispatched(_)));
        assert_eq!(outcome.status(), StatusCode::OK);
        assert!(elapsed < Duration::from_secs(1), "acknowledged after {elapsed:?}");
        assert_eq!(notifier.started(), 1);
    }
}
