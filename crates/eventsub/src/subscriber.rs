//! Registers `stream.online` webhook subscriptions for configured channels.

use {
    futures::{StreamExt, stream},
    secrecy::{ExposeSecret, Secret},
    streamhook_helix::{HelixApi, SubscriptionCreated, SubscriptionRequest},
    tracing::debug,
};

use crate::message::SubscriptionType;

/// A channel the platform will deliver `stream.online` events for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSubscription {
    pub channel_id: String,
    pub display_name: String,
    pub event_type: SubscriptionType,
    pub callback_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Created(ChannelSubscription),
    /// The platform already had an identical subscription.
    AlreadySubscribed(ChannelSubscription),
    Failed(String),
}

impl SubscriptionStatus {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Per-channel result of [`subscribe_all`], in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionReport {
    pub login: String,
    pub status: SubscriptionStatus,
}

/// Subscribe every channel, at most `concurrency` at a time.
///
/// Logins are trimmed, lowercased and deduplicated first. One channel
/// failing never affects the others; logging the outcome is left to the
/// caller.
pub async fn subscribe_all(
    api: &dyn HelixApi,
    logins: &[String],
    callback_url: &str,
    secret: &Secret<String>,
    concurrency: usize,
) -> Vec<SubscriptionReport> {
    let logins = normalize_logins(logins);

    stream::iter(logins)
        .map(|login| async move {
            let status = subscribe_one(api, &login, callback_url, secret).await;
            SubscriptionReport { login, status }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}

async fn subscribe_one(
    api: &dyn HelixApi,
    login: &str,
    callback_url: &str,
    secret: &Secret<String>,
) -> SubscriptionStatus {
    let user = match api.resolve_channel(login).await {
        Ok(user) => user,
        Err(e) => return SubscriptionStatus::Failed(e.to_string()),
    };

    let request =
        SubscriptionRequest::stream_online(&user.id, callback_url, secret.expose_secret());
    let subscription = ChannelSubscription {
        channel_id: user.id,
        display_name: user.display_name,
        event_type: SubscriptionType::StreamOnline,
        callback_url: callback_url.to_string(),
    };

    match api.create_subscription(&request).await {
        Ok(SubscriptionCreated::Created { id }) => {
            debug!(channel = login, subscription_id = ?id, "subscription accepted");
            SubscriptionStatus::Created(subscription)
        },
        Ok(SubscriptionCreated::AlreadyExists) => {
            SubscriptionStatus::AlreadySubscribed(subscription)
        },
        Err(e) => SubscriptionStatus::Failed(e.to_string()),
    }
}

fn normalize_logins(logins: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(logins.len());
    for login in logins {
        let login = login.trim().to_lowercase();
        if !login.is_empty() && !seen.contains(&login) {
            seen.push(login);
        }
    }
    seen
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testing::FakeHelix,
        std::time::Duration,
        streamhook_helix::Error,
    };

    const CALLBACK: &str = "https://relay.example/callback";

    fn secret() -> Secret<String> {
        Secret::new("supersecret".into())
    }

    fn logins(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn unresolvable_channel_does_not_stop_batch() {
        let fake = FakeHelix::default()
            .with_user("1", "alice", "Alice")
            .with_user("3", "carol", "Carol");

        let reports = subscribe_all(
            &fake,
            &logins(&["alice", "nosuchuser", "carol"]),
            CALLBACK,
            &secret(),
            2,
        )
        .await;

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].login, "alice");
        assert_eq!(
            reports[0].status,
            SubscriptionStatus::Created(ChannelSubscription {
                channel_id: "1".into(),
                display_name: "Alice".into(),
                event_type: SubscriptionType::StreamOnline,
                callback_url: CALLBACK.into(),
            })
        );
        assert_eq!(reports[1].login, "nosuchuser");
        assert!(matches!(&reports[1].status, SubscriptionStatus::Failed(msg) if msg.contains("nosuchuser")));
        assert!(reports[2].status.is_success());

        let sent = fake.subscriptions();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|r| r.transport.callback == CALLBACK));
        assert!(sent.iter().all(|r| r.transport.secret == "supersecret"));
        assert!(sent.iter().all(|r| r.kind == "stream.online"));
    }

    #[tokio::test]
    async fn conflict_counts_as_subscribed() {
        let fake = FakeHelix::default()
            .with_user("1", "alice", "Alice")
            .already_subscribed("1");
        let reports = subscribe_all(&fake, &logins(&["alice"]), CALLBACK, &secret(), 4).await;
        assert!(matches!(
            reports[0].status,
            SubscriptionStatus::AlreadySubscribed(ref s) if s.channel_id == "1"
        ));
        assert!(reports[0].status.is_success());
    }

    #[tokio::test]
    async fn rejected_subscription_is_reported() {
        let fake = FakeHelix::default()
            .with_user("1", "alice", "Alice")
            .with_user("2", "bob", "Bob")
            .failing_subscription("1", || Error::Subscription {
                status: 400,
                body: "invalid callback".into(),
            });
        let reports = subscribe_all(&fake, &logins(&["alice", "bob"]), CALLBACK, &secret(), 4).await;
        assert!(matches!(&reports[0].status, SubscriptionStatus::Failed(msg) if msg.contains("400")));
        assert!(reports[1].status.is_success());
    }

    #[tokio::test]
    async fn logins_are_normalized_and_deduplicated() {
        let fake = FakeHelix::default().with_user("1", "alice", "Alice");
        let reports = subscribe_all(
            &fake,
            &logins(&[" Alice ", "alice", "", "ALICE"]),
            CALLBACK,
            &secret(),
            4,
        )
        .await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].login, "alice");
        assert_eq!(fake.subscriptions().len(), 1);
    }

    #[tokio::test]
    async fn empty_list_makes_no_calls() {
        let fake = FakeHelix::default();
        let reports = subscribe_all(&fake, &[], CALLBACK, &secret(), 4).await;
        assert!(reports.is_empty());
        assert!(fake.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn zero_concurrency_still_progresses() {
        let fake = FakeHelix::default()
            .with_user("1", "alice", "Alice")
            .with_delay(Duration::from_millis(1));
        let reports = subscribe_all(&fake, &logins(&["alice"]), CALLBACK, &secret(), 0).await;
        assert!(reports[0].status.is_success());
    }
}
