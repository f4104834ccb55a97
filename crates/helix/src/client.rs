use {
    async_trait::async_trait,
    reqwest::StatusCode,
    secrecy::ExposeSecret,
    serde::de::DeserializeOwned,
    tracing::debug,
};

use crate::{
    Error, Result,
    api::HelixApi,
    auth::AppToken,
    types::{
        CreatedSubscription, DataEnvelope, HelixGame, HelixStream, HelixUser, SubscriptionCreated,
        SubscriptionRequest,
    },
};

/// Base URLs for the Helix API and the OAuth token endpoint.
#[derive(Debug, Clone)]
pub struct HelixEndpoints {
    /// e.g. `https://api.twitch.tv/helix`
    pub api_base: String,
    /// e.g. `https://id.twitch.tv`
    pub auth_base: String,
}

impl Default for HelixEndpoints {
    fn default() -> Self {
        Self {
            api_base: "https://api.twitch.tv/helix".into(),
            auth_base: "https://id.twitch.tv".into(),
        }
    }
}

/// Authenticated Helix client.
///
/// Immutable after construction: the token and client ID are shared by every
/// call for the life of the process.
#[derive(Debug, Clone)]
pub struct HelixClient {
    http: reqwest::Client,
    endpoints: HelixEndpoints,
    client_id: String,
    token: AppToken,
}

impl HelixClient {
    pub fn new(
        http: reqwest::Client,
        endpoints: HelixEndpoints,
        client_id: impl Into<String>,
        token: AppToken,
    ) -> Self {
        Self {
            http,
            endpoints,
            client_id: client_id.into(),
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.endpoints.api_base.trim_end_matches('/'))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header("Client-Id", &self.client_id)
            .bearer_auth(self.token.access_token.expose_secret())
    }

    async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let resp = self
            .request(reqwest::Method::GET, path)
            .query(query)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Status { status, body });
        }
        let envelope: DataEnvelope<T> = resp.json().await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl HelixApi for HelixClient {
    async fn resolve_channel(&self, login: &str) -> Result<HelixUser> {
        let users: Vec<HelixUser> = self.get_data("users", &[("login", login)]).await?;
        users.into_iter().next().ok_or_else(|| Error::NotFound {
            login: login.to_string(),
        })
    }

    async fn create_subscription(
        &self,
        request: &SubscriptionRequest,
    ) -> Result<SubscriptionCreated> {
        let resp = self
            .request(reqwest::Method::POST, "eventsub/subscriptions")
            .json(request)
            .send()
            .await?;

        match resp.status() {
            StatusCode::CONFLICT => Ok(SubscriptionCreated::AlreadyExists),
            status if status.is_success() => {
                let id = resp
                    .json::<DataEnvelope<CreatedSubscription>>()
                    .await
                    .ok()
                    .and_then(|env| env.data.into_iter().next())
                    .map(|sub| sub.id);
                debug!(
                    broadcaster = %request.condition.broadcaster_user_id,
                    id = ?id,
                    "subscription accepted"
                );
                Ok(SubscriptionCreated::Created { id })
            },
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(Error::Subscription {
                    status: status.as_u16(),
                    body,
                })
            },
        }
    }

    async fn stream_info(&self, user_id: &str) -> Result<Option<HelixStream>> {
        let streams: Vec<HelixStream> = self.get_data("streams", &[("user_id", user_id)]).await?;
        Ok(streams.into_iter().next())
    }

    async fn game_name(&self, game_id: &str) -> Result<Option<String>> {
        let games: Vec<HelixGame> = self.get_data("games", &[("id", game_id)]).await?;
        Ok(games.into_iter().next().map(|g| g.name))
    }
}
