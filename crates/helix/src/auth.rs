use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::{debug, info},
};

use crate::{Error, Result, client::HelixEndpoints};

/// App access token from the client-credentials grant.
///
/// Held for the life of the process; expiry is recorded but not acted on.
#[derive(Clone)]
pub struct AppToken {
    pub access_token: Secret<String>,
    pub expires_in: Option<u64>,
}

impl std::fmt::Debug for AppToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

/// Exchange the application credentials for an app access token.
///
/// Every failure mode (transport, timeout, non-2xx, malformed body) maps to
/// [`Error::Auth`].
pub async fn acquire_token(
    http: &reqwest::Client,
    endpoints: &HelixEndpoints,
    client_id: &str,
    client_secret: &Secret<String>,
) -> Result<AppToken> {
    let url = format!("{}/oauth2/token", endpoints.auth_base.trim_end_matches('/'));
    let form = [
        ("client_id", client_id),
        ("client_secret", client_secret.expose_secret().as_str()),
        ("grant_type", "client_credentials"),
    ];

    debug!(%url, "requesting app access token");
    let resp = http
        .post(&url)
        .form(&form)
        .send()
        .await
        .map_err(|e| Error::auth(format!("token endpoint unreachable: {e}")))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::auth(format!("token request failed ({status}): {body}")));
    }

    let body: TokenResponse = resp
        .json()
        .await
        .map_err(|e| Error::auth(format!("invalid token response: {e}")))?;
    let access_token = body
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::auth("token response has no access_token"))?;

    info!(expires_in = ?body.expires_in, "acquired app access token");
    Ok(AppToken {
        access_token: Secret::new(access_token),
        expires_in: body.expires_in,
    })
}
