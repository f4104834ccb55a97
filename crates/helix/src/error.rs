use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The client-credentials exchange failed; nothing downstream can run.
    #[error("token exchange failed: {message}")]
    Auth { message: String },

    #[error("no Twitch channel named '{login}'")]
    NotFound { login: String },

    #[error("subscription rejected ({status}): {body}")]
    Subscription { status: u16, body: String },

    #[error("Helix request failed ({status}): {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl Error {
    #[must_use]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Whether the failure was the outbound timeout firing.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
