use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("chat webhook rejected message ({status}): {body}")]
    Delivery { status: u16, body: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
