use shared::error::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("server url must be http or https, got {0}")]
    UnsupportedScheme(String),
    #[error("server url {0} cannot be used as a base")]
    CannotBeBase(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server rejected request ({status}): {}", error.message)]
    Api { status: u16, error: ApiError },
}
