use thiserror::Error;

use crate::auth::AuthError;

/// Failures talking to the answer service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized: the service rejected the bearer token")]
    Unauthorized,

    #[error("Service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Could not obtain a bearer token: {0}")]
    Token(#[from] AuthError),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
