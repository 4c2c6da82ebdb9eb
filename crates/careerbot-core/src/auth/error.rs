use thiserror::Error;

/// Failures of the sign-in flow and of obtaining a bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Sign-in was cancelled")]
    Cancelled,

    #[error("Network error during sign-in: {0}")]
    Network(String),

    #[error("Sign-in rejected by provider: {0}")]
    Rejected(String),

    #[error("Authentication is not configured: {0}")]
    Misconfigured(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
