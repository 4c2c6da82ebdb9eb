use std::sync::Arc;

use super::error::AuthError;
use super::identity::{Identity, StaticToken};
use super::session_gate::{AuthProvider, SignInRequest};
use crate::BoxFuture;

/// Signs in with a bearer token issued out of band, e.g. for a local backend.
pub struct StaticTokenAuth {
    token: String,
    display_name: String,
    email: Option<String>,
}

impl StaticTokenAuth {
    pub fn new(token: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            display_name: display_name.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }
}

impl AuthProvider for StaticTokenAuth {
    fn sign_in(&self, _request: SignInRequest) -> BoxFuture<'_, Result<Identity, AuthError>> {
        Box::pin(async move {
            if self.token.trim().is_empty() {
                return Err(AuthError::Misconfigured(
                    "no bearer token was provided".to_string(),
                ));
            }
            let uid = self
                .email
                .clone()
                .unwrap_or_else(|| "local-user".to_string());
            Ok(
                Identity::new(uid, &self.display_name, Arc::new(StaticToken::new(&self.token)))
                    .with_email(self.email.clone()),
            )
        })
    }

    fn requires_credentials(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signs_in_with_configured_token() {
        let auth = StaticTokenAuth::new("dev-token", "Dev User")
            .with_email(Some("dev@example.com".to_string()));

        let identity = auth.sign_in(SignInRequest::default()).await.unwrap();
        assert_eq!(identity.display_name, "Dev User");
        assert_eq!(identity.uid, "dev@example.com");
        assert_eq!(identity.id_token().await.unwrap(), "dev-token");
        assert!(!auth.requires_credentials());
    }

    #[tokio::test]
    async fn test_blank_token_is_misconfigured() {
        let auth = StaticTokenAuth::new("  ", "Nobody");
        let err = auth.sign_in(SignInRequest::default()).await.unwrap_err();
        assert!(matches!(err, AuthError::Misconfigured(_)));
    }
}
