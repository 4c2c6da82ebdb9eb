use std::fmt;
use std::sync::Arc;

use super::error::AuthError;
use crate::BoxFuture;

/// Something that can hand out a short-lived bearer credential.
pub trait TokenSource: Send + Sync + 'static {
    fn id_token(&self) -> BoxFuture<'_, Result<String, AuthError>>;
}

/// A pre-issued token that never refreshes.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenSource for StaticToken {
    fn id_token(&self) -> BoxFuture<'_, Result<String, AuthError>> {
        Box::pin(async move { Ok(self.0.clone()) })
    }
}

/// The signed-in user.
///
/// Created by an [`AuthProvider`](super::AuthProvider) on sign-in and owned by
/// the [`SessionGate`](super::SessionGate). Clones share the token source, so
/// the conversation can hold its own handle without owning the session.
#[derive(Clone)]
pub struct Identity {
    pub uid: String,
    pub display_name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    tokens: Arc<dyn TokenSource>,
}

impl Identity {
    pub fn new(
        uid: impl Into<String>,
        display_name: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            uid: uid.into(),
            display_name: display_name.into(),
            email: None,
            avatar_url: None,
            tokens,
        }
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    pub fn with_avatar(mut self, avatar_url: Option<String>) -> Self {
        self.avatar_url = avatar_url;
        self
    }

    /// Obtain a bearer credential for the answer service.
    pub async fn id_token(&self) -> Result<String, AuthError> {
        self.tokens.id_token().await
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("uid", &self.uid)
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .field("avatar_url", &self.avatar_url)
            .finish_non_exhaustive()
    }
}
