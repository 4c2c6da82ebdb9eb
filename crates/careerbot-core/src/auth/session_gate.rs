use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use super::error::AuthError;
use super::identity::Identity;
use crate::BoxFuture;

/// Credentials collected by the sign-in screen. Providers that do not need
/// them (a pre-issued token) ignore the fields.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

impl SignInRequest {
    pub fn password(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for SignInRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// The external identity collaborator.
pub trait AuthProvider: Send + Sync + 'static {
    fn sign_in(&self, request: SignInRequest) -> BoxFuture<'_, Result<Identity, AuthError>>;

    /// Drop any provider-side session state.
    fn sign_out(&self) {}

    /// Whether the sign-in screen has to ask for email and password.
    fn requires_credentials(&self) -> bool;
}

/// Holds the current identity and gates the chat surface on it.
pub struct SessionGate {
    provider: Arc<dyn AuthProvider>,
    state: watch::Sender<Option<Identity>>,
}

impl SessionGate {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        let (state, _) = watch::channel(None);
        Self { provider, state }
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.state.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub fn requires_credentials(&self) -> bool {
        self.provider.requires_credentials()
    }

    /// Auth-state-changed notifications. The receiver sees the current value
    /// immediately and every sign-in/sign-out afterwards.
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.state.subscribe()
    }

    /// Run the provider's sign-in flow. On failure the gate stays signed out.
    pub async fn sign_in(&self, request: SignInRequest) -> Result<Identity, AuthError> {
        match self.provider.sign_in(request).await {
            Ok(identity) => {
                info!(uid = %identity.uid, name = %identity.display_name, "Signed in");
                self.state.send_replace(Some(identity.clone()));
                Ok(identity)
            }
            Err(err) => {
                warn!(error = %err, "Sign in failed");
                Err(err)
            }
        }
    }

    pub fn sign_out(&self) {
        self.provider.sign_out();
        if self.state.send_replace(None).is_some() {
            info!("Signed out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::StaticToken;

    struct ScriptedProvider {
        outcome: Result<(), AuthError>,
    }

    impl AuthProvider for ScriptedProvider {
        fn sign_in(&self, request: SignInRequest) -> BoxFuture<'_, Result<Identity, AuthError>> {
            let outcome = self.outcome.clone();
            Box::pin(async move {
                outcome.map(|()| {
                    Identity::new("uid-1", "Grace", Arc::new(StaticToken::new("t")))
                        .with_email(Some(request.email))
                })
            })
        }

        fn requires_credentials(&self) -> bool {
            true
        }
    }

    fn gate(outcome: Result<(), AuthError>) -> SessionGate {
        SessionGate::new(Arc::new(ScriptedProvider { outcome }))
    }

    #[tokio::test]
    async fn test_starts_signed_out() {
        let gate = gate(Ok(()));
        assert!(gate.current_identity().is_none());
        assert!(!gate.is_signed_in());
    }

    #[tokio::test]
    async fn test_sign_in_populates_identity_and_notifies() {
        let gate = gate(Ok(()));
        let mut rx = gate.subscribe();

        let identity = gate
            .sign_in(SignInRequest::password("grace@example.com", "pw"))
            .await
            .unwrap();

        assert_eq!(identity.display_name, "Grace");
        assert!(gate.is_signed_in());
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            rx.borrow_and_update().as_ref().map(|i| i.uid.clone()),
            Some("uid-1".to_string())
        );
    }

    #[tokio::test]
    async fn test_failed_sign_in_stays_signed_out() {
        let gate = gate(Err(AuthError::Rejected("INVALID_PASSWORD".into())));

        let err = gate.sign_in(SignInRequest::default()).await.unwrap_err();

        assert_eq!(err, AuthError::Rejected("INVALID_PASSWORD".into()));
        assert!(gate.current_identity().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_clears_identity() {
        let gate = gate(Ok(()));
        gate.sign_in(SignInRequest::default()).await.unwrap();

        gate.sign_out();
        assert!(gate.current_identity().is_none());

        // Signing out twice is harmless
        gate.sign_out();
        assert!(!gate.is_signed_in());
    }

    #[test]
    fn test_request_debug_omits_password() {
        let rendered = format!("{:?}", SignInRequest::password("a@b.c", "hunter2"));
        assert!(rendered.contains("a@b.c"));
        assert!(!rendered.contains("hunter2"));
    }
}
