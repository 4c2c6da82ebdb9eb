use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::error::AuthError;
use super::identity::{Identity, TokenSource};
use super::session_gate::{AuthProvider, SignInRequest};
use crate::BoxFuture;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";
const TOKEN_REFRESH_THRESHOLD_SECS: u64 = 5 * 60; // 5 minutes
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;
const AUTH_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordSignInBody<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordSignInResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupBody<'a> {
    id_token: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
}

#[derive(Serialize)]
struct RefreshBody<'a> {
    grant_type: &'a str,
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorEnvelope {
    error: FirebaseErrorBody,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorBody {
    message: String,
}

fn lifetime(expires_in: Option<&str>) -> Duration {
    let secs = expires_in
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
    Duration::from_secs(secs)
}

/// Map a non-success response from the identity endpoints onto an `AuthError`.
async fn rejection(response: reqwest::Response) -> AuthError {
    let status = response.status();
    if status.is_server_error() {
        return AuthError::Network(format!("identity service returned HTTP {}", status.as_u16()));
    }
    match response.json::<FirebaseErrorEnvelope>().await {
        Ok(envelope) => AuthError::Rejected(envelope.error.message),
        Err(_) => AuthError::Rejected(format!("HTTP {}", status.as_u16())),
    }
}

/// Email/password sign-in against the Firebase Identity Toolkit REST API.
pub struct FirebasePasswordAuth {
    http: reqwest::Client,
    api_key: String,
    identity_toolkit_url: String,
    secure_token_url: String,
}

impl FirebasePasswordAuth {
    pub fn new(api_key: impl Into<String>) -> Result<Self, AuthError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AuthError::Misconfigured(
                "Firebase API key is empty".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(AUTH_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            api_key,
            identity_toolkit_url: IDENTITY_TOOLKIT_URL.to_string(),
            secure_token_url: SECURE_TOKEN_URL.to_string(),
        })
    }

    /// Point the provider at different endpoints (emulator or test server).
    pub fn with_endpoints(
        mut self,
        identity_toolkit_url: impl Into<String>,
        secure_token_url: impl Into<String>,
    ) -> Self {
        self.identity_toolkit_url = identity_toolkit_url.into();
        self.secure_token_url = secure_token_url.into();
        self
    }

    async fn password_sign_in(
        &self,
        request: &SignInRequest,
    ) -> Result<PasswordSignInResponse, AuthError> {
        let url = format!("{}/accounts:signInWithPassword", self.identity_toolkit_url);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&PasswordSignInBody {
                email: request.email.trim(),
                password: &request.password,
                return_secure_token: true,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        response
            .json::<PasswordSignInResponse>()
            .await
            .map_err(|e| AuthError::Network(format!("malformed sign-in response: {e}")))
    }

    /// Best-effort profile lookup for the display name and avatar.
    async fn lookup_profile(&self, id_token: &str) -> Option<AccountInfo> {
        let url = format!("{}/accounts:lookup", self.identity_toolkit_url);
        let result = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&LookupBody { id_token })
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => response
                .json::<LookupResponse>()
                .await
                .ok()
                .and_then(|lookup| lookup.users.into_iter().next()),
            Ok(response) => {
                debug!(status = response.status().as_u16(), "Profile lookup failed");
                None
            }
            Err(err) => {
                debug!(error = %err, "Profile lookup failed");
                None
            }
        }
    }
}

impl AuthProvider for FirebasePasswordAuth {
    fn sign_in(&self, request: SignInRequest) -> BoxFuture<'_, Result<Identity, AuthError>> {
        Box::pin(async move {
            if request.email.trim().is_empty() || request.password.is_empty() {
                return Err(AuthError::Rejected(
                    "email and password are required".to_string(),
                ));
            }

            let signed_in = self.password_sign_in(&request).await?;
            let profile = self.lookup_profile(&signed_in.id_token).await;

            let email = signed_in.email.clone().or(Some(request.email.trim().to_string()));
            let display_name = profile
                .as_ref()
                .and_then(|p| p.display_name.clone())
                .or_else(|| signed_in.display_name.clone().filter(|n| !n.is_empty()))
                .or_else(|| email.clone())
                .unwrap_or_else(|| signed_in.local_id.clone());
            let avatar_url = profile.and_then(|p| p.photo_url);

            let tokens = FirebaseTokenSource {
                http: self.http.clone(),
                api_key: self.api_key.clone(),
                secure_token_url: self.secure_token_url.clone(),
                cached: RwLock::new(CachedToken {
                    id_token: signed_in.id_token,
                    refresh_token: signed_in.refresh_token,
                    expires_at: SystemTime::now() + lifetime(signed_in.expires_in.as_deref()),
                }),
            };

            Ok(Identity::new(signed_in.local_id, display_name, Arc::new(tokens))
                .with_email(email)
                .with_avatar(avatar_url))
        })
    }

    fn requires_credentials(&self) -> bool {
        true
    }
}

struct CachedToken {
    id_token: String,
    refresh_token: String,
    expires_at: SystemTime,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at
            .duration_since(SystemTime::now())
            .map(|ttl| ttl > Duration::from_secs(TOKEN_REFRESH_THRESHOLD_SECS))
            .unwrap_or(false)
    }
}

/// Caches the Firebase ID token and refreshes it through the Secure Token API
/// once it is within five minutes of expiry.
struct FirebaseTokenSource {
    http: reqwest::Client,
    api_key: String,
    secure_token_url: String,
    cached: RwLock<CachedToken>,
}

impl FirebaseTokenSource {
    async fn refresh(&self) -> Result<String, AuthError> {
        let mut cached = self.cached.write().await;
        // Another caller may have refreshed while we waited for the lock
        if cached.is_fresh() {
            return Ok(cached.id_token.clone());
        }

        info!("Refreshing Firebase ID token");
        let url = format!("{}/token", self.secure_token_url);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&RefreshBody {
                grant_type: "refresh_token",
                refresh_token: &cached.refresh_token,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let refreshed = response
            .json::<RefreshResponse>()
            .await
            .map_err(|e| AuthError::Network(format!("malformed token response: {e}")))?;

        cached.expires_at = SystemTime::now() + lifetime(refreshed.expires_in.as_deref());
        cached.id_token = refreshed.id_token;
        cached.refresh_token = refreshed.refresh_token;

        Ok(cached.id_token.clone())
    }
}

impl TokenSource for FirebaseTokenSource {
    fn id_token(&self) -> BoxFuture<'_, Result<String, AuthError>> {
        Box::pin(async move {
            {
                let cached = self.cached.read().await;
                if cached.is_fresh() {
                    return Ok(cached.id_token.clone());
                }
            }
            self.refresh().await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> FirebasePasswordAuth {
        FirebasePasswordAuth::new("test-key")
            .unwrap()
            .with_endpoints(format!("{}/v1", server.uri()), format!("{}/v1", server.uri()))
    }

    async fn mount_sign_in(server: &MockServer, expires_in: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "email": "ada@example.com",
                "returnSecureToken": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "idToken": "id-1",
                "refreshToken": "refresh-1",
                "expiresIn": expires_in,
                "localId": "uid-ada",
                "email": "ada@example.com"
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_sign_in_builds_identity_with_profile() {
        let server = MockServer::start().await;
        mount_sign_in(&server, "3600").await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:lookup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "users": [{ "displayName": "Ada Lovelace", "photoUrl": "https://img/ada.png" }]
            })))
            .mount(&server)
            .await;

        let identity = provider(&server)
            .sign_in(SignInRequest::password("ada@example.com", "pw"))
            .await
            .unwrap();

        assert_eq!(identity.uid, "uid-ada");
        assert_eq!(identity.display_name, "Ada Lovelace");
        assert_eq!(identity.avatar_url.as_deref(), Some("https://img/ada.png"));
        assert_eq!(identity.id_token().await.unwrap(), "id-1");
    }

    #[tokio::test]
    async fn test_lookup_failure_falls_back_to_email() {
        let server = MockServer::start().await;
        mount_sign_in(&server, "3600").await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:lookup"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let identity = provider(&server)
            .sign_in(SignInRequest::password("ada@example.com", "pw"))
            .await
            .unwrap();

        assert_eq!(identity.display_name, "ada@example.com");
        assert!(identity.avatar_url.is_none());
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "code": 400, "message": "INVALID_LOGIN_CREDENTIALS" }
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .sign_in(SignInRequest::password("ada@example.com", "wrong"))
            .await
            .unwrap_err();

        assert_eq!(err, AuthError::Rejected("INVALID_LOGIN_CREDENTIALS".into()));
    }

    #[tokio::test]
    async fn test_missing_credentials_skip_the_network() {
        let server = MockServer::start().await;

        let err = provider(&server)
            .sign_in(SignInRequest::password("", ""))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Rejected(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expiring_token_is_refreshed() {
        let server = MockServer::start().await;
        // 60s lifetime is inside the refresh threshold
        mount_sign_in(&server, "60").await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:lookup"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/token"))
            .and(body_partial_json(serde_json::json!({
                "grant_type": "refresh_token",
                "refresh_token": "refresh-1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id_token": "id-2",
                "refresh_token": "refresh-2",
                "expires_in": "3600"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let identity = provider(&server)
            .sign_in(SignInRequest::password("ada@example.com", "pw"))
            .await
            .unwrap();

        assert_eq!(identity.id_token().await.unwrap(), "id-2");
        // Fresh now, served from cache
        assert_eq!(identity.id_token().await.unwrap(), "id-2");
    }

    #[test]
    fn test_lifetime_parsing() {
        assert_eq!(lifetime(Some("120")), Duration::from_secs(120));
        assert_eq!(lifetime(Some("soon")), Duration::from_secs(3600));
        assert_eq!(lifetime(None), Duration::from_secs(3600));
    }
}
