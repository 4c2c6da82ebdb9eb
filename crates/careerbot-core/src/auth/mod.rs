pub mod error;
pub mod firebase_auth;
pub mod identity;
pub mod session_gate;
pub mod static_auth;

pub use error::AuthError;
pub use firebase_auth::FirebasePasswordAuth;
pub use identity::{Identity, StaticToken, TokenSource};
pub use session_gate::{AuthProvider, SessionGate, SignInRequest};
pub use static_auth::StaticTokenAuth;
