pub mod api;
pub mod attachments;
pub mod auth;
pub mod capabilities;
pub mod config;
pub mod conversation;
pub mod exporters;

use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub use api::{ApiClient, ApiError, ChatBackend};
pub use attachments::{Attachment, AttachmentError, load_attachment};
pub use auth::{AuthError, AuthProvider, Identity, SessionGate, SignInRequest};
pub use capabilities::{Capabilities, CapabilityError};
pub use config::{ClientConfig, Language};
pub use conversation::{
    Conversation, ConversationController, ConversationEvent, ConversationNotice, ExchangeState,
    Message, Sender,
};
pub use exporters::{ExportError, ExportFormat, export_transcript};
