pub mod controller;
pub mod conversation_model;
pub mod message;
pub mod reveal;

pub use controller::{ConversationController, ConversationEvent, ConversationNotice};
pub use conversation_model::{Conversation, ExchangeOutcome, ExchangeState, PendingExchange, SubmitRejected};
pub use message::{FALLBACK_REPLY, Message, Sender};
pub use reveal::RevealCursor;
