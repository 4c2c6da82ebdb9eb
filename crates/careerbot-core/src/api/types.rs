use serde::{Deserialize, Serialize};

use crate::conversation::Message;

#[derive(Debug, Serialize)]
pub struct AskRequest<'a> {
    pub question: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

/// One stored history record.
///
/// The service either returns transcript messages directly or the
/// question/answer pairs it persists per exchange.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HistoryEntry {
    Message(Message),
    Exchange {
        question: String,
        #[serde(default)]
        answer: String,
    },
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Option<Vec<HistoryEntry>>,
}

impl HistoryResponse {
    /// Flatten into transcript order; an exchange becomes a user message
    /// followed by a bot message.
    pub fn into_messages(self) -> Vec<Message> {
        let mut messages = Vec::new();
        for entry in self.history.unwrap_or_default() {
            match entry {
                HistoryEntry::Message(message) => messages.push(message),
                HistoryEntry::Exchange { question, answer } => {
                    messages.push(Message::user(question));
                    messages.push(Message::bot(answer));
                }
            }
        }
        messages
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilesResponse {
    #[serde(default)]
    pub files: Vec<String>,
}
