use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::conversation_model::{Conversation, ExchangeOutcome, ExchangeState, SubmitRejected};
use super::message::Message;
use super::reveal::{pick_interval, spawn_reveal_timer};
use crate::api::{ApiError, ChatBackend, FileUpload};
use crate::auth::Identity;
use crate::config::RevealSettings;

/// Completions posted back to the UI loop by background tasks.
#[derive(Debug)]
pub enum ConversationEvent {
    HistoryLoaded(Result<Vec<Message>, ApiError>),
    ReplyReceived {
        exchange_id: u64,
        result: Result<String, ApiError>,
    },
    RevealTick {
        generation: u64,
    },
    UploadFinished {
        file_name: String,
        result: Result<String, ApiError>,
    },
    FilesListed(Result<Vec<String>, ApiError>),
}

/// What changed after handling an event, for status lines and sound cues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationNotice {
    HistoryLoaded { entries: usize },
    Answered,
    ReplyFailed,
    RevealFinished,
    Uploaded { file_name: String, message: String },
    UploadFailed { file_name: String, error: String },
    Files(Vec<String>),
}

/// Drives a [`Conversation`] for one signed-in identity.
///
/// All network work runs on spawned tasks that report back through the event
/// channel; the caller feeds those events to [`handle_event`](Self::handle_event)
/// from its single UI loop. At most one ask call and one reveal timer exist
/// at any time.
pub struct ConversationController {
    identity: Identity,
    backend: Arc<dyn ChatBackend>,
    conversation: Conversation,
    reveal_settings: RevealSettings,
    events: UnboundedSender<ConversationEvent>,
    reveal_task: Option<JoinHandle<()>>,
    history_requested: bool,
    /// A history fetch is in flight and its result still applies.
    history_pending: bool,
}

impl ConversationController {
    pub fn new(
        identity: Identity,
        backend: Arc<dyn ChatBackend>,
        reveal_settings: RevealSettings,
        events: UnboundedSender<ConversationEvent>,
    ) -> Self {
        Self {
            conversation: Conversation::new(reveal_settings.enabled),
            identity,
            backend,
            reveal_settings,
            events,
            reveal_task: None,
            history_requested: false,
            history_pending: false,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    /// Fetch the stored transcript. Only the first call issues a request.
    pub fn load_history(&mut self) {
        if self.history_requested {
            return;
        }
        self.history_requested = true;
        self.history_pending = true;

        let identity = self.identity.clone();
        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = match identity.id_token().await {
                Ok(token) => backend.fetch_history(token).await,
                Err(err) => Err(ApiError::Token(err)),
            };
            let _ = events.send(ConversationEvent::HistoryLoaded(result));
        });
    }

    /// Send the current input to the answer service.
    pub fn submit(&mut self) -> Result<u64, SubmitRejected> {
        let pending = self.conversation.submit()?;
        self.stop_reveal();

        let identity = self.identity.clone();
        let backend = self.backend.clone();
        let events = self.events.clone();
        let exchange_id = pending.id;
        tokio::spawn(async move {
            let result = match identity.id_token().await {
                Ok(token) => backend.ask(token, pending.question).await,
                Err(err) => Err(ApiError::Token(err)),
            };
            let _ = events.send(ConversationEvent::ReplyReceived {
                exchange_id,
                result,
            });
        });
        self.conversation.mark_awaiting(exchange_id);

        info!(exchange_id, "Question sent");
        Ok(exchange_id)
    }

    pub fn handle_event(&mut self, event: ConversationEvent) -> Option<ConversationNotice> {
        match event {
            ConversationEvent::HistoryLoaded(_) if !self.history_pending => {
                debug!("Dropping history that arrived after a clear");
                None
            }
            ConversationEvent::HistoryLoaded(Ok(history)) => {
                self.history_pending = false;
                let entries = history.len();
                self.conversation.load_history(history);
                debug!(entries, "History loaded");
                Some(ConversationNotice::HistoryLoaded { entries })
            }
            ConversationEvent::HistoryLoaded(Err(err)) => {
                self.history_pending = false;
                warn!(error = %err, "Failed to load history");
                None
            }
            ConversationEvent::ReplyReceived {
                exchange_id,
                result,
            } => {
                if let Err(err) = &result {
                    warn!(exchange_id, error = %err, "Question failed");
                }
                match self.conversation.resolve(exchange_id, result)? {
                    ExchangeOutcome::Answered => {
                        if self.conversation.state() == ExchangeState::Revealing {
                            self.start_reveal();
                        }
                        Some(ConversationNotice::Answered)
                    }
                    ExchangeOutcome::Failed => Some(ConversationNotice::ReplyFailed),
                }
            }
            ConversationEvent::RevealTick { generation } => {
                if self.conversation.advance_reveal(generation) {
                    self.reveal_task = None;
                    Some(ConversationNotice::RevealFinished)
                } else {
                    None
                }
            }
            ConversationEvent::UploadFinished { file_name, result } => match result {
                Ok(message) => Some(ConversationNotice::Uploaded { file_name, message }),
                Err(err) => {
                    warn!(file = %file_name, error = %err, "Upload failed");
                    Some(ConversationNotice::UploadFailed {
                        file_name,
                        error: err.to_string(),
                    })
                }
            },
            ConversationEvent::FilesListed(Ok(files)) => Some(ConversationNotice::Files(files)),
            ConversationEvent::FilesListed(Err(err)) => {
                warn!(error = %err, "Failed to list uploaded files");
                None
            }
        }
    }

    /// Empty the transcript and reset the counter. Local only.
    pub fn clear(&mut self) {
        self.stop_reveal();
        self.history_pending = false;
        self.conversation.clear();
        info!("Conversation cleared");
    }

    /// Reveal the rest of the current reply immediately.
    pub fn skip_reveal(&mut self) {
        self.stop_reveal();
        self.conversation.finish_reveal();
    }

    pub fn upload(&self, file: FileUpload) {
        let identity = self.identity.clone();
        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let file_name = file.file_name.clone();
            let result = match identity.id_token().await {
                Ok(token) => backend.upload(token, file).await,
                Err(err) => Err(ApiError::Token(err)),
            };
            let _ = events.send(ConversationEvent::UploadFinished { file_name, result });
        });
    }

    pub fn list_files(&self) {
        let identity = self.identity.clone();
        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = match identity.id_token().await {
                Ok(token) => backend.list_files(token).await,
                Err(err) => Err(ApiError::Token(err)),
            };
            let _ = events.send(ConversationEvent::FilesListed(result));
        });
    }

    fn start_reveal(&mut self) {
        self.stop_reveal();
        let Some(cursor) = self.conversation.reveal_cursor() else {
            return;
        };
        let interval = pick_interval(&self.reveal_settings);
        debug!(
            generation = cursor.generation(),
            chars = cursor.len(),
            interval_ms = interval.as_millis() as u64,
            "Starting reveal"
        );
        self.reveal_task = Some(spawn_reveal_timer(
            cursor.generation(),
            interval,
            cursor.len(),
            self.events.clone(),
        ));
    }

    fn stop_reveal(&mut self) {
        if let Some(task) = self.reveal_task.take() {
            task.abort();
            debug!("Stopped reveal timer");
        }
    }
}

impl Drop for ConversationController {
    fn drop(&mut self) {
        self.stop_reveal();
    }
}
