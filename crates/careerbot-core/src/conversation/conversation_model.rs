use thiserror::Error;
use tracing::debug;

use super::message::{FALLBACK_REPLY, Message};
use super::reveal::RevealCursor;
use crate::api::ApiError;

/// Lifecycle of the current exchange.
///
/// `Idle -> Sending -> AwaitingReply -> Revealing -> Idle`; a failed reply
/// goes from `AwaitingReply` straight back to `Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    Sending,
    AwaitingReply,
    Revealing,
}

/// How the most recent exchange ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Answered,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitRejected {
    #[error("message is empty")]
    Empty,

    #[error("still waiting for the previous reply")]
    ReplyPending,
}

/// An exchange that has been optimistically appended and needs a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingExchange {
    pub id: u64,
    pub question: String,
}

/// Transcript and exchange state of the conversation view.
///
/// Pure state: it never performs I/O. The controller feeds it results from
/// the answer service and ticks from the reveal timer.
#[derive(Debug)]
pub struct Conversation {
    messages: Vec<Message>,
    input: String,
    state: ExchangeState,
    questions_asked: usize,
    reveal: Option<RevealCursor>,
    reveal_enabled: bool,
    next_exchange_id: u64,
    pending: Option<u64>,
    last_outcome: Option<ExchangeOutcome>,
}

impl Conversation {
    pub fn new(reveal_enabled: bool) -> Self {
        Self {
            messages: Vec::new(),
            input: String::new(),
            state: ExchangeState::Idle,
            questions_asked: 0,
            reveal: None,
            reveal_enabled,
            next_exchange_id: 1,
            pending: None,
            last_outcome: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Analytics counter: questions answered in this session.
    pub fn questions_asked(&self) -> usize {
        self.questions_asked
    }

    pub fn last_outcome(&self) -> Option<ExchangeOutcome> {
        self.last_outcome
    }

    pub fn reveal_cursor(&self) -> Option<&RevealCursor> {
        self.reveal.as_ref()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    /// Input is accepted while idle and while a reply is still being revealed.
    pub fn is_input_enabled(&self) -> bool {
        matches!(self.state, ExchangeState::Idle | ExchangeState::Revealing)
    }

    pub fn is_awaiting_reply(&self) -> bool {
        matches!(
            self.state,
            ExchangeState::Sending | ExchangeState::AwaitingReply
        )
    }

    /// User-authored entries, oldest first.
    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .filter(|m| m.is_user())
            .map(|m| m.text.as_str())
    }

    /// Text to render for the entry at `index`: the revealed prefix for the
    /// reply being played back, the full text otherwise.
    pub fn display_text(&self, index: usize) -> Option<&str> {
        let message = self.messages.get(index)?;
        match &self.reveal {
            Some(cursor) if index + 1 == self.messages.len() && !message.is_user() => {
                Some(cursor.visible(&message.text))
            }
            _ => Some(&message.text),
        }
    }

    /// Submit the current input.
    ///
    /// Appends the user message immediately, clears the input and abandons
    /// any reveal in progress. Blank input and submissions while a reply is
    /// outstanding are rejected without touching the state.
    pub fn submit(&mut self) -> Result<PendingExchange, SubmitRejected> {
        if self.is_awaiting_reply() {
            return Err(SubmitRejected::ReplyPending);
        }
        if self.input.trim().is_empty() {
            return Err(SubmitRejected::Empty);
        }

        let question = std::mem::take(&mut self.input);
        self.messages.push(Message::user(question.clone()));
        self.reveal = None;

        let id = self.next_exchange_id;
        self.next_exchange_id += 1;
        self.pending = Some(id);
        self.state = ExchangeState::Sending;

        debug!(exchange_id = id, "Exchange started");
        Ok(PendingExchange { id, question })
    }

    /// The request for `exchange_id` has been issued.
    pub fn mark_awaiting(&mut self, exchange_id: u64) {
        if self.pending == Some(exchange_id) && self.state == ExchangeState::Sending {
            self.state = ExchangeState::AwaitingReply;
        }
    }

    /// Apply the answer service's result. Results for exchanges that are no
    /// longer pending (the transcript was cleared meanwhile) are dropped.
    pub fn resolve(
        &mut self,
        exchange_id: u64,
        result: Result<String, ApiError>,
    ) -> Option<ExchangeOutcome> {
        if self.pending != Some(exchange_id) {
            debug!(exchange_id, "Dropping reply for stale exchange");
            return None;
        }
        self.pending = None;

        let outcome = match result {
            Ok(answer) => {
                self.questions_asked += 1;
                if self.reveal_enabled && !answer.is_empty() {
                    self.reveal = Some(RevealCursor::new(&answer, exchange_id));
                    self.state = ExchangeState::Revealing;
                } else {
                    self.state = ExchangeState::Idle;
                }
                self.messages.push(Message::bot(answer));
                ExchangeOutcome::Answered
            }
            Err(_) => {
                self.messages.push(Message::bot(FALLBACK_REPLY));
                self.state = ExchangeState::Idle;
                ExchangeOutcome::Failed
            }
        };

        self.last_outcome = Some(outcome);
        Some(outcome)
    }

    /// Advance the reveal for `generation` by one character. Ticks from an
    /// abandoned reveal are ignored. Returns true when the reveal finished.
    pub fn advance_reveal(&mut self, generation: u64) -> bool {
        let Some(cursor) = self.reveal.as_mut() else {
            return false;
        };
        if cursor.generation() != generation {
            return false;
        }
        if cursor.advance() {
            self.finish_reveal();
            return true;
        }
        false
    }

    /// Show the whole reply at once.
    pub fn finish_reveal(&mut self) {
        self.reveal = None;
        if self.state == ExchangeState::Revealing {
            self.state = ExchangeState::Idle;
        }
    }

    /// Merge the stored history in front of anything sent locally since the
    /// view opened, and recount the questions.
    pub fn load_history(&mut self, history: Vec<Message>) {
        let loaded_questions = history.iter().filter(|m| m.is_user()).count();
        let local = std::mem::replace(&mut self.messages, history);
        self.messages.extend(local);
        self.questions_asked += loaded_questions;
    }

    /// Empty the transcript and reset the counter. Local only.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.questions_asked = 0;
        self.reveal = None;
        self.pending = None;
        self.last_outcome = None;
        self.state = ExchangeState::Idle;
    }
}
