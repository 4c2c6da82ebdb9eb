use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use super::controller::ConversationEvent;
use crate::config::RevealSettings;

/// Typing playback position inside the latest bot message.
///
/// Counts characters, not bytes, so partial text always ends on a character
/// boundary. The position never moves backwards and never passes `len`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevealCursor {
    position: usize,
    len: usize,
    generation: u64,
}

impl RevealCursor {
    pub fn new(text: &str, generation: u64) -> Self {
        Self {
            position: 0,
            len: text.chars().count(),
            generation,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_complete(&self) -> bool {
        self.position >= self.len
    }

    /// Move one character forward. Returns true once the end is reached.
    pub fn advance(&mut self) -> bool {
        if self.position < self.len {
            self.position += 1;
        }
        self.is_complete()
    }

    /// The revealed prefix of `text`.
    pub fn visible<'a>(&self, text: &'a str) -> &'a str {
        match text.char_indices().nth(self.position) {
            Some((end, _)) => &text[..end],
            None => text,
        }
    }
}

/// Draw one tick interval from the configured band.
pub fn pick_interval(settings: &RevealSettings) -> Duration {
    let millis = rand::thread_rng().gen_range(settings.interval_band());
    Duration::from_millis(millis)
}

/// Spawn the periodic task that drives one reveal. It emits `steps` ticks
/// tagged with `generation` and then exits; aborting the handle stops it early.
pub fn spawn_reveal_timer(
    generation: u64,
    interval: Duration,
    steps: usize,
    events: UnboundedSender<ConversationEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;
        for _ in 0..steps {
            ticker.tick().await;
            if events
                .send(ConversationEvent::RevealTick { generation })
                .is_err()
            {
                break;
            }
        }
    })
}
