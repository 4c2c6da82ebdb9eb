//! Optional platform capabilities. Each has a no-op implementation that
//! reports [`CapabilityError::Unsupported`] so callers can degrade quietly.

pub mod clipboard;
pub mod sound;
pub mod speech;

use std::sync::Arc;

use thiserror::Error;

pub use clipboard::{Clipboard, NoClipboard, Osc52Clipboard};
pub use sound::{Cue, Silent, SoundCue, TerminalBell};
pub use speech::{NoSpeechInput, SpeechInput};

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("{0} is not supported here")]
    Unsupported(&'static str),

    #[error("capability I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// The set of capabilities available to the conversation view.
#[derive(Clone)]
pub struct Capabilities {
    pub clipboard: Arc<dyn Clipboard>,
    pub speech: Arc<dyn SpeechInput>,
    pub sound: Arc<dyn SoundCue>,
}

impl Capabilities {
    /// Nothing supported.
    pub fn none() -> Self {
        Self {
            clipboard: Arc::new(NoClipboard),
            speech: Arc::new(NoSpeechInput),
            sound: Arc::new(Silent),
        }
    }

    /// What a terminal on stdout can offer: OSC 52 clipboard and the bell.
    pub fn terminal() -> Self {
        Self {
            clipboard: Arc::new(Osc52Clipboard::stdout()),
            speech: Arc::new(NoSpeechInput),
            sound: Arc::new(TerminalBell::stdout()),
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::none()
    }
}
