use super::CapabilityError;
use crate::BoxFuture;

/// Voice dictation. `listen` resolves to the recognized text.
pub trait SpeechInput: Send + Sync {
    fn is_supported(&self) -> bool;

    fn listen(&self, locale: &str) -> BoxFuture<'_, Result<String, CapabilityError>>;
}

pub struct NoSpeechInput;

impl SpeechInput for NoSpeechInput {
    fn is_supported(&self) -> bool {
        false
    }

    fn listen(&self, _locale: &str) -> BoxFuture<'_, Result<String, CapabilityError>> {
        Box::pin(async { Err(CapabilityError::Unsupported("voice input")) })
    }
}
