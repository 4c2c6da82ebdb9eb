use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parking_lot::Mutex;
use tracing::debug;

use super::CapabilityError;

pub trait Clipboard: Send + Sync {
    fn set_text(&self, text: &str) -> Result<(), CapabilityError>;
}

pub struct NoClipboard;

impl Clipboard for NoClipboard {
    fn set_text(&self, _text: &str) -> Result<(), CapabilityError> {
        Err(CapabilityError::Unsupported("clipboard"))
    }
}

/// Clipboard through the OSC 52 terminal escape. The terminal decides
/// whether to honour it; writing always succeeds if the stream is open.
pub struct Osc52Clipboard<W: Write + Send> {
    out: Mutex<W>,
}

impl Osc52Clipboard<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> Osc52Clipboard<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

impl<W: Write + Send> Clipboard for Osc52Clipboard<W> {
    fn set_text(&self, text: &str) -> Result<(), CapabilityError> {
        let mut out = self.out.lock();
        out.write_all(osc52_sequence(text).as_bytes())?;
        out.flush()?;
        debug!(chars = text.chars().count(), "Copied to clipboard");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_osc52_encodes_payload() {
        let clipboard = Osc52Clipboard::new(Vec::new());
        clipboard.set_text("hello").unwrap();

        let written = String::from_utf8(clipboard.into_inner()).unwrap();
        assert_eq!(written, "\x1b]52;c;aGVsbG8=\x07");
    }

    #[test]
    fn test_no_clipboard_is_unsupported() {
        assert!(matches!(
            NoClipboard.set_text("x"),
            Err(CapabilityError::Unsupported("clipboard"))
        ));
    }
}
