use std::io::Write;

use parking_lot::Mutex;

use super::CapabilityError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    MessageSent,
    ReplyReceived,
    Error,
}

pub trait SoundCue: Send + Sync {
    fn play(&self, cue: Cue) -> Result<(), CapabilityError>;
}

pub struct Silent;

impl SoundCue for Silent {
    fn play(&self, _cue: Cue) -> Result<(), CapabilityError> {
        Ok(())
    }
}

/// Rings the terminal bell for replies and errors. Sends are quiet.
pub struct TerminalBell<W: Write + Send> {
    out: Mutex<W>,
}

impl TerminalBell<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl<W: Write + Send> SoundCue for TerminalBell<W> {
    fn play(&self, cue: Cue) -> Result<(), CapabilityError> {
        if cue == Cue::MessageSent {
            return Ok(());
        }
        let mut out = self.out.lock();
        out.write_all(b"\x07")?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bell_rings_for_reply_and_error_only() {
        let bell = TerminalBell::new(Vec::new());
        bell.play(Cue::MessageSent).unwrap();
        bell.play(Cue::ReplyReceived).unwrap();
        bell.play(Cue::Error).unwrap();

        assert_eq!(bell.into_inner(), b"\x07\x07");
    }
}
