use super::{CommandSource, ReaderCommand};

/// Source that never produces a command.
#[derive(Default, Debug, Clone, Copy)]
pub struct NoCommands;

impl NoCommands {
    pub const fn new() -> Self {
        Self
    }
}

impl CommandSource for NoCommands {
    type Error = core::convert::Infallible;

    fn poll_command(&mut self, _now_ms: u64) -> Result<Option<ReaderCommand>, Self::Error> {
        Ok(None)
    }
}
