use std::collections::VecDeque;

use super::{CommandSource, ReaderCommand};

/// Replays commands once the simulated clock reaches their timestamp.
#[derive(Clone, Debug, Default)]
pub struct ScriptedCommands {
    script: VecDeque<(u64, ReaderCommand)>,
}

impl ScriptedCommands {
    /// `script` must be ordered by timestamp.
    pub fn new(script: impl IntoIterator<Item = (u64, ReaderCommand)>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.script.is_empty()
    }
}

impl CommandSource for ScriptedCommands {
    type Error = core::convert::Infallible;

    fn poll_command(&mut self, now_ms: u64) -> Result<Option<ReaderCommand>, Self::Error> {
        match self.script.front() {
            Some((at_ms, _)) if *at_ms <= now_ms => Ok(self.script.pop_front().map(|(_, cmd)| cmd)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_wait_for_their_timestamp() {
        let mut source = ScriptedCommands::new([(0, ReaderCommand::Play), (100, ReaderCommand::Pause)]);

        assert_eq!(source.poll_command(0), Ok(Some(ReaderCommand::Play)));
        assert_eq!(source.poll_command(50), Ok(None));
        assert_eq!(source.poll_command(100), Ok(Some(ReaderCommand::Pause)));
        assert!(source.is_exhausted());
    }
}
