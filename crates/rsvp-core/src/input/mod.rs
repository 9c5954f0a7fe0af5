//! Command input abstraction.
//!
//! Externally triggered calls reach the engine as [`ReaderCommand`]s polled at
//! the start of each tick, so the tick remains the only writer of playback
//! state.

mod mock;
mod scripted;

pub use mock::NoCommands;
pub use scripted::ScriptedCommands;

/// Imperative operations accepted by a reading session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReaderCommand {
    Play,
    Pause,
    Resume,
    Toggle,
    /// Press-and-hold preview.
    HoldStart,
    HoldRelease,
    SeekTo(i64),
    SkipForward(usize),
    SkipBackward(usize),
    SetWpm(i64),
    Close,
}

/// Polled command provider.
pub trait CommandSource {
    type Error;

    fn poll_command(&mut self, now_ms: u64) -> Result<Option<ReaderCommand>, Self::Error>;
}
