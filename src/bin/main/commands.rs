use std::{convert::Infallible, io::BufRead, thread};

use log::{debug, warn};
use rsvp_core::input::{CommandSource, ReaderCommand};
use tokio::sync::mpsc::{self, error::TryRecvError};

const WPM_STEP: i64 = 25;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum InputCommand {
    Reader(ReaderCommand),
    Faster,
    Slower,
}

/// Parses one stdin line. Whitespace-only lines toggle playback.
pub(super) fn parse_line(line: &str) -> Option<InputCommand> {
    if line.is_empty() {
        return None;
    }
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Some(InputCommand::Reader(ReaderCommand::Toggle));
    }

    let mut parts = trimmed.split_whitespace();
    let head = parts.next()?;
    let arg = parts.next();
    if parts.next().is_some() {
        return None;
    }

    let number = |default: i64| match arg {
        Some(raw) => raw.parse::<i64>().ok(),
        None => Some(default),
    };
    let count = |value: i64| usize::try_from(value.max(0)).unwrap_or(usize::MAX);

    let command = match head {
        "p" => ReaderCommand::Toggle,
        "h" => ReaderCommand::HoldStart,
        "u" => ReaderCommand::HoldRelease,
        "f" => ReaderCommand::SkipForward(count(number(10)?)),
        "b" => ReaderCommand::SkipBackward(count(number(10)?)),
        "g" => ReaderCommand::SeekTo(arg?.parse().ok()?),
        "w" => ReaderCommand::SetWpm(arg?.parse().ok()?),
        "q" => ReaderCommand::Close,
        "+" if arg.is_none() => return Some(InputCommand::Faster),
        "-" if arg.is_none() => return Some(InputCommand::Slower),
        _ => return None,
    };
    Some(InputCommand::Reader(command))
}

/// Line commands from stdin, read on a plain thread so a pending read never
/// blocks runtime shutdown.
pub(super) struct StdinCommands {
    rx: mpsc::UnboundedReceiver<InputCommand>,
    pending: Option<InputCommand>,
    target_wpm: u16,
    disconnected: bool,
}

impl StdinCommands {
    pub(super) fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!("input: stdin read failed err={}", err);
                        break;
                    }
                };
                match parse_line(&line) {
                    Some(command) => {
                        if tx.send(command).is_err() {
                            return;
                        }
                    }
                    None if !line.is_empty() => warn!("input: unknown command line={:?}", line),
                    None => {}
                }
            }
            debug!("input: stdin closed");
        });

        Self {
            rx,
            pending: None,
            target_wpm: 0,
            disconnected: false,
        }
    }

    /// Completes once a command is ready for the next `poll_command`.
    pub(super) async fn wait(&mut self) {
        if self.pending.is_some() || self.disconnected {
            return;
        }
        match self.rx.recv().await {
            Some(command) => self.pending = Some(command),
            None => self.disconnected = true,
        }
    }

    /// Base for `+`/`-` steps.
    pub(super) fn set_target_wpm(&mut self, wpm: u16) {
        self.target_wpm = wpm;
    }

    fn resolve(&self, command: InputCommand) -> ReaderCommand {
        let target = i64::from(self.target_wpm);
        match command {
            InputCommand::Reader(command) => command,
            InputCommand::Faster => ReaderCommand::SetWpm(target + WPM_STEP),
            InputCommand::Slower => ReaderCommand::SetWpm(target - WPM_STEP),
        }
    }
}

impl CommandSource for StdinCommands {
    type Error = Infallible;

    fn poll_command(&mut self, _now_ms: u64) -> Result<Option<ReaderCommand>, Self::Error> {
        if let Some(command) = self.pending.take() {
            return Ok(Some(self.resolve(command)));
        }
        if self.disconnected {
            // end of input closes the session
            return Ok(Some(ReaderCommand::Close));
        }

        match self.rx.try_recv() {
            Ok(command) => Ok(Some(self.resolve(command))),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                self.disconnected = true;
                Ok(Some(ReaderCommand::Close))
            }
        }
    }
}
