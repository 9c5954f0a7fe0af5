use std::path::PathBuf;

use embassy_futures::select::{Either3, select3};
use log::{debug, info};
use rsvp_core::{
    LoadedStream, ReadingSession, RsvpError, SessionPhase, extract::PlainTextExtractor,
    input::ReaderCommand, load_token_stream, tokenizer::count_words,
};
use rsvp_store::RedbStore;

use super::{clock::Clock, commands::StdinCommands};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum LoadingOutcome {
    Ready,
    Failed,
    Cancelled,
}

/// Runs extraction on the blocking pool and installs the result. Commands
/// arriving meanwhile go through the session, so `q` or Ctrl-C cancels the
/// load.
pub(super) async fn load_document(
    session: &mut ReadingSession<RedbStore>,
    commands: &mut StdinCommands,
    cache: RedbStore,
    path: PathBuf,
    clock: &Clock,
) -> Result<LoadingOutcome, RsvpError> {
    let ticket = session.begin_loading()?;
    let request = ticket.request.clone();
    let now_unix_ms = clock.unix_ms();

    let mut task = tokio::task::spawn_blocking(move || -> Result<LoadedStream, RsvpError> {
        let bytes = std::fs::read(&path).map_err(|err| {
            RsvpError::Extraction(format!("read failed path={} err={err}", path.display()))
        })?;
        let mut cache = cache;
        let mut extractor = PlainTextExtractor::from_bytes(bytes);
        load_token_stream(&mut extractor, &mut cache, &request, now_unix_ms)
    });

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        match select3(&mut task, commands.wait(), ctrl_c.as_mut()).await {
            Either3::First(joined) => {
                break joined
                    .map_err(|err| RsvpError::Extraction(format!("loader task failed: {err}")))
                    .and_then(|outcome| outcome);
            }
            Either3::Second(()) => {
                let _ = session.tick(commands, clock.now_ms(), clock.unix_ms());
                if session.phase() == &SessionPhase::Closed {
                    debug!("extract: cancelled doc={}", session.doc_id());
                    return Ok(LoadingOutcome::Cancelled);
                }
            }
            Either3::Third(_) => {
                session.apply(ReaderCommand::Close, clock.now_ms(), clock.unix_ms());
                debug!("extract: interrupted doc={}", session.doc_id());
                return Ok(LoadingOutcome::Cancelled);
            }
        }
    };

    if let Ok(stream) = &outcome {
        info!(
            "extract: ready doc={} words={} cached={}",
            session.doc_id(),
            count_words(&stream.tokens),
            stream.from_cache
        );
    }

    match session.install(ticket, outcome) {
        Ok(()) => Ok(LoadingOutcome::Ready),
        Err(RsvpError::SessionClosed) => Ok(LoadingOutcome::Cancelled),
        Err(_) => Ok(LoadingOutcome::Failed),
    }
}
