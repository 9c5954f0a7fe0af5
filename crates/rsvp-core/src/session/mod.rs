//! One open document in RSVP mode: stream loading, command dispatch, ticking
//! and progress persistence.

mod loader;

use log::{debug, info, warn};

use crate::{
    cache::CacheStore,
    config::ReaderConfig,
    engine::{PlaybackEngine, PlaybackView, TickResult},
    error::RsvpError,
    input::{CommandSource, ReaderCommand},
    progress::{FlushReason, ProgressStore, ProgressSync, ReadingProgress},
    text_policy::snippet_limited,
    token::Token,
    tokenizer::context_snippet,
};

pub use loader::load_token_stream;

/// Tokens on either side of the current one kept in the saved snippet.
pub const SNIPPET_CONTEXT_TOKENS: usize = 3;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoadRequest {
    pub doc_id: String,
    /// Explicit 1-based start page; wins over saved progress.
    pub start_page: Option<u32>,
}

impl LoadRequest {
    pub fn new(doc_id: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            start_page: None,
        }
    }

    pub fn with_start_page(mut self, start_page: Option<u32>) -> Self {
        self.start_page = start_page;
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoadedStream {
    pub tokens: Vec<Token>,
    pub total_pages: u32,
    pub file_hash: String,
    pub from_cache: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionPhase {
    /// No stream yet and no extraction running.
    Idle,
    Loading,
    Ready,
    /// Terminal for this session; holds the error shown to the user.
    Failed(RsvpError),
    Closed,
}

/// Proof that the holder started the one extraction this session accepts.
#[derive(Debug)]
pub struct LoadTicket {
    generation: u64,
    pub request: LoadRequest,
}

pub struct ReadingSession<P: ProgressStore> {
    request: LoadRequest,
    config: ReaderConfig,
    progress: P,
    phase: SessionPhase,
    generation: u64,
    engine: Option<PlaybackEngine>,
    sync: ProgressSync,
    total_words_read: u64,
}

impl<P: ProgressStore> ReadingSession<P> {
    pub fn new(request: LoadRequest, progress: P, config: ReaderConfig) -> Self {
        Self {
            request,
            config: config.normalized(),
            progress,
            phase: SessionPhase::Idle,
            generation: 0,
            engine: None,
            sync: ProgressSync::new(None),
            total_words_read: 0,
        }
    }

    pub fn doc_id(&self) -> &str {
        &self.request.doc_id
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn engine(&self) -> Option<&PlaybackEngine> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut PlaybackEngine> {
        self.engine.as_mut()
    }

    pub fn view(&self) -> Option<PlaybackView<'_>> {
        self.engine.as_ref().map(PlaybackEngine::view)
    }

    /// Whether the host should keep its periodic tick running.
    pub fn wants_ticks(&self) -> bool {
        self.engine
            .as_ref()
            .is_some_and(|engine| engine.state().is_playing())
    }

    pub fn total_words_read(&self) -> u64 {
        self.total_words_read
    }

    /// Message for the persistent error state, if the session failed.
    pub fn error_message(&self) -> Option<String> {
        match &self.phase {
            SessionPhase::Failed(err) => Some(err.user_message()),
            _ => None,
        }
    }

    /// Claims the single extraction slot of this session.
    pub fn begin_loading(&mut self) -> Result<LoadTicket, RsvpError> {
        match self.phase {
            SessionPhase::Closed => return Err(RsvpError::SessionClosed),
            SessionPhase::Loading => return Err(RsvpError::ExtractionInProgress),
            SessionPhase::Idle | SessionPhase::Ready | SessionPhase::Failed(_) => {}
        }

        self.generation += 1;
        self.phase = SessionPhase::Loading;
        info!(
            "extract: loading doc={} generation={}",
            self.request.doc_id, self.generation
        );
        Ok(LoadTicket {
            generation: self.generation,
            request: self.request.clone(),
        })
    }

    /// Installs the outcome of the extraction started with `ticket`.
    ///
    /// The engine is created parked in `Idle` at the resolved start position:
    /// explicit start page, else saved progress, else the first token.
    pub fn install(
        &mut self,
        ticket: LoadTicket,
        outcome: Result<LoadedStream, RsvpError>,
    ) -> Result<(), RsvpError> {
        if self.phase == SessionPhase::Closed || ticket.generation != self.generation {
            debug!("extract: dropping stale result doc={}", ticket.request.doc_id);
            return Err(RsvpError::SessionClosed);
        }

        let stream = match outcome {
            Ok(stream) => stream,
            Err(err) => {
                warn!("extract: failed doc={} err={}", self.request.doc_id, err);
                self.phase = SessionPhase::Failed(err.clone());
                return Err(err);
            }
        };

        let saved = match self.progress.load_progress(&self.request.doc_id) {
            Ok(saved) => saved,
            Err(err) => {
                warn!(
                    "progress-save: load failed doc={} err={}",
                    self.request.doc_id, err
                );
                None
            }
        };

        let start_index = resolve_start_index(&stream.tokens, self.request.start_page, saved.as_ref());
        self.total_words_read = saved.as_ref().map_or(0, |saved| saved.total_words_read);
        self.sync = ProgressSync::new(Some(start_index));

        info!(
            "extract: installed doc={} tokens={} pages={} cached={} start_index={}",
            self.request.doc_id,
            stream.tokens.len(),
            stream.total_pages,
            stream.from_cache,
            start_index
        );
        self.engine = Some(PlaybackEngine::new(stream.tokens, self.config, start_index));
        self.phase = SessionPhase::Ready;
        Ok(())
    }

    /// Dispatches one command. Commands before the stream is ready are
    /// dropped.
    pub fn apply(&mut self, command: ReaderCommand, now_ms: u64, now_unix_ms: u64) {
        if command == ReaderCommand::Close {
            if let Err(err) = self.close(now_ms, now_unix_ms) {
                warn!("progress-save: close flush failed err={}", err);
            }
            return;
        }

        if self.phase != SessionPhase::Ready {
            debug!("rsvp-engine: command ignored phase={:?} cmd={:?}", self.phase, command);
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        match command {
            ReaderCommand::Play => {
                engine.play(now_ms);
            }
            ReaderCommand::Pause => {
                engine.pause(now_ms);
            }
            ReaderCommand::Resume => {
                engine.resume(now_ms);
            }
            ReaderCommand::Toggle => {
                engine.toggle(now_ms);
            }
            ReaderCommand::HoldStart => {
                engine.hold_start(now_ms);
            }
            ReaderCommand::HoldRelease => {
                engine.hold_release(now_ms);
            }
            ReaderCommand::SeekTo(index) => engine.seek_to(index, now_ms),
            ReaderCommand::SkipForward(count) => engine.skip_forward(count, now_ms),
            ReaderCommand::SkipBackward(count) => engine.skip_backward(count, now_ms),
            ReaderCommand::SetWpm(wpm) => {
                engine.set_target_wpm(wpm);
            }
            ReaderCommand::Close => {}
        }

        self.observe_progress(now_ms, now_unix_ms);
    }

    /// Drains pending commands, advances playback and persists progress.
    pub fn tick<S: CommandSource>(
        &mut self,
        commands: &mut S,
        now_ms: u64,
        now_unix_ms: u64,
    ) -> TickResult {
        while self.phase != SessionPhase::Closed {
            match commands.poll_command(now_ms) {
                Ok(Some(command)) => self.apply(command, now_ms, now_unix_ms),
                Ok(None) => break,
                Err(_) => {
                    warn!("rsvp-engine: command source failed");
                    break;
                }
            }
        }

        if self.phase != SessionPhase::Ready {
            return TickResult::NoRender;
        }
        let Some(engine) = self.engine.as_mut() else {
            return TickResult::NoRender;
        };

        let result = engine.tick(now_ms);
        self.observe_progress(now_ms, now_unix_ms);
        result
    }

    /// Stops playback for good and writes the position immediately.
    /// The token cache is left untouched.
    pub fn close(&mut self, now_ms: u64, now_unix_ms: u64) -> Result<(), RsvpError> {
        if self.phase == SessionPhase::Closed {
            return Ok(());
        }
        self.phase = SessionPhase::Closed;

        let Some(engine) = self.engine.as_mut() else {
            info!("progress-save: closed before load doc={}", self.request.doc_id);
            return Ok(());
        };
        engine.stop();
        self.total_words_read += engine.drain_word_updates() as u64;

        let record = self.progress_record(now_unix_ms);
        let result = record.map_or(Ok(()), |record| {
            self.progress
                .save_progress(&record)
                .map_err(RsvpError::storage)
        });
        let index = self.current_index();
        match &result {
            Ok(()) => {
                self.sync.mark_saved(index, now_ms);
                info!(
                    "progress-save: saved reason={} doc={} index={}",
                    FlushReason::Close.as_str(),
                    self.request.doc_id,
                    index
                );
            }
            Err(err) => warn!(
                "progress-save: failed reason={} doc={} err={}",
                FlushReason::Close.as_str(),
                self.request.doc_id,
                err
            ),
        }
        result
    }

    pub fn into_progress_store(self) -> P {
        self.progress
    }

    fn current_index(&self) -> usize {
        self.engine
            .as_ref()
            .map_or(0, PlaybackEngine::current_index)
    }

    fn observe_progress(&mut self, now_ms: u64, now_unix_ms: u64) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        let advanced = engine.drain_word_updates();
        self.total_words_read += advanced as u64;
        let index = engine.current_index();
        let playing = engine.state().is_playing();

        let reason = self
            .sync
            .observe(index, playing, advanced, now_ms)
            .or_else(|| self.sync.due(now_ms));
        if let Some(reason) = reason {
            self.flush(reason, now_ms, now_unix_ms);
        }
    }

    fn flush(&mut self, reason: FlushReason, now_ms: u64, now_unix_ms: u64) -> bool {
        if !reason.is_immediate() && !self.sync.can_flush_now(now_ms) {
            return false;
        }
        let Some(record) = self.progress_record(now_unix_ms) else {
            return false;
        };

        match self.progress.save_progress(&record) {
            Ok(()) => {
                self.sync.mark_saved(record.current_token_index as usize, now_ms);
                info!(
                    "progress-save: saved reason={} doc={} index={} page={} words={}",
                    reason.as_str(),
                    record.doc_id,
                    record.current_token_index,
                    record.current_page_num,
                    record.total_words_read
                );
                true
            }
            Err(err) => {
                self.sync.mark_failed(now_ms);
                warn!(
                    "progress-save: failed reason={} doc={} err={}",
                    reason.as_str(),
                    record.doc_id,
                    err
                );
                false
            }
        }
    }

    fn progress_record(&self, now_unix_ms: u64) -> Option<ReadingProgress> {
        let engine = self.engine.as_ref()?;
        let tokens = engine.tokens();
        if tokens.is_empty() {
            return None;
        }

        let index = engine.current_index();
        Some(ReadingProgress {
            doc_id: self.request.doc_id.clone(),
            current_token_index: index as u32,
            current_page_num: engine.current_page_num(),
            snippet: snippet_limited(&context_snippet(tokens, index, SNIPPET_CONTEXT_TOKENS)),
            total_words_read: self.total_words_read,
            last_update_time: now_unix_ms,
        })
    }
}

fn resolve_start_index(
    tokens: &[Token],
    start_page: Option<u32>,
    saved: Option<&ReadingProgress>,
) -> usize {
    let last = tokens.len().saturating_sub(1);

    if let Some(page) = start_page {
        return tokens
            .iter()
            .position(|token| token.page_num() >= page)
            .unwrap_or(last);
    }

    saved.map_or(0, |saved| (saved.current_token_index as usize).min(last))
}

/// Drops everything stored for a removed document.
pub fn forget_document<P, C>(progress: &mut P, cache: &mut C, doc_id: &str) -> Result<(), RsvpError>
where
    P: ProgressStore,
    C: CacheStore,
{
    progress.delete_progress(doc_id).map_err(RsvpError::storage)?;
    cache.remove_entry(doc_id).map_err(RsvpError::storage)?;
    info!("cache: forgot doc={}", doc_id);
    Ok(())
}
