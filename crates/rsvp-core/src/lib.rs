//! RSVP token pipeline and playback engine.
//!
//! Extracted page text is turned into a stream of classified, ORP-split
//! tokens, played back one token at a time by [`engine::PlaybackEngine`], and
//! persisted through the store traits in [`progress`], [`cache`] and
//! [`settings`] so a reopened document resumes where it was left.

pub mod cache;
pub mod config;
pub mod easing;
pub mod engine;
pub mod error;
pub mod extract;
pub mod input;
pub mod progress;
pub mod session;
pub mod settings;
pub mod store;
pub mod text_policy;
pub mod timing;
pub mod token;
pub mod tokenizer;

pub use config::ReaderConfig;
pub use engine::{PlaybackEngine, PlaybackState, PlaybackView, TickResult};
pub use error::RsvpError;
pub use session::{
    LoadRequest, LoadTicket, LoadedStream, ReadingSession, SessionPhase, forget_document,
    load_token_stream,
};
pub use token::{OrpSplit, SourceRef, Token, TokenKind};
