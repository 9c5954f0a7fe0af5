//! Playback state machine: one token at a time, driven by a periodic tick.

use heapless::String as HeaplessString;
use log::{debug, info, warn};

use crate::{
    config::{
        MAX_COMMA_PAUSE_MS, MAX_PERIOD_PAUSE_MS, MAX_RAMP_DURATION_MS, ReaderConfig, clamp_wpm,
    },
    easing::{EasingCurve, TEMPORARY_RATIO, is_ramp_complete, ramp_start_wpm, ramped_wpm},
    settings::PersistedSettings,
    timing::{
        Pacing, TIME_LABEL_BYTES, display_duration_ms, progress_percent, should_advance,
        time_remaining_label,
    },
    token::Token,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TickResult {
    NoRender,
    RenderRequested,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlaybackState {
    /// No active playback; position parked.
    Idle,
    /// Accelerating from 60 % toward the target speed.
    Ramping,
    PlayingContinuous,
    /// Press-and-hold preview at a fixed reduced speed.
    PlayingTemporary,
    Paused,
}

impl PlaybackState {
    pub const fn is_playing(self) -> bool {
        matches!(
            self,
            Self::Ramping | Self::PlayingContinuous | Self::PlayingTemporary
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ramping => "ramping",
            Self::PlayingContinuous => "playing_continuous",
            Self::PlayingTemporary => "playing_temporary",
            Self::Paused => "paused",
        }
    }
}

/// Snapshot handed to renderers after a tick.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackView<'a> {
    pub state: PlaybackState,
    pub is_playing: bool,
    pub is_paused: bool,
    /// Playback ran off the end of the stream.
    pub finished: bool,
    pub current_token: Option<&'a Token>,
    pub current_token_index: usize,
    pub total_tokens: usize,
    pub current_page_num: u32,
    pub current_wpm: f32,
    pub target_wpm: u16,
    pub progress_percent: f32,
    pub time_remaining_label: HeaplessString<TIME_LABEL_BYTES>,
}

/// Owns the position/speed/state tuple of one reading session.
///
/// Every mutation goes through `&mut self`; clocks are passed in by the
/// caller so the engine never reads time on its own.
pub struct PlaybackEngine {
    tokens: Vec<Token>,
    config: ReaderConfig,
    state: PlaybackState,
    current_index: usize,
    current_page_num: u32,
    current_wpm: f32,
    ramp_start_wpm: f32,
    ramp_started_ms: u64,
    /// `None` until the next tick stamps the token clock.
    token_started_ms: Option<u64>,
    paused_at_ms: Option<u64>,
    started_reading_ms: Option<u64>,
    hold_return: Option<PlaybackState>,
    finished: bool,
    pending_redraw: bool,
    words_since_drain: u32,
}

include!("view.rs");
include!("runtime.rs");
include!("navigation.rs");
