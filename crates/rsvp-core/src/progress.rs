//! Resumable reading position and its debounced persistence.

use core::fmt::Display;

use serde::{Deserialize, Serialize};

/// Save after this many advanced words while playing.
pub const PROGRESS_SAVE_WORD_BATCH: u32 = 10;
/// Save when playback has been dirty this long without a batch save.
pub const PROGRESS_SAVE_DEBOUNCE_MS: u64 = 5_000;
pub const PROGRESS_SAVE_MIN_SPACING_MS: u64 = 500;

/// One persisted record per document, upserted by `doc_id`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingProgress {
    pub doc_id: String,
    pub current_token_index: u32,
    pub current_page_num: u32,
    pub snippet: String,
    pub total_words_read: u64,
    /// Unix epoch milliseconds.
    pub last_update_time: u64,
}

/// Abstract `reading_progress` backend.
pub trait ProgressStore {
    type Error: Display;

    fn load_progress(&mut self, doc_id: &str) -> Result<Option<ReadingProgress>, Self::Error>;
    /// Insert or replace the record for `progress.doc_id`.
    fn save_progress(&mut self, progress: &ReadingProgress) -> Result<(), Self::Error>;
    /// Only called when the document itself is removed.
    fn delete_progress(&mut self, doc_id: &str) -> Result<(), Self::Error>;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FlushReason {
    WordBatch,
    Debounce,
    Pause,
    Navigation,
    Close,
}

impl FlushReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WordBatch => "word_batch",
            Self::Debounce => "debounce",
            Self::Pause => "pause",
            Self::Navigation => "navigation",
            Self::Close => "close",
        }
    }

    /// Immediate reasons bypass the minimum spacing between writes.
    pub const fn is_immediate(self) -> bool {
        matches!(self, Self::Pause | Self::Navigation | Self::Close)
    }
}

/// Decides when the current position has to be written.
///
/// While playing, writes are batched by word count or by time, whichever
/// comes first. Leaving the playing states, or moving while paused, forces a
/// write that supersedes any pending batch.
#[derive(Clone, Debug)]
pub struct ProgressSync {
    last_saved_index: Option<usize>,
    last_seen_index: Option<usize>,
    dirty_since_ms: Option<u64>,
    last_flush_ms: Option<u64>,
    words_since_save: u32,
    prev_playing: bool,
}

impl ProgressSync {
    pub fn new(initial_index: Option<usize>) -> Self {
        Self {
            last_saved_index: initial_index,
            last_seen_index: initial_index,
            dirty_since_ms: None,
            last_flush_ms: None,
            words_since_save: 0,
            prev_playing: false,
        }
    }

    /// Feed the engine state after a tick. Returns a forced flush reason when
    /// one applies.
    pub fn observe(
        &mut self,
        index: usize,
        playing: bool,
        advanced_words: u32,
        now_ms: u64,
    ) -> Option<FlushReason> {
        let moved = self.last_seen_index != Some(index);
        let unsaved = self.last_saved_index != Some(index);
        self.last_seen_index = Some(index);

        let mut force = None;
        if self.prev_playing && !playing {
            if unsaved || self.dirty_since_ms.is_some() {
                force = Some(FlushReason::Pause);
            }
        } else if !playing && moved && unsaved {
            force = Some(FlushReason::Navigation);
        }
        self.prev_playing = playing;

        if playing && moved {
            self.words_since_save = self.words_since_save.saturating_add(advanced_words);
            if self.dirty_since_ms.is_none() {
                self.dirty_since_ms = Some(now_ms);
            }
        }

        force
    }

    /// Batched reason that is due now, respecting the minimum spacing.
    pub fn due(&self, now_ms: u64) -> Option<FlushReason> {
        let dirty_since = self.dirty_since_ms?;
        if !self.can_flush_now(now_ms) {
            return None;
        }
        if self.words_since_save >= PROGRESS_SAVE_WORD_BATCH {
            return Some(FlushReason::WordBatch);
        }
        if now_ms.saturating_sub(dirty_since) >= PROGRESS_SAVE_DEBOUNCE_MS {
            return Some(FlushReason::Debounce);
        }
        None
    }

    pub fn can_flush_now(&self, now_ms: u64) -> bool {
        self.last_flush_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= PROGRESS_SAVE_MIN_SPACING_MS)
    }

    pub fn mark_saved(&mut self, index: usize, now_ms: u64) {
        self.last_saved_index = Some(index);
        self.last_flush_ms = Some(now_ms);
        self.words_since_save = 0;
        self.dirty_since_ms = None;
    }

    /// Failed writes retry after the spacing interval.
    pub fn mark_failed(&mut self, now_ms: u64) {
        self.last_flush_ms = Some(now_ms);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_since_ms.is_some() || self.last_seen_index != self.last_saved_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_save_after_ten_words() {
        let mut sync = ProgressSync::new(Some(0));
        for index in 1..10 {
            assert_eq!(sync.observe(index, true, 1, index as u64 * 100), None);
            assert_eq!(sync.due(index as u64 * 100), None);
        }
        sync.observe(10, true, 1, 1_000);
        assert_eq!(sync.due(1_000), Some(FlushReason::WordBatch));

        sync.mark_saved(10, 1_000);
        assert_eq!(sync.due(1_000), None);
        assert!(!sync.is_dirty());
    }

    #[test]
    fn slow_playback_saves_on_debounce() {
        let mut sync = ProgressSync::new(Some(0));
        sync.observe(1, true, 1, 0);
        assert_eq!(sync.due(4_999), None);
        assert_eq!(sync.due(5_000), Some(FlushReason::Debounce));
    }

    #[test]
    fn pause_forces_a_flush_once() {
        let mut sync = ProgressSync::new(Some(0));
        sync.observe(3, true, 3, 300);
        assert_eq!(sync.observe(3, false, 0, 350), Some(FlushReason::Pause));
        sync.mark_saved(3, 350);
        assert_eq!(sync.observe(3, false, 0, 400), None);
    }

    #[test]
    fn pausing_without_movement_writes_nothing() {
        let mut sync = ProgressSync::new(Some(7));
        sync.observe(7, true, 0, 0);
        assert_eq!(sync.observe(7, false, 0, 10), None);
    }

    #[test]
    fn seeking_while_paused_is_saved_immediately() {
        let mut sync = ProgressSync::new(Some(0));
        assert_eq!(sync.observe(40, false, 0, 10), Some(FlushReason::Navigation));
        sync.mark_saved(40, 10);
        assert_eq!(sync.observe(40, false, 0, 20), None);
    }

    #[test]
    fn spacing_holds_back_batched_writes() {
        let mut sync = ProgressSync::new(Some(0));
        sync.observe(10, true, 10, 0);
        sync.mark_saved(10, 0);
        sync.observe(20, true, 10, 100);
        assert_eq!(sync.due(100), None);
        assert_eq!(sync.due(500), Some(FlushReason::WordBatch));
    }
}
