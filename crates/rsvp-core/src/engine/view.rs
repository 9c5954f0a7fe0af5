impl PlaybackEngine {
    /// Installs `tokens` parked at `start_index` (clamped) in `Idle`.
    pub fn new(tokens: Vec<Token>, config: ReaderConfig, start_index: usize) -> Self {
        let config = config.normalized();
        let current_index = start_index.min(tokens.len().saturating_sub(1));
        let current_page_num = tokens
            .get(current_index)
            .map_or(1, |token| token.page_num());
        let target = config.target_wpm as f32;

        info!(
            "rsvp-engine: stream installed tokens={} start_index={} page={}",
            tokens.len(),
            current_index,
            current_page_num
        );

        Self {
            tokens,
            config,
            state: PlaybackState::Idle,
            current_index,
            current_page_num,
            current_wpm: target,
            ramp_start_wpm: ramp_start_wpm(target),
            ramp_started_ms: 0,
            token_started_ms: None,
            paused_at_ms: None,
            started_reading_ms: None,
            hold_return: None,
            finished: false,
            pending_redraw: true,
            words_since_drain: 0,
        }
    }

    pub fn view(&self) -> PlaybackView<'_> {
        let total = self.tokens.len();
        let remaining = total.saturating_sub(self.current_index);

        PlaybackView {
            state: self.state,
            is_playing: self.state.is_playing(),
            is_paused: self.state == PlaybackState::Paused,
            finished: self.finished,
            current_token: self.current_token(),
            current_token_index: self.current_index,
            total_tokens: total,
            current_page_num: self.current_page_num,
            current_wpm: self.current_wpm,
            target_wpm: self.config.target_wpm,
            progress_percent: progress_percent(self.current_index, total),
            time_remaining_label: time_remaining_label(remaining, self.current_wpm),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_token(&self) -> Option<&Token> {
        self.tokens.get(self.current_index)
    }

    pub fn current_page_num(&self) -> u32 {
        self.current_page_num
    }

    pub fn current_wpm(&self) -> f32 {
        self.current_wpm
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Wall time since playback first started in this session.
    pub fn reading_elapsed_ms(&self, now_ms: u64) -> u64 {
        self.started_reading_ms
            .map_or(0, |started| now_ms.saturating_sub(started))
    }

    pub fn paused_for_ms(&self, now_ms: u64) -> Option<u64> {
        self.paused_at_ms
            .map(|paused| now_ms.saturating_sub(paused))
    }

    /// Word tokens advanced past since the last drain.
    pub fn drain_word_updates(&mut self) -> u32 {
        let count = self.words_since_drain;
        self.words_since_drain = 0;
        count
    }

    pub fn persisted_settings(&self) -> PersistedSettings {
        PersistedSettings::from_config(&self.config)
    }

    pub fn apply_persisted_settings(&mut self, settings: PersistedSettings) {
        self.config = settings.apply_to(self.config);
        self.retarget_speed();
        self.pending_redraw = true;
    }
}
