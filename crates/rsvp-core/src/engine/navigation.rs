impl PlaybackEngine {
    /// `Idle | Paused → Ramping`. Ignored while playing or without tokens.
    pub fn play(&mut self, now_ms: u64) -> bool {
        if self.tokens.is_empty() {
            warn!("rsvp-engine: play ignored, empty stream");
            return false;
        }
        if !matches!(self.state, PlaybackState::Idle | PlaybackState::Paused) {
            return false;
        }

        self.started_reading_ms.get_or_insert(now_ms);
        self.enter_ramping(now_ms);
        true
    }

    pub fn pause(&mut self, now_ms: u64) -> bool {
        if !self.state.is_playing() {
            return false;
        }
        debug!(
            "rsvp-engine: pause from={} index={}",
            self.state.as_str(),
            self.current_index
        );
        self.enter_paused(now_ms);
        true
    }

    /// `Paused → Ramping`; always re-ramps from 60 % of the target.
    pub fn resume(&mut self, now_ms: u64) -> bool {
        if self.state != PlaybackState::Paused || self.tokens.is_empty() {
            return false;
        }
        self.enter_ramping(now_ms);
        true
    }

    pub fn toggle(&mut self, now_ms: u64) -> bool {
        match self.state {
            PlaybackState::Idle => self.play(now_ms),
            PlaybackState::Paused => self.resume(now_ms),
            PlaybackState::Ramping
            | PlaybackState::PlayingContinuous
            | PlaybackState::PlayingTemporary => self.pause(now_ms),
        }
    }

    /// Starts the press-and-hold preview from `Idle` or `Paused`.
    pub fn hold_start(&mut self, now_ms: u64) -> bool {
        if self.tokens.is_empty()
            || !matches!(self.state, PlaybackState::Idle | PlaybackState::Paused)
        {
            return false;
        }

        self.hold_return = Some(self.state);
        self.state = PlaybackState::PlayingTemporary;
        self.current_wpm = self.config.target_wpm as f32 * TEMPORARY_RATIO;
        self.paused_at_ms = None;
        self.finished = false;
        self.token_started_ms = Some(now_ms);
        self.started_reading_ms.get_or_insert(now_ms);
        self.pending_redraw = true;
        debug!("rsvp-engine: hold start index={}", self.current_index);
        true
    }

    /// Ends the preview and returns to the state it started from.
    pub fn hold_release(&mut self, now_ms: u64) -> bool {
        if self.state != PlaybackState::PlayingTemporary {
            return false;
        }

        let back = self.hold_return.take().unwrap_or(PlaybackState::Idle);
        self.state = back;
        self.token_started_ms = None;
        if back == PlaybackState::Paused {
            self.paused_at_ms = Some(now_ms);
        }
        self.retarget_speed();
        self.pending_redraw = true;
        debug!(
            "rsvp-engine: hold release to={} index={}",
            back.as_str(),
            self.current_index
        );
        true
    }

    /// Leaves every playing state for good; used when the session closes.
    pub fn stop(&mut self) {
        self.state = PlaybackState::Idle;
        self.hold_return = None;
        self.token_started_ms = None;
        self.pending_redraw = false;
    }

    /// Moves to `index` clamped into the stream. Play state is unchanged;
    /// the per-token clock restarts at `now_ms`.
    pub fn seek_to(&mut self, index: i64, now_ms: u64) {
        if self.tokens.is_empty() {
            return;
        }

        let last = self.tokens.len() - 1;
        let clamped = index.clamp(0, last as i64) as usize;
        if clamped as i64 != index {
            debug!("rsvp-engine: seek clamped requested={} index={}", index, clamped);
        }

        self.current_index = clamped;
        self.current_page_num = self.tokens[clamped].page_num();
        self.token_started_ms = self.state.is_playing().then_some(now_ms);
        self.finished = false;
        self.pending_redraw = true;
    }

    pub fn skip_forward(&mut self, count: usize, now_ms: u64) {
        let target = self.current_index.saturating_add(count);
        self.seek_to(target.min(i64::MAX as usize) as i64, now_ms);
    }

    pub fn skip_backward(&mut self, count: usize, now_ms: u64) {
        self.seek_to(self.current_index.saturating_sub(count) as i64, now_ms);
    }

    /// Clamps into `100..=1000`. A running ramp keeps its curve and heads
    /// for the new target.
    pub fn set_target_wpm(&mut self, wpm: i64) -> u16 {
        let clamped = clamp_wpm(wpm);
        if clamped != self.config.target_wpm {
            debug!(
                "rsvp-engine: target wpm {} -> {}",
                self.config.target_wpm, clamped
            );
            self.config.target_wpm = clamped;
            self.retarget_speed();
            self.pending_redraw = true;
        }
        clamped
    }

    pub fn set_ramp_duration(&mut self, ms: u32) {
        self.config.ramp_duration_ms = ms.min(MAX_RAMP_DURATION_MS);
    }

    pub fn set_easing(&mut self, easing: EasingCurve) {
        self.config.easing = easing;
    }

    pub fn toggle_natural_pacing(&mut self) -> bool {
        self.config.natural_pacing = !self.config.natural_pacing;
        self.config.natural_pacing
    }

    pub fn set_comma_pause_ms(&mut self, ms: u32) {
        self.config.comma_pause_ms = ms.min(MAX_COMMA_PAUSE_MS);
    }

    pub fn set_period_pause_ms(&mut self, ms: u32) {
        self.config.period_pause_ms = ms.min(MAX_PERIOD_PAUSE_MS);
    }

    fn enter_ramping(&mut self, now_ms: u64) {
        let target = self.config.target_wpm as f32;
        self.state = PlaybackState::Ramping;
        self.ramp_started_ms = now_ms;
        self.ramp_start_wpm = ramp_start_wpm(target);
        self.current_wpm = self.ramp_start_wpm;
        self.paused_at_ms = None;
        self.hold_return = None;
        self.finished = false;
        self.token_started_ms = Some(now_ms);
        self.pending_redraw = true;
        debug!(
            "rsvp-engine: ramp start wpm={} target={} index={}",
            self.current_wpm, self.config.target_wpm, self.current_index
        );
    }
}
