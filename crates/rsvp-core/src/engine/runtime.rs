impl PlaybackEngine {
    /// Advances playback to `now_ms`. At most one token advance per call.
    pub fn tick(&mut self, now_ms: u64) -> TickResult {
        if !self.state.is_playing() {
            return self.take_redraw();
        }

        if self.current_token().is_none() {
            warn!(
                "rsvp-engine: no current token, pausing index={} tokens={}",
                self.current_index,
                self.tokens.len()
            );
            self.enter_paused(now_ms);
            return TickResult::RenderRequested;
        }

        if self.state == PlaybackState::Ramping {
            self.tick_ramp(now_ms);
        }

        let Some(started_ms) = self.token_started_ms else {
            self.token_started_ms = Some(now_ms);
            return self.take_redraw();
        };

        let duration_ms = self.current_duration_ms();
        let elapsed_ms = now_ms.saturating_sub(started_ms);
        if !should_advance(elapsed_ms, duration_ms, self.config.timing_tolerance_ms) {
            return self.take_redraw();
        }

        self.advance_token(now_ms, started_ms + duration_ms as u64);
        self.pending_redraw = false;
        TickResult::RenderRequested
    }

    fn tick_ramp(&mut self, now_ms: u64) {
        let elapsed_ms = now_ms.saturating_sub(self.ramp_started_ms);
        let target = self.config.target_wpm as f32;

        if is_ramp_complete(elapsed_ms, self.config.ramp_duration_ms) {
            self.state = PlaybackState::PlayingContinuous;
            self.current_wpm = target;
            debug!(
                "rsvp-engine: ramp complete wpm={} elapsed_ms={}",
                self.config.target_wpm, elapsed_ms
            );
            return;
        }

        self.current_wpm = ramped_wpm(
            self.ramp_start_wpm,
            target,
            elapsed_ms,
            self.config.ramp_duration_ms,
            self.config.easing,
        );
    }

    /// Display duration of the current token at the current speed.
    pub fn current_duration_ms(&self) -> u32 {
        let Some(token) = self.current_token() else {
            return 0;
        };
        display_duration_ms(token, self.current_wpm, self.pacing())
    }

    fn pacing(&self) -> Pacing {
        Pacing {
            enabled: self.config.natural_pacing,
            comma_pause_ms: self.config.comma_pause_ms,
            period_pause_ms: self.config.period_pause_ms,
        }
    }

    fn advance_token(&mut self, now_ms: u64, deadline_ms: u64) {
        if self
            .current_token()
            .is_some_and(|token| token.kind.counts_as_word())
        {
            self.words_since_drain = self.words_since_drain.saturating_add(1);
        }

        let next_index = self.current_index + 1;
        if next_index >= self.tokens.len() {
            info!(
                "rsvp-engine: end of stream index={} tokens={}",
                self.current_index,
                self.tokens.len()
            );
            self.finished = true;
            self.enter_paused(now_ms);
            return;
        }

        self.current_index = next_index;
        if let Some(token) = self.tokens.get(next_index) {
            self.current_page_num = token.page_num();
        }

        // Early or on-time advances keep the schedule; late ones restart it.
        let tolerance_ms = self.config.timing_tolerance_ms as u64;
        self.token_started_ms = if now_ms <= deadline_ms + tolerance_ms {
            Some(deadline_ms)
        } else {
            Some(now_ms)
        };
    }

    fn enter_paused(&mut self, now_ms: u64) {
        self.state = PlaybackState::Paused;
        self.paused_at_ms = Some(now_ms);
        self.hold_return = None;
        self.token_started_ms = None;
        self.pending_redraw = true;
    }

    /// Re-derives the current speed after the target or state changed.
    fn retarget_speed(&mut self) {
        let target = self.config.target_wpm as f32;
        match self.state {
            PlaybackState::Ramping => {}
            PlaybackState::PlayingTemporary => self.current_wpm = target * TEMPORARY_RATIO,
            PlaybackState::Idle | PlaybackState::PlayingContinuous | PlaybackState::Paused => {
                self.current_wpm = target;
            }
        }
    }

    fn take_redraw(&mut self) -> TickResult {
        if self.pending_redraw {
            self.pending_redraw = false;
            TickResult::RenderRequested
        } else {
            TickResult::NoRender
        }
    }
}
