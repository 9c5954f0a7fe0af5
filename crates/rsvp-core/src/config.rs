//! Playback tuning shared by the engine, the settings layer and the host.

use serde::{Deserialize, Serialize};

use crate::{easing::EasingCurve, timing::TIMING_TOLERANCE_MS};

pub const MIN_WPM: u16 = 100;
pub const MAX_WPM: u16 = 1_000;
pub const MAX_RAMP_DURATION_MS: u32 = 5_000;
pub const MAX_COMMA_PAUSE_MS: u32 = 500;
pub const MAX_PERIOD_PAUSE_MS: u32 = 1_000;
pub const DEFAULT_TICK_INTERVAL_MS: u32 = 16;
const MAX_TICK_INTERVAL_MS: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReaderConfig {
    pub target_wpm: u16,
    pub natural_pacing: bool,
    pub comma_pause_ms: u32,
    pub period_pause_ms: u32,
    /// Zero disables ramping.
    pub ramp_duration_ms: u32,
    pub easing: EasingCurve,
    pub tick_interval_ms: u32,
    pub timing_tolerance_ms: u32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            target_wpm: 300,
            natural_pacing: true,
            comma_pause_ms: 50,
            period_pause_ms: 200,
            ramp_duration_ms: 2_000,
            easing: EasingCurve::EaseOutQuad,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            timing_tolerance_ms: TIMING_TOLERANCE_MS,
        }
    }
}

impl ReaderConfig {
    /// Clamps every field into its supported range.
    pub fn normalized(mut self) -> Self {
        self.target_wpm = clamp_wpm(self.target_wpm as i64);
        self.comma_pause_ms = self.comma_pause_ms.min(MAX_COMMA_PAUSE_MS);
        self.period_pause_ms = self.period_pause_ms.min(MAX_PERIOD_PAUSE_MS);
        self.ramp_duration_ms = self.ramp_duration_ms.min(MAX_RAMP_DURATION_MS);
        self.tick_interval_ms = self.tick_interval_ms.clamp(1, MAX_TICK_INTERVAL_MS);
        // Tolerance wider than a tick would let two deadlines collapse into one.
        self.timing_tolerance_ms = self.timing_tolerance_ms.min(self.tick_interval_ms);
        self
    }
}

pub fn clamp_wpm(wpm: i64) -> u16 {
    wpm.clamp(MIN_WPM as i64, MAX_WPM as i64) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_clamps_out_of_range_fields() {
        let config = ReaderConfig {
            target_wpm: 5_000,
            comma_pause_ms: 9_999,
            period_pause_ms: 9_999,
            ramp_duration_ms: 60_000,
            tick_interval_ms: 0,
            timing_tolerance_ms: 50,
            ..ReaderConfig::default()
        }
        .normalized();

        assert_eq!(config.target_wpm, MAX_WPM);
        assert_eq!(config.comma_pause_ms, 500);
        assert_eq!(config.period_pause_ms, 1_000);
        assert_eq!(config.ramp_duration_ms, 5_000);
        assert_eq!(config.tick_interval_ms, 1);
        assert_eq!(config.timing_tolerance_ms, 1);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: ReaderConfig =
            serde_json::from_str(r#"{"targetWpm": 450, "easing": "sigmoid"}"#).unwrap();
        assert_eq!(config.target_wpm, 450);
        assert_eq!(config.easing, EasingCurve::Sigmoid);
        assert_eq!(config.period_pause_ms, 200);
        assert!(config.natural_pacing);
    }

    #[test]
    fn default_is_already_normalized() {
        assert_eq!(ReaderConfig::default().normalized(), ReaderConfig::default());
    }
}
