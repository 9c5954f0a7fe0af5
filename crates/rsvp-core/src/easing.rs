//! Speed ramp curves.

use core::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Playback starts at this share of the target speed and accelerates.
pub const RAMP_START_RATIO: f32 = 0.6;
/// Fixed speed share used while holding for a temporary preview.
pub const TEMPORARY_RATIO: f32 = 0.7;

const SIGMOID_STEEPNESS: f32 = 10.0;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EasingCurve {
    Linear,
    #[default]
    EaseOutQuad,
    EaseInOutCubic,
    Sigmoid,
}

impl EasingCurve {
    pub const ALL: [Self; 4] = [
        Self::Linear,
        Self::EaseOutQuad,
        Self::EaseInOutCubic,
        Self::Sigmoid,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::EaseOutQuad => "easeOutQuad",
            Self::EaseInOutCubic => "easeInOutCubic",
            Self::Sigmoid => "sigmoid",
        }
    }

    /// Maps `t` in `0..=1` onto the curve; input is clamped.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Self::Sigmoid => 1.0 / (1.0 + (-SIGMOID_STEEPNESS * (t - 0.5)).exp()),
        }
    }
}

impl fmt::Display for EasingCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown easing curve `{0}`")]
pub struct UnknownEasing(pub String);

impl FromStr for EasingCurve {
    type Err = UnknownEasing;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|curve| curve.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownEasing(s.to_owned()))
    }
}

pub fn ramp_start_wpm(target_wpm: f32) -> f32 {
    target_wpm * RAMP_START_RATIO
}

/// Interpolated speed `elapsed_ms` into a ramp of `duration_ms`.
///
/// Exactly `target_wpm` once the ramp is complete.
pub fn ramped_wpm(
    start_wpm: f32,
    target_wpm: f32,
    elapsed_ms: u64,
    duration_ms: u32,
    curve: EasingCurve,
) -> f32 {
    if is_ramp_complete(elapsed_ms, duration_ms) {
        return target_wpm;
    }
    let t = elapsed_ms as f32 / duration_ms as f32;
    start_wpm + (target_wpm - start_wpm) * curve.apply(t)
}

pub const fn is_ramp_complete(elapsed_ms: u64, duration_ms: u32) -> bool {
    elapsed_ms >= duration_ms as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curves_hit_both_endpoints() {
        for curve in [EasingCurve::Linear, EasingCurve::EaseOutQuad, EasingCurve::EaseInOutCubic] {
            assert_eq!(curve.apply(0.0), 0.0, "{curve}");
            assert_eq!(curve.apply(1.0), 1.0, "{curve}");
        }
        assert!(EasingCurve::Sigmoid.apply(0.0) < 0.01);
        assert!(EasingCurve::Sigmoid.apply(1.0) > 0.99);
        assert!((EasingCurve::Sigmoid.apply(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn ease_out_quad_ramp_is_monotonic_and_lands_on_target() {
        let mut previous = 0.0f32;
        for elapsed in (0..=2_400).step_by(16) {
            let wpm = ramped_wpm(180.0, 300.0, elapsed, 2_000, EasingCurve::EaseOutQuad);
            assert!(wpm >= previous, "elapsed={elapsed} wpm={wpm} previous={previous}");
            previous = wpm;
            if elapsed >= 2_000 {
                assert_eq!(wpm, 300.0);
            }
        }
    }

    #[test]
    fn every_curve_is_monotonic() {
        for curve in EasingCurve::ALL {
            let mut previous = curve.apply(0.0);
            for step in 1..=100 {
                let eased = curve.apply(step as f32 / 100.0);
                assert!(eased >= previous, "{curve} step={step}");
                previous = eased;
            }
        }
    }

    #[test]
    fn zero_duration_ramp_is_already_complete() {
        assert!(is_ramp_complete(0, 0));
        assert_eq!(ramped_wpm(180.0, 300.0, 0, 0, EasingCurve::Linear), 300.0);
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for curve in EasingCurve::ALL {
            assert_eq!(curve.as_str().parse::<EasingCurve>(), Ok(curve));
        }
        assert_eq!("EASEOUTQUAD".parse::<EasingCurve>(), Ok(EasingCurve::EaseOutQuad));
        assert!("bounce".parse::<EasingCurve>().is_err());
    }
}
