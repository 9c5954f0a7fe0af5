//! Persisted user settings over a flat string key/value store.

use core::fmt::Display;

use log::{debug, info, warn};

use crate::{config::ReaderConfig, easing::EasingCurve};

pub const SETTINGS_SAVE_DEBOUNCE_MS: u64 = 1_500;

pub const KEY_TARGET_WPM: &str = "rsvp.target_wpm";
pub const KEY_NATURAL_PACING: &str = "rsvp.natural_pacing";
pub const KEY_COMMA_PAUSE_MS: &str = "rsvp.comma_pause_ms";
pub const KEY_PERIOD_PAUSE_MS: &str = "rsvp.period_pause_ms";
pub const KEY_RAMP_DURATION_MS: &str = "rsvp.ramp_duration_ms";
pub const KEY_EASING: &str = "rsvp.easing";

/// User-tunable settings that should survive a restart.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PersistedSettings {
    pub target_wpm: u16,
    pub natural_pacing: bool,
    pub comma_pause_ms: u32,
    pub period_pause_ms: u32,
    pub ramp_duration_ms: u32,
    pub easing: EasingCurve,
}

impl PersistedSettings {
    pub const fn from_config(config: &ReaderConfig) -> Self {
        Self {
            target_wpm: config.target_wpm,
            natural_pacing: config.natural_pacing,
            comma_pause_ms: config.comma_pause_ms,
            period_pause_ms: config.period_pause_ms,
            ramp_duration_ms: config.ramp_duration_ms,
            easing: config.easing,
        }
    }

    /// Overlays these settings on `config`, keeping its non-persisted fields.
    pub fn apply_to(self, config: ReaderConfig) -> ReaderConfig {
        ReaderConfig {
            target_wpm: self.target_wpm,
            natural_pacing: self.natural_pacing,
            comma_pause_ms: self.comma_pause_ms,
            period_pause_ms: self.period_pause_ms,
            ramp_duration_ms: self.ramp_duration_ms,
            easing: self.easing,
            ..config
        }
        .normalized()
    }

    fn entries(&self) -> [(&'static str, String); 6] {
        [
            (KEY_TARGET_WPM, self.target_wpm.to_string()),
            (KEY_NATURAL_PACING, self.natural_pacing.to_string()),
            (KEY_COMMA_PAUSE_MS, self.comma_pause_ms.to_string()),
            (KEY_PERIOD_PAUSE_MS, self.period_pause_ms.to_string()),
            (KEY_RAMP_DURATION_MS, self.ramp_duration_ms.to_string()),
            (KEY_EASING, self.easing.as_str().to_owned()),
        ]
    }

    fn overlay(&mut self, key: &str, value: &str) -> bool {
        let parsed = match key {
            KEY_TARGET_WPM => value.parse().map(|v| self.target_wpm = v).is_ok(),
            KEY_NATURAL_PACING => value.parse().map(|v| self.natural_pacing = v).is_ok(),
            KEY_COMMA_PAUSE_MS => value.parse().map(|v| self.comma_pause_ms = v).is_ok(),
            KEY_PERIOD_PAUSE_MS => value.parse().map(|v| self.period_pause_ms = v).is_ok(),
            KEY_RAMP_DURATION_MS => value.parse().map(|v| self.ramp_duration_ms = v).is_ok(),
            KEY_EASING => value.parse().map(|v| self.easing = v).is_ok(),
            _ => false,
        };
        if !parsed {
            warn!("settings: ignoring unreadable value key={} value={:?}", key, value);
        }
        parsed
    }
}

/// Abstract flat key/value settings backend.
pub trait SettingsStore {
    type Error: Display;

    fn get_setting(&mut self, key: &str) -> Result<Option<String>, Self::Error>;
    fn set_setting(&mut self, key: &str, value: &str) -> Result<(), Self::Error>;
}

/// Reads every known key over `base`. `None` when nothing was ever saved.
pub fn load_settings<S: SettingsStore>(
    store: &mut S,
    base: PersistedSettings,
) -> Result<Option<PersistedSettings>, S::Error> {
    let mut settings = base;
    let mut found = false;

    for (key, _) in base.entries() {
        if let Some(value) = store.get_setting(key)? {
            found = true;
            settings.overlay(key, &value);
        }
    }

    Ok(found.then_some(settings))
}

pub fn save_settings<S: SettingsStore>(
    store: &mut S,
    settings: &PersistedSettings,
) -> Result<(), S::Error> {
    for (key, value) in settings.entries() {
        store.set_setting(key, &value)?;
    }
    Ok(())
}

/// Debounced settings writer; a failed write stays pending for retry.
pub struct SettingsSync {
    last_saved: PersistedSettings,
    pending: Option<(PersistedSettings, u64)>,
}

impl SettingsSync {
    pub fn new(initial: PersistedSettings) -> Self {
        Self {
            last_saved: initial,
            pending: None,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Monotonic time at which the pending change becomes writable.
    pub fn due_at_ms(&self) -> Option<u64> {
        self.pending
            .map(|(_, changed_at_ms)| changed_at_ms.saturating_add(SETTINGS_SAVE_DEBOUNCE_MS))
    }

    pub fn track_current(&mut self, current: PersistedSettings, now_ms: u64) {
        if current == self.last_saved {
            self.pending = None;
            return;
        }

        match self.pending.as_mut() {
            Some((pending, changed_at_ms)) => {
                if *pending != current {
                    *pending = current;
                    *changed_at_ms = now_ms;
                }
            }
            None => {
                debug!("settings: change pending wpm={}", current.target_wpm);
                self.pending = Some((current, now_ms));
            }
        }
    }

    /// Writes the pending change once it has been stable for the debounce
    /// window. Returns `true` when a write happened.
    pub fn flush_if_due<S: SettingsStore>(&mut self, store: &mut S, now_ms: u64) -> bool {
        let Some((_, changed_at_ms)) = self.pending else {
            return false;
        };

        if now_ms.saturating_sub(changed_at_ms) < SETTINGS_SAVE_DEBOUNCE_MS {
            return false;
        }

        self.flush_now(store, now_ms)
    }

    pub fn flush_now<S: SettingsStore>(&mut self, store: &mut S, now_ms: u64) -> bool {
        let Some((candidate, _)) = self.pending else {
            return false;
        };

        match save_settings(store, &candidate) {
            Ok(()) => {
                info!(
                    "settings: saved wpm={} pacing={} easing={}",
                    candidate.target_wpm, candidate.natural_pacing, candidate.easing
                );
                self.last_saved = candidate;
                self.pending = None;
                true
            }
            Err(err) => {
                warn!("settings: save failed, retrying later err={}", err);
                self.pending = Some((candidate, now_ms));
                false
            }
        }
    }

    pub fn last_saved(&self) -> PersistedSettings {
        self.last_saved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    struct FailingStore;

    impl SettingsStore for FailingStore {
        type Error = &'static str;

        fn get_setting(&mut self, _key: &str) -> Result<Option<String>, Self::Error> {
            Err("unavailable")
        }

        fn set_setting(&mut self, _key: &str, _value: &str) -> Result<(), Self::Error> {
            Err("unavailable")
        }
    }

    fn defaults() -> PersistedSettings {
        PersistedSettings::from_config(&ReaderConfig::default())
    }

    #[test]
    fn empty_store_has_no_settings() {
        let mut store = MemoryStore::new();
        assert_eq!(load_settings(&mut store, defaults()), Ok(None));
    }

    #[test]
    fn saved_settings_load_back() {
        let mut store = MemoryStore::new();
        let settings = PersistedSettings {
            target_wpm: 550,
            natural_pacing: false,
            easing: EasingCurve::Sigmoid,
            ..defaults()
        };
        save_settings(&mut store, &settings).unwrap();

        assert_eq!(load_settings(&mut store, defaults()), Ok(Some(settings)));
        assert_eq!(
            store.get_setting(KEY_TARGET_WPM).unwrap().as_deref(),
            Some("550")
        );
    }

    #[test]
    fn unreadable_values_keep_the_base() {
        let mut store = MemoryStore::new();
        store.set_setting(KEY_TARGET_WPM, "fast").unwrap();
        store.set_setting(KEY_EASING, "linear").unwrap();

        let loaded = load_settings(&mut store, defaults()).unwrap().unwrap();
        assert_eq!(loaded.target_wpm, 300);
        assert_eq!(loaded.easing, EasingCurve::Linear);
    }

    #[test]
    fn sync_waits_for_debounce_window() {
        let mut store = MemoryStore::new();
        let mut sync = SettingsSync::new(defaults());
        let changed = PersistedSettings {
            target_wpm: 400,
            ..defaults()
        };

        assert_eq!(sync.due_at_ms(), None);
        sync.track_current(changed, 1_000);
        assert_eq!(sync.due_at_ms(), Some(2_500));
        assert!(!sync.flush_if_due(&mut store, 2_000));
        assert!(sync.flush_if_due(&mut store, 2_500));
        assert!(!sync.has_pending());
        assert_eq!(sync.due_at_ms(), None);
        assert_eq!(sync.last_saved(), changed);
    }

    #[test]
    fn reverting_a_change_drops_the_pending_write() {
        let mut sync = SettingsSync::new(defaults());
        sync.track_current(
            PersistedSettings {
                target_wpm: 400,
                ..defaults()
            },
            0,
        );
        sync.track_current(defaults(), 100);
        assert!(!sync.has_pending());
    }

    #[test]
    fn failed_save_stays_pending() {
        let mut sync = SettingsSync::new(defaults());
        sync.track_current(
            PersistedSettings {
                target_wpm: 400,
                ..defaults()
            },
            0,
        );

        assert!(!sync.flush_if_due(&mut FailingStore, 5_000));
        assert!(sync.has_pending());
        assert!(!sync.flush_if_due(&mut FailingStore, 5_100));
    }
}
