use anyhow::{Context, Result};
use log::{info, warn};
use rsvp_core::{
    ReaderConfig,
    settings::{PersistedSettings, SettingsStore, load_settings},
};

use super::Cli;

/// Defaults, then the JSON file, then persisted settings, then flags.
pub(super) fn resolve_config<S: SettingsStore>(cli: &Cli, store: &mut S) -> Result<ReaderConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str::<ReaderConfig>(&raw)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => ReaderConfig::default(),
    };

    match load_settings(store, PersistedSettings::from_config(&config)) {
        Ok(Some(saved)) => {
            config = saved.apply_to(config);
            info!("settings: restored target_wpm={}", config.target_wpm);
        }
        Ok(None) => {}
        Err(err) => warn!("settings: load failed err={}", err),
    }

    Ok(apply_flags(cli, config))
}

fn apply_flags(cli: &Cli, mut config: ReaderConfig) -> ReaderConfig {
    if let Some(wpm) = cli.wpm {
        config.target_wpm = rsvp_core::config::clamp_wpm(i64::from(wpm));
    }
    if cli.no_pacing {
        config.natural_pacing = false;
    }
    if let Some(easing) = cli.easing {
        config.easing = easing;
    }
    if let Some(ramp_ms) = cli.ramp_ms {
        config.ramp_duration_ms = ramp_ms;
    }
    config.normalized()
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use rsvp_core::{easing::EasingCurve, settings::KEY_TARGET_WPM, store::MemoryStore};

    use super::*;

    #[test]
    fn flags_win_over_persisted_settings() {
        let mut store = MemoryStore::new();
        store.set_setting(KEY_TARGET_WPM, "480").unwrap();

        let cli = Cli::parse_from(["rsvp-reader", "book.txt"]);
        assert_eq!(resolve_config(&cli, &mut store).unwrap().target_wpm, 480);

        let cli = Cli::parse_from([
            "rsvp-reader",
            "book.txt",
            "--wpm",
            "5000",
            "--no-pacing",
            "--easing",
            "linear",
        ]);
        let config = resolve_config(&cli, &mut store).unwrap();
        assert_eq!(config.target_wpm, 1_000);
        assert!(!config.natural_pacing);
        assert_eq!(config.easing, EasingCurve::Linear);
    }
}
