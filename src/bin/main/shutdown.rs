use log::warn;
use rsvp_core::{
    ReadingSession,
    input::ReaderCommand,
    progress::ProgressStore,
    settings::{SettingsStore, SettingsSync},
};

/// Closes the session, which writes the reading position, then saves any
/// settings change still inside its debounce window. Safe to call on an
/// already closed session.
pub(super) fn shut_down<P, S>(
    session: &mut ReadingSession<P>,
    settings_sync: &mut SettingsSync,
    settings: &mut S,
    now_ms: u64,
    now_unix_ms: u64,
) where
    P: ProgressStore,
    S: SettingsStore,
{
    session.apply(ReaderCommand::Close, now_ms, now_unix_ms);

    if let Some(engine) = session.engine() {
        settings_sync.track_current(engine.persisted_settings(), now_ms);
    }
    if settings_sync.has_pending() && !settings_sync.flush_now(settings, now_ms) {
        warn!("settings: final save failed");
    }
}

#[cfg(test)]
mod tests {
    use rsvp_core::{
        LoadRequest, ReaderConfig, SessionPhase,
        extract::PlainTextExtractor,
        load_token_stream,
        settings::{KEY_TARGET_WPM, PersistedSettings},
        store::MemoryStore,
    };

    use super::*;

    fn playing_session(config: ReaderConfig) -> ReadingSession<MemoryStore> {
        let text = (0..40).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let mut session = ReadingSession::new(LoadRequest::new("doc"), MemoryStore::new(), config);
        let ticket = session.begin_loading().unwrap();
        let stream = load_token_stream(
            &mut PlainTextExtractor::from_bytes(text),
            &mut MemoryStore::new(),
            &ticket.request,
            0,
        );
        session.install(ticket, stream).unwrap();
        session.apply(ReaderCommand::Play, 0, 0);
        session
    }

    #[test]
    fn interrupt_mid_playback_keeps_position_and_settings() {
        let config = ReaderConfig::default();
        let mut session = playing_session(config);
        let mut sync = SettingsSync::new(PersistedSettings::from_config(&config));
        let mut settings = MemoryStore::new();

        session.apply(ReaderCommand::SkipForward(7), 10, 10);
        session.apply(ReaderCommand::SetWpm(450), 20, 20);
        assert!(session.wants_ticks());

        shut_down(&mut session, &mut sync, &mut settings, 30, 1_700_000_000_000);

        assert_eq!(session.phase(), &SessionPhase::Closed);
        assert!(!sync.has_pending());
        assert_eq!(
            settings.get_setting(KEY_TARGET_WPM).unwrap().as_deref(),
            Some("450")
        );
        let saved = session
            .into_progress_store()
            .load_progress("doc")
            .unwrap()
            .unwrap();
        assert_eq!(saved.current_token_index, 7);
        assert_eq!(saved.last_update_time, 1_700_000_000_000);
    }

    #[test]
    fn second_shutdown_writes_nothing_new() {
        let config = ReaderConfig::default();
        let mut session = playing_session(config);
        let mut sync = SettingsSync::new(PersistedSettings::from_config(&config));
        let mut settings = MemoryStore::new();

        shut_down(&mut session, &mut sync, &mut settings, 30, 30);
        let mut store = session.into_progress_store();
        let writes = store.progress_writes();
        assert!(store.load_progress("doc").unwrap().is_some());

        let mut session = ReadingSession::new(LoadRequest::new("doc"), store, config);
        shut_down(&mut session, &mut sync, &mut settings, 40, 40);
        assert_eq!(session.into_progress_store().progress_writes(), writes);
        assert!(settings.get_setting(KEY_TARGET_WPM).unwrap().is_none());
    }
}
