//! Terminal RSVP reader.
//!
//! ```bash
//! rsvp-reader book.txt
//! rsvp-reader book.txt --wpm 450 --start-page 12
//! RUST_LOG=debug rsvp-reader book.txt --db ~/.rsvp.redb 2>reader.log
//! ```
//!
//! Commands are read line by line from stdin: `p` or a blank line toggles,
//! `h`/`u` hold and release, `f N`/`b N` skip, `g N` seeks, `+`/`-`/`w N`
//! change speed and `q` quits. Ctrl-C quits the same way, saving the
//! position first.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result, bail};
use clap::Parser;
use embassy_futures::select::{Either, Either3, select, select3};
use log::{debug, info};
use rsvp_core::{
    LoadRequest, ReadingSession, SessionPhase, TickResult,
    easing::EasingCurve,
    settings::{PersistedSettings, SettingsSync},
};
use rsvp_store::RedbStore;
use tokio::time::{Interval, MissedTickBehavior};
use tracing_subscriber::EnvFilter;

use clock::Clock;
use commands::StdinCommands;
use loading::LoadingOutcome;
use terminal::TerminalRenderer;

#[path = "main/clock.rs"]
mod clock;
#[path = "main/commands.rs"]
mod commands;
#[path = "main/config.rs"]
mod config;
#[path = "main/loading.rs"]
mod loading;
#[path = "main/shutdown.rs"]
mod shutdown;
#[path = "main/terminal.rs"]
mod terminal;

const REPORT_INTERVAL_MS: u64 = 5_000;

/// Rapid serial visual presentation reader for plain-text documents.
#[derive(Parser)]
#[command(name = "rsvp-reader", version, about)]
struct Cli {
    /// Plain-text document; form feeds separate pages
    file: PathBuf,

    /// Database holding progress, the token cache and settings
    #[arg(long, default_value = "rsvp-reader.redb")]
    db: PathBuf,

    /// JSON file with reader defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target words per minute
    #[arg(long)]
    wpm: Option<u16>,

    /// 1-based page to start from, ignoring saved progress
    #[arg(long)]
    start_page: Option<u32>,

    /// Disable punctuation and word length pauses
    #[arg(long)]
    no_pacing: bool,

    /// Speed ramp curve: linear, easeOutQuad, easeInOutCubic or sigmoid
    #[arg(long)]
    easing: Option<EasingCurve>,

    /// Speed ramp duration in milliseconds, 0 disables the ramp
    #[arg(long)]
    ramp_ms: Option<u32>,
}

/// What woke the event loop.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Wake {
    Input,
    Interrupted,
}

fn new_ticker(tick_interval_ms: u32) -> Interval {
    let mut ticker = tokio::time::interval(Duration::from_millis(u64::from(tick_interval_ms)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut store =
        RedbStore::open(&cli.db).with_context(|| format!("opening {}", cli.db.display()))?;
    let reader_config = config::resolve_config(&cli, &mut store)?;

    let doc_path = std::fs::canonicalize(&cli.file)
        .with_context(|| format!("opening {}", cli.file.display()))?;
    let doc_id = doc_path.display().to_string();
    let request = LoadRequest::new(doc_id).with_start_page(cli.start_page);

    info!(
        "Reader started: doc={} target_wpm={} natural_pacing={} ramp_ms={} easing={}",
        request.doc_id,
        reader_config.target_wpm,
        reader_config.natural_pacing,
        reader_config.ramp_duration_ms,
        reader_config.easing
    );

    let clock = Clock::new();
    let mut renderer = TerminalRenderer::new();
    let mut commands = StdinCommands::spawn();
    let mut session = ReadingSession::new(request, store.clone(), reader_config);
    let mut settings_sync = SettingsSync::new(PersistedSettings::from_config(&reader_config));

    renderer.status("loading...")?;
    let outcome =
        loading::load_document(&mut session, &mut commands, store.clone(), doc_path, &clock)
            .await?;
    match outcome {
        LoadingOutcome::Ready => {}
        LoadingOutcome::Cancelled => {
            renderer.finish()?;
            return Ok(());
        }
        LoadingOutcome::Failed => {
            let message = session
                .error_message()
                .unwrap_or_else(|| "Unable to load document".to_owned());
            renderer.status(&message)?;
            renderer.finish()?;
            bail!(message);
        }
    }

    let mut ticker: Option<Interval> = None;
    let mut report_words = session.total_words_read();
    let mut report_start_ms = clock.now_ms();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut exit = session.view().map_or(Ok(()), |view| renderer.render(&view));
    while exit.is_ok() && session.phase() != &SessionPhase::Closed {
        let wake = if session.wants_ticks() {
            let ticker = ticker.get_or_insert_with(|| new_ticker(reader_config.tick_interval_ms));
            match select3(ticker.tick(), commands.wait(), ctrl_c.as_mut()).await {
                Either3::Third(_) => Wake::Interrupted,
                _ => Wake::Input,
            }
        } else {
            if ticker.take().is_some() {
                debug!("rsvp-engine: tick timer stopped");
            }
            match settings_sync.due_at_ms() {
                Some(due_at_ms) => {
                    let wait_ms = due_at_ms.saturating_sub(clock.now_ms());
                    let debounce = tokio::time::sleep(Duration::from_millis(wait_ms));
                    match select3(debounce, commands.wait(), ctrl_c.as_mut()).await {
                        Either3::Third(_) => Wake::Interrupted,
                        _ => Wake::Input,
                    }
                }
                None => match select(commands.wait(), ctrl_c.as_mut()).await {
                    Either::Second(_) => Wake::Interrupted,
                    Either::First(()) => Wake::Input,
                },
            }
        };
        if wake == Wake::Interrupted {
            info!("Reader interrupted: doc={}", session.doc_id());
            break;
        }

        let now_ms = clock.now_ms();
        if let Some(view) = session.view() {
            commands.set_target_wpm(view.target_wpm);
        }
        let result = session.tick(&mut commands, now_ms, clock.unix_ms());

        if result == TickResult::RenderRequested
            && let Some(view) = session.view()
        {
            exit = renderer.render(&view);
        }

        if let Some(engine) = session.engine() {
            settings_sync.track_current(engine.persisted_settings(), now_ms);
            settings_sync.flush_if_due(&mut store, now_ms);
        }

        let elapsed_ms = now_ms.saturating_sub(report_start_ms);
        if elapsed_ms >= REPORT_INTERVAL_MS {
            let words = session.total_words_read().saturating_sub(report_words);
            let wpm_x100 = words * 6_000_000 / elapsed_ms.max(1);
            debug!(
                "effective_wpm={}.{:02} words={} elapsed_ms={}",
                wpm_x100 / 100,
                wpm_x100 % 100,
                words,
                elapsed_ms
            );
            report_words = session.total_words_read();
            report_start_ms = now_ms;
        }
    }

    shutdown::shut_down(
        &mut session,
        &mut settings_sync,
        &mut store,
        clock.now_ms(),
        clock.unix_ms(),
    );

    info!(
        "Reader closed: doc={} words_read={}",
        session.doc_id(),
        session.total_words_read()
    );
    exit.context("writing to the terminal")?;
    renderer.finish()?;
    Ok(())
}
