//! On-Air terminal dashboard.
//!
//! Wires the relay client, store and poller together and redraws whenever the
//! store publishes a new epoch or the terminal reports input.

#![forbid(unsafe_code)]

use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{Event as TermEvent, EventStream, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;
use futures::StreamExt;
use onair_api::{BaseUrl, HttpApi, RelayApi, DEFAULT_UPSTREAM};
use onair_poller::{PollConfig, Poller, EVENTS_EVERY, NOW_PLAYING_EVERY};
use onair_store::{spawn_store, StoreHandle, ViewState};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;

pub mod app;
pub mod ui;

pub use app::{App, Command};

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub base: BaseUrl,
    pub poll: PollConfig,
    pub timeout: Duration,
    pub page_size: usize,
    pub export_dir: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base: BaseUrl::default(),
            poll: PollConfig::default(),
            timeout: Duration::from_secs(10),
            page_size: onair_core::PAGE_SIZE_DEFAULT,
            export_dir: PathBuf::from("."),
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|s| s.trim().parse::<u64>().ok()).unwrap_or(default)
}

impl DashboardConfig {
    /// Read `ONAIR_*` variables; unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let upstream = std::env::var("ONAIR_UPSTREAM").unwrap_or_else(|_| DEFAULT_UPSTREAM.to_string());
        let relay = std::env::var("ONAIR_RELAY_URL").ok();
        Self {
            base: BaseUrl::from_options(relay, upstream),
            poll: PollConfig::from_millis(
                env_u64("ONAIR_NOW_MS", NOW_PLAYING_EVERY.as_millis() as u64),
                env_u64("ONAIR_EVENTS_MS", EVENTS_EVERY.as_millis() as u64),
            ),
            timeout: Duration::from_millis(env_u64("ONAIR_HTTP_TIMEOUT_MS", 10_000)),
            page_size: env_u64("ONAIR_PAGE_SIZE", onair_core::PAGE_SIZE_DEFAULT as u64).max(1) as usize,
            export_dir: std::env::var("ONAIR_EXPORT_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

type Term = Terminal<CrosstermBackend<Stdout>>;

/// Run the dashboard until the user quits.
pub async fn run(cfg: DashboardConfig) -> Result<()> {
    let api: Arc<dyn RelayApi> = Arc::new(HttpApi::new(cfg.base.clone(), cfg.timeout).context("building http client")?);
    let store = spawn_store(ViewState::new(cfg.page_size), 256);
    let mut poller = Poller::new(api, store.clone(), cfg.poll);
    info!(base = ?cfg.base, page_size = cfg.page_size, "dashboard: starting");
    poller.start();

    let mut terminal = setup_terminal().context("terminal setup")?;
    let res = event_loop(&mut terminal, &store, &cfg).await;
    poller.stop();
    restore_terminal(&mut terminal).context("terminal restore")?;
    info!("dashboard: exited");
    res
}

fn setup_terminal() -> Result<Term> {
    enable_raw_mode()?;
    let mut out = io::stdout();
    out.execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(out))?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Term) -> Result<()> {
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn event_loop(terminal: &mut Term, store: &StoreHandle, cfg: &DashboardConfig) -> Result<()> {
    let mut app = App::new();
    let mut input = EventStream::new();
    let mut epoch = store.subscribe_epoch();
    loop {
        let snap = store.current();
        terminal.draw(|f| ui::draw(f, &snap, &app))?;
        tokio::select! {
            maybe = input.next() => match maybe {
                Some(Ok(TermEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                    match app.handle_key(key, &snap) {
                        Command::Quit => return Ok(()),
                        Command::Dispatch(action) => store.dispatch(action).await?,
                        Command::Export => app.export(&snap, &cfg.export_dir),
                        Command::None => {}
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("reading terminal input"),
                None => return Ok(()),
            },
            changed = epoch.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
        }
    }
}
