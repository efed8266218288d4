use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use pomo_sync::{paths, runtime, Agent, Collaborators, FileStore, Intent, SocketBus, SystemClock};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod alarm;
mod app;
mod config;
mod ui;

use alarm::NotifyAlarm;
use app::{Action, Keymap};
use ui::TuiDisplay;

/// Puts the terminal back however `main` exits.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    }
}

fn init_logging(data_dir: &std::path::Path) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let log_path = data_dir.join("pomo.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file at {:?}", log_path))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("POMO_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Blocking key reader. Returning drops the sender, which ends the agent loop.
fn read_keys(mut keymap: Keymap, intents: UnboundedSender<Intent>) {
    loop {
        let key = match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => key,
            Ok(_) => continue,
            Err(_) => return,
        };
        match keymap.handle(key) {
            Some(Action::Quit) => return,
            Some(Action::Intent(intent)) => {
                if intents.send(intent).is_err() {
                    return;
                }
            }
            None => {}
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let data_dir = paths::data_dir()?;
    init_logging(&data_dir)?;
    let config = config::load_config()?;

    let bus_dir = paths::bus_dir()?;
    let (bus, mut inbox) = SocketBus::bind(&bus_dir)
        .with_context(|| format!("Failed to join the timer bus in {:?}", bus_dir))?;
    info!(socket = %bus.path().display(), "pomo starting");

    // Setup terminal
    let guard = TerminalGuard::enter()?;
    let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    let (alarm_tx, mut alarm_rx) = unbounded_channel();
    let (intent_tx, mut intent_rx) = unbounded_channel();

    let mut agent = Agent::new(Collaborators {
        store: Box::new(FileStore::new(&data_dir)),
        bus: Box::new(bus),
        clock: Box::new(SystemClock),
        alarm: Box::new(NotifyAlarm::new(alarm_tx, config.alarm_duration())),
        display: Box::new(TuiDisplay::new(terminal, config.clone())),
    });

    let keymap = Keymap::new(agent.settings().clone(), config.clone());
    std::thread::spawn(move || read_keys(keymap, intent_tx));

    runtime::run(
        &mut agent,
        &mut inbox,
        &mut intent_rx,
        &mut alarm_rx,
        config.tick_interval(),
    )
    .await;

    agent.shutdown();
    drop(agent);
    drop(guard);
    info!("pomo stopped");
    Ok(())
}
