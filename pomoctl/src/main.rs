use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use pomo_sync::runtime::{self, DEFAULT_TICK};
use pomo_sync::{
    paths, Agent, Collaborators, Display, FileStore, Intent, SilentAlarm, SocketBus, SocketInbox,
    SystemClock, TimerKind, TimerView,
};
use tokio::sync::mpsc::unbounded_channel;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pomoctl")]
#[command(about = "Control the pomo timer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the timer
    Start,
    /// Stop the timer, keeping the time left
    Stop,
    /// Start when stopped, stop when running
    Toggle,
    /// Stop and restore the full duration
    Reset,
    /// Switch to the focus timer
    Focus,
    /// Switch to the short break
    Short,
    /// Switch to the long break
    Long,
    /// Make the current countdown run out in a few seconds
    ExpireIn { seconds: u64 },
    /// Get timer status
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Follow the timer until interrupted
    Watch,
}

/// Prints one line per visible change. Silent for one-shot commands.
struct LineDisplay {
    echo: bool,
    last: Option<String>,
}

impl Display for LineDisplay {
    fn render(&mut self, view: &TimerView) {
        if !self.echo {
            return;
        }
        let line = describe(view);
        if self.last.as_ref() != Some(&line) {
            println!("{line}");
            self.last = Some(line);
        }
    }
}

fn describe(view: &TimerView) -> String {
    let state = if view.running { "running" } else { "stopped" };
    format!("{:<11} {} {}", view.kind.label(), view.clock(), state)
}

fn join(echo: bool) -> Result<(Agent, SocketInbox)> {
    let data_dir = paths::data_dir()?;
    let bus_dir = paths::bus_dir()?;
    let (bus, inbox) = SocketBus::bind(&bus_dir)
        .with_context(|| format!("Failed to join the timer bus in {:?}", bus_dir))?;
    let agent = Agent::new(Collaborators {
        store: Box::new(FileStore::new(data_dir)),
        bus: Box::new(bus),
        clock: Box::new(SystemClock),
        alarm: Box::new(SilentAlarm),
        display: Box::new(LineDisplay { echo, last: None }),
    });
    Ok((agent, inbox))
}

fn print_status(agent: &Agent, json: bool) -> Result<()> {
    let snapshot = agent.snapshot();
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
        return Ok(());
    }
    println!("{}", describe(&agent.view()));
    if snapshot.running {
        let end = i64::try_from(snapshot.end_time_ms)
            .ok()
            .and_then(|ms| Local.timestamp_millis_opt(ms).single());
        if let Some(end) = end {
            println!("ends at {}", end.format("%H:%M:%S"));
        }
    }
    if snapshot.sound_playing {
        println!("alarm sounding");
    }
    Ok(())
}

async fn watch() -> Result<()> {
    let (mut agent, mut inbox) = join(true)?;
    let (intent_tx, mut intent_rx) = unbounded_channel::<Intent>();
    let (_alarm_tx, mut alarm_rx) = unbounded_channel();

    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        drop(intent_tx);
    });

    runtime::run(&mut agent, &mut inbox, &mut intent_rx, &mut alarm_rx, DEFAULT_TICK).await;
    agent.shutdown();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("POMO_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let intent = match intent_for(&cli.command) {
        Some(intent) => intent,
        None => match cli.command {
            Commands::Status { json } => {
                let (agent, _inbox) = join(false)?;
                return print_status(&agent, json);
            }
            _ => return watch().await,
        },
    };

    let (mut agent, _inbox) = join(false)?;
    agent.apply(intent);
    print_status(&agent, false)
}

/// Convert CLI command to an agent intent. `status` and `watch` have none.
fn intent_for(command: &Commands) -> Option<Intent> {
    let intent = match command {
        Commands::Start => Intent::Start,
        Commands::Stop => Intent::Stop,
        Commands::Toggle => Intent::Toggle,
        Commands::Reset => Intent::Reset,
        Commands::Focus => Intent::Select(TimerKind::Focus),
        Commands::Short => Intent::Select(TimerKind::ShortBreak),
        Commands::Long => Intent::Select(TimerKind::LongBreak),
        Commands::ExpireIn { seconds } => Intent::SetRemaining(seconds.saturating_mul(1000)),
        Commands::Status { .. } | Commands::Watch => return None,
    };
    Some(intent)
}
