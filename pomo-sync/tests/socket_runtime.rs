mod common;

use common::RecordingDisplay;
use pomo_sync::runtime::run;
use pomo_sync::{
    Agent, Collaborators, FileStore, Intent, ManualClock, SilentAlarm, SocketBus, TimerKind,
};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc::unbounded_channel;

fn agent(root: &Path, clock: &ManualClock, display: &RecordingDisplay) -> (Agent, pomo_sync::SocketInbox) {
    let (bus, inbox) = SocketBus::bind(root.join("bus")).unwrap();
    let agent = Agent::new(Collaborators {
        store: Box::new(FileStore::new(root.join("data"))),
        bus: Box::new(bus),
        clock: Box::new(clock.clone()),
        alarm: Box::new(SilentAlarm),
        display: Box::new(display.clone()),
    });
    (agent, inbox)
}

#[tokio::test]
async fn agents_converge_over_sockets_and_files() {
    let root = TempDir::new().unwrap();
    let clock = ManualClock::new(1_000);
    let display_a = RecordingDisplay::default();
    let display_b = RecordingDisplay::default();
    let (mut a, mut inbox_a) = agent(root.path(), &clock, &display_a);
    let (mut b, mut inbox_b) = agent(root.path(), &clock, &display_b);

    let (tx_a, mut intents_a) = unbounded_channel();
    let (tx_b, mut intents_b) = unbounded_channel();
    let (_alarm_tx, mut alarm_a) = unbounded_channel();
    let (_alarm_tx_b, mut alarm_b) = unbounded_channel();

    tx_a.send(Intent::Select(TimerKind::LongBreak)).unwrap();
    tx_a.send(Intent::Start).unwrap();

    let driver = async {
        for _ in 0..200 {
            if display_b.last().is_some_and(|v| v.running) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        drop(tx_a);
        drop(tx_b);
    };

    let tick = Duration::from_millis(20);
    tokio::join!(
        run(&mut a, &mut inbox_a, &mut intents_a, &mut alarm_a, tick),
        run(&mut b, &mut inbox_b, &mut intents_b, &mut alarm_b, tick),
        driver,
    );

    assert!(b.snapshot().running);
    assert_eq!(b.snapshot(), a.snapshot());
    assert_eq!(b.snapshot().end_time_ms, 1_000 + 10 * 60 * 1000);
    assert_eq!(display_b.last().unwrap().clock(), "10:00");

    // A third agent started afterwards resumes from the file store.
    let display_c = RecordingDisplay::default();
    let (c, _inbox_c) = agent(root.path(), &clock, &display_c);
    assert_eq!(c.snapshot(), a.snapshot());
}
