//! The single-threaded event loop that drives one agent.
//!
//! Ticks, bus payloads, user intents and alarm completions are handled one at
//! a time on the caller's task, so agent handlers never interleave.

use crate::agent::{Agent, Intent};
use crate::error::AlarmError;
use crate::socket::SocketInbox;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, warn};

pub const DEFAULT_TICK: Duration = Duration::from_millis(250);

/// Consecutive receive errors after which the inbox is given up on.
const MAX_RECV_FAILURES: u32 = 8;

pub type AlarmOutcome = Result<(), AlarmError>;

/// Runs until the intent channel closes.
pub async fn run(
    agent: &mut Agent,
    inbox: &mut SocketInbox,
    intents: &mut UnboundedReceiver<Intent>,
    alarm_done: &mut UnboundedReceiver<AlarmOutcome>,
    tick_every: Duration,
) {
    let mut ticker = interval(tick_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut inbox_health = InboxHealth::default();

    loop {
        tokio::select! {
            _ = ticker.tick() => agent.tick(),
            payload = inbox.recv(), if inbox_health.listening() => match payload {
                Ok(payload) => {
                    inbox_health.record_success();
                    agent.on_payload(&payload);
                }
                Err(e) => {
                    warn!("bus receive failed: {}", e);
                    if !inbox_health.record_failure() {
                        // Still ticks and publishes, so peers keep hearing from us.
                        error!("bus inbox keeps failing, no longer listening");
                    }
                }
            },
            intent = intents.recv() => match intent {
                Some(intent) => {
                    debug!(?intent, "intent");
                    agent.apply(intent);
                }
                None => break,
            },
            Some(outcome) = alarm_done.recv() => agent.on_alarm_done(outcome),
        }
    }
    debug!("agent loop finished");
}

/// Counts consecutive inbox failures so a broken socket cannot spin the loop.
#[derive(Debug, Default)]
struct InboxHealth {
    failures: u32,
}

impl InboxHealth {
    fn listening(&self) -> bool {
        self.failures < MAX_RECV_FAILURES
    }

    fn record_success(&mut self) {
        self.failures = 0;
    }

    /// Returns whether the inbox is still worth polling.
    fn record_failure(&mut self) -> bool {
        self.failures += 1;
        self.listening()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbox_given_up_after_consecutive_failures() {
        let mut health = InboxHealth::default();
        for _ in 0..MAX_RECV_FAILURES - 1 {
            assert!(health.record_failure());
        }
        health.record_success();
        for _ in 0..MAX_RECV_FAILURES - 1 {
            assert!(health.record_failure());
        }
        assert!(!health.record_failure());
        assert!(!health.listening());
    }
}
