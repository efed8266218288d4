//! The timer agent: one per running timer process.
//!
//! An agent owns the current [`Snapshot`] and keeps it converged with every
//! other agent on the machine. User intents and expiries mutate the snapshot
//! and immediately go through [`Agent::publish`], which persists it to the
//! store and broadcasts it on the bus in one step. Snapshots received from the
//! bus replace the local one wholesale (last writer wins).
//!
//! Time itself is never broadcast. While running, each agent derives the
//! remaining time from the shared end timestamp on its own tick, so a dropped
//! message can delay an expiry decision by at most one tick but never skews
//! the countdown.

use crate::alarm::AlarmPlayer;
use crate::bus::Bus;
use crate::clock::Clock;
use crate::display::{Display, TimerView};
use crate::error::AlarmError;
use crate::message::{Command, Message};
use crate::settings::Settings;
use crate::snapshot::{Snapshot, TimerKind, MAX_REMAINING_MS};
use crate::store::{Store, SETTINGS_KEY, STATE_KEY};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

/// Everything an agent talks to.
pub struct Collaborators {
    pub store: Box<dyn Store>,
    pub bus: Box<dyn Bus>,
    pub clock: Box<dyn Clock>,
    pub alarm: Box<dyn AlarmPlayer>,
    pub display: Box<dyn Display>,
}

/// A user request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Start,
    Stop,
    Toggle,
    Reset,
    Select(TimerKind),
    SetRemaining(u64),
    UpdateSettings(Settings),
}

/// Why this agent's alarm is sounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AlarmOrigin {
    /// Our own countdown ran out.
    Expiry,
    /// Another agent asked us to play it.
    Request,
}

pub struct Agent {
    snapshot: Snapshot,
    settings: Settings,
    playing: Option<AlarmOrigin>,
    store: Box<dyn Store>,
    bus: Box<dyn Bus>,
    clock: Box<dyn Clock>,
    alarm: Box<dyn AlarmPlayer>,
    display: Box<dyn Display>,
}

impl Agent {
    /// Loads the last known state and settings and draws the first frame.
    ///
    /// A countdown that ran out while no agent was alive expires right here,
    /// before anything is rendered, so a stale or negative time is never shown.
    pub fn new(collaborators: Collaborators) -> Self {
        let Collaborators {
            store,
            bus,
            clock,
            alarm,
            display,
        } = collaborators;

        let mut snapshot = load(&*store, STATE_KEY, Snapshot::from_json).unwrap_or_default();
        // Playback never outlives the agent that started it.
        snapshot.sound_playing = false;
        let settings = load(&*store, SETTINGS_KEY, parse_json::<Settings>).unwrap_or_default();

        let mut agent = Self {
            snapshot,
            settings,
            playing: None,
            store,
            bus,
            clock,
            alarm,
            display,
        };
        agent.display.apply_settings(&agent.settings);

        let now = agent.clock.now_ms();
        if agent.snapshot.is_expired_at(now) {
            info!(kind = ?agent.snapshot.kind, "countdown ran out while no agent was running");
            agent.expire(now);
        } else {
            agent.snapshot.remaining_ms = agent.snapshot.remaining_at(now);
            agent.render();
        }
        agent
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn view(&self) -> TimerView {
        TimerView {
            remaining_ms: self.snapshot.remaining_at(self.clock.now_ms()),
            running: self.snapshot.running,
            kind: self.snapshot.kind,
        }
    }

    pub fn apply(&mut self, intent: Intent) {
        match intent {
            Intent::Start => self.start(),
            Intent::Stop => self.stop(),
            Intent::Toggle => self.toggle(),
            Intent::Reset => self.reset(),
            Intent::Select(kind) => self.select_kind(kind),
            Intent::SetRemaining(ms) => self.set_remaining(ms),
            Intent::UpdateSettings(settings) => self.update_settings(settings),
        }
    }

    /// Starts the countdown. A finished countdown restarts at full length.
    pub fn start(&mut self) {
        if self.snapshot.running {
            debug!("start ignored, already running");
            return;
        }
        if self.snapshot.remaining_ms == 0 {
            self.snapshot.remaining_ms = self.snapshot.kind.duration_ms();
        }
        let now = self.clock.now_ms();
        self.snapshot.end_time_ms = now.saturating_add(self.snapshot.remaining_ms);
        self.snapshot.running = true;
        info!(kind = ?self.snapshot.kind, remaining_ms = self.snapshot.remaining_ms, "timer started");
        self.publish();
    }

    /// Freezes the remaining time. Also silences the alarm.
    pub fn stop(&mut self) {
        if !self.snapshot.running {
            debug!("stop ignored, not running");
            return;
        }
        let now = self.clock.now_ms();
        self.snapshot.remaining_ms = self.snapshot.remaining_at(now);
        self.snapshot.end_time_ms = 0;
        self.snapshot.running = false;
        self.silence();
        info!(kind = ?self.snapshot.kind, remaining_ms = self.snapshot.remaining_ms, "timer stopped");
        self.publish();
    }

    pub fn toggle(&mut self) {
        if self.snapshot.running {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Stops and restores the full duration of the selected kind.
    pub fn reset(&mut self) {
        self.snapshot = Snapshot::stopped(self.snapshot.kind);
        self.silence();
        info!(kind = ?self.snapshot.kind, "timer reset");
        self.publish();
    }

    /// Selects `kind` at full duration, keeping the running state.
    /// Selecting the current kind restarts it from the top.
    pub fn select_kind(&mut self, kind: TimerKind) {
        self.snapshot.kind = kind;
        self.set_remaining_inner(kind.duration_ms());
        info!(?kind, running = self.snapshot.running, "timer selected");
        self.publish();
    }

    /// Overrides the remaining time, mostly to fast-forward to an expiry.
    pub fn set_remaining(&mut self, remaining_ms: u64) {
        self.set_remaining_inner(remaining_ms);
        info!(remaining_ms, "remaining time overridden");
        self.publish();
    }

    fn set_remaining_inner(&mut self, remaining_ms: u64) {
        if remaining_ms > MAX_REMAINING_MS {
            warn!(remaining_ms, "remaining time clamped to {} ms", MAX_REMAINING_MS);
        }
        let remaining_ms = remaining_ms.min(MAX_REMAINING_MS);
        self.snapshot.remaining_ms = remaining_ms;
        if self.snapshot.running {
            // Keep the end strictly positive so the snapshot stays valid.
            self.snapshot.end_time_ms = self.clock.now_ms().saturating_add(remaining_ms).max(1);
        }
    }

    /// Settings are local: stored for the next start, never broadcast.
    pub fn update_settings(&mut self, settings: Settings) {
        self.settings = settings;
        match serde_json::to_string(&self.settings) {
            Ok(raw) => {
                if let Err(e) = self.store.set(SETTINGS_KEY, &raw) {
                    warn!("could not save settings: {}", e);
                }
            }
            Err(e) => warn!("could not encode settings: {}", e),
        }
        self.display.apply_settings(&self.settings);
        self.render();
    }

    /// Periodic reconciliation against the clock.
    pub fn tick(&mut self) {
        if !self.snapshot.running {
            return;
        }
        let now = self.clock.now_ms();
        if self.snapshot.is_expired_at(now) {
            self.expire(now);
        } else {
            self.snapshot.remaining_ms = self.snapshot.remaining_at(now);
            self.render();
        }
    }

    fn expire(&mut self, now: u64) {
        let finished = self.snapshot.kind;
        let (next, keep_running) = finished.after_expiry();
        info!(?finished, ?next, keep_running, "countdown finished");

        let delegate = self.sound_alarm(finished);

        self.snapshot.kind = next;
        self.snapshot.remaining_ms = next.duration_ms();
        self.snapshot.running = keep_running;
        self.snapshot.end_time_ms = if keep_running {
            now.saturating_add(next.duration_ms())
        } else {
            0
        };
        self.publish();

        if delegate {
            self.request_remote_alarm();
        }
    }

    /// Returns true when playback was blocked here and another agent should try.
    fn sound_alarm(&mut self, finished: TimerKind) -> bool {
        if self.snapshot.sound_playing || self.playing.is_some() {
            debug!("alarm already sounding");
            return false;
        }
        if !self.settings.alarm_enabled_for(finished) {
            debug!(?finished, "alarm disabled in settings");
            return false;
        }
        match self.alarm.play() {
            Ok(()) => {
                self.playing = Some(AlarmOrigin::Expiry);
                self.snapshot.sound_playing = true;
                false
            }
            Err(AlarmError::PlaybackBlocked) => {
                warn!("alarm blocked here, asking other agents to play it");
                true
            }
            Err(e) => {
                warn!("alarm skipped: {}", e);
                false
            }
        }
    }

    /// Completion of playback started by this agent.
    pub fn on_alarm_done(&mut self, outcome: Result<(), AlarmError>) {
        let Some(origin) = self.playing.take() else {
            // Already silenced by a stop or a foreign snapshot.
            return;
        };
        let delegate = match outcome {
            Ok(()) => {
                debug!("alarm finished");
                false
            }
            Err(AlarmError::PlaybackBlocked) if origin == AlarmOrigin::Expiry => {
                warn!("alarm blocked here, asking other agents to play it");
                true
            }
            Err(e) => {
                warn!("alarm failed: {}", e);
                false
            }
        };
        self.snapshot.sound_playing = false;
        self.publish();
        if delegate {
            self.request_remote_alarm();
        }
    }

    /// Call before dropping the agent. An alarm sounding here is stopped and
    /// the cleared flag published, or every other agent would keep skipping
    /// its alarms on a flag nobody is left to clear.
    pub fn shutdown(&mut self) {
        if self.playing.is_none() {
            return;
        }
        info!("stopping alarm on shutdown");
        self.silence();
        self.publish();
    }

    fn silence(&mut self) {
        if self.playing.take().is_some() {
            self.alarm.stop();
        }
        self.snapshot.sound_playing = false;
    }

    fn request_remote_alarm(&mut self) {
        let message = Message::Command {
            name: Command::PlayAlarm,
        };
        if let Err(e) = self.bus.publish(&message) {
            warn!("could not ask other agents for the alarm: {}", e);
        }
    }

    /// Raw payload from the bus. Anything undecodable is dropped.
    pub fn on_payload(&mut self, payload: &[u8]) {
        match Message::decode(payload) {
            Ok(message) => self.on_message(message),
            Err(e) => warn!("discarding bus message: {}", e),
        }
    }

    pub fn on_message(&mut self, message: Message) {
        match message {
            Message::State { snapshot } => self.adopt(snapshot),
            Message::Command {
                name: Command::PlayAlarm,
            } => self.play_requested_alarm(),
        }
    }

    fn adopt(&mut self, snapshot: Snapshot) {
        if let Err(e) = snapshot.validate() {
            warn!("discarding foreign snapshot: {}", e);
            return;
        }
        if !snapshot.sound_playing && self.playing.take().is_some() {
            debug!("alarm silenced by another agent");
            self.alarm.stop();
        }
        debug!(kind = ?snapshot.kind, running = snapshot.running, "adopting foreign snapshot");
        self.snapshot = snapshot;
        self.persist();
        self.render();
    }

    fn play_requested_alarm(&mut self) {
        if self.playing.is_some() || self.snapshot.sound_playing {
            debug!("alarm request ignored, already sounding");
            return;
        }
        match self.alarm.play() {
            Ok(()) => {
                info!("playing alarm for another agent");
                self.playing = Some(AlarmOrigin::Request);
                self.snapshot.sound_playing = true;
                self.publish();
            }
            // Never re-broadcast: if nobody can play it, it is skipped.
            Err(e) => debug!("cannot play requested alarm: {}", e),
        }
    }

    /// Persists and broadcasts the current snapshot, then redraws.
    ///
    /// This is the only way a local change leaves the agent, so the store and
    /// the bus can never disagree about what this agent last decided.
    pub fn publish(&mut self) {
        self.persist();
        let message = Message::State {
            snapshot: self.snapshot.clone(),
        };
        if let Err(e) = self.bus.publish(&message) {
            warn!("broadcast failed: {}", e);
        }
        self.render();
    }

    fn persist(&self) {
        let result = self
            .snapshot
            .to_json()
            .and_then(|raw| self.store.set(STATE_KEY, &raw));
        if let Err(e) = result {
            warn!("could not persist timer state: {}", e);
        }
    }

    fn render(&mut self) {
        let view = self.view();
        self.display.render(&view);
    }
}

fn parse_json<T: DeserializeOwned>(raw: &str) -> crate::error::Result<T> {
    Ok(serde_json::from_str(raw)?)
}

/// Reads `key`, treating a missing entry, an unreadable store or bad data
/// all as "nothing stored".
fn load<T>(
    store: &dyn Store,
    key: &str,
    parse: impl FnOnce(&str) -> crate::error::Result<T>,
) -> Option<T> {
    let raw = match store.get(key) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!(key, "store unavailable, using defaults: {}", e);
            return None;
        }
    };
    match parse(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, "discarding stored value: {}", e);
            None
        }
    }
}
