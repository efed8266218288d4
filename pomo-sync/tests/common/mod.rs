#![allow(dead_code)]

use pomo_sync::{
    Agent, AlarmError, AlarmPlayer, Collaborators, Display, ManualClock, MemoryBus,
    MemoryEndpoint, MemoryStore, Settings, Store, TimerView,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const MIN: u64 = 60 * 1000;

#[derive(Default)]
pub struct AlarmLog {
    pub plays: usize,
    pub stops: usize,
    /// Answers for upcoming `play` calls. Empty means `Ok(())`.
    pub answers: VecDeque<Result<(), AlarmError>>,
}

#[derive(Clone, Default)]
pub struct RecordingAlarm(pub Arc<Mutex<AlarmLog>>);

impl RecordingAlarm {
    pub fn plays(&self) -> usize {
        self.0.lock().unwrap().plays
    }

    pub fn stops(&self) -> usize {
        self.0.lock().unwrap().stops
    }

    pub fn answer_next(&self, answer: Result<(), AlarmError>) {
        self.0.lock().unwrap().answers.push_back(answer);
    }

    pub fn always_block(&self) {
        let mut log = self.0.lock().unwrap();
        for _ in 0..16 {
            log.answers.push_back(Err(AlarmError::PlaybackBlocked));
        }
    }
}

impl AlarmPlayer for RecordingAlarm {
    fn play(&mut self) -> Result<(), AlarmError> {
        let mut log = self.0.lock().unwrap();
        log.plays += 1;
        log.answers.pop_front().unwrap_or(Ok(()))
    }

    fn stop(&mut self) {
        self.0.lock().unwrap().stops += 1;
    }
}

#[derive(Clone, Default)]
pub struct RecordingDisplay {
    pub frames: Arc<Mutex<Vec<TimerView>>>,
    pub settings: Arc<Mutex<Option<Settings>>>,
}

impl RecordingDisplay {
    pub fn last(&self) -> Option<TimerView> {
        self.frames.lock().unwrap().last().copied()
    }

    pub fn count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}

impl Display for RecordingDisplay {
    fn render(&mut self, view: &TimerView) {
        self.frames.lock().unwrap().push(*view);
    }

    fn apply_settings(&mut self, settings: &Settings) {
        *self.settings.lock().unwrap() = Some(settings.clone());
    }
}

/// One agent plus handles on its doubles.
pub struct Node {
    pub agent: Agent,
    pub endpoint: MemoryEndpoint,
    pub alarm: RecordingAlarm,
    pub display: RecordingDisplay,
}

impl Node {
    /// Hands every queued bus payload to the agent. Returns how many there were.
    pub fn deliver(&mut self) -> usize {
        let payloads = self.endpoint.drain();
        for payload in &payloads {
            self.agent.on_payload(payload);
        }
        payloads.len()
    }
}

/// Several agents sharing one store, one bus and one clock.
pub struct World {
    pub store: MemoryStore,
    pub bus: MemoryBus,
    pub clock: ManualClock,
    pub nodes: Vec<Node>,
}

impl World {
    pub fn new(start_ms: u64) -> Self {
        Self {
            store: MemoryStore::new(),
            bus: MemoryBus::new(),
            clock: ManualClock::new(start_ms),
            nodes: Vec::new(),
        }
    }

    pub fn with_agents(start_ms: u64, n: usize) -> Self {
        let mut world = Self::new(start_ms);
        for _ in 0..n {
            world.spawn();
        }
        world
    }

    /// Opens a new agent; returns its index.
    pub fn spawn(&mut self) -> usize {
        self.spawn_with_alarm(RecordingAlarm::default())
    }

    pub fn spawn_with_alarm(&mut self, alarm: RecordingAlarm) -> usize {
        let endpoint = self.bus.join();
        let display = RecordingDisplay::default();
        let agent = Agent::new(Collaborators {
            store: Box::new(self.store.clone()),
            bus: Box::new(endpoint.clone()),
            clock: Box::new(self.clock.clone()),
            alarm: Box::new(alarm.clone()),
            display: Box::new(display.clone()),
        });
        self.nodes.push(Node {
            agent,
            endpoint,
            alarm,
            display,
        });
        self.nodes.len() - 1
    }

    pub fn node(&mut self, i: usize) -> &mut Node {
        &mut self.nodes[i]
    }

    pub fn agent(&mut self, i: usize) -> &mut Agent {
        &mut self.nodes[i].agent
    }

    /// Delivers until no agent has anything left to read.
    pub fn settle(&mut self) {
        loop {
            let delivered: usize = self.nodes.iter_mut().map(Node::deliver).sum();
            if delivered == 0 {
                break;
            }
        }
    }

    pub fn tick_all(&mut self) {
        for node in &mut self.nodes {
            node.agent.tick();
        }
    }

    pub fn stored_state(&self) -> Option<pomo_sync::Snapshot> {
        self.store
            .get(pomo_sync::store::STATE_KEY)
            .unwrap()
            .map(|raw| pomo_sync::Snapshot::from_json(&raw).unwrap())
    }
}

/// Builds one standalone agent over the given store.
pub fn lone_agent(
    store: impl Store + 'static,
    clock: &ManualClock,
) -> (Agent, MemoryEndpoint, RecordingAlarm, RecordingDisplay) {
    let bus = MemoryBus::new();
    let endpoint = bus.join();
    let alarm = RecordingAlarm::default();
    let display = RecordingDisplay::default();
    let agent = Agent::new(Collaborators {
        store: Box::new(store),
        bus: Box::new(endpoint.clone()),
        clock: Box::new(clock.clone()),
        alarm: Box::new(alarm.clone()),
        display: Box::new(display.clone()),
    });
    (agent, endpoint, alarm, display)
}
