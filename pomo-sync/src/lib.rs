//! Keeps one Pomodoro countdown consistent across every timer process on a
//! machine, with no server.
//!
//! Each process runs an [`Agent`]. Agents share a durable [`Store`] (so a
//! fresh agent can resume) and a live [`Bus`] (so running agents converge).
//! Only state transitions travel on the bus; remaining time is derived
//! locally from the shared end timestamp.

pub mod agent;
pub mod alarm;
pub mod bus;
pub mod clock;
pub mod display;
pub mod error;
pub mod message;
pub mod paths;
pub mod runtime;
pub mod settings;
pub mod snapshot;
pub mod socket;
pub mod store;

pub use agent::{Agent, Collaborators, Intent};
pub use alarm::{AlarmPlayer, SilentAlarm};
pub use bus::{Bus, MemoryBus, MemoryEndpoint};
pub use clock::{Clock, ManualClock, SystemClock};
pub use display::{format_clock, Display, TimerView};
pub use error::{AlarmError, SyncError};
pub use message::{Command, Message};
pub use settings::Settings;
pub use snapshot::{Snapshot, TimerKind, MAX_REMAINING_MS};
pub use socket::{SocketBus, SocketInbox};
pub use store::{FileStore, MemoryStore, Store};
