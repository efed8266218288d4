//! Fire-and-forget broadcast between live agents.

use crate::error::Result;
use crate::message::Message;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Sending half of a bus. Delivery goes to every other live agent, never back
/// to the sender, with no acknowledgement.
pub trait Bus {
    fn publish(&self, message: &Message) -> Result<()>;
}

type Inbox = Arc<Mutex<VecDeque<Vec<u8>>>>;

#[derive(Default)]
struct Hub {
    next_id: usize,
    members: Vec<(usize, Inbox)>,
}

/// In-process bus. Each [`MemoryBus::join`] creates an endpoint with its own
/// inbox; publishing from one endpoint queues the encoded payload on all the
/// others. Nothing is delivered until the owner drains its inbox.
#[derive(Clone, Default)]
pub struct MemoryBus {
    hub: Arc<Mutex<Hub>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self) -> MemoryEndpoint {
        let mut hub = self.hub.lock().unwrap_or_else(|e| e.into_inner());
        let id = hub.next_id;
        hub.next_id += 1;
        let inbox = Inbox::default();
        hub.members.push((id, inbox.clone()));
        MemoryEndpoint {
            id,
            hub: self.hub.clone(),
            inbox,
        }
    }
}

/// One agent's connection to a [`MemoryBus`]. Clones share the same inbox.
#[derive(Clone)]
pub struct MemoryEndpoint {
    id: usize,
    hub: Arc<Mutex<Hub>>,
    inbox: Inbox,
}

impl MemoryEndpoint {
    /// Takes every payload queued for this endpoint, oldest first.
    pub fn drain(&self) -> Vec<Vec<u8>> {
        let mut inbox = self.inbox.lock().unwrap_or_else(|e| e.into_inner());
        inbox.drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.inbox.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Leaves the bus. Later publishes are not queued here any more.
    pub fn leave(&self) {
        let mut hub = self.hub.lock().unwrap_or_else(|e| e.into_inner());
        hub.members.retain(|(id, _)| *id != self.id);
    }
}

impl Bus for MemoryEndpoint {
    fn publish(&self, message: &Message) -> Result<()> {
        let payload = message.encode()?;
        let hub = self.hub.lock().unwrap_or_else(|e| e.into_inner());
        for (id, inbox) in &hub.members {
            if *id == self.id {
                continue;
            }
            inbox
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push_back(payload.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Command;

    #[test]
    fn publish_skips_sender_and_departed() {
        let bus = MemoryBus::new();
        let a = bus.join();
        let b = bus.join();
        let c = bus.join();
        c.leave();

        a.publish(&Message::Command { name: Command::PlayAlarm }).unwrap();

        assert_eq!(a.pending(), 0);
        assert_eq!(b.pending(), 1);
        assert_eq!(c.pending(), 0);
        let payloads = b.drain();
        assert_eq!(
            Message::decode(&payloads[0]).unwrap(),
            Message::Command { name: Command::PlayAlarm }
        );
        assert_eq!(b.pending(), 0);
    }
}
