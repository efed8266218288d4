//! Messages agents exchange over the bus.
//!
//! Everything on the wire is one tagged JSON object, so a receiver can never
//! confuse a bare snapshot with a command.

use crate::error::Result;
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};

/// Best-effort requests that are never persisted or replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Command {
    /// Sent when the agent that hit expiry could not play the alarm itself.
    PlayAlarm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    State { snapshot: Snapshot },
    Command { name: Command },
}

impl Message {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes a payload. Snapshots are validated before they are handed out.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let message: Message = serde_json::from_slice(payload)?;
        if let Message::State { snapshot } = &message {
            snapshot.validate()?;
        }
        Ok(message)
    }
}
