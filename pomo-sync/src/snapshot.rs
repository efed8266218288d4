//! The timer state every agent agrees on.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};

const MINUTE_MS: u64 = 60 * 1000;

/// Upper bound on any remaining time an agent accepts or produces.
pub const MAX_REMAINING_MS: u64 = 24 * 60 * MINUTE_MS;

/// Which countdown is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerKind {
    #[default]
    Focus,
    ShortBreak,
    LongBreak,
}

impl TimerKind {
    pub const ALL: [TimerKind; 3] = [TimerKind::Focus, TimerKind::ShortBreak, TimerKind::LongBreak];

    /// Nominal length of a full countdown of this kind.
    pub const fn duration_ms(self) -> u64 {
        match self {
            TimerKind::Focus => 25 * MINUTE_MS,
            TimerKind::ShortBreak => 5 * MINUTE_MS,
            TimerKind::LongBreak => 10 * MINUTE_MS,
        }
    }

    pub fn is_break(self) -> bool {
        !matches!(self, TimerKind::Focus)
    }

    /// Kind selected after this one runs out, and whether it keeps running.
    ///
    /// Focus rolls straight into a short break. Any break returns to a
    /// stopped Focus so the next work block needs an explicit start.
    pub fn after_expiry(self) -> (TimerKind, bool) {
        match self {
            TimerKind::Focus => (TimerKind::ShortBreak, true),
            TimerKind::ShortBreak | TimerKind::LongBreak => (TimerKind::Focus, false),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimerKind::Focus => "Focus",
            TimerKind::ShortBreak => "Short Break",
            TimerKind::LongBreak => "Long Break",
        }
    }
}

/// The complete serializable timer state.
///
/// While `running`, `remaining_ms` is only a cached display value and the
/// truth is `end_time_ms - now`. While stopped, `remaining_ms` is
/// authoritative and `end_time_ms` is 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub running: bool,
    pub kind: TimerKind,
    pub remaining_ms: u64,
    #[serde(default)]
    pub end_time_ms: u64,
    #[serde(default)]
    pub sound_playing: bool,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::stopped(TimerKind::Focus)
    }
}

impl Snapshot {
    /// A stopped, full-length countdown of `kind`.
    pub fn stopped(kind: TimerKind) -> Self {
        Self {
            running: false,
            kind,
            remaining_ms: kind.duration_ms(),
            end_time_ms: 0,
            sound_playing: false,
        }
    }

    /// Time left at `now_ms`, never negative.
    pub fn remaining_at(&self, now_ms: u64) -> u64 {
        if self.running {
            self.end_time_ms.saturating_sub(now_ms)
        } else {
            self.remaining_ms
        }
    }

    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        self.running && now_ms >= self.end_time_ms
    }

    pub fn validate(&self) -> Result<()> {
        if self.running && self.end_time_ms == 0 {
            return Err(SyncError::InvalidSnapshot("running without an end time"));
        }
        if self.remaining_ms > MAX_REMAINING_MS {
            return Err(SyncError::InvalidSnapshot("remaining time out of range"));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses and validates a stored or received snapshot.
    pub fn from_json(raw: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(raw)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_stopped_full_focus() {
        let s = Snapshot::default();
        assert!(!s.running);
        assert_eq!(s.kind, TimerKind::Focus);
        assert_eq!(s.remaining_ms, 1_500_000);
        assert_eq!(s.end_time_ms, 0);
    }

    #[test]
    fn reads_store_layout() {
        let raw = r#"{"running":true,"kind":"shortBreak","remainingMs":1000,"endTimeMs":5000,"soundPlaying":false}"#;
        let s = Snapshot::from_json(raw).unwrap();
        assert!(s.running);
        assert_eq!(s.kind, TimerKind::ShortBreak);
        assert_eq!(s.remaining_at(4_000), 1_000);
        assert_eq!(s.remaining_at(6_000), 0);
    }

    #[test]
    fn running_without_end_time_is_rejected() {
        let raw = r#"{"running":true,"kind":"focus","remainingMs":1000,"endTimeMs":0}"#;
        assert!(matches!(
            Snapshot::from_json(raw),
            Err(SyncError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn absurd_remaining_time_is_rejected() {
        let raw = r#"{"running":false,"kind":"focus","remainingMs":18446744073709551615,"endTimeMs":0}"#;
        assert!(matches!(
            Snapshot::from_json(raw),
            Err(SyncError::InvalidSnapshot(_))
        ));
        let mut s = Snapshot::stopped(TimerKind::Focus);
        s.remaining_ms = MAX_REMAINING_MS;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            Snapshot::from_json("{not json"),
            Err(SyncError::MalformedSnapshot(_))
        ));
        assert!(matches!(
            Snapshot::from_json(r#"{"running":false,"kind":"nap","remainingMs":1}"#),
            Err(SyncError::MalformedSnapshot(_))
        ));
    }

    #[test]
    fn breaks_return_to_stopped_focus() {
        assert_eq!(TimerKind::Focus.after_expiry(), (TimerKind::ShortBreak, true));
        assert_eq!(TimerKind::ShortBreak.after_expiry(), (TimerKind::Focus, false));
        assert_eq!(TimerKind::LongBreak.after_expiry(), (TimerKind::Focus, false));
    }
}
