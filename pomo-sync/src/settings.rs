use serde::{Deserialize, Serialize};

/// Per-machine preferences. Persisted next to the snapshot but never broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Alarm when a focus block ends.
    pub sound: bool,
    /// Alarm when a break ends.
    pub sound_breaks: bool,
    /// Name of the background the display should use. Empty means its default.
    pub background: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound: true,
            sound_breaks: true,
            background: String::new(),
        }
    }
}

impl Settings {
    /// Whether an expiry of `kind` should sound the alarm.
    pub fn alarm_enabled_for(&self, kind: crate::snapshot::TimerKind) -> bool {
        if kind.is_break() {
            self.sound_breaks
        } else {
            self.sound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::TimerKind;

    #[test]
    fn missing_fields_fall_back() {
        let s: Settings = serde_json::from_str(r#"{"soundBreaks":false}"#).unwrap();
        assert!(s.sound);
        assert!(!s.sound_breaks);
        assert!(s.alarm_enabled_for(TimerKind::Focus));
        assert!(!s.alarm_enabled_for(TimerKind::LongBreak));
    }
}
