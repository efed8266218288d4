use crate::settings::Settings;
use crate::snapshot::TimerKind;

/// What a display needs to draw the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerView {
    pub remaining_ms: u64,
    pub running: bool,
    pub kind: TimerKind,
}

impl TimerView {
    /// `MM:SS`, rounding partial seconds down.
    pub fn clock(&self) -> String {
        format_clock(self.remaining_ms)
    }
}

pub fn format_clock(remaining_ms: u64) -> String {
    let total_seconds = remaining_ms / 1000;
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

pub trait Display {
    fn render(&mut self, view: &TimerView);

    /// Called at startup and whenever settings change.
    fn apply_settings(&mut self, _settings: &Settings) {}
}
