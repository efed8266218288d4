use crate::error::AlarmError;

/// Plays the end-of-countdown alarm.
///
/// `play` returns as soon as playback has started, or with an error when it
/// is refused up front. Playback that started reports its end later through
/// [`Agent::on_alarm_done`](crate::agent::Agent::on_alarm_done).
pub trait AlarmPlayer {
    fn play(&mut self) -> Result<(), AlarmError>;
    fn stop(&mut self);
}

/// For agents with no sound output. Every request is refused as unavailable,
/// so it never takes over a `playAlarm` request from another agent.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentAlarm;

impl AlarmPlayer for SilentAlarm {
    fn play(&mut self) -> Result<(), AlarmError> {
        Err(AlarmError::Unavailable)
    }

    fn stop(&mut self) {}
}
