use notify_rust::{Notification, Timeout};
use pomo_sync::runtime::AlarmOutcome;
use pomo_sync::{AlarmError, AlarmPlayer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Sounds the alarm as a desktop notification held up for a while.
///
/// A desktop that refuses notifications is treated as blocked playback, so
/// another timer (say, one in a session with a notification daemon) gets
/// asked to play it instead.
pub struct NotifyAlarm {
    done: UnboundedSender<AlarmOutcome>,
    hold: Duration,
    cancel: Option<Arc<Notify>>,
}

impl NotifyAlarm {
    pub fn new(done: UnboundedSender<AlarmOutcome>, hold: Duration) -> Self {
        Self {
            done,
            hold,
            cancel: None,
        }
    }
}

impl AlarmPlayer for NotifyAlarm {
    fn play(&mut self) -> Result<(), AlarmError> {
        let cancel = Arc::new(Notify::new());
        self.cancel = Some(cancel.clone());
        let done = self.done.clone();
        let hold = self.hold;

        tokio::spawn(async move {
            let shown = tokio::task::spawn_blocking(move || {
                Notification::new()
                    .summary("pomo")
                    .body("Time is up!")
                    .appname("pomo")
                    .sound_name("alarm-clock-elapsed")
                    .timeout(Timeout::Milliseconds(
                        u32::try_from(hold.as_millis()).unwrap_or(u32::MAX),
                    ))
                    .show()
                    .map(|_| ())
            })
            .await;

            let outcome = match shown {
                Ok(Ok(())) => {
                    tokio::select! {
                        _ = tokio::time::sleep(hold) => Ok(()),
                        // Stopped by the agent: it already knows, report nothing.
                        _ = cancel.notified() => {
                            debug!("alarm cancelled");
                            return;
                        }
                    }
                }
                Ok(Err(e)) => {
                    warn!("notification refused: {}", e);
                    Err(AlarmError::PlaybackBlocked)
                }
                Err(e) => Err(AlarmError::Failed(e.to_string())),
            };
            let _ = done.send(outcome);
        });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.notify_one();
        }
    }
}
