use crate::config::Config;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pomo_sync::{Intent, Settings, TimerKind};

pub enum Action {
    Intent(Intent),
    Quit,
}

/// Turns key presses into agent intents.
///
/// Settings are never broadcast, so this agent is their only writer and the
/// copy kept here stays in step with the agent's.
pub struct Keymap {
    settings: Settings,
    config: Config,
}

impl Keymap {
    pub fn new(settings: Settings, config: Config) -> Self {
        Self { settings, config }
    }

    pub fn handle(&mut self, key: KeyEvent) -> Option<Action> {
        let intent = match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Some(Action::Quit)
            }
            KeyCode::Char('q') | KeyCode::Esc => return Some(Action::Quit),
            KeyCode::Char(' ') | KeyCode::Enter => Intent::Toggle,
            KeyCode::Char('r') => Intent::Reset,
            KeyCode::Char('1') => Intent::Select(TimerKind::Focus),
            KeyCode::Char('2') => Intent::Select(TimerKind::ShortBreak),
            KeyCode::Char('3') => Intent::Select(TimerKind::LongBreak),
            // Jump to the last seconds to watch a transition happen.
            KeyCode::Char('x') => Intent::SetRemaining(3_000),
            KeyCode::Char('s') => {
                self.settings.sound = !self.settings.sound;
                Intent::UpdateSettings(self.settings.clone())
            }
            KeyCode::Char('b') => {
                self.settings.sound_breaks = !self.settings.sound_breaks;
                Intent::UpdateSettings(self.settings.clone())
            }
            KeyCode::Char('g') => {
                self.settings.background = self.config.next_background(&self.settings.background);
                Intent::UpdateSettings(self.settings.clone())
            }
            _ => return None,
        };
        Some(Action::Intent(intent))
    }
}
