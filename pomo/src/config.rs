use anyhow::{Context, Result};
use ratatui::style::Color;
use serde::Deserialize;
use std::fs;
use std::time::Duration;
use tracing::warn;

/// Ticks faster than this only burn CPU; slower ones make the seconds stutter.
const TICK_RANGE_MS: (u64, u64) = (100, 500);
const ALARM_RANGE_SECS: (u64, u64) = (1, 300);

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub tick_interval_ms: u64,
    /// How long the alarm notification stays up.
    pub alarm_seconds: u64,
    pub theme: Theme,
    /// Choices cycled through with `g`; the selected name is stored in the settings.
    pub backgrounds: Vec<Background>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Theme {
    #[serde(deserialize_with = "hex_to_color")]
    pub background: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub foreground: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub focus: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub short_break: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub long_break: Color,
    #[serde(deserialize_with = "hex_to_color")]
    pub muted: Color,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Background {
    pub name: String,
    #[serde(deserialize_with = "hex_to_color")]
    pub color: Color,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_ms: 250,
            alarm_seconds: 8,
            theme: Theme::default(),
            backgrounds: vec![
                Background {
                    name: "night".to_string(),
                    color: Color::Rgb(9, 14, 19),
                },
                Background {
                    name: "forest".to_string(),
                    color: Color::Rgb(18, 32, 24),
                },
                Background {
                    name: "dusk".to_string(),
                    color: Color::Rgb(38, 24, 40),
                },
            ],
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::Rgb(9, 14, 19),
            foreground: Color::Rgb(197, 201, 199),
            focus: Color::Rgb(228, 104, 118),
            short_break: Color::Rgb(138, 154, 123),
            long_break: Color::Rgb(127, 180, 202),
            muted: Color::Rgb(164, 167, 164),
        }
    }
}

impl Config {
    pub fn tick_interval(&self) -> Duration {
        let (min, max) = TICK_RANGE_MS;
        let ms = self.tick_interval_ms.clamp(min, max);
        if ms != self.tick_interval_ms {
            warn!(configured = self.tick_interval_ms, used = ms, "tick interval out of range");
        }
        Duration::from_millis(ms)
    }

    pub fn alarm_duration(&self) -> Duration {
        let (min, max) = ALARM_RANGE_SECS;
        let secs = self.alarm_seconds.clamp(min, max);
        if secs != self.alarm_seconds {
            warn!(configured = self.alarm_seconds, used = secs, "alarm duration out of range");
        }
        Duration::from_secs(secs)
    }

    /// Background color for a stored choice; unknown or empty names fall back to the theme.
    pub fn background_color(&self, name: &str) -> Color {
        self.backgrounds
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.color)
            .unwrap_or(self.theme.background)
    }

    /// The background after `current` in the configured order, wrapping around.
    pub fn next_background(&self, current: &str) -> String {
        let position = self.backgrounds.iter().position(|b| b.name == current);
        let next = match position {
            Some(i) => (i + 1) % self.backgrounds.len(),
            None => 0,
        };
        self.backgrounds
            .get(next)
            .map(|b| b.name.clone())
            .unwrap_or_default()
    }
}

fn hex_to_color<'de, D>(deserializer: D) -> Result<Color, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = serde::Deserialize::deserialize(deserializer)?;
    if !s.starts_with('#') || s.len() != 7 || !s.is_ascii() {
        return Err(serde::de::Error::custom("invalid hex color format"));
    }
    let r = u8::from_str_radix(&s[1..3], 16).map_err(serde::de::Error::custom)?;
    let g = u8::from_str_radix(&s[3..5], 16).map_err(serde::de::Error::custom)?;
    let b = u8::from_str_radix(&s[5..7], 16).map_err(serde::de::Error::custom)?;
    Ok(Color::Rgb(r, g, b))
}

pub fn load_config() -> Result<Config> {
    match pomo_sync::paths::config_file() {
        Some(path) if path.exists() => {
            let config_str = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file at {:?}", path))?;
            toml::from_str(&config_str)
                .with_context(|| format!("Failed to parse config file at {:?}", path))
        }
        _ => Ok(Config::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r##"
tick_interval_ms = 20

[theme]
focus = "#ff0000"

[[backgrounds]]
name = "paper"
color = "#f1f1ef"
"##,
        )
        .unwrap();
        assert_eq!(config.theme.focus, Color::Rgb(255, 0, 0));
        assert_eq!(config.theme.muted, Theme::default().muted);
        assert_eq!(config.alarm_seconds, 8);
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
        assert_eq!(config.background_color("paper"), Color::Rgb(241, 241, 239));
        assert_eq!(config.background_color(""), config.theme.background);
    }

    #[test]
    fn bad_color_is_an_error() {
        let parsed: std::result::Result<Config, _> = toml::from_str("[theme]\nfocus = \"red\"\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn non_ascii_color_is_an_error() {
        // Seven bytes, but the slice boundaries fall inside the 'é'.
        let parsed: std::result::Result<Config, _> = toml::from_str("[theme]\nfocus = \"#1é234\"\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn alarm_duration_is_bounded() {
        let mut config = Config::default();
        assert_eq!(config.alarm_duration(), Duration::from_secs(8));
        config.alarm_seconds = 0;
        assert_eq!(config.alarm_duration(), Duration::from_secs(1));
        config.alarm_seconds = u64::MAX;
        assert_eq!(config.alarm_duration(), Duration::from_secs(300));
    }

    #[test]
    fn backgrounds_cycle() {
        let config = Config::default();
        assert_eq!(config.next_background(""), "night");
        assert_eq!(config.next_background("night"), "forest");
        assert_eq!(config.next_background("dusk"), "night");
    }
}
