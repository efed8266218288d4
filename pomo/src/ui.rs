use crate::config::Config;
use pomo_sync::{Display, Settings, TimerKind, TimerView};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Gauge, Paragraph, Tabs},
    Frame, Terminal,
};
use tracing::warn;

/// Draws the timer into the terminal on every render from the agent.
pub struct TuiDisplay<B: Backend> {
    terminal: Terminal<B>,
    config: Config,
    settings: Settings,
}

impl<B: Backend> TuiDisplay<B> {
    pub fn new(terminal: Terminal<B>, config: Config) -> Self {
        Self {
            terminal,
            config,
            settings: Settings::default(),
        }
    }
}

impl<B: Backend> Display for TuiDisplay<B> {
    fn render(&mut self, view: &TimerView) {
        let config = &self.config;
        let settings = &self.settings;
        if let Err(e) = self.terminal.draw(|f| draw(f, view, config, settings)) {
            warn!("redraw failed: {}", e);
        }
    }

    fn apply_settings(&mut self, settings: &Settings) {
        self.settings = settings.clone();
    }
}

fn kind_color(config: &Config, kind: TimerKind) -> Color {
    match kind {
        TimerKind::Focus => config.theme.focus,
        TimerKind::ShortBreak => config.theme.short_break,
        TimerKind::LongBreak => config.theme.long_break,
    }
}

pub fn draw(f: &mut Frame, view: &TimerView, config: &Config, settings: &Settings) {
    let theme = &config.theme;
    let background = config.background_color(&settings.background);

    let outer = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.muted))
        .title(Span::styled(
            " POMO ",
            Style::default().fg(theme.foreground).add_modifier(Modifier::BOLD),
        ))
        .title_alignment(Alignment::Center)
        .style(Style::default().bg(background).fg(theme.foreground));
    let area = outer.inner(f.area());
    f.render_widget(outer, f.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(2),
        ])
        .split(area);

    draw_tabs(f, chunks[0], view, config);
    draw_clock(f, chunks[1], view, config);
    draw_progress(f, chunks[2], view, config);
    draw_footer(f, chunks[3], view, config, settings);
}

fn draw_tabs(f: &mut Frame, area: Rect, view: &TimerView, config: &Config) {
    let selected = TimerKind::ALL
        .iter()
        .position(|k| *k == view.kind)
        .unwrap_or(0);
    let tabs = Tabs::new(TimerKind::ALL.iter().map(|k| k.label()))
        .select(selected)
        .style(Style::default().fg(config.theme.muted))
        .highlight_style(
            Style::default()
                .fg(kind_color(config, view.kind))
                .add_modifier(Modifier::BOLD),
        )
        .divider("│");
    f.render_widget(tabs, centered_row(area, 44));
}

fn draw_clock(f: &mut Frame, area: Rect, view: &TimerView, config: &Config) {
    let color = kind_color(config, view.kind);
    let icon = if view.running { "▶" } else { "■" };
    let lines = vec![
        Line::from(Span::styled(
            view.clock(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("{} {}", icon, if view.running { "running" } else { "stopped" }),
            Style::default().fg(config.theme.muted),
        )),
    ];
    let top = area.y + area.height.saturating_sub(2) / 2;
    let block = Rect::new(area.x, top, area.width, area.height.min(2));
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), block);
}

fn draw_progress(f: &mut Frame, area: Rect, view: &TimerView, config: &Config) {
    let total = view.kind.duration_ms() as f64;
    let ratio = (1.0 - view.remaining_ms as f64 / total).clamp(0.0, 1.0);
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::NONE))
        .gauge_style(Style::default().fg(kind_color(config, view.kind)))
        .ratio(ratio)
        .label("");
    f.render_widget(gauge, centered_row(area, 40));
}

fn draw_footer(f: &mut Frame, area: Rect, view: &TimerView, config: &Config, settings: &Settings) {
    let on_off = |on: bool| if on { "on" } else { "off" };
    let start_stop = if view.running { "stop" } else { "start" };
    let lines = vec![
        Line::from(format!(
            "space {start_stop} · r reset · 1/2/3 timer · q quit"
        )),
        Line::from(format!(
            "s focus sound: {} · b break sound: {} · g background",
            on_off(settings.sound),
            on_off(settings.sound_breaks)
        )),
    ];
    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .style(Style::default().fg(config.theme.muted)),
        area,
    );
}

fn centered_row(area: Rect, width: u16) -> Rect {
    let width = width.min(area.width);
    Rect::new(area.x + (area.width - width) / 2, area.y, width, area.height)
}
