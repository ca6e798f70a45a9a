//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::config::RgbColor;
use crate::data::Metric;
use crate::graph::SeriesStyle;

impl From<RgbColor> for Color {
    fn from(c: RgbColor) -> Self {
        Color::Rgb(c.r, c.g, c.b)
    }
}

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Indicator color while the connection is open.
    pub connected: Color,
    /// Indicator color while disconnected.
    pub disconnected: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Text that should recede, such as axis labels.
    pub muted: Color,
    /// Style for header rows and titles.
    pub header: Style,
    /// Style for the selected chart or row.
    pub selected: Style,
    /// Style for the active tab.
    pub tab_active: Style,
    /// Style for inactive tabs.
    pub tab_inactive: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            connected: Color::Green,
            disconnected: Color::Red,
            border: Color::Gray,
            muted: Color::DarkGray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::Gray),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            connected: Color::Green,
            disconnected: Color::Red,
            border: Color::DarkGray,
            muted: Color::Gray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::DarkGray),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Line color for a series; configured colors win over the fallback.
    pub fn series_color(&self, style: &SeriesStyle) -> Color {
        match style.color {
            Some(color) => color.into(),
            None => self.fallback_color(style.metric),
        }
    }

    fn fallback_color(&self, metric: Metric) -> Color {
        match metric {
            Metric::Cpu => Color::Green,
            Metric::Mem => Color::Cyan,
            Metric::Reads => Color::Red,
        }
    }

    /// Indicator style for the connection state.
    pub fn connection_style(&self, connected: bool) -> Style {
        if connected {
            Style::default().fg(self.connected)
        } else {
            Style::default().fg(self.disconnected).add_modifier(Modifier::BOLD)
        }
    }
}
