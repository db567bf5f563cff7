//! Theme color definitions for the UI
//!
//! Dark and light palettes, selected by the `DarkMode` config flag.

use crate::config::ZoneVerdict;
use ratatui::style::Color;

/// Complete color palette for the UI
#[derive(Debug, Clone, Copy)]
pub struct ThemeColors {
    /// Main background
    pub bg: Color,
    /// Primary foreground text
    pub fg: Color,
    /// Dimmed/secondary text
    pub dim: Color,
    /// Accent color (headings, active tab, running segment)
    pub cyan: Color,
    /// Inside the target window
    pub green: Color,
    /// Below the target window
    pub yellow: Color,
    /// Past the target window
    pub red: Color,
    /// Unfilled part of a segment bar
    pub bar_track: Color,
    /// Target window markers on a bar
    pub window_mark: Color,
    /// Status bar background
    pub status_bg: Color,
}

impl ThemeColors {
    /// Palette for the configured theme flag
    pub fn from_dark_mode(dark_mode: bool) -> Self {
        if dark_mode {
            Self::dark()
        } else {
            Self::light()
        }
    }

    pub fn dark() -> Self {
        Self {
            bg: Color::Rgb(22, 22, 30),
            fg: Color::Rgb(200, 200, 210),
            dim: Color::Rgb(90, 90, 110),
            cyan: Color::Rgb(80, 200, 220),
            green: Color::Rgb(80, 200, 120),
            yellow: Color::Rgb(240, 180, 80),
            red: Color::Rgb(240, 90, 100),
            bar_track: Color::Rgb(40, 40, 50),
            window_mark: Color::Rgb(180, 180, 190),
            status_bg: Color::Rgb(55, 55, 70),
        }
    }

    /// High contrast for bright terminals
    pub fn light() -> Self {
        Self {
            bg: Color::Rgb(245, 245, 248),
            fg: Color::Rgb(30, 30, 40),
            dim: Color::Rgb(130, 130, 150),
            cyan: Color::Rgb(0, 130, 160),
            green: Color::Rgb(30, 150, 70),
            yellow: Color::Rgb(180, 120, 0),
            red: Color::Rgb(200, 50, 60),
            bar_track: Color::Rgb(220, 220, 228),
            window_mark: Color::Rgb(50, 50, 60),
            status_bg: Color::Rgb(200, 200, 212),
        }
    }

    /// Bar fill color for a zone verdict
    pub fn verdict(&self, verdict: ZoneVerdict) -> Color {
        match verdict {
            ZoneVerdict::Early => self.yellow,
            ZoneVerdict::OnTarget => self.green,
            ZoneVerdict::Late => self.red,
        }
    }
}
