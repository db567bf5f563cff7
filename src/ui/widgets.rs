//! Custom TUI widgets

use super::theme::ThemeColors;
use crate::settings::{Field, SettingsEditor, ZoneField};
use crate::timing::{KeyRole, SegmentFrame};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Column of `ms` on a bar `width` cells wide scaled to `hard_max`
fn column_for(ms: f64, hard_max: f64, width: u16) -> u16 {
    if width == 0 || hard_max <= 0.0 {
        return 0;
    }
    let ratio = (ms / hard_max).clamp(0.0, 1.0);
    ((ratio * width as f64).round() as u16).min(width.saturating_sub(1))
}

/// Progress bar for one segment, with the target window marked
pub struct SegmentBar<'a> {
    frame: &'a SegmentFrame,
    colors: &'a ThemeColors,
}

impl<'a> SegmentBar<'a> {
    pub fn new(frame: &'a SegmentFrame, colors: &'a ThemeColors) -> Self {
        Self { frame, colors }
    }
}

impl Widget for SegmentBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let zone = self.frame.zone;
        let elapsed = self.frame.elapsed_ms as f64;

        let title_style = if self.frame.active {
            Style::default().fg(self.colors.cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.colors.fg)
        };
        let fill_color = self.colors.verdict(zone.classify(elapsed));
        let value_style = if self.frame.elapsed_ms == 0 && !self.frame.active {
            Style::default().fg(self.colors.dim)
        } else {
            Style::default().fg(fill_color).add_modifier(Modifier::BOLD)
        };

        let title = Line::from(vec![
            Span::styled(format!("Segment {}  ", self.frame.segment + 1), title_style),
            Span::styled(format!("{:>6} ms", self.frame.elapsed_ms), value_style),
            Span::styled(
                format!("   target {}–{} ms", zone.min, zone.max),
                Style::default().fg(self.colors.dim),
            ),
        ]);
        buf.set_line(area.x, area.y, &title, area.width);

        if area.height < 2 {
            return;
        }
        let y = area.y + 1;
        let width = area.width;
        let filled = (zone.fill_ratio(elapsed) * width as f64).round() as u16;
        let window_start = column_for(zone.min, zone.hard_max, width);
        let window_end = column_for(zone.max, zone.hard_max, width);

        for col in 0..width {
            let bg = if col < filled {
                fill_color
            } else {
                self.colors.bar_track
            };
            let symbol = if col == window_start || col == window_end {
                "│"
            } else {
                " "
            };
            buf.set_string(
                area.x + col,
                y,
                symbol,
                Style::default().bg(bg).fg(self.colors.window_mark),
            );
        }
    }
}

/// Settings editor panel
pub struct SettingsPanel<'a> {
    editor: &'a SettingsEditor,
    colors: &'a ThemeColors,
}

impl<'a> SettingsPanel<'a> {
    pub fn new(editor: &'a SettingsEditor, colors: &'a ThemeColors) -> Self {
        Self { editor, colors }
    }
}

impl Widget for SettingsPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Settings ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.colors.cyan));
        let inner = block.inner(area);
        block.render(area, buf);

        let bottom = inner.y + inner.height;
        let mut y = inner.y;
        for (i, field) in Field::ALL.iter().enumerate() {
            if y >= bottom {
                return;
            }
            let selected = i == self.editor.selected_index();
            let marker = if selected { "> " } else { "  " };
            let label_style = if selected {
                Style::default().fg(self.colors.cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.colors.fg)
            };
            let line = Line::from(vec![
                Span::styled(marker, label_style),
                Span::styled(format!("{:<16}", field.label()), label_style),
                Span::styled(self.editor.value_text(*field), Style::default().fg(self.colors.fg)),
            ]);
            buf.set_line(inner.x, y, &line, inner.width);
            y += 1;
            // Blank line between groups
            if matches!(field, Field::Zone(_, ZoneField::HardMax) | Field::Key(KeyRole::End)) {
                y += 1;
            }
        }

        if y + 1 < bottom {
            let (text, color) = match self.editor.error() {
                Some(err) => (err.to_string(), self.colors.red),
                None => (
                    "Ctrl+S save  Enter capture key / toggle  F2 close".to_string(),
                    self.colors.dim,
                ),
            };
            buf.set_string(inner.x + 2, y + 1, text, Style::default().fg(color));
        }
    }
}

/// Widget for the help screen
pub struct HelpPanel<'a> {
    colors: &'a ThemeColors,
}

impl<'a> HelpPanel<'a> {
    pub fn new(colors: &'a ThemeColors) -> Self {
        Self { colors }
    }
}

impl Widget for HelpPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Help - keysplit ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.colors.cyan));

        let inner = block.inner(area);
        block.render(area, buf);

        let help_text = [
            "",
            " TIMING",
            " -----------",
            " Start key release : Start segment 1",
            " Start key press   : Abort and clear the run",
            " Split key press   : Close segment 1, then segment 2",
            " End key press     : Close segment 3",
            " 10 minutes idle   : Run resets itself",
            "",
            " CONTROLS",
            " -----------",
            " F1                : This help",
            " F2                : Settings (applied on restart)",
            "                     A pending key capture takes the next key,",
            "                     Esc included; F2 leaves without saving",
            " F5                : Reset timer",
            " Tab / Shift+Tab   : Switch view",
            " Ctrl+Q / Ctrl+C   : Quit",
            "",
            " Keys are captured system-wide; this window need not have focus.",
        ];

        for (i, line) in help_text.iter().enumerate() {
            if i as u16 >= inner.height {
                break;
            }
            let style = if line.contains("---") {
                Style::default().fg(self.colors.dim)
            } else if line.len() > 1 && line[1..].chars().all(|c| c.is_ascii_uppercase()) {
                Style::default().fg(self.colors.yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.colors.fg)
            };
            buf.set_string(inner.x, inner.y + i as u16, line, style);
        }
    }
}

/// Status bar widget
pub struct StatusBar<'a> {
    phase: &'a str,
    bindings: &'a str,
    elapsed: &'a str,
    message: Option<&'a str>,
    colors: &'a ThemeColors,
}

impl<'a> StatusBar<'a> {
    pub fn new(phase: &'a str, bindings: &'a str, elapsed: &'a str, colors: &'a ThemeColors) -> Self {
        Self {
            phase,
            bindings,
            elapsed,
            message: None,
            colors,
        }
    }

    pub fn message(mut self, message: Option<&'a str>) -> Self {
        self.message = message;
        self
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bg_style = Style::default().bg(self.colors.status_bg).fg(self.colors.fg);
        for x in area.x..area.x + area.width {
            buf.set_string(x, area.y, " ", bg_style);
        }

        let left = format!(" {} | {} ", self.phase, self.bindings);
        buf.set_string(area.x, area.y, &left, bg_style.add_modifier(Modifier::BOLD));

        if let Some(msg) = self.message {
            let msg_style = bg_style.fg(self.colors.yellow);
            let msg_x = area.x + (area.width / 2).saturating_sub(msg.len() as u16 / 2);
            buf.set_string(msg_x, area.y, msg, msg_style);
        }

        let right = format!(" {} ", self.elapsed);
        let right_x = area.x + area.width.saturating_sub(right.len() as u16);
        buf.set_string(right_x, area.y, &right, bg_style);
    }
}

/// Tab bar widget
pub struct TabBar<'a> {
    tabs: &'a [&'a str],
    selected: usize,
    colors: &'a ThemeColors,
}

impl<'a> TabBar<'a> {
    pub fn new(tabs: &'a [&'a str], selected: usize, colors: &'a ThemeColors) -> Self {
        Self {
            tabs,
            selected,
            colors,
        }
    }
}

impl Widget for TabBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut x = area.x;
        let idle = Style::default().fg(self.colors.fg).bg(self.colors.status_bg);

        for (i, tab) in self.tabs.iter().enumerate() {
            let style = if i == self.selected {
                Style::default()
                    .fg(self.colors.bg)
                    .bg(self.colors.cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                idle
            };

            let label = format!(" {} ", tab);
            let width = label.len() as u16;

            if x + width <= area.x + area.width {
                buf.set_string(x, area.y, &label, style);
                x += width;

                if i < self.tabs.len() - 1 && x < area.x + area.width {
                    buf.set_string(x, area.y, "|", idle.fg(self.colors.dim));
                    x += 1;
                }
            }
        }

        for fill_x in x..area.x + area.width {
            buf.set_string(fill_x, area.y, " ", idle);
        }
    }
}
