//! Settings editor
//!
//! Holds an editable draft of the configuration. Numbers are kept as text
//! while editing and only parsed on save, so nothing reaches disk unless the
//! whole draft validates. Saved settings apply on the next start.

use crate::config::{Config, ConfigError, ConfigValidationError, KeyBindings, TimingZone};
use crate::keyboard::KeyCode;
use crate::timing::{KeyRole, SEGMENT_COUNT};
use std::path::Path;

/// One bound of a timing zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneField {
    Min,
    Max,
    HardMax,
}

impl ZoneField {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Min => "Min",
            Self::Max => "Max",
            Self::HardMax => "HardMax",
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::Min => 0,
            Self::Max => 1,
            Self::HardMax => 2,
        }
    }
}

/// An editable row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Zero-based zone index and bound
    Zone(usize, ZoneField),
    Key(KeyRole),
    DarkMode,
}

impl Field {
    /// Rows in display order
    pub const ALL: [Field; 13] = [
        Field::Zone(0, ZoneField::Min),
        Field::Zone(0, ZoneField::Max),
        Field::Zone(0, ZoneField::HardMax),
        Field::Zone(1, ZoneField::Min),
        Field::Zone(1, ZoneField::Max),
        Field::Zone(1, ZoneField::HardMax),
        Field::Zone(2, ZoneField::Min),
        Field::Zone(2, ZoneField::Max),
        Field::Zone(2, ZoneField::HardMax),
        Field::Key(KeyRole::Start),
        Field::Key(KeyRole::Split),
        Field::Key(KeyRole::End),
        Field::DarkMode,
    ];

    pub fn label(&self) -> String {
        match self {
            Field::Zone(zone, bound) => format!("Timer{} {}", zone + 1, bound.name()),
            Field::Key(KeyRole::Start) => "Start key".to_string(),
            Field::Key(KeyRole::Split) => "Split key".to_string(),
            Field::Key(KeyRole::End) => "End key".to_string(),
            Field::DarkMode => "Dark mode".to_string(),
        }
    }
}

fn format_ms(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

/// Draft configuration being edited
#[derive(Debug, Clone)]
pub struct SettingsEditor {
    zone_text: [[String; 3]; SEGMENT_COUNT],
    keys: KeyBindings,
    dark_mode: bool,
    selected: usize,
    capturing: Option<KeyRole>,
    error: Option<String>,
}

impl SettingsEditor {
    /// Start a draft from the running configuration
    pub fn new(config: &Config) -> Self {
        let zone_text = config
            .zones()
            .map(|z| [format_ms(z.min), format_ms(z.max), format_ms(z.hard_max)]);
        Self {
            zone_text,
            keys: config.keys,
            dark_mode: config.dark_mode,
            selected: 0,
            capturing: None,
            error: None,
        }
    }

    pub fn selected_field(&self) -> Field {
        Field::ALL[self.selected]
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % Field::ALL.len();
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.checked_sub(1).unwrap_or(Field::ALL.len() - 1);
    }

    /// Text shown for a field
    pub fn value_text(&self, field: Field) -> String {
        match field {
            Field::Zone(zone, bound) => self.zone_text[zone][bound.index()].clone(),
            Field::Key(role) => {
                if self.capturing == Some(role) {
                    "press a key…".to_string()
                } else {
                    self.key_for(role).to_string()
                }
            }
            Field::DarkMode => (if self.dark_mode { "On" } else { "Off" }).to_string(),
        }
    }

    fn key_for(&self, role: KeyRole) -> KeyCode {
        match role {
            KeyRole::Start => self.keys.start_key,
            KeyRole::Split => self.keys.split_key,
            KeyRole::End => self.keys.end_key,
        }
    }

    /// Type into the selected numeric field. Other characters are ignored.
    pub fn input_char(&mut self, c: char) {
        if let Field::Zone(zone, bound) = self.selected_field() {
            let text = &mut self.zone_text[zone][bound.index()];
            if c.is_ascii_digit() || (c == '.' && !text.contains('.')) {
                text.push(c);
                self.error = None;
            }
        }
    }

    pub fn backspace(&mut self) {
        if let Field::Zone(zone, bound) = self.selected_field() {
            self.zone_text[zone][bound.index()].pop();
            self.error = None;
        }
    }

    /// Enter/Space on the selected row: start key capture or flip the theme
    pub fn activate(&mut self) {
        match self.selected_field() {
            Field::Key(role) => {
                self.capturing = Some(role);
                self.error = None;
            }
            Field::DarkMode => self.dark_mode = !self.dark_mode,
            Field::Zone(..) => {}
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.is_some()
    }

    /// Offer a pressed key to a pending capture. Returns true if it was taken.
    pub fn capture_key(&mut self, key: KeyCode) -> bool {
        let Some(role) = self.capturing.take() else {
            return false;
        };
        match role {
            KeyRole::Start => self.keys.start_key = key,
            KeyRole::Split => self.keys.split_key = key,
            KeyRole::End => self.keys.end_key = key,
        }
        log::debug!("{:?} key captured as {}", role, key);
        true
    }

    /// Last save error, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Parse and validate the draft into a configuration
    pub fn build(&self) -> Result<Config, ConfigValidationError> {
        let mut zones = [TimingZone::new(0.0, 0.0, 0.0); SEGMENT_COUNT];
        for (zone, texts) in self.zone_text.iter().enumerate() {
            let mut values = [0.0; 3];
            for (bound, value) in [ZoneField::Min, ZoneField::Max, ZoneField::HardMax]
                .into_iter()
                .zip(values.iter_mut())
            {
                *value = texts[bound.index()].trim().parse::<f64>().map_err(|_| {
                    ConfigValidationError::NotANumber {
                        zone: zone + 1,
                        field: bound.name(),
                    }
                })?;
            }
            zones[zone] = TimingZone::new(values[0], values[1], values[2]);
        }

        let config = Config {
            timer1: zones[0],
            timer2: zones[1],
            timer3: zones[2],
            keys: self.keys,
            dark_mode: self.dark_mode,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate and write the draft. On failure the error is kept for display
    /// and nothing is written.
    pub fn commit(&mut self, path: &Path) -> Result<Config, ConfigError> {
        let result = self
            .build()
            .map_err(ConfigError::from)
            .and_then(|config| config.save_to(path).map(|()| config));
        match &result {
            Ok(_) => self.error = None,
            Err(e) => self.error = Some(e.to_string()),
        }
        result
    }
}
