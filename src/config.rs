//! Configuration management for keysplit
//!
//! The configuration is a JSON document loaded once at startup and treated as
//! read-only for the rest of the session. Edits are written back to disk and
//! take effect on the next start.
//!
//! ## Config File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/keysplit/config.json` |
//! | macOS | `~/Library/Application Support/keysplit/config.json` |
//! | Windows | `%APPDATA%\keysplit\config.json` |
//!
//! ## Example
//!
//! ```no_run
//! use keysplit::Config;
//!
//! // Falls back to defaults when the file is missing or unreadable
//! let (config, notice) = Config::load_or_default();
//! if let Some(notice) = notice {
//!     eprintln!("{}", notice);
//! }
//! println!("Segment 2 target: {}..{} ms", config.timer2.min, config.timer2.max);
//! ```

use crate::keyboard::KeyCode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Error type for loading and saving configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ConfigValidationError),
}

/// A configuration that violates an invariant
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Timer {zone}: {field} is not a number")]
    NotANumber { zone: usize, field: &'static str },
    #[error("Timer {zone}: {field} must be a finite number")]
    NotFinite { zone: usize, field: &'static str },
    #[error("Timer {zone}: {field} must not be negative")]
    Negative { zone: usize, field: &'static str },
    #[error("Timer {zone}: values must satisfy Min < Max < HardMax (got {min} / {max} / {hard_max})")]
    ZoneOrder {
        zone: usize,
        min: f64,
        max: f64,
        hard_max: f64,
    },
    #[error("{first} and {second} are both bound to {key}")]
    DuplicateKeys {
        first: &'static str,
        second: &'static str,
        key: KeyCode,
    },
}

/// Returns the path to the config file.
///
/// Creates the config directory if it doesn't exist.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    let app_dir = config_dir.join("keysplit");

    if !app_dir.exists() {
        fs::create_dir_all(&app_dir)?;
    }

    Ok(app_dir.join("config.json"))
}

/// Target window and display ceiling for one segment, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimingZone {
    /// Lower bound of the target window
    pub min: f64,
    /// Upper bound of the target window
    pub max: f64,
    /// Full-scale value of the progress bar
    pub hard_max: f64,
}

/// Where a measured duration falls relative to a zone's target window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneVerdict {
    Early,
    OnTarget,
    Late,
}

impl TimingZone {
    pub const fn new(min: f64, max: f64, hard_max: f64) -> Self {
        Self { min, max, hard_max }
    }

    /// Classify a duration against the target window (bounds inclusive)
    pub fn classify(&self, ms: f64) -> ZoneVerdict {
        if ms < self.min {
            ZoneVerdict::Early
        } else if ms <= self.max {
            ZoneVerdict::OnTarget
        } else {
            ZoneVerdict::Late
        }
    }

    /// Fraction of the bar filled by `ms`, clamped to 0..=1
    pub fn fill_ratio(&self, ms: f64) -> f64 {
        if self.hard_max <= 0.0 {
            return 0.0;
        }
        (ms / self.hard_max).clamp(0.0, 1.0)
    }

    /// Check `0 <= min < max < hard_max` for zone number `zone` (1-based)
    pub fn validate(&self, zone: usize) -> Result<(), ConfigValidationError> {
        for (field, value) in [("Min", self.min), ("Max", self.max), ("HardMax", self.hard_max)] {
            if !value.is_finite() {
                return Err(ConfigValidationError::NotFinite { zone, field });
            }
            if value < 0.0 {
                return Err(ConfigValidationError::Negative { zone, field });
            }
        }
        if !(self.min < self.max && self.max < self.hard_max) {
            return Err(ConfigValidationError::ZoneOrder {
                zone,
                min: self.min,
                max: self.max,
                hard_max: self.hard_max,
            });
        }
        Ok(())
    }
}

/// Keys that drive the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyBindings {
    /// Release arms segment 1; press resets
    pub start_key: KeyCode,
    /// Press closes segment 1 and segment 2
    pub split_key: KeyCode,
    /// Press closes segment 3
    pub end_key: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            start_key: KeyCode::C,
            split_key: KeyCode::ESCAPE,
            end_key: KeyCode::E,
        }
    }
}

impl KeyBindings {
    /// All three bindings must be pairwise distinct
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let named = [
            ("StartKey", self.start_key),
            ("SplitKey", self.split_key),
            ("EndKey", self.end_key),
        ];
        for (i, &(first, a)) in named.iter().enumerate() {
            for &(second, b) in &named[i + 1..] {
                if a == b {
                    return Err(ConfigValidationError::DuplicateKeys { first, second, key: a });
                }
            }
        }
        Ok(())
    }
}

fn default_timer1() -> TimingZone {
    TimingZone::new(40.0, 60.0, 90.0)
}

fn default_timer2() -> TimingZone {
    TimingZone::new(1060.0, 1100.0, 1500.0)
}

fn default_timer3() -> TimingZone {
    TimingZone::new(230.0, 250.0, 500.0)
}

fn default_dark_mode() -> bool {
    true
}

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    /// Segment 1 zone
    #[serde(default = "default_timer1")]
    pub timer1: TimingZone,
    /// Segment 2 zone
    #[serde(default = "default_timer2")]
    pub timer2: TimingZone,
    /// Segment 3 zone
    #[serde(default = "default_timer3")]
    pub timer3: TimingZone,
    /// Key bindings
    #[serde(default)]
    pub keys: KeyBindings,
    /// Dark or light palette
    #[serde(default = "default_dark_mode")]
    pub dark_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timer1: default_timer1(),
            timer2: default_timer2(),
            timer3: default_timer3(),
            keys: KeyBindings::default(),
            dark_mode: default_dark_mode(),
        }
    }
}

impl Config {
    /// Zones in segment order
    pub fn zones(&self) -> [TimingZone; 3] {
        [self.timer1, self.timer2, self.timer3]
    }

    /// Check every invariant. Nothing is applied unless this passes.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (i, zone) in self.zones().iter().enumerate() {
            zone.validate(i + 1)?;
        }
        self.keys.validate()
    }

    /// Load configuration from the default config file.
    ///
    /// Returns the default configuration if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse and validate a JSON document
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the default location, substituting defaults on any failure.
    ///
    /// The second value is a user-facing notice describing why defaults were
    /// used; it is `None` when the file was read (or simply absent).
    pub fn load_or_default() -> (Self, Option<String>) {
        Self::recover(Self::load())
    }

    /// Same as [`Config::load_or_default`] for an explicit path.
    ///
    /// A missing file is not an error.
    pub fn load_or_default_from(path: &Path) -> (Self, Option<String>) {
        if !path.exists() {
            return (Self::default(), None);
        }
        Self::recover(Self::load_from(path))
    }

    fn recover(result: Result<Self, ConfigError>) -> (Self, Option<String>) {
        match result {
            Ok(config) => (config, None),
            Err(e) => {
                log::warn!("config load failed, using defaults: {}", e);
                (Self::default(), Some(format!("Config not loaded ({}); using defaults", e)))
            }
        }
    }

    /// Save configuration to the default config file.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Validate, then write pretty-printed JSON to `path`
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        log::info!("config saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::temp_json_path;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn config_default_values() {
        let config = Config::default();
        assert_eq!(config.timer1, TimingZone::new(40.0, 60.0, 90.0));
        assert_eq!(config.timer2, TimingZone::new(1060.0, 1100.0, 1500.0));
        assert_eq!(config.timer3, TimingZone::new(230.0, 250.0, 500.0));
        assert_eq!(config.keys.start_key, KeyCode::C);
        assert_eq!(config.keys.split_key, KeyCode::ESCAPE);
        assert_eq!(config.keys.end_key, KeyCode::E);
        assert!(config.dark_mode);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_save_and_load_roundtrip() {
        let path = temp_json_path("config-roundtrip");

        let mut config = Config::default();
        config.timer2 = TimingZone::new(1000.5, 1100.25, 1600.0);
        config.keys.end_key = KeyCode::from_name("F").unwrap();
        config.dark_mode = false;

        config.save_to(&path).expect("Failed to save config");
        let loaded = Config::load_from(&path).expect("Failed to load config");

        for (a, b) in config.zones().iter().zip(loaded.zones().iter()) {
            assert!(approx(a.min, b.min));
            assert!(approx(a.max, b.max));
            assert!(approx(a.hard_max, b.hard_max));
        }
        assert_eq!(loaded.keys, config.keys);
        assert_eq!(loaded.dark_mode, config.dark_mode);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn serializes_with_pascal_case_fields() {
        let json = serde_json::to_string_pretty(&Config::default()).expect("Failed to serialize");

        assert!(json.contains("\"Timer1\""));
        assert!(json.contains("\"HardMax\": 90.0"));
        assert!(json.contains("\"StartKey\": \"C\""));
        assert!(json.contains("\"SplitKey\": \"Escape\""));
        assert!(json.contains("\"DarkMode\": true"));
    }

    #[test]
    fn deserializes_from_json() {
        let json = r#"{
            "Timer1": { "Min": 10, "Max": 20, "HardMax": 30 },
            "Timer2": { "Min": 100, "Max": 200, "HardMax": 300 },
            "Timer3": { "Min": 1, "Max": 2, "HardMax": 3 },
            "Keys": { "StartKey": "Space", "SplitKey": "F1", "EndKey": "Enter" },
            "DarkMode": false
        }"#;

        let config = Config::from_json(json).expect("Failed to deserialize");

        assert_eq!(config.timer1, TimingZone::new(10.0, 20.0, 30.0));
        assert_eq!(config.timer3.hard_max, 3.0);
        assert_eq!(config.keys.start_key, KeyCode::from_name("Space").unwrap());
        assert_eq!(config.keys.split_key, KeyCode::from_name("F1").unwrap());
        assert!(!config.dark_mode);
    }

    #[test]
    fn missing_zone_defaults_individually() {
        let json = r#"{ "Timer2": { "Min": 1, "Max": 2, "HardMax": 3 } }"#;
        let config = Config::from_json(json).unwrap();

        assert_eq!(config.timer1, default_timer1());
        assert_eq!(config.timer2, TimingZone::new(1.0, 2.0, 3.0));
        assert_eq!(config.timer3, default_timer3());
        assert_eq!(config.keys, KeyBindings::default());
        assert!(config.dark_mode);
    }

    #[test]
    fn inverted_zone_is_rejected() {
        let mut config = Config::default();
        config.timer2 = TimingZone::new(100.0, 50.0, 200.0);
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::ZoneOrder {
                zone: 2,
                min: 100.0,
                max: 50.0,
                hard_max: 200.0,
            })
        );
    }

    #[test]
    fn hard_max_must_exceed_max() {
        assert!(TimingZone::new(1.0, 5.0, 5.0).validate(1).is_err());
        assert!(TimingZone::new(1.0, 5.0, 6.0).validate(1).is_ok());
    }

    #[test]
    fn negative_and_nan_values_are_rejected() {
        assert!(matches!(
            TimingZone::new(-1.0, 5.0, 6.0).validate(3),
            Err(ConfigValidationError::Negative { zone: 3, field: "Min" })
        ));
        assert!(matches!(
            TimingZone::new(1.0, f64::NAN, 6.0).validate(1),
            Err(ConfigValidationError::NotFinite { field: "Max", .. })
        ));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let mut config = Config::default();
        config.keys.end_key = config.keys.start_key;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigValidationError::DuplicateKeys { first: "StartKey", second: "EndKey", .. }
        ));
        assert!(err.to_string().contains("C"));
    }

    #[test]
    fn save_refuses_invalid_config() {
        let path = temp_json_path("config-invalid");
        let mut config = Config::default();
        config.timer1 = TimingZone::new(5.0, 1.0, 9.0);

        assert!(matches!(config.save_to(&path), Err(ConfigError::Invalid(_))));
        assert!(!path.exists());
    }

    #[test]
    fn malformed_file_falls_back_with_notice() {
        let path = temp_json_path("config-malformed");
        fs::write(&path, "{ this is not json").unwrap();

        let (config, notice) = Config::load_or_default_from(&path);
        assert_eq!(config, Config::default());
        assert!(notice.expect("notice").contains("defaults"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn invalid_file_contents_fall_back_with_notice() {
        let path = temp_json_path("config-badzone");
        fs::write(&path, r#"{ "Timer1": { "Min": 9, "Max": 1, "HardMax": 10 } }"#).unwrap();

        let (config, notice) = Config::load_or_default_from(&path);
        assert_eq!(config, Config::default());
        assert!(notice.is_some());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn unknown_key_name_is_a_parse_error() {
        let json = r#"{ "Keys": { "StartKey": "Nope", "SplitKey": "Escape", "EndKey": "E" } }"#;
        assert!(matches!(Config::from_json(json), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_is_silent_default() {
        let path = PathBuf::from("/nonexistent/keysplit/config.json");
        let (config, notice) = Config::load_or_default_from(&path);
        assert_eq!(config, Config::default());
        assert!(notice.is_none());
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn classify_and_fill() {
        let zone = TimingZone::new(40.0, 60.0, 90.0);
        assert_eq!(zone.classify(39.0), ZoneVerdict::Early);
        assert_eq!(zone.classify(40.0), ZoneVerdict::OnTarget);
        assert_eq!(zone.classify(60.0), ZoneVerdict::OnTarget);
        assert_eq!(zone.classify(61.0), ZoneVerdict::Late);
        assert!(approx(zone.fill_ratio(45.0), 0.5));
        assert_eq!(zone.fill_ratio(500.0), 1.0);
        assert_eq!(zone.fill_ratio(-3.0), 0.0);
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::NoConfigDir;
        assert_eq!(err.to_string(), "Could not determine config directory");

        let io_err = ConfigError::Io(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(io_err.to_string().contains("IO error"));
    }
}
