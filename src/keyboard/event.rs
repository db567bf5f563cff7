//! Keyboard event types and the portable polling listener

use super::hook::{HookError, KeySource};
use super::KeyCode;
use crate::clock::{Clock, Millis};
use device_query::{DeviceQuery, DeviceState};
use std::sync::mpsc;

/// Direction of a key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    /// Key was pressed down
    Down,
    /// Key was released
    Up,
}

/// A keyboard event stamped with the session clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyEvent {
    /// The key code
    pub key: KeyCode,
    /// Press or release
    pub direction: KeyDirection,
    /// Arrival time in session-clock milliseconds
    pub timestamp_ms: Millis,
}

impl KeyEvent {
    pub fn new(key: KeyCode, direction: KeyDirection, timestamp_ms: Millis) -> Self {
        Self {
            key,
            direction,
            timestamp_ms,
        }
    }

    pub fn down(key: KeyCode, timestamp_ms: Millis) -> Self {
        Self::new(key, KeyDirection::Down, timestamp_ms)
    }

    pub fn up(key: KeyCode, timestamp_ms: Millis) -> Self {
        Self::new(key, KeyDirection::Up, timestamp_ms)
    }
}

/// Keyboard listener that polls the global key state via device_query.
///
/// Works regardless of which window has focus. Transitions are found by
/// diffing the pressed-key set between polls, so timestamp resolution is the
/// poll period.
pub struct KeyboardListener {
    device_state: DeviceState,
    last_keys: Vec<device_query::Keycode>,
    clock: Clock,
    event_tx: mpsc::Sender<KeyEvent>,
}

impl KeyboardListener {
    /// Create a new keyboard listener
    pub fn new(clock: Clock, event_tx: mpsc::Sender<KeyEvent>) -> Self {
        let device_state = DeviceState::new();
        // Keys already held at startup are not reported as presses
        let last_keys = device_state.get_keys();
        Self {
            device_state,
            last_keys,
            clock,
            event_tx,
        }
    }

    fn emit(&self, key: device_query::Keycode, direction: KeyDirection, now: Millis) -> Result<(), HookError> {
        let event = KeyEvent::new(KeyCode::from(key), direction, now);
        self.event_tx
            .send(event)
            .map_err(|_| HookError::Disconnected)
    }
}

impl KeySource for KeyboardListener {
    fn name(&self) -> &'static str {
        "device_query"
    }

    /// Poll for keyboard state changes.
    /// Returns the number of events generated
    fn poll(&mut self) -> Result<usize, HookError> {
        let now = self.clock.now_ms();
        let current_keys = self.device_state.get_keys();
        let mut event_count = 0;

        // Releases first so a release/press pair within one poll keeps order
        for key in &self.last_keys {
            if !current_keys.contains(key) {
                self.emit(*key, KeyDirection::Up, now)?;
                event_count += 1;
            }
        }

        for key in &current_keys {
            if !self.last_keys.contains(key) {
                self.emit(*key, KeyDirection::Down, now)?;
                event_count += 1;
            }
        }

        self.last_keys = current_keys;
        Ok(event_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_direction() {
        let down = KeyEvent::down(KeyCode::C, 12.5);
        assert_eq!(down.direction, KeyDirection::Down);
        assert_eq!(down.timestamp_ms, 12.5);

        let up = KeyEvent::up(KeyCode::E, 40.0);
        assert_eq!(up.direction, KeyDirection::Up);
        assert_eq!(up.key, KeyCode::E);
    }
}
