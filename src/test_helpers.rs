//! Shared test utilities
//!
//! Event builders with millisecond timestamps and scratch file paths.

use crate::clock::Millis;
use crate::keyboard::{KeyCode, KeyEvent};
use crate::timing::{Outcome, TimingMachine};
use std::env;
use std::path::PathBuf;

/// Key-down of `key` at `ms`
pub fn press_at(key: KeyCode, ms: Millis) -> KeyEvent {
    KeyEvent::down(key, ms)
}

/// Key-up of `key` at `ms`
pub fn release_at(key: KeyCode, ms: Millis) -> KeyEvent {
    KeyEvent::up(key, ms)
}

/// Feed events in order, returning the last outcome
pub fn feed(machine: &mut TimingMachine, events: &[KeyEvent]) -> Option<Outcome> {
    events.iter().map(|e| machine.submit_key_event(e)).last()
}

/// Per-process scratch path for a JSON file
pub fn temp_json_path(tag: &str) -> PathBuf {
    env::temp_dir().join(format!("keysplit-{}-{}.json", tag, std::process::id()))
}
