//! Raw evdev-based keyboard listener for Linux
//!
//! Reads kernel input events straight from `/dev/input/event*`, which sees
//! every keyboard on the system regardless of window focus or display
//! server. Requires read access to the devices (root or the `input` group).

use super::hook::{HookError, KeySource};
use super::{KeyCode, KeyDirection, KeyEvent};
use crate::clock::Clock;
use nix::libc;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Error type for evdev operations
#[derive(Debug, thiserror::Error)]
pub enum EvdevError {
    #[error("No keyboard devices found")]
    NoDevices,
    #[error("Permission denied accessing {0}")]
    PermissionDenied(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Device enumeration failed: {0}")]
    EnumerationFailed(String),
}

/// A raw input event from the kernel
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct InputEvent {
    tv_sec: libc::time_t,
    tv_usec: libc::suseconds_t,
    event_type: u16,
    code: u16,
    value: i32,
}

const EV_KEY: u16 = 0x01;
const KEY_REPEAT: i32 = 2;
const INPUT_EVENT_SIZE: usize = std::mem::size_of::<InputEvent>();

/// Find all keyboard input devices
fn find_keyboard_devices() -> Result<Vec<PathBuf>, EvdevError> {
    let input_dir = Path::new("/dev/input");
    if !input_dir.exists() {
        return Err(EvdevError::EnumerationFailed(
            "/dev/input does not exist".to_string(),
        ));
    }

    let mut keyboards: Vec<PathBuf> = fs::read_dir(input_dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| name.starts_with("event"))
        })
        .filter(|path| is_keyboard_device(path))
        .collect();
    keyboards.sort();

    if keyboards.is_empty() {
        return Err(EvdevError::NoDevices);
    }

    Ok(keyboards)
}

/// Check if a device is a keyboard by examining /sys/class/input
fn is_keyboard_device(device_path: &Path) -> bool {
    let Some(name) = device_path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    let caps_path = format!("/sys/class/input/{}/device/capabilities/key", name);
    if let Ok(caps) = fs::read_to_string(&caps_path) {
        let trimmed = caps.trim();
        if !trimmed.is_empty() && trimmed != "0" {
            // Keyboards advertise many key bits; mice and power buttons a handful
            let total_bits: u32 = trimmed
                .split_whitespace()
                .filter_map(|hex| u64::from_str_radix(hex, 16).ok())
                .map(|n| n.count_ones())
                .sum();
            return total_bits > 50;
        }
    }

    let name_path = format!("/sys/class/input/{}/device/name", name);
    if let Ok(dev_name) = fs::read_to_string(&name_path) {
        let dev_name_lower = dev_name.to_lowercase();
        return dev_name_lower.contains("keyboard") || dev_name_lower.contains("kbd");
    }
    false
}

/// Evdev-based keyboard listener
pub struct EvdevListener {
    devices: Vec<File>,
    device_paths: Vec<PathBuf>,
    pressed_keys: HashSet<u16>,
    clock: Clock,
    event_tx: mpsc::Sender<KeyEvent>,
    buffer: Vec<u8>,
}

impl EvdevListener {
    /// Open every accessible keyboard device in non-blocking mode
    pub fn new(clock: Clock, event_tx: mpsc::Sender<KeyEvent>) -> Result<Self, EvdevError> {
        let candidates = find_keyboard_devices()?;
        let mut devices = Vec::new();
        let mut device_paths = Vec::new();

        for path in candidates {
            match File::open(&path) {
                Ok(file) => {
                    let fd = file.as_raw_fd();
                    // SAFETY: fd is a valid descriptor owned by `file` for this scope
                    unsafe {
                        let flags = libc::fcntl(fd, libc::F_GETFL);
                        libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                    }
                    devices.push(file);
                    device_paths.push(path);
                }
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    log::debug!("skipping {}: permission denied", path.display());
                }
                Err(e) => return Err(EvdevError::Io(e)),
            }
        }

        if devices.is_empty() {
            return Err(EvdevError::PermissionDenied(
                "keyboard devices (run as root or join the 'input' group)".to_string(),
            ));
        }

        Ok(Self {
            devices,
            device_paths,
            pressed_keys: HashSet::new(),
            clock,
            event_tx,
            buffer: vec![0u8; INPUT_EVENT_SIZE * 64],
        })
    }

    /// Paths of the devices being read
    pub fn device_paths(&self) -> &[PathBuf] {
        &self.device_paths
    }

    /// Translate one raw event, returning None for non-key, repeat, or duplicate events
    fn translate(&mut self, raw: &InputEvent) -> Option<(KeyCode, KeyDirection)> {
        if raw.event_type != EV_KEY || raw.value == KEY_REPEAT {
            return None;
        }
        let scancode = raw.code;
        if raw.value != 0 {
            // Several devices can report the same key; keep the first press
            self.pressed_keys
                .insert(scancode)
                .then_some((KeyCode::new(scancode), KeyDirection::Down))
        } else {
            self.pressed_keys
                .remove(&scancode)
                .then_some((KeyCode::new(scancode), KeyDirection::Up))
        }
    }
}

impl KeySource for EvdevListener {
    fn name(&self) -> &'static str {
        "evdev"
    }

    fn poll(&mut self) -> Result<usize, HookError> {
        let now = self.clock.now_ms();
        let mut event_count = 0;
        let mut raw_events = Vec::new();
        let mut failed = Vec::new();

        for (index, device) in self.devices.iter_mut().enumerate() {
            loop {
                match device.read(&mut self.buffer) {
                    Ok(bytes_read) if bytes_read >= INPUT_EVENT_SIZE => {
                        for chunk in self.buffer[..bytes_read].chunks_exact(INPUT_EVENT_SIZE) {
                            // SAFETY: chunk is exactly one InputEvent as written by the kernel
                            let raw: InputEvent = unsafe {
                                std::ptr::read_unaligned(chunk.as_ptr() as *const InputEvent)
                            };
                            raw_events.push(raw);
                        }
                    }
                    Ok(_) => break,
                    Err(ref e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                        ) =>
                    {
                        break
                    }
                    Err(e) => {
                        log::warn!(
                            "evdev read failed on {}, dropping device: {}",
                            self.device_paths[index].display(),
                            e
                        );
                        failed.push(index);
                        break;
                    }
                }
            }
        }

        // Unplugged devices fail every read; stop polling them
        for index in failed.into_iter().rev() {
            self.devices.remove(index);
            self.device_paths.remove(index);
        }

        for raw in &raw_events {
            if let Some((key, direction)) = self.translate(raw) {
                self.event_tx
                    .send(KeyEvent::new(key, direction, now))
                    .map_err(|_| HookError::Disconnected)?;
                event_count += 1;
            }
        }

        if self.devices.is_empty() {
            return Err(HookError::Unavailable(
                "every evdev keyboard device was lost".to_string(),
            ));
        }
        Ok(event_count)
    }
}

/// Get a status message about evdev availability
pub fn evdev_status() -> String {
    match find_keyboard_devices() {
        Ok(devices) => format!("{} keyboard device(s) found", devices.len()),
        Err(EvdevError::NoDevices) => "No keyboard devices found".to_string(),
        Err(e) => format!("Error: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(code: u16, value: i32) -> InputEvent {
        InputEvent {
            tv_sec: 0,
            tv_usec: 0,
            event_type: EV_KEY,
            code,
            value,
        }
    }

    fn listener() -> EvdevListener {
        let (tx, _rx) = mpsc::channel();
        EvdevListener {
            devices: Vec::new(),
            device_paths: Vec::new(),
            pressed_keys: HashSet::new(),
            clock: Clock::start(),
            event_tx: tx,
            buffer: Vec::new(),
        }
    }

    #[test]
    fn repeats_are_dropped() {
        let mut l = listener();
        assert_eq!(l.translate(&raw(46, 1)), Some((KeyCode::C, KeyDirection::Down)));
        assert_eq!(l.translate(&raw(46, KEY_REPEAT)), None);
        assert_eq!(l.translate(&raw(46, 0)), Some((KeyCode::C, KeyDirection::Up)));
    }

    #[test]
    fn duplicate_presses_from_second_device_are_dropped() {
        let mut l = listener();
        assert!(l.translate(&raw(18, 1)).is_some());
        assert_eq!(l.translate(&raw(18, 1)), None);
        assert!(l.translate(&raw(18, 0)).is_some());
        assert_eq!(l.translate(&raw(18, 0)), None);
    }

    #[test]
    fn non_key_events_are_ignored() {
        let mut l = listener();
        let mut sync = raw(0, 0);
        sync.event_type = 0;
        assert_eq!(l.translate(&sync), None);
    }

    #[test]
    fn failing_device_is_dropped() {
        let empty = std::env::temp_dir().join(format!("keysplit-evdev-{}", std::process::id()));
        fs::write(&empty, b"").unwrap();

        let mut l = listener();
        // Reading a directory fails on every call
        l.devices.push(File::open(std::env::temp_dir()).unwrap());
        l.device_paths.push(std::env::temp_dir());
        l.devices.push(File::open(&empty).unwrap());
        l.device_paths.push(empty.clone());
        l.buffer = vec![0u8; INPUT_EVENT_SIZE * 4];

        for _ in 0..10 {
            assert_eq!(l.poll().unwrap(), 0);
        }
        assert_eq!(l.devices.len(), 1);
        assert_eq!(l.device_paths(), &[empty.clone()][..]);
        let _ = fs::remove_file(&empty);
    }

    #[test]
    fn losing_every_device_is_an_error() {
        let mut l = listener();
        l.devices.push(File::open(std::env::temp_dir()).unwrap());
        l.device_paths.push(std::env::temp_dir());
        l.buffer = vec![0u8; INPUT_EVENT_SIZE * 4];

        assert!(matches!(l.poll(), Err(HookError::Unavailable(_))));
        assert!(l.devices.is_empty());
        assert!(l.device_paths().is_empty());
    }

    #[test]
    fn status_is_never_empty() {
        assert!(!evdev_status().is_empty());
    }
}
