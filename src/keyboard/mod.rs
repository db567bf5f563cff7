//! Global keyboard capture: key identifiers, events, and the hook that
//! delivers them from outside the application's focus

mod event;
pub mod hook;
pub mod keymap;
#[cfg(target_os = "linux")]
mod evdev_listener;

pub use event::{KeyDirection, KeyEvent, KeyboardListener};
pub use hook::{GlobalHook, HookError, KeySource};
pub use keymap::{KeyCode, KeyInfo, KEYMAP};

#[cfg(target_os = "linux")]
pub use evdev_listener::{evdev_status, EvdevError, EvdevListener};
