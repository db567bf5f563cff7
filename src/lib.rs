//! keysplit - global-hotkey segment timer
//!
//! Times three consecutive input windows from system-wide key presses and
//! shows each one against its configured target window.

pub mod clock;
pub mod config;
pub mod keyboard;
pub mod settings;
pub mod timing;
pub mod ui;

pub use config::Config;

#[cfg(test)]
pub(crate) mod test_helpers;
