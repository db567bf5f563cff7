//! Process-wide global key hook
//!
//! [`GlobalHook`] owns the background thread that captures system-wide key
//! events and forwards them over a channel. The consumer side of that channel
//! is the only place timer state is mutated. Dropping the hook stops and
//! joins the thread, so the capture never outlives its owner.

use super::KeyEvent;
use crate::clock::Clock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Poll period of the capture thread
pub const HOOK_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Failure to install or run the global key hook
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("global keyboard capture unavailable: {0}")]
    Unavailable(String),
    #[error("failed to spawn key hook thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
    #[error("key event receiver disconnected")]
    Disconnected,
}

/// A backend that turns OS keyboard state into [`KeyEvent`]s.
///
/// `poll` is called repeatedly from the hook thread and must not block.
pub trait KeySource {
    /// Backend name for diagnostics
    fn name(&self) -> &'static str;

    /// Forward any pending transitions, returning how many were sent
    fn poll(&mut self) -> Result<usize, HookError>;
}

/// Builds a [`KeySource`] on the hook thread.
pub type SourceFactory =
    Box<dyn FnOnce(Clock, mpsc::Sender<KeyEvent>) -> Result<Box<dyn KeySource>, HookError> + Send>;

/// Installed global key hook. Deregisters on drop.
pub struct GlobalHook {
    backend: &'static str,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl GlobalHook {
    /// Install the platform's preferred backend.
    ///
    /// On Linux raw evdev is tried first, then device_query polling.
    pub fn install(clock: Clock, event_tx: mpsc::Sender<KeyEvent>) -> Result<Self, HookError> {
        Self::install_with(clock, event_tx, Box::new(default_source))
    }

    /// Install a hook around a specific backend.
    ///
    /// The factory runs on the hook thread; its result is reported back
    /// before this returns, so a failing backend surfaces here.
    pub fn install_with(
        clock: Clock,
        event_tx: mpsc::Sender<KeyEvent>,
        factory: SourceFactory,
    ) -> Result<Self, HookError> {
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<&'static str, HookError>>(1);

        let thread_stop = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name("key-hook".to_string())
            .spawn(move || {
                let built = panic::catch_unwind(AssertUnwindSafe(|| factory(clock, event_tx)))
                    .unwrap_or_else(|payload| Err(HookError::Unavailable(panic_message(&payload))));
                let mut source = match built {
                    Ok(source) => {
                        let _ = ready_tx.send(Ok(source.name()));
                        source
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                run_hook_loop(source.as_mut(), &thread_stop);
            })?;

        let backend = match ready_rx.recv() {
            Ok(Ok(name)) => name,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(HookError::Unavailable("hook thread exited during setup".to_string()));
            }
        };

        log::info!("global key hook installed ({} backend)", backend);
        Ok(Self {
            backend,
            stop,
            thread: Some(thread),
        })
    }

    /// Name of the active backend
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// Whether the capture thread is still running
    pub fn is_active(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Deregister now instead of at drop
    pub fn uninstall(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.stop.store(true, Ordering::SeqCst);
        if thread.join().is_err() {
            log::error!("key hook thread panicked during shutdown");
        }
        log::info!("global key hook removed");
    }
}

impl Drop for GlobalHook {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_hook_loop(source: &mut dyn KeySource, stop: &AtomicBool) {
    while !stop.load(Ordering::SeqCst) {
        // A panic inside one poll must not take the hook down
        match panic::catch_unwind(AssertUnwindSafe(|| source.poll())) {
            Ok(Ok(_)) => {}
            Ok(Err(HookError::Disconnected)) => {
                log::debug!("key event receiver gone, stopping hook");
                break;
            }
            Ok(Err(HookError::Unavailable(reason))) => {
                log::error!("key capture lost: {}", reason);
                break;
            }
            Ok(Err(e)) => log::warn!("key poll failed: {}", e),
            Err(payload) => log::warn!("key poll panicked: {}", panic_message(&payload)),
        }
        thread::sleep(HOOK_POLL_INTERVAL);
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn default_source(
    clock: Clock,
    event_tx: mpsc::Sender<KeyEvent>,
) -> Result<Box<dyn KeySource>, HookError> {
    #[cfg(target_os = "linux")]
    {
        match super::EvdevListener::new(clock, event_tx.clone()) {
            Ok(evdev) => {
                for path in evdev.device_paths() {
                    log::debug!("reading {}", path.display());
                }
                return Ok(Box::new(evdev));
            }
            Err(e) => log::info!("evdev unavailable ({}), falling back to device_query", e),
        }
    }

    Ok(Box::new(super::KeyboardListener::new(clock, event_tx)))
}
