//! Main application state and logic

use super::theme::ThemeColors;
use crate::clock::Millis;
use crate::config::Config;
use crate::keyboard::{KeyCode, KeyDirection, KeyEvent};
use crate::settings::SettingsEditor;
use crate::timing::{
    DisplaySink, Phase, SegmentFrame, TimingMachine, Transition, SEGMENT_COUNT,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// How long a status message stays visible
const STATUS_TTL: Duration = Duration::from_secs(3);

/// Current view/tab in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppView {
    Timer,
    Settings,
    Help,
}

impl AppView {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Timer => "Timer",
            Self::Settings => "Settings",
            Self::Help => "Help",
        }
    }

    pub fn all() -> &'static [AppView] {
        &[Self::Timer, Self::Settings, Self::Help]
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Timer => 0,
            Self::Settings => 1,
            Self::Help => 2,
        }
    }

    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Self::Timer,
            1 => Self::Settings,
            _ => Self::Help,
        }
    }
}

/// Application running state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Running,
    Quitting,
}

/// Latest frame per segment, as handed over by the timing machine
#[derive(Debug, Clone, Default)]
pub struct OverlayBars {
    frames: [Option<SegmentFrame>; SEGMENT_COUNT],
}

impl OverlayBars {
    pub fn frames(&self) -> impl Iterator<Item = &SegmentFrame> {
        self.frames.iter().flatten()
    }

    pub fn get(&self, segment: usize) -> Option<&SegmentFrame> {
        self.frames.get(segment).and_then(Option::as_ref)
    }
}

impl DisplaySink for OverlayBars {
    fn present(&mut self, frame: SegmentFrame) {
        if let Some(slot) = self.frames.get_mut(frame.segment) {
            *slot = Some(frame);
        }
    }
}

/// Main application
pub struct App {
    /// Current view
    pub view: AppView,
    /// Application state
    pub state: AppState,
    /// Configuration for this session
    pub config: Config,
    /// Palette picked from the config at startup
    pub colors: ThemeColors,
    /// Where settings are saved; None disables saving
    pub config_path: Option<PathBuf>,
    /// The segment timer
    pub machine: TimingMachine,
    /// What the overlay draws
    pub bars: OverlayBars,
    /// Draft settings while the editor is open
    pub editor: Option<SettingsEditor>,
    /// Key capture only accepts presses at or after this reading
    pub capture_since: Millis,
    /// A captured key still held down; its release is not a timer event
    pub captured_held: Option<KeyCode>,
    /// Settings were saved and need a restart to apply
    pub restart_pending: bool,
    /// Application start time
    pub start_time: Instant,
    /// Total key events received
    pub total_events: u64,
    /// Completed runs this session
    pub completed_runs: u64,
    /// Last status message
    pub status_message: Option<String>,
    /// Status message timestamp
    pub status_time: Option<Instant>,
    /// Startup notice kept until the first key or the settings view
    pub notice: Option<String>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let machine = TimingMachine::from_config(&config);
        let mut bars = OverlayBars::default();
        machine.present_to(&mut bars);
        Self {
            view: AppView::Timer,
            state: AppState::Running,
            colors: ThemeColors::from_dark_mode(config.dark_mode),
            config,
            config_path: None,
            machine,
            bars,
            editor: None,
            capture_since: 0.0,
            captured_held: None,
            restart_pending: false,
            start_time: Instant::now(),
            total_events: 0,
            completed_runs: 0,
            status_message: None,
            status_time: None,
            notice: None,
        }
    }

    /// Save edited settings to `path`
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    /// Route one key event from the global hook.
    ///
    /// While the settings editor waits for a key, the next press is taken
    /// as the new binding and does not reach the timer. Presses older than
    /// the capture request (the Enter that started it) are not taken. The
    /// release of a captured press is dropped too.
    pub fn process_event(&mut self, event: &KeyEvent) {
        if self.state != AppState::Running {
            return;
        }
        self.total_events += 1;
        self.notice = None;

        match event.direction {
            KeyDirection::Down if event.timestamp_ms >= self.capture_since => {
                if let Some(editor) = self.editor.as_mut() {
                    if editor.capture_key(event.key) {
                        self.captured_held = Some(event.key);
                        return;
                    }
                }
            }
            KeyDirection::Up if self.captured_held == Some(event.key) => {
                self.captured_held = None;
                return;
            }
            _ => {}
        }

        let outcome = self.machine.submit_key_event(event);
        match outcome.transition {
            Transition::Completed(segment) => {
                log::info!(
                    "segment {} completed in {} ms",
                    segment.segment + 1,
                    segment.duration_ms
                );
                if outcome.phase == Phase::Idle {
                    self.completed_runs += 1;
                }
            }
            Transition::Reset => log::debug!("run reset by start key"),
            Transition::Armed | Transition::Ignored => {}
        }
        self.machine.present_to(&mut self.bars);
    }

    /// Periodic update with the current clock reading
    pub fn on_tick(&mut self, now_ms: Millis) {
        let tick = self.machine.tick(now_ms);
        if tick.timed_out {
            self.set_status("Run timed out and was reset".to_string());
        }
        self.machine.present_to(&mut self.bars);
    }

    /// Clear the run
    pub fn reset_timer(&mut self) {
        self.machine.reset();
        self.machine.present_to(&mut self.bars);
        self.set_status("Timer reset".to_string());
    }

    /// Switch to the next view
    pub fn next_view(&mut self) {
        let next = (self.view.index() + 1) % AppView::all().len();
        self.set_view(AppView::from_index(next));
    }

    /// Switch to the previous view
    pub fn prev_view(&mut self) {
        let current = self.view.index();
        let prev = if current == 0 {
            AppView::all().len() - 1
        } else {
            current - 1
        };
        self.set_view(AppView::from_index(prev));
    }

    /// Change view, opening or discarding the settings draft as needed
    pub fn set_view(&mut self, view: AppView) {
        if view == AppView::Settings && self.editor.is_none() {
            self.notice = None;
            self.editor = Some(SettingsEditor::new(&self.config));
        } else if view != AppView::Settings {
            self.editor = None;
        }
        self.view = view;
    }

    /// F2: open settings, or close them discarding the draft
    pub fn toggle_settings(&mut self) {
        if self.view == AppView::Settings {
            self.set_view(AppView::Timer);
        } else {
            self.set_view(AppView::Settings);
        }
    }

    /// Terminal editing keys are ignored while a capture waits for its key
    /// or the captured key is still held, since the same keystroke also
    /// reaches the terminal.
    pub fn settings_input_blocked(&self) -> bool {
        self.captured_held.is_some() || self.editor.as_ref().is_some_and(|e| e.is_capturing())
    }

    /// Enter/Space in the settings view, at clock reading `now_ms`
    pub fn activate_setting(&mut self, now_ms: Millis) {
        if let Some(editor) = self.editor.as_mut() {
            editor.activate();
            if editor.is_capturing() {
                self.capture_since = now_ms;
            }
        }
    }

    /// Validate and persist the settings draft
    pub fn save_settings(&mut self) {
        let Some(path) = self.config_path.clone() else {
            self.set_status("No config location; settings not saved".to_string());
            return;
        };
        let Some(editor) = self.editor.as_mut() else {
            return;
        };
        match editor.commit(&path) {
            Ok(_) => {
                self.restart_pending = true;
                self.set_view(AppView::Timer);
                self.set_status("Settings saved; restart to apply".to_string());
            }
            // Editor keeps the message and stays open
            Err(e) => log::info!("settings rejected: {}", e),
        }
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.state = AppState::Quitting;
    }

    /// Set a status message
    pub fn set_status(&mut self, message: String) {
        self.status_message = Some(message);
        self.status_time = Some(Instant::now());
    }

    /// Show a startup notice until the first key or the settings view
    pub fn set_notice(&mut self, notice: String) {
        self.notice = Some(notice);
    }

    /// Get status message if still valid
    pub fn get_status(&self) -> Option<&str> {
        match (&self.status_message, self.status_time) {
            (Some(msg), Some(time)) if time.elapsed() < STATUS_TTL => Some(msg.as_str()),
            _ if self.notice.is_some() => self.notice.as_deref(),
            _ if self.restart_pending => Some("Restart to apply saved settings"),
            _ => None,
        }
    }

    /// Bindings as shown in the status bar
    pub fn bindings_summary(&self) -> String {
        let keys = self.machine.bindings();
        format!(
            "Start {}  Split {}  End {}",
            keys.start_key.label(),
            keys.split_key.label(),
            keys.end_key.label()
        )
    }

    /// Get elapsed time formatted
    pub fn elapsed_formatted(&self) -> String {
        let secs = self.start_time.elapsed().as_secs();
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{:02}:{:02}", mins, secs)
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
