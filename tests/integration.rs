//! Integration tests for keysplit
//!
//! These tests exercise the full App pipeline: hook events routed through
//! the timing machine into the overlay bars, the watchdog, and the settings
//! editor saving to disk.

use keysplit::config::{Config, KeyBindings, TimingZone};
use keysplit::keyboard::{KeyCode, KeyEvent};
use keysplit::settings::Field;
use keysplit::timing::{KeyRole, Phase};
use keysplit::ui::{App, AppState, AppView, ThemeColors};
use std::env;
use std::fs;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const START: KeyCode = KeyCode::C;
const SPLIT: KeyCode = KeyCode::ESCAPE;
const END: KeyCode = KeyCode::E;

fn press(key: KeyCode, ms: f64) -> KeyEvent {
    KeyEvent::down(key, ms)
}

fn release(key: KeyCode, ms: f64) -> KeyEvent {
    KeyEvent::up(key, ms)
}

fn temp_config(tag: &str) -> PathBuf {
    env::temp_dir().join(format!("keysplit-it-{}-{}.json", tag, std::process::id()))
}

/// Displayed value per segment as the overlay sees it
fn shown(app: &App) -> Vec<u64> {
    app.bars.frames().map(|f| f.elapsed_ms).collect()
}

/// start Up @1000, split Down @1045, split Down @2110, end Down @2355
fn reference_run(app: &mut App) {
    app.process_event(&press(START, 990.0));
    app.process_event(&release(START, 1000.0));
    app.process_event(&press(SPLIT, 1045.0));
    app.process_event(&release(SPLIT, 1080.0));
    app.process_event(&press(SPLIT, 2110.0));
    app.process_event(&release(SPLIT, 2150.0));
    app.process_event(&press(END, 2355.0));
    app.process_event(&release(END, 2400.0));
}

// ---------------------------------------------------------------------------
// Full pipeline tests
// ---------------------------------------------------------------------------

#[test]
fn full_run_reaches_the_overlay() {
    let mut app = App::default();
    reference_run(&mut app);

    assert_eq!(app.machine.phase(), Phase::Idle);
    assert_eq!(shown(&app), vec![45, 1065, 245]);
    assert_eq!(app.completed_runs, 1);
    assert_eq!(app.total_events, 8);
    assert!(app.bars.frames().all(|f| !f.active));
}

#[test]
fn overlay_starts_with_three_empty_bars() {
    let app = App::default();
    assert_eq!(shown(&app), vec![0, 0, 0]);
    let zones: Vec<TimingZone> = app.bars.frames().map(|f| f.zone).collect();
    assert_eq!(zones, Config::default().zones().to_vec());
}

#[test]
fn tick_shows_live_value_of_active_segment() {
    let mut app = App::default();
    app.process_event(&release(START, 1000.0));
    app.on_tick(1030.4);

    let bar = app.bars.get(0).unwrap();
    assert!(bar.active);
    assert_eq!(bar.elapsed_ms, 30);
}

#[test]
fn start_press_mid_run_clears_everything() {
    let mut app = App::default();
    app.process_event(&release(START, 1000.0));
    app.process_event(&press(SPLIT, 1045.0));
    app.on_tick(1500.0);

    app.process_event(&press(START, 1600.0));
    assert_eq!(app.machine.phase(), Phase::Idle);
    assert_eq!(shown(&app), vec![0, 0, 0]);
    assert_eq!(app.completed_runs, 0);
}

#[test]
fn unbound_keys_do_not_move_the_timer() {
    let mut app = App::default();
    app.process_event(&press(KeyCode(30), 10.0));
    app.process_event(&release(KeyCode(30), 20.0));
    assert_eq!(app.machine.phase(), Phase::Idle);
    assert_eq!(app.total_events, 2);
}

#[test]
fn watchdog_resets_stale_run_on_tick() {
    let mut app = App::default();
    app.process_event(&release(START, 0.0));
    app.process_event(&press(SPLIT, 50.0));

    app.on_tick(600_050.0);
    assert_eq!(app.machine.phase(), Phase::Segment2);

    app.on_tick(600_051.0);
    assert_eq!(app.machine.phase(), Phase::Idle);
    assert_eq!(shown(&app), vec![0, 0, 0]);
    assert_eq!(app.get_status(), Some("Run timed out and was reset"));
}

#[test]
fn manual_reset_clears_run() {
    let mut app = App::default();
    app.process_event(&release(START, 0.0));
    app.on_tick(100.0);

    app.reset_timer();
    app.reset_timer();
    assert_eq!(app.machine.phase(), Phase::Idle);
    assert_eq!(shown(&app), vec![0, 0, 0]);
}

#[test]
fn custom_bindings_drive_the_run() {
    let keys = KeyBindings {
        start_key: KeyCode::from_name("F1").unwrap(),
        split_key: KeyCode::from_name("Space").unwrap(),
        end_key: KeyCode::from_name("Enter").unwrap(),
    };
    let mut app = App::new(Config {
        keys,
        ..Config::default()
    });

    // Default keys are plain keys now
    app.process_event(&release(START, 0.0));
    assert_eq!(app.machine.phase(), Phase::Idle);

    app.process_event(&release(keys.start_key, 100.0));
    app.process_event(&press(keys.split_key, 160.0));
    app.process_event(&press(keys.split_key, 1200.0));
    app.process_event(&press(keys.end_key, 1440.0));
    assert_eq!(shown(&app), vec![60, 1040, 240]);
    assert!(app.bindings_summary().contains("Space"));
}

#[test]
fn events_ignored_after_quit() {
    let mut app = App::default();
    app.quit();
    assert_eq!(app.state, AppState::Quitting);
    app.process_event(&release(START, 0.0));
    assert_eq!(app.total_events, 0);
    assert_eq!(app.machine.phase(), Phase::Idle);
}

// ---------------------------------------------------------------------------
// Settings tests
// ---------------------------------------------------------------------------

fn select_row(app: &mut App, label: &str) {
    let editor = app.editor.as_mut().expect("settings open");
    for _ in 0..Field::ALL.len() {
        if editor.selected_field().label() == label {
            return;
        }
        editor.select_next();
    }
    panic!("no settings row {}", label);
}

#[test]
fn captured_key_goes_to_editor_not_timer() {
    let mut app = App::default();
    app.set_view(AppView::Settings);
    select_row(&mut app, "Start key");
    app.activate_setting(500.0);

    // The Enter that opened the capture happened earlier and is not taken
    app.process_event(&press(KeyCode::from_name("Enter").unwrap(), 499.0));
    assert!(app.editor.as_ref().unwrap().is_capturing());

    app.process_event(&press(SPLIT, 520.0));
    let editor = app.editor.as_ref().unwrap();
    assert!(!editor.is_capturing());
    assert_eq!(editor.value_text(Field::Key(KeyRole::Start)), "Escape");

    // Capture consumed the press; later events reach the timer again
    app.process_event(&release(START, 600.0));
    assert_eq!(app.machine.phase(), Phase::Segment1);
}

#[test]
fn timer_keeps_running_while_settings_open() {
    let mut app = App::default();
    app.set_view(AppView::Settings);
    reference_run(&mut app);
    assert_eq!(shown(&app), vec![45, 1065, 245]);
}

#[test]
fn saving_valid_settings_writes_file_and_needs_restart() {
    let path = temp_config("save");
    let mut app = App::default().with_config_path(path.clone());
    app.set_view(AppView::Settings);
    select_row(&mut app, "Dark mode");
    app.activate_setting(0.0);
    app.save_settings();

    assert!(app.restart_pending);
    assert_eq!(app.view, AppView::Timer);
    assert!(app.editor.is_none());

    let saved = Config::load_from(&path).unwrap();
    assert!(!saved.dark_mode);
    // Running session is unchanged until restart
    assert!(app.config.dark_mode);
    let _ = fs::remove_file(&path);
}

#[test]
fn invalid_settings_keep_editor_open() {
    let path = temp_config("invalid");
    let mut app = App::default().with_config_path(path.clone());
    app.set_view(AppView::Settings);
    select_row(&mut app, "Timer2 Min");
    {
        let editor = app.editor.as_mut().unwrap();
        for _ in 0..8 {
            editor.backspace();
        }
        for c in "5000".chars() {
            editor.input_char(c);
        }
    }
    app.save_settings();

    assert!(!app.restart_pending);
    assert_eq!(app.view, AppView::Settings);
    assert!(app.editor.as_ref().unwrap().error().is_some());
    assert!(!path.exists());
}

#[test]
fn leaving_settings_discards_draft() {
    let mut app = App::default();
    app.toggle_settings();
    assert_eq!(app.view, AppView::Settings);
    select_row(&mut app, "Dark mode");
    app.activate_setting(0.0);

    app.toggle_settings();
    assert_eq!(app.view, AppView::Timer);
    assert!(app.editor.is_none());

    app.toggle_settings();
    assert_eq!(app.editor.as_ref().unwrap().value_text(Field::DarkMode), "On");
}

// ---------------------------------------------------------------------------
// Navigation and config
// ---------------------------------------------------------------------------

#[test]
fn view_navigation_wraps() {
    let mut app = App::default();
    assert_eq!(app.view, AppView::Timer);
    app.next_view();
    assert_eq!(app.view, AppView::Settings);
    assert!(app.editor.is_some());
    app.next_view();
    assert_eq!(app.view, AppView::Help);
    assert!(app.editor.is_none());
    app.next_view();
    assert_eq!(app.view, AppView::Timer);
    app.prev_view();
    assert_eq!(app.view, AppView::Help);
}

#[test]
fn malformed_config_file_falls_back_with_notice() {
    let path = temp_config("malformed");
    fs::write(&path, "{ \"Timer1\": ").unwrap();
    let (config, notice) = Config::load_or_default_from(&path);
    assert_eq!(config, Config::default());
    assert!(notice.is_some());
    let _ = fs::remove_file(&path);
}

#[test]
fn light_mode_config_picks_light_palette() {
    let app = App::new(Config {
        dark_mode: false,
        ..Config::default()
    });
    assert_eq!(app.colors.bg, ThemeColors::light().bg);
}

#[test]
fn capturing_start_key_does_not_arm_a_run() {
    let mut app = App::default();
    app.set_view(AppView::Settings);
    select_row(&mut app, "Start key");
    app.activate_setting(100.0);

    app.process_event(&press(START, 200.0));
    assert!(app.settings_input_blocked());
    app.process_event(&release(START, 260.0));
    assert_eq!(app.machine.phase(), Phase::Idle);
    assert!(!app.settings_input_blocked());

    // The next full press of the same key is a timer event again
    app.process_event(&press(START, 400.0));
    app.process_event(&release(START, 450.0));
    assert_eq!(app.machine.phase(), Phase::Segment1);
}

#[test]
fn escape_can_be_captured_as_a_binding() {
    let mut app = App::default();
    app.set_view(AppView::Settings);
    select_row(&mut app, "End key");
    app.activate_setting(100.0);
    assert!(app.settings_input_blocked());

    app.process_event(&press(KeyCode::ESCAPE, 150.0));
    let editor = app.editor.as_ref().unwrap();
    assert_eq!(editor.value_text(Field::Key(KeyRole::End)), "Escape");
    // Terminal keys stay ignored until the captured key is released
    assert!(app.settings_input_blocked());
    app.process_event(&release(KeyCode::ESCAPE, 190.0));
    assert!(!app.settings_input_blocked());
}

#[test]
fn load_notice_stays_until_first_key() {
    let mut app = App::default();
    app.set_notice("Config not loaded; using defaults".to_string());
    assert_eq!(app.get_status(), Some("Config not loaded; using defaults"));

    app.process_event(&press(KeyCode(30), 10.0));
    assert_eq!(app.get_status(), None);
}

#[test]
fn load_notice_clears_when_settings_open() {
    let mut app = App::default();
    app.set_notice("Config not loaded; using defaults".to_string());
    app.toggle_settings();
    assert_eq!(app.get_status(), None);
}
