//! keysplit - global-hotkey segment timer
//!
//! Captures keys system-wide and draws the three segment bars in the terminal.

use anyhow::{anyhow, Context, Result};
use crossterm::{
    event::{self, Event, KeyCode as CtKeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use env_logger::{Env, Target};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Margin, Rect},
    style::Style,
    symbols::border,
    widgets::{Block, Borders},
    Frame, Terminal,
};
use std::{
    fs::{self, OpenOptions},
    io::stdout,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    time::{Duration, Instant},
};

use keysplit::{
    clock::Clock,
    config::{self, Config},
    keyboard::{GlobalHook, KeyEvent},
    timing::SEGMENT_COUNT,
    ui::{App, AppState, AppView, HelpPanel, SegmentBar, SettingsPanel, StatusBar, TabBar},
};

/// UI loop period
const TICK_RATE: Duration = Duration::from_millis(10);

/// Log to a file so the alternate screen stays clean. Without a writable
/// data directory logging is disabled.
fn init_logging() {
    let Some(dir) = dirs::data_local_dir().map(|d| d.join("keysplit")) else {
        return;
    };
    if fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("keysplit.log"))
    else {
        return;
    };
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .init();
}

fn main() -> Result<()> {
    init_logging();

    let clock = Clock::start();
    let (config, notice) = Config::load_or_default();
    let config_path = match config::config_path() {
        Ok(path) => Some(path),
        Err(e) => {
            log::warn!("settings cannot be saved: {}", e);
            None
        }
    };

    // Install before touching the terminal so a failure prints plainly
    let (event_tx, event_rx) = mpsc::channel::<KeyEvent>();
    let hook = GlobalHook::install(clock, event_tx)
        .context("Failed to install the global keyboard hook")?;

    #[cfg(target_os = "linux")]
    if hook.backend() != "evdev" {
        log::info!("evdev: {}", keysplit::keyboard::evdev_status());
    }

    let quit = Arc::new(AtomicBool::new(false));
    ctrlc::set_handler({
        let quit = quit.clone();
        move || quit.store(true, Ordering::SeqCst)
    })
    .context("Failed to set Ctrl+C handler")?;

    let mut app = App::new(config);
    if let Some(path) = config_path {
        app = app.with_config_path(path);
    }
    match notice {
        Some(notice) => app.set_notice(notice),
        None => app.set_status(format!("Capturing keys via {}", hook.backend())),
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app, &hook, &event_rx, &clock, &quit);

    // Deregister before handing the terminal back
    hook.uninstall();

    // Cleanup terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result?;

    println!("\nkeysplit session complete.");
    println!("Completed runs: {}", app.completed_runs);
    println!("Key events processed: {}", app.total_events);
    println!("Session duration: {}", app.elapsed_formatted());
    if app.restart_pending {
        println!("Saved settings apply on next start.");
    }

    Ok(())
}

fn run<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    hook: &GlobalHook,
    event_rx: &mpsc::Receiver<KeyEvent>,
    clock: &Clock,
    quit: &AtomicBool,
) -> Result<()> {
    loop {
        let frame_start = Instant::now();

        while let Ok(key_event) = event_rx.try_recv() {
            app.process_event(&key_event);
        }
        if !hook.is_active() {
            return Err(anyhow!("keyboard hook stopped unexpectedly"));
        }

        app.on_tick(clock.now_ms());

        terminal.draw(|frame| draw(frame, app))?;

        let budget = TICK_RATE.saturating_sub(frame_start.elapsed());
        if event::poll(budget)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key, clock);
                }
            }
        }

        if quit.load(Ordering::SeqCst) {
            app.quit();
        }
        if app.state == AppState::Quitting {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: event::KeyEvent, clock: &Clock) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        CtKeyCode::Char('q') | CtKeyCode::Char('c') if ctrl => app.quit(),
        CtKeyCode::Char('s') if ctrl && app.view == AppView::Settings => app.save_settings(),
        CtKeyCode::F(1) => app.set_view(AppView::Help),
        CtKeyCode::F(2) => app.toggle_settings(),
        CtKeyCode::F(5) => app.reset_timer(),
        CtKeyCode::BackTab => app.prev_view(),
        CtKeyCode::Tab if key.modifiers.contains(KeyModifiers::SHIFT) => app.prev_view(),
        CtKeyCode::Tab => app.next_view(),
        _ if app.view == AppView::Settings && app.settings_input_blocked() => {}
        CtKeyCode::Enter | CtKeyCode::Char(' ') if app.view == AppView::Settings => {
            app.activate_setting(clock.now_ms())
        }
        code if app.view == AppView::Settings => {
            let Some(editor) = app.editor.as_mut() else {
                return;
            };
            match code {
                CtKeyCode::Up => editor.select_prev(),
                CtKeyCode::Down => editor.select_next(),
                CtKeyCode::Backspace => editor.backspace(),
                CtKeyCode::Char(c) => editor.input_char(c),
                _ => {}
            }
        }
        _ => {}
    }
}

fn draw(frame: &mut Frame, app: &App) {
    let colors = &app.colors;
    let size = frame.area();
    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg).fg(colors.fg)),
        size,
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Tab bar
            Constraint::Min(8),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(size);

    let tab_names: Vec<&str> = AppView::all().iter().map(|v| v.name()).collect();
    frame.render_widget(TabBar::new(&tab_names, app.view.index(), colors), chunks[0]);

    match app.view {
        AppView::Timer => draw_bars(frame, app, chunks[1]),
        AppView::Settings => {
            if let Some(editor) = &app.editor {
                frame.render_widget(SettingsPanel::new(editor, colors), chunks[1]);
            }
        }
        AppView::Help => frame.render_widget(HelpPanel::new(colors), chunks[1]),
    }

    let bindings = app.bindings_summary();
    let elapsed = app.elapsed_formatted();
    let status = StatusBar::new(app.machine.phase().name(), &bindings, &elapsed, colors)
        .message(app.get_status());
    frame.render_widget(status, chunks[2]);
}

fn draw_bars(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Segments ")
        .borders(Borders::ALL)
        .border_set(border::ROUNDED)
        .border_style(Style::default().fg(app.colors.dim));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut constraints = vec![Constraint::Length(3); SEGMENT_COUNT];
    constraints.push(Constraint::Min(0));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner.inner(Margin::new(1, 1)));

    for (row, bar_frame) in rows.iter().zip(app.bars.frames()) {
        frame.render_widget(SegmentBar::new(bar_frame, &app.colors), *row);
    }
}
