use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend, layout::Rect};

use crate::app::App;
use crate::audio::Manager;
use crate::config::{self, BarMode};
use crate::{library, ui};

/// Main terminal event loop: advances the queue, redraws at `ui.fps` and
/// handles input. Returns `Ok(())` when the user quits.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    manager: &Manager,
    app: &mut App,
) -> anyhow::Result<()> {
    let frame_time = Duration::from_secs_f64(1.0 / f64::from(settings.ui.fps.max(1)));
    let mut last_width: Option<u16> = None;

    loop {
        let started = Instant::now();

        manager.advance();

        let size = terminal.size()?;
        let width = ui::visualizer_width(Rect::new(0, 0, size.width, size.height));
        if last_width != Some(width) {
            manager.resize(width);
            last_width = Some(width);
        }

        app.sync(manager, Instant::now());
        terminal.draw(|f| ui::draw(f, app, &settings.ui, &settings.controls))?;

        // Spend the rest of the frame waiting for input.
        let mut timeout = frame_time.saturating_sub(started.elapsed());
        while event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if handle_key_event(key, settings, manager) {
                        return Ok(());
                    }
                }
                Event::Paste(text) => handle_paste(&text, settings, manager, app),
                _ => {}
            }
            timeout = Duration::ZERO;
        }
    }
}

/// Returns `true` when the app should exit.
fn handle_key_event(key: KeyEvent, settings: &config::Settings, manager: &Manager) -> bool {
    let scrub = settings.controls.scrub_seconds as f64;
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            if let Some(state) = manager.toggle_pause() {
                log::debug!("toggled pause: {state:?}");
            }
        }
        KeyCode::Char('l') | KeyCode::Char('n') => {
            manager.skip();
        }
        KeyCode::Char('h') | KeyCode::Char('b') => {
            manager.previous();
        }
        KeyCode::Char('L') => {
            manager.scrub(scrub);
        }
        KeyCode::Char('H') => {
            manager.scrub(-scrub);
        }
        KeyCode::Char('m') => {
            let mode = match manager.bar_mode() {
                BarMode::Logarithmic => BarMode::Linear,
                BarMode::Linear => BarMode::Logarithmic,
            };
            manager.set_bar_mode(mode);
        }
        _ => {}
    }
    false
}

fn handle_paste(text: &str, settings: &config::Settings, manager: &Manager, app: &mut App) {
    let files = library::expand(&library::parse_pasted(text), &settings.library);
    if files.is_empty() {
        return;
    }
    log::info!("queueing {} pasted file(s)", files.len());
    let message = match files.as_slice() {
        [one] => format!("queued {}", library::display_name(one)),
        many => format!("queued {} files", many.len()),
    };
    for file in files {
        manager.enqueue(file);
    }
    app.push_notice(message, Instant::now());
}
