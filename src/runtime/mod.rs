use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use crossterm::event::{DisableBracketedPaste, EnableBracketedPaste};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::audio::{DeviceOutput, Manager, NullOutput, Output};
use crate::{library, logging};

mod event_loop;
mod settings;

/// Command line options.
#[derive(Debug, Default)]
pub struct Options {
    /// Files and directories to queue at startup.
    pub paths: Vec<PathBuf>,
    /// Run the queue without opening an audio device.
    pub no_audio: bool,
}

pub fn run(options: Options) -> anyhow::Result<()> {
    let (settings, config_problem) = settings::load_settings();
    match logging::init(&settings.logging) {
        Some(path) => log::info!("logging to {}", path.display()),
        None => eprintln!("bandstand: running without a log file"),
    }
    if let Some(problem) = config_problem {
        log::warn!("{problem}");
    }

    let output: Arc<dyn Output> = if options.no_audio {
        Arc::new(NullOutput)
    } else {
        Arc::new(DeviceOutput::spawn(&settings.audio, &settings.analysis))
    };
    let manager = Manager::new(&settings, output);

    let files = library::expand(&options.paths, &settings.library);
    log::info!("queueing {} file(s) from the command line", files.len());
    for file in files {
        manager.enqueue(file);
    }

    let mut app = App::new(&settings, manager.bar_partition());

    enable_raw_mode().context("cannot enable raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
        .context("cannot set up the terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result = event_loop::run(&mut terminal, &settings, &manager, &mut app);
    let restored = restore_terminal(&mut terminal);

    manager.shutdown();
    log::info!("shut down");

    run_result.and(restored)
}

fn restore_terminal(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}
