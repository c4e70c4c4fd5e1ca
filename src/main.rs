// URCLTTY: step debugger for URCL programs

use std::io;

use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use urcltty::backend::UrclBackend;
use urcltty::config::Config;
use urcltty::logging;
use urcltty::session::Session;
use urcltty::ui::{App, AppExit};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    if let Some(path) = &config.log_file {
        if let Err(e) = logging::init(path, config.log_level.into()) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
    log::info!(
        "starting with {} module(s), step interval {:?}",
        config.files.len(),
        config.step_interval()
    );

    let session = Session::new(UrclBackend, config.step_interval());

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create and run app
    let mut app = App::new(session);
    let res = app.run(&mut terminal, &config.files);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    match res {
        Ok(AppExit::Quit) => Ok(()),
        Ok(AppExit::StartupAborted) => {
            eprintln!("Startup aborted: a module failed to load");
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("Error: {:?}", err);
            std::process::exit(1);
        }
    }
}
