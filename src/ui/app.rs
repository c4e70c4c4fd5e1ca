//! Main TUI application state and logic

use crate::backend::{LoadError, ModuleSource, UrclBackend};
use crate::session::modules::{LoadDecision, LoadErrorPrompt, Rebuild};
use crate::session::scheduler::Signals;
use crate::session::{Session, StepOutcome};
use crate::ui::panes::{
    render_dialog, render_memory_pane, render_modules_bar, render_program_pane,
    render_registers_pane, render_stack_pane, render_status_bar, ScrollState, StatusRenderData,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{info, warn};
use ratatui::{
    backend::Backend as TerminalBackend,
    buffer::Buffer,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Longest the event loop waits for input when nothing is scheduled
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Registers,
    Program,
    Stack,
    Memory,
}

impl FocusedPane {
    /// Move focus to the next pane (clockwise: registers -> program -> memory -> stack)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Registers => FocusedPane::Program,
            FocusedPane::Program => FocusedPane::Memory,
            FocusedPane::Memory => FocusedPane::Stack,
            FocusedPane::Stack => FocusedPane::Registers,
        }
    }

    /// Move focus to the previous pane (counter-clockwise)
    pub fn prev(self) -> Self {
        match self {
            FocusedPane::Registers => FocusedPane::Stack,
            FocusedPane::Program => FocusedPane::Registers,
            FocusedPane::Memory => FocusedPane::Program,
            FocusedPane::Stack => FocusedPane::Memory,
        }
    }
}

/// What keystrokes currently mean
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing the path of a module to open
    OpenPath(String),
    /// Choosing which module to unload; holds the digits typed so far
    PickUnload(String),
    /// Waiting for y/n before unloading the module at this index
    ConfirmUnload(usize),
}

/// How the application ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppExit {
    Quit,
    /// A module named on the command line failed and the user aborted
    StartupAborted,
}

/// Modal load-error prompt drawn over the last rendered screen.
///
/// Blocks on the keyboard until the user picks an answer.
pub struct TerminalPrompt<'a, T: TerminalBackend> {
    terminal: &'a mut Terminal<T>,
    background: &'a Buffer,
}

impl<'a, T: TerminalBackend> TerminalPrompt<'a, T> {
    pub fn new(terminal: &'a mut Terminal<T>, background: &'a Buffer) -> Self {
        TerminalPrompt {
            terminal,
            background,
        }
    }

    fn ask(&mut self, source: &ModuleSource, error: &LoadError) -> io::Result<LoadDecision> {
        let body = vec![
            format!("Could not load {}:", source.display_name()),
            error.to_string(),
        ];
        let background = self.background;

        loop {
            self.terminal.draw(|frame| {
                if background.area == frame.area() {
                    frame.buffer_mut().merge(background);
                }
                render_dialog(
                    frame,
                    "Load Error",
                    &body,
                    &[("c", "continue"), ("a", "abort")],
                    true,
                );
            })?;

            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('c') | KeyCode::Char('C') | KeyCode::Enter => {
                        return Ok(LoadDecision::Continue)
                    }
                    KeyCode::Char('a') | KeyCode::Char('A') | KeyCode::Esc => {
                        return Ok(LoadDecision::Abort)
                    }
                    _ => {}
                }
            }
        }
    }
}

impl<T: TerminalBackend> LoadErrorPrompt for TerminalPrompt<'_, T> {
    fn on_load_error(&mut self, source: &ModuleSource, error: &LoadError) -> LoadDecision {
        match self.ask(source, error) {
            Ok(decision) => decision,
            Err(e) => {
                warn!("load prompt failed ({}), aborting", e);
                LoadDecision::Abort
            }
        }
    }
}

/// The main application state
pub struct App {
    /// The debugging session
    pub session: Session<UrclBackend>,

    /// Currently focused pane
    pub focused_pane: FocusedPane,

    /// Per-pane scroll offsets
    pub registers_scroll: ScrollState,
    pub program_scroll: ScrollState,
    pub stack_scroll: ScrollState,
    pub memory_scroll: ScrollState,

    /// Frame revision last drawn; a newer one scrolls the panes to follow
    pub rendered_revision: u64,

    pub input_mode: InputMode,

    /// Whether the app should quit
    pub should_quit: bool,

    /// Status message to display
    pub status_message: String,

    /// Last engine exception, cleared by the next successful action
    pub error_message: Option<String>,

    /// Screen contents of the last draw, kept as a backdrop for modal prompts
    last_screen: Buffer,
}

impl App {
    pub fn new(session: Session<UrclBackend>) -> Self {
        App {
            session,
            focused_pane: FocusedPane::Program,
            registers_scroll: ScrollState::default(),
            program_scroll: ScrollState::default(),
            stack_scroll: ScrollState::default(),
            memory_scroll: ScrollState::default(),
            rendered_revision: 0,
            input_mode: InputMode::Normal,
            should_quit: false,
            status_message: String::from("Ready!"),
            error_message: None,
            last_screen: Buffer::default(),
        }
    }

    /// Load the startup modules, then run the event loop until quit
    pub fn run<T: TerminalBackend>(
        &mut self,
        terminal: &mut Terminal<T>,
        files: &[PathBuf],
    ) -> io::Result<AppExit> {
        self.draw(terminal)?;
        for path in files {
            if !self.open(terminal, ModuleSource::file(path)) {
                return Ok(AppExit::StartupAborted);
            }
        }

        loop {
            self.draw(terminal)?;

            if self.should_quit {
                break;
            }

            if let Some(outcome) = self.session.tick(Instant::now()) {
                self.report_step(outcome);
                continue;
            }

            let timeout = self
                .session
                .scheduler()
                .time_until_tick(Instant::now())
                .map_or(IDLE_POLL, |until| until.min(IDLE_POLL));

            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key, terminal);
                    }
                }
            }
        }

        Ok(AppExit::Quit)
    }

    fn draw<T: TerminalBackend>(&mut self, terminal: &mut Terminal<T>) -> io::Result<()> {
        let completed = terminal.draw(|f| self.render(f))?;
        self.last_screen = completed.buffer.clone();
        Ok(())
    }

    /// Render the UI
    fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();
        let follow = self.session.revision() != self.rendered_revision;
        self.rendered_revision = self.session.revision();

        // Modules bar, four panes in two columns, status bar
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(size);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(main_chunks[1]);

        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(columns[0]);

        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(columns[1]);

        render_modules_bar(frame, main_chunks[0], self.session.modules());

        let data = self.session.frame();
        render_registers_pane(
            frame,
            left_rows[0],
            data,
            self.focused_pane == FocusedPane::Registers,
            &mut self.registers_scroll,
        );
        render_stack_pane(
            frame,
            left_rows[1],
            data,
            self.focused_pane == FocusedPane::Stack,
            &mut self.stack_scroll,
            follow,
        );
        render_program_pane(
            frame,
            right_rows[0],
            data,
            self.focused_pane == FocusedPane::Program,
            &mut self.program_scroll,
            follow,
        );
        render_memory_pane(
            frame,
            right_rows[1],
            data,
            self.focused_pane == FocusedPane::Memory,
            &mut self.memory_scroll,
            follow,
        );

        render_status_bar(
            frame,
            main_chunks[2],
            &StatusRenderData {
                message: &self.status_message,
                run_state: self.session.run_state(),
                error: self.error_message.as_deref(),
                revision: self.session.revision(),
                has_modules: !self.session.modules().is_empty(),
            },
        );

        self.render_mode_dialog(frame);
    }

    fn render_mode_dialog(&self, frame: &mut Frame) {
        match &self.input_mode {
            InputMode::Normal => {}
            InputMode::OpenPath(path) => render_dialog(
                frame,
                "Open Module",
                &[format!("Path: {}▏", path)],
                &[("↵", "open"), ("esc", "cancel")],
                false,
            ),
            InputMode::PickUnload(number) => {
                let mut body: Vec<String> = self
                    .session
                    .modules()
                    .iter()
                    .enumerate()
                    .map(|(i, m)| format!("{}  {}", i + 1, m.display_name()))
                    .collect();
                body.push(String::new());
                body.push(format!("Module: {}▏", number));
                render_dialog(
                    frame,
                    "Unload Module",
                    &body,
                    &[("0-9", "number"), ("↵", "choose"), ("esc", "cancel")],
                    false,
                );
            }
            InputMode::ConfirmUnload(index) => {
                let name = self
                    .session
                    .modules()
                    .get(*index)
                    .map_or("?", |m| m.display_name());
                render_dialog(
                    frame,
                    "Unload Module",
                    &[format!("Unload {} and rebuild from the remaining modules?", name)],
                    &[("y", "unload"), ("n", "keep")],
                    false,
                );
            }
        }
    }

    /// Handle keyboard input
    fn handle_key_event<T: TerminalBackend>(&mut self, key: KeyEvent, terminal: &mut Terminal<T>) {
        match std::mem::replace(&mut self.input_mode, InputMode::Normal) {
            InputMode::Normal => self.handle_normal_key(key, terminal),
            InputMode::OpenPath(mut path) => match key.code {
                KeyCode::Enter if !path.trim().is_empty() => {
                    let source = ModuleSource::file(path.trim());
                    self.open(terminal, source);
                }
                KeyCode::Enter | KeyCode::Esc => {}
                KeyCode::Backspace => {
                    path.pop();
                    self.input_mode = InputMode::OpenPath(path);
                }
                KeyCode::Char(c) => {
                    path.push(c);
                    self.input_mode = InputMode::OpenPath(path);
                }
                _ => self.input_mode = InputMode::OpenPath(path),
            },
            InputMode::PickUnload(mut number) => {
                let count = self.session.modules().len();
                match key.code {
                    KeyCode::Char(c) if c.is_ascii_digit() => {
                        number.push(c);
                        // With fewer than ten modules one digit is the whole answer
                        self.input_mode = match parse_module_number(&number, count) {
                            Some(index) if count < 10 => InputMode::ConfirmUnload(index),
                            _ if count < 10 => InputMode::PickUnload(String::new()),
                            _ => InputMode::PickUnload(number),
                        };
                    }
                    KeyCode::Backspace => {
                        number.pop();
                        self.input_mode = InputMode::PickUnload(number);
                    }
                    KeyCode::Enter => match parse_module_number(&number, count) {
                        Some(index) => self.input_mode = InputMode::ConfirmUnload(index),
                        None => {
                            self.status_message = format!("No module numbered \"{}\"", number);
                            self.input_mode = InputMode::PickUnload(String::new());
                        }
                    },
                    KeyCode::Esc => {}
                    _ => self.input_mode = InputMode::PickUnload(number),
                }
            }
            InputMode::ConfirmUnload(index) => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    self.unload(terminal, index);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.status_message = "Unload cancelled".to_string();
                }
                _ => self.input_mode = InputMode::ConfirmUnload(index),
            },
        }
    }

    fn handle_normal_key<T: TerminalBackend>(&mut self, key: KeyEvent, terminal: &mut Terminal<T>) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            KeyCode::Char('s') | KeyCode::Right => {
                if self.require_modules() {
                    let outcome = self.session.step();
                    self.report_step(outcome);
                }
            }
            KeyCode::Char('r') => {
                if self.require_modules() {
                    self.error_message = None;
                    self.session.start_continuous(Instant::now());
                    self.status_message = "Running...".to_string();
                }
            }
            KeyCode::Char(' ') => {
                if self.session.scheduler().is_running() {
                    self.session.interrupt();
                    self.status_message = "Interrupted".to_string();
                }
            }
            KeyCode::Char('o') => {
                self.input_mode = InputMode::OpenPath(String::new());
            }
            KeyCode::Char('R') => {
                if self.require_modules() {
                    self.reload(terminal);
                }
            }
            KeyCode::Char('u') => match self.session.modules().len() {
                0 => self.status_message = "No modules to unload".to_string(),
                1 => self.input_mode = InputMode::ConfirmUnload(0),
                _ => self.input_mode = InputMode::PickUnload(String::new()),
            },
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::BackTab => {
                self.focused_pane = self.focused_pane.prev();
            }
            KeyCode::Up => self.scroll_focused(|offset| offset.saturating_sub(1)),
            KeyCode::Down => self.scroll_focused(|offset| offset.saturating_add(1)),
            KeyCode::PageUp => self.scroll_focused(|offset| offset.saturating_sub(10)),
            KeyCode::PageDown => self.scroll_focused(|offset| offset.saturating_add(10)),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            _ => {}
        }
    }

    fn scroll_focused(&mut self, update: impl FnOnce(usize) -> usize) {
        let scroll = match self.focused_pane {
            FocusedPane::Registers => &mut self.registers_scroll,
            FocusedPane::Program => &mut self.program_scroll,
            FocusedPane::Stack => &mut self.stack_scroll,
            FocusedPane::Memory => &mut self.memory_scroll,
        };
        // Panes clamp the offset on the next render
        scroll.offset = update(scroll.offset);
    }

    fn require_modules(&mut self) -> bool {
        if self.session.modules().is_empty() {
            self.status_message = "No program loaded (press o to open one)".to_string();
            false
        } else {
            true
        }
    }

    fn report_step(&mut self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Completed(Signals { halted, broke }) => {
                self.error_message = None;
                if halted {
                    self.status_message = "Program halted".to_string();
                } else if broke {
                    self.status_message = "Break reached".to_string();
                } else if !self.session.scheduler().is_running() {
                    self.status_message = "Stepped".to_string();
                }
            }
            StepOutcome::Failed(error) => {
                self.error_message = Some(format!("Engine Exception: {}", error));
            }
            StepOutcome::Skipped => {}
        }
    }

    /// Open a module, prompting over the current screen if it fails
    fn open<T: TerminalBackend>(&mut self, terminal: &mut Terminal<T>, source: ModuleSource) -> bool {
        let name = source.display_name().to_string();
        let mut prompt = TerminalPrompt::new(terminal, &self.last_screen);
        let loaded = self.session.load_file(source, &mut prompt);
        if loaded {
            self.error_message = None;
            self.status_message = format!("Loaded {}", name);
        } else {
            self.status_message = format!("Open of {} aborted", name);
        }
        loaded
    }

    fn reload<T: TerminalBackend>(&mut self, terminal: &mut Terminal<T>) {
        let mut prompt = TerminalPrompt::new(terminal, &self.last_screen);
        let result = self.session.reload(&mut prompt);
        self.report_rebuild("Reloaded", result);
    }

    fn unload<T: TerminalBackend>(&mut self, terminal: &mut Terminal<T>, index: usize) {
        let mut prompt = TerminalPrompt::new(terminal, &self.last_screen);
        let result = self.session.unload_at(index, &mut prompt);
        self.report_rebuild("Unloaded", result);
    }

    fn report_rebuild(&mut self, verb: &str, result: Rebuild) {
        match result {
            Rebuild::Completed => {
                info!("{} ({} module(s) remain)", verb, self.session.modules().len());
                self.error_message = None;
                self.status_message = format!("{} ({} module(s))", verb, self.session.modules().len());
            }
            Rebuild::Aborted => {
                self.error_message = None;
                self.status_message = "Rebuild aborted; all modules unloaded".to_string();
            }
            Rebuild::Unchanged => {}
        }
    }
}

/// Index of the module listed as `input` (1-based) among `count` modules
fn parse_module_number(input: &str, count: usize) -> Option<usize> {
    let number: usize = input.trim().parse().ok()?;
    (1..=count).contains(&number).then(|| number - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_numbers_are_one_based_and_bounded() {
        assert_eq!(parse_module_number("1", 3), Some(0));
        assert_eq!(parse_module_number("3", 3), Some(2));
        assert_eq!(parse_module_number("4", 3), None);
        assert_eq!(parse_module_number("0", 3), None);
        assert_eq!(parse_module_number("", 3), None);
    }

    #[test]
    fn test_module_numbers_past_nine() {
        assert_eq!(parse_module_number("10", 12), Some(9));
        assert_eq!(parse_module_number("12", 12), Some(11));
        assert_eq!(parse_module_number("012", 12), Some(11));
        assert_eq!(parse_module_number("13", 12), None);
        assert_eq!(parse_module_number("99999999999999999999999", 12), None);
    }
}
