//! Status bar and module bar rendering

use crate::backend::ModuleSource;
use crate::session::scheduler::RunState;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Everything the status bar shows
pub struct StatusRenderData<'a> {
    pub message: &'a str,
    pub run_state: RunState,
    /// Last engine exception, shown instead of the message
    pub error: Option<&'a str>,
    pub revision: u64,
    pub has_modules: bool,
}

fn state_badge(data: &StatusRenderData) -> Span<'static> {
    let (text, bg) = if data.error.is_some() {
        (" ✖ ERROR ", DEFAULT_THEME.error)
    } else if !data.has_modules {
        (" NO PROGRAM ", DEFAULT_THEME.comment)
    } else {
        match data.run_state {
            RunState::Idle => (" IDLE ", DEFAULT_THEME.primary),
            RunState::Stepping => (" STEP ", DEFAULT_THEME.secondary),
            RunState::ContinuousRunning => (" ▶ RUNNING ", DEFAULT_THEME.secondary),
            RunState::Halted => (" ■ HALTED ", DEFAULT_THEME.success),
        }
    };

    Span::styled(
        text,
        Style::default()
            .bg(bg)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    )
}

/// Render the status bar at the bottom.
pub fn render_status_bar(frame: &mut Frame, area: Rect, data: &StatusRenderData) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let desc_style = Style::default()
        .bg(DEFAULT_THEME.current_line_bg)
        .fg(DEFAULT_THEME.fg);
    let sep_style = Style::default()
        .bg(DEFAULT_THEME.current_line_bg)
        .fg(DEFAULT_THEME.comment);

    let (text, text_style) = match data.error {
        Some(error) => (error, desc_style.fg(DEFAULT_THEME.error)),
        None => (data.message, desc_style),
    };

    let left_spans = vec![
        state_badge(data),
        Span::styled(format!(" #{} ", data.revision), sep_style),
        Span::styled("│", sep_style),
        Span::styled(format!(" {} ", text), text_style),
    ];

    let left_paragraph = Paragraph::new(Line::from(left_spans))
        .style(Style::default().bg(DEFAULT_THEME.current_line_bg))
        .alignment(Alignment::Left);
    frame.render_widget(left_paragraph, layout[0]);

    let key_style = Style::default().bg(DEFAULT_THEME.comment).fg(Color::Black);
    let bindings = [
        (" s/→ ", " step "),
        (" r ", " run "),
        (" ⎵ ", " interrupt "),
        (" o ", " open "),
        (" R ", " reload "),
        (" u ", " unload "),
        (" q ", " quit "),
    ];

    let mut right_spans = Vec::with_capacity(bindings.len() * 3);
    for (i, (key, desc)) in bindings.iter().enumerate() {
        if i > 0 {
            right_spans.push(Span::styled("│", sep_style));
        }
        right_spans.push(Span::styled(*key, key_style));
        right_spans.push(Span::styled(*desc, desc_style));
    }

    let right_paragraph = Paragraph::new(Line::from(right_spans))
        .style(Style::default().bg(DEFAULT_THEME.current_line_bg))
        .alignment(Alignment::Right);
    frame.render_widget(right_paragraph, layout[1]);
}

/// Render the one-line list of loaded modules, numbered from 1
pub fn render_modules_bar(frame: &mut Frame, area: Rect, modules: &[ModuleSource]) {
    let label_style = Style::default()
        .fg(DEFAULT_THEME.primary)
        .add_modifier(Modifier::BOLD);
    let mut spans = vec![Span::styled(" Modules: ", label_style)];

    if modules.is_empty() {
        spans.push(Span::styled(
            "none (press o to open a file)",
            Style::default().fg(DEFAULT_THEME.comment),
        ));
    }
    for (i, module) in modules.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" │ ", Style::default().fg(DEFAULT_THEME.comment)));
        }
        spans.push(Span::styled(
            format!("{} ", i + 1),
            Style::default().fg(DEFAULT_THEME.secondary),
        ));
        spans.push(Span::styled(
            module.display_name(),
            Style::default().fg(DEFAULT_THEME.fg),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
