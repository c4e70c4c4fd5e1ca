//! Modal popup rendering
//!
//! Dialogs are drawn over the panes after clearing the area beneath them.
//! The caller owns the input loop; this module only draws.

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Rectangle of `width` percent and `height` rows centred in `area`
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(height.min(area.height)),
            Constraint::Fill(1),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width) / 2),
            Constraint::Percentage(width),
            Constraint::Percentage((100 - width) / 2),
        ])
        .split(vertical[1])[1]
}

/// Draw a popup with a title, body lines and a row of `(key, action)` hints.
pub fn render_dialog(
    frame: &mut Frame,
    title: &str,
    body: &[String],
    hints: &[(&str, &str)],
    is_error: bool,
) {
    let accent = if is_error {
        DEFAULT_THEME.error
    } else {
        DEFAULT_THEME.border_focused
    };

    // Body + blank line + hints + borders
    let height = body.len() as u16 + 4;
    let area = centered_rect(60, height, frame.area());

    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent).add_modifier(Modifier::BOLD));

    let mut lines: Vec<Line> = body
        .iter()
        .map(|text| Line::from(Span::styled(text.clone(), Style::default().fg(DEFAULT_THEME.fg))))
        .collect();
    lines.push(Line::default());

    let key_style = Style::default().bg(accent).fg(Color::Black);
    let mut hint_spans = Vec::new();
    for (key, action) in hints {
        hint_spans.push(Span::styled(format!(" {} ", key), key_style));
        hint_spans.push(Span::styled(
            format!(" {}  ", action),
            Style::default().fg(DEFAULT_THEME.comment),
        ));
    }
    lines.push(Line::from(hint_spans).alignment(Alignment::Center));

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}
