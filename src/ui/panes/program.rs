//! Program pane rendering: the ROM listing with the instruction at `IP`
//! highlighted and kept in view.

use super::{pane_block, visible_items, ScrollState};
use crate::session::DebugFrame;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

/// Render the program pane
pub fn render_program_pane(
    frame: &mut Frame,
    area: Rect,
    data: &DebugFrame,
    is_focused: bool,
    scroll: &mut ScrollState,
    follow: bool,
) {
    let Some(program) = &data.snapshot.program else {
        let block = pane_block(" Program ", is_focused);
        let items = vec![ListItem::new("(no program)").style(Style::default().fg(DEFAULT_THEME.comment))];
        frame.render_widget(List::new(items).block(block), area);
        return;
    };

    let title = format!(" Program │ IP = {} ", program.instruction_pointer);
    let block = pane_block(&title, is_focused);
    let current = program.current();
    let number_width = program.instructions.len().saturating_sub(1).to_string().len();

    let all_items: Vec<ListItem> = program
        .instructions
        .iter()
        .enumerate()
        .map(|(i, source)| {
            let is_current = current == Some(i);
            let marker = if is_current { "▶ " } else { "  " };
            let line = Line::from(vec![
                Span::styled(marker, Style::default().fg(DEFAULT_THEME.current_instruction)),
                Span::styled(
                    format!("{:>number_width$} ", i),
                    Style::default().fg(DEFAULT_THEME.comment),
                ),
                Span::styled(
                    source.clone(),
                    if is_current {
                        Style::default()
                            .fg(DEFAULT_THEME.current_instruction)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(DEFAULT_THEME.fg)
                    },
                ),
            ]);
            if is_current {
                ListItem::new(line).style(Style::default().bg(DEFAULT_THEME.current_line_bg))
            } else {
                ListItem::new(line)
            }
        })
        .collect();

    let items = visible_items(all_items, area, scroll, current.filter(|_| follow));
    frame.render_widget(List::new(items).block(block), area);
}
