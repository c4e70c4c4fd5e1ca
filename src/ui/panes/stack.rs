//! Stack pane rendering
//!
//! Cells are listed in storage order. The cell at `-SP - 1` is the top of the
//! stack and is marked; when that index falls outside the cells nothing is
//! marked and the title shows the raw pointer only.

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

/// Render the stack pane
pub fn render_stack_pane(
    frame: &mut Frame,
    area: Rect,
    data: &DebugFrame,
    is_focused: bool,
    scroll: &mut ScrollState,
    follow: bool,
) {
    let Some(stack) = &data.snapshot.stack else {
        let block = pane_block(" Stack ", is_focused);
        let items = vec![ListItem::new("(no stack)").style(Style::default().fg(DEFAULT_THEME.comment))];
        frame.render_widget(List::new(items).block(block), area);
        return;
    };

    let title = format!(" Stack │ SP = {} ", stack.stack_pointer);
    let block = pane_block(&title, is_focused);
    let active = stack.active();

    let all_items: Vec<ListItem> = if stack.cells.is_empty() {
        vec![ListItem::new("(empty)").style(Style::default().fg(DEFAULT_THEME.comment))]
    } else {
        stack
            .cells
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let is_active = active == Some(i);
                let mut spans = vec![
                    Span::styled(format!("[{}] ", i), Style::default().fg(DEFAULT_THEME.comment)),
                    Span::styled(
                        value.clone(),
                        if is_active {
                            Style::default()
                                .fg(DEFAULT_THEME.active_stack)
                                .add_modifier(Modifier::BOLD)
                        } else {
                            Style::default().fg(DEFAULT_THEME.fg)
                        },
                    ),
                ];
                if is_active {
                    spans.push(Span::styled(
                        " ◀ top",
                        Style::default().fg(DEFAULT_THEME.active_stack),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect()
    };

    let items = visible_items(all_items, area, scroll, active.filter(|_| follow));
    frame.render_widget(List::new(items).block(block), area);
}
