//! Memory pane rendering
//!
//! Shows `RAM` in ascending address order. Absent address ranges collapse into
//! a `···` row; new or updated cells are drawn in green and the last of them
//! is scrolled into view after each step.

use super::{pane_block, visible_items, ScrollState};
use crate::session::DebugFrame;
use crate::snapshot::MemoryRow;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

/// Render the memory pane
pub fn render_memory_pane(
    frame: &mut Frame,
    area: Rect,
    data: &DebugFrame,
    is_focused: bool,
    scroll: &mut ScrollState,
    follow: bool,
) {
    let block = pane_block(" Memory ", is_focused);
    let rows = &data.snapshot.memory;

    if rows.is_empty() {
        let items = vec![ListItem::new("(no memory)").style(Style::default().fg(DEFAULT_THEME.comment))];
        frame.render_widget(List::new(items).block(block), area);
        return;
    }

    let address_width = data
        .snapshot
        .memory_addresses()
        .map(|a| a.to_string().len())
        .max()
        .unwrap_or(1);

    let mut last_updated = None;
    let all_items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .map(|(row, entry)| match entry {
            MemoryRow::Gap => {
                ListItem::new("···").style(Style::default().fg(DEFAULT_THEME.comment))
            }
            MemoryRow::Cell { address, value } => {
                let updated = data
                    .delta
                    .memory(*address)
                    .is_some_and(|change| change.is_highlighted());
                if updated {
                    last_updated = Some(row);
                }
                let value_style = if updated {
                    Style::default()
                        .fg(DEFAULT_THEME.memory_changed)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(DEFAULT_THEME.fg)
                };
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:>address_width$}", address),
                        Style::default().fg(DEFAULT_THEME.primary),
                    ),
                    Span::styled(" │ ", Style::default().fg(DEFAULT_THEME.comment)),
                    Span::styled(value.clone(), value_style),
                ]))
            }
        })
        .collect();

    let items = visible_items(all_items, area, scroll, last_updated.filter(|_| follow));
    frame.render_widget(List::new(items).block(block), area);
}
