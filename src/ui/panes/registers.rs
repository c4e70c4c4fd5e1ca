//! Register pane rendering
//!
//! Lists every integer and boolean variable in display order. Colour encodes
//! the change classification of the current frame: new registers in pink,
//! changed ones in bold red, unchanged ones in the default foreground.

use super::{pane_block, visible_items, ScrollState};
use crate::session::DebugFrame;
use crate::snapshot::Change;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
    Frame,
};

fn change_style(change: Option<Change>) -> Style {
    match change {
        Some(Change::New) => Style::default().fg(DEFAULT_THEME.register_new),
        Some(Change::Changed) => Style::default()
            .fg(DEFAULT_THEME.register_changed)
            .add_modifier(Modifier::BOLD),
        _ => Style::default().fg(DEFAULT_THEME.fg),
    }
}

/// Render the register pane
pub fn render_registers_pane(
    frame: &mut Frame,
    area: Rect,
    data: &DebugFrame,
    is_focused: bool,
    scroll: &mut ScrollState,
) {
    let block = pane_block(" Registers ", is_focused);
    let registers = &data.snapshot.registers;

    let all_items: Vec<ListItem> = if registers.is_empty() {
        vec![ListItem::new("(no registers)").style(Style::default().fg(DEFAULT_THEME.comment))]
    } else {
        let width = registers.iter().map(|r| r.name.len()).max().unwrap_or(0);
        registers
            .iter()
            .map(|register| {
                let style = change_style(data.delta.register(&register.name));
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:<width$}", register.name), style),
                    Span::styled(" = ", Style::default().fg(DEFAULT_THEME.comment)),
                    Span::styled(register.text(), style),
                ]))
            })
            .collect()
    };

    let items = visible_items(all_items, area, scroll, None);
    frame.render_widget(List::new(items).block(block), area);
}
