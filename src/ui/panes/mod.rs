//! TUI pane rendering modules
//!
//! Each pane is a stateless render function over a published
//! [`DebugFrame`](crate::session::DebugFrame); the only state a pane keeps is
//! its scroll offset.
//!
//! # Pane Modules
//!
//! - [`registers`]: integer and boolean variables, coloured by change
//! - [`program`]: ROM listing with the instruction pointer
//! - [`stack`]: stack cells with the stack pointer
//! - [`memory`]: sparse RAM listing with gap markers
//! - [`status`]: run state, modules and keybindings
//! - [`dialog`]: modal popups (load errors, confirmations, path input)

pub mod dialog;
pub mod memory;
pub mod program;
pub mod registers;
pub mod stack;
pub mod status;

pub use dialog::render_dialog;
pub use memory::render_memory_pane;
pub use program::render_program_pane;
pub use registers::render_registers_pane;
pub use stack::render_stack_pane;
pub use status::{render_modules_bar, render_status_bar, StatusRenderData};

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders, ListItem},
};

/// Scroll position of a pane
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrollState {
    pub offset: usize,
}

/// Bordered block with the focus-dependent border colour
pub(crate) fn pane_block(title: &str, is_focused: bool) -> Block<'_> {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style)
}

/// Clamp the scroll offset and cut out the visible rows.
///
/// When `follow` names a row (the current instruction, the active stack cell,
/// the last updated memory cell) the offset moves just enough to show it.
pub(crate) fn visible_items<'a>(
    all_items: Vec<ListItem<'a>>,
    area: Rect,
    scroll: &mut ScrollState,
    follow: Option<usize>,
) -> Vec<ListItem<'a>> {
    let total_items = all_items.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize; // Account for borders, min 1

    if let Some(row) = follow {
        if row < scroll.offset {
            scroll.offset = row;
        } else if row >= scroll.offset + visible_height {
            scroll.offset = row + 1 - visible_height;
        }
    }

    if total_items > visible_height {
        scroll.offset = scroll.offset.min(total_items - visible_height);
    } else {
        scroll.offset = 0;
    }

    all_items
        .into_iter()
        .skip(scroll.offset)
        .take(visible_height)
        .collect()
}
