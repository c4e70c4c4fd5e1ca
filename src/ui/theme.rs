use ratatui::style::Color;

pub struct Theme {
    pub fg: Color,
    pub primary: Color,   // Blue
    pub secondary: Color, // Orange
    pub comment: Color,   // Grey
    pub success: Color,   // Green
    pub error: Color,     // Red
    pub border_focused: Color,
    pub border_normal: Color,
    pub current_line_bg: Color,
    pub register_new: Color,
    pub register_changed: Color,
    pub memory_changed: Color,
    pub current_instruction: Color,
    pub active_stack: Color, // Cell at -SP - 1
}

pub const DEFAULT_THEME: Theme = Theme {
    fg: Color::Rgb(205, 214, 244),
    primary: Color::Rgb(137, 180, 250),   // Blue
    secondary: Color::Rgb(250, 179, 135), // Orange
    comment: Color::Rgb(108, 112, 134),
    success: Color::Rgb(166, 227, 161),
    error: Color::Rgb(243, 139, 168),
    border_focused: Color::Rgb(249, 226, 175), // Yellow border for focus
    border_normal: Color::Rgb(108, 112, 134),  // Grey border for normal
    current_line_bg: Color::Rgb(50, 50, 70),   // Slightly lighter BG for status bar
    register_new: Color::Rgb(245, 194, 231),   // Pink
    register_changed: Color::Rgb(243, 139, 168), // Red
    memory_changed: Color::Rgb(166, 227, 161), // Green
    current_instruction: Color::Rgb(249, 226, 175), // Yellow
    active_stack: Color::Rgb(137, 220, 235),   // Sky blue
};
