use ratatui::style::{Color, Modifier, Style};

use crate::constants::COLORS;

pub(super) fn depth_color(depth: usize) -> Color {
    COLORS[depth % COLORS.len()]
}

pub(super) fn text_color_for_bg(bg_color: Color) -> Color {
    if let Color::Rgb(r, g, b) = bg_color {
        let brightness = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
        if brightness > 128 {
            Color::Black
        } else {
            Color::White
        }
    } else {
        Color::White
    }
}

pub(super) fn row_style(depth: usize, running: bool, selected: bool) -> Style {
    let mut style = if running {
        let bg = depth_color(depth);
        Style::default().fg(text_color_for_bg(bg)).bg(bg)
    } else {
        Style::default().fg(Color::White)
    };
    if selected {
        style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
    }
    style
}
