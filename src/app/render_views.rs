use ratatui::prelude::{Line, Span};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, BorderType, Borders, List, ListItem, Paragraph},
};

use crate::{
    constants::{HELP_TEXT, INDENT_WIDTH},
    domain::ReportRow,
    interpreter::Mode,
};

use super::{App, time_format, view_style};

impl App {
    pub(super) fn draw_frame(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(3)])
            .split(f.size());

        self.render_tree(f, chunks[0]);
        self.render_command_line(f, chunks[1]);
    }

    fn render_tree(&self, f: &mut Frame, area: Rect) {
        let mut rows = self.tracker.render();
        let total = rows.pop();
        let frozen = self.interpreter.mode() == Mode::Frozen;
        let selection = self.interpreter.selection();
        let inner_width = area.width.saturating_sub(2) as usize;

        let items: Vec<ListItem> = if self.tracker.is_empty() {
            vec![ListItem::new(Line::from(Span::styled(
                "No categories yet. Press ins or * to add one.",
                Style::default().fg(Color::Gray),
            )))]
        } else {
            rows.iter()
                .map(|row| {
                    let held = frozen && self.tracker.is_in_running_set(row.key);
                    self.tree_item(row, held, selection == Some(row.key), inner_width)
                })
                .collect()
        };

        let total_label = total
            .map(|row| format!(" {} {} ", row.name, row.elapsed))
            .unwrap_or_default();
        let title = if frozen { " tracktime (frozen) " } else { " tracktime " };
        let border_color = if frozen { Color::Gray } else { view_style::depth_color(0) };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(
                Line::from(Span::styled(
                    title,
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ))
                .alignment(Alignment::Left),
            )
            .title(
                Line::from(Span::styled(
                    time_format::format_clock(),
                    Style::default().fg(Color::White),
                ))
                .alignment(Alignment::Center),
            )
            .title(
                Line::from(Span::styled(total_label, Style::default().fg(Color::White)))
                    .alignment(Alignment::Right),
            )
            .border_style(Style::default().fg(border_color));

        f.render_widget(List::new(items).block(block), area);
    }

    fn tree_item(&self, row: &ReportRow, held: bool, selected: bool, width: usize) -> ListItem<'static> {
        let marker = if row.running {
            "▶ "
        } else if held {
            "‖ "
        } else {
            "  "
        };
        let indent = " ".repeat(row.depth * INDENT_WIDTH);
        let room = width.saturating_sub(indent.len() + marker.chars().count() + row.elapsed.len() + 4);
        let name = time_format::truncate_label(&row.name, room);

        let label = format!("{}{}{}  {}", indent, marker, row.key, name);
        let gap = time_format::gap_before(&label, &row.elapsed, width);
        let style = view_style::row_style(row.depth, row.running, selected);

        ListItem::new(Line::from(vec![
            Span::raw(indent),
            Span::raw(marker),
            Span::styled(
                row.key.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  {}", name)),
            Span::raw(" ".repeat(gap)),
            Span::raw(row.elapsed.clone()),
        ]))
        .style(style)
    }

    fn render_command_line(&self, f: &mut Frame, area: Rect) {
        let line = if self.interpreter.wants_text() {
            Line::from(vec![
                Span::styled("> ", Style::default().fg(Color::Gray)),
                Span::raw(self.input_line.clone()),
                Span::styled("▏", Style::default().fg(Color::Gray)),
            ])
        } else if let Some(status) = self.interpreter.status() {
            Line::from(Span::styled(
                status.to_string(),
                Style::default().fg(Color::Yellow),
            ))
        } else {
            Line::from(Span::styled(HELP_TEXT, Style::default().fg(Color::Gray)))
        };

        let title = self
            .interpreter
            .prompt()
            .map(|prompt| format!(" {} ", prompt))
            .unwrap_or_default();

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(Line::from(Span::styled(title, Style::default().fg(Color::White))))
            .border_style(Style::default().fg(Color::Gray));

        f.render_widget(Paragraph::new(line).block(block), area);
    }
}
