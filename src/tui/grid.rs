use crate::shared::{ClipSpan, TIMELINE_BARS};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::Block;
use ratatui::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Placeholder, // audio region with no note data
    Notes,
}

// which clip (if any) covers each bar of the timeline
pub fn bar_cells(clips: &[ClipSpan]) -> [Cell; TIMELINE_BARS] {
    let mut cells = [Cell::Empty; TIMELINE_BARS];
    for (bar, cell) in cells.iter_mut().enumerate() {
        let bar = bar as f64;
        for clip in clips {
            if bar + 1.0 > clip.start_bar && bar < clip.start_bar + clip.duration_bars {
                // note-bearing clips win when they overlap a placeholder
                if clip.has_notes || *cell == Cell::Empty {
                    *cell = if clip.has_notes { Cell::Notes } else { Cell::Placeholder };
                }
            }
        }
    }
    cells
}

pub fn draw_timeline_row(frame: &mut Frame, area: Rect, clips: &[ClipSpan], playhead: Option<usize>, muted: bool) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, TIMELINE_BARS as u32); TIMELINE_BARS])
        .split(area);

    for (bar, (cell, cell_area)) in bar_cells(clips).iter().zip(cols.iter()).enumerate() {
        let mut style = match cell {
            Cell::Notes => Style::default().bg(Color::Magenta),
            Cell::Placeholder => Style::default().bg(Color::DarkGray),
            Cell::Empty => Style::default(),
        };
        if muted && *cell != Cell::Empty {
            style = Style::default().bg(Color::Black);
        }
        if playhead == Some(bar) {
            style = style.bg(Color::LightYellow);
        }
        frame.render_widget(Block::default().style(style), *cell_area);
    }
}
