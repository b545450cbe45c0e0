use crate::shared::{DisplayState, TIMELINE_BARS, TrackRow};
use super::grid::draw_timeline_row;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

const LABEL_WIDTH: u16 = 30;
const HELP: &str = "space play  1-9 track  m mute  s solo  [ ] vol  - = pan  , . bpm  g generate  esc quit";

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // transport header
            Constraint::Min(4), // tracks
            Constraint::Length(1), // status
            Constraint::Length(1), // key help
        ])
        .split(area);

    draw_header(frame, sections[0], state);
    draw_tracks(frame, sections[1], state);
    frame.render_widget(Paragraph::new(state.status.as_str()), sections[2]);
    frame.render_widget(
        Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray)),
        sections[3],
    );
}

fn draw_header(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let (icon, color) = if state.playing { ("▶", Color::Green) } else { ("■", Color::Gray) };
    let line = Line::from(vec![
        Span::styled(format!(" {icon} "), Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::raw(format!("bar {:>5.2}", state.current_bar + 1.0)),
        Span::raw(format!("   {:.0} bpm", state.bpm)),
        Span::raw(format!("   {}", state.key)),
    ]);
    let block = Block::default().borders(Borders::ALL).title(" soundweave ");
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_tracks(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let block = Block::default().borders(Borders::ALL).title(" tracks ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(1); state.tracks.len()])
        .split(inner);

    let playhead = playhead_bar(state);
    for (i, (track, row)) in state.tracks.iter().zip(rows.iter()).enumerate() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(LABEL_WIDTH), Constraint::Min(TIMELINE_BARS as u16)])
            .split(*row);

        let selected = i == state.selected_track;
        frame.render_widget(Paragraph::new(track_label(i, track, selected)), cols[0]);
        draw_timeline_row(frame, cols[1], &track.clips, playhead, track.muted);
    }
}

fn playhead_bar(state: &DisplayState) -> Option<usize> {
    if !state.playing && state.current_bar == 0.0 {
        return None;
    }
    let bar = state.current_bar.floor() as usize;
    (bar < TIMELINE_BARS).then_some(bar)
}

fn track_label(index: usize, track: &TrackRow, selected: bool) -> Line<'static> {
    let flag = |on: bool, c: &'static str, color: Color| {
        if on {
            Span::styled(c, Style::default().fg(Color::Black).bg(color))
        } else {
            Span::styled(c, Style::default().fg(Color::DarkGray))
        }
    };
    let name_style = if selected {
        Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::styled(format!("{} {:<10.10}", index + 1, track.name), name_style),
        Span::raw(" "),
        flag(track.muted, "M", Color::Red),
        flag(track.soloed, "S", Color::Yellow),
        Span::raw(format!(" {:>3.0}% {:+.1} {}", track.volume * 100.0, track.pan, track.instrument.get(..1).unwrap_or(""))),
    ])
}
