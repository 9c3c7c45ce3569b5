//! UI rendering
//!
//! ```text
//! ┌ Results ────────────────────────────────────────────────────┐
//! │ Route  Departure Time  Arrival Time  Duration  Price  Carrier│
//! ├ Search ────────────┬ Details ───────────────────────────────┤
//! │ From / To / Depart │ ○ 08:00 UTC CPH                        │
//! └────────────────────┴────────────────────────────────────────┘
//!  status │ keys
//! ```

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::search::FIELD_LABELS;
use crate::app::{App, Screen};
use crate::render::TABLE_HEADERS;

const FOCUSED: Color = Color::Magenta;
const UNFOCUSED: Color = Color::White;

fn pane(title: &str, focused: bool) -> Block<'_> {
    let color = if focused { FOCUSED } else { UNFOCUSED };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title)
}

/// Render the entire UI
pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45), // Results table
            Constraint::Min(14),        // Search + details
            Constraint::Length(1),      // Status bar
        ])
        .split(frame.area());

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(33), Constraint::Percentage(67)])
        .split(chunks[1]);

    render_results(frame, app, chunks[0]);
    render_search(frame, app, bottom[0]);
    render_details(frame, app, bottom[1]);
    render_status_bar(frame, app, chunks[2]);
}

fn render_results(frame: &mut Frame, app: &mut App, area: Rect) {
    let header = Row::new(TABLE_HEADERS.map(Cell::from))
        .style(Style::default().add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    let rows: Vec<Row> = app
        .results
        .rows()
        .iter()
        .map(|row| Row::new(row.cells().map(|cell| Cell::from(cell.to_string()))))
        .collect();

    let widths = [
        Constraint::Percentage(20),
        Constraint::Percentage(14),
        Constraint::Percentage(14),
        Constraint::Percentage(22),
        Constraint::Percentage(10),
        Constraint::Percentage(20),
    ];

    let title = format!(" Results [{}] ", app.results.rows().len());
    let table = Table::new(rows, widths)
        .header(header)
        .block(pane(&title, app.screen == Screen::Results))
        .row_highlight_style(
            Style::default()
                .fg(Color::LightYellow)
                .bg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_stateful_widget(table, area, &mut app.results.table_state);
}

fn render_search(frame: &mut Frame, app: &mut App, area: Rect) {
    let focused = app.screen == Screen::Search;
    let block = pane(" Search ", focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(inner);

    let focus = app.search.focus;
    for (index, field) in app.search.fields.iter_mut().enumerate() {
        let active = focused && index == focus;
        let border = if active { FOCUSED } else { Color::DarkGray };
        field.set_block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(FIELD_LABELS[index]),
        );
        field.set_cursor_line_style(Style::default());
        field.set_cursor_style(if active {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        });
        frame.render_widget(&*field, rows[index]);
    }

    let message = if app.search.loading {
        Line::styled("Searching flights...", Style::default().fg(Color::Magenta))
    } else if let Some(error) = &app.search.error {
        Line::styled(error.clone(), Style::default().fg(Color::Red))
    } else {
        Line::styled(
            "tab: next field, enter: search",
            Style::default().fg(Color::DarkGray),
        )
    };
    frame.render_widget(Paragraph::new(message).wrap(Wrap { trim: true }), rows[3]);
}

fn render_details(frame: &mut Frame, app: &App, area: Rect) {
    let block = pane(" Details ", app.screen == Screen::Details);

    let paragraph = match &app.details {
        Some(details) => {
            let mut lines = vec![
                Line::styled(
                    details.header.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Line::from(""),
            ];
            lines.extend(details.lines.iter().map(|l| Line::from(l.clone())));
            Paragraph::new(lines).scroll((details.scroll, 0))
        }
        None => Paragraph::new(Line::styled(
            "Select a flight to see its itinerary",
            Style::default().fg(Color::DarkGray),
        )),
    };

    frame.render_widget(paragraph.block(block), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let keys = match app.screen {
        Screen::Search => "enter: search │ tab: next field │ ctrl+c: quit",
        Screen::Results => "enter: details │ esc: new search │ q: quit",
        Screen::Details => "b: back │ j/k: scroll │ q: quit",
    };
    let status_text = match &app.status {
        Some(status) => format!(" {} │ {} │ ctrl+z: suspend", status, keys),
        None => format!(" {} │ ctrl+z: suspend", keys),
    };

    let status = Paragraph::new(status_text).style(Style::default().fg(Color::DarkGray));

    frame.render_widget(status, area);
}
