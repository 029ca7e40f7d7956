use std::cmp::Ordering;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use focustap::stats::{KindHistory, SessionRow};
use focustap::stimulus::StimulusKind;

use crate::{App, SortBy};

/// How many stored sessions the history screen loads
pub const HISTORY_LIMIT: usize = 200;

fn hit_rate_color(hit_rate: f64) -> Color {
    if hit_rate >= 80.0 {
        Color::Green
    } else if hit_rate >= 50.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Pure presenter for a single session row
pub fn present_row(row: &SessionRow) -> Row<'static> {
    let reaction = if row.avg_reaction_ms > 0.0 {
        format!(
            "{:.0} ({:.0}-{:.0})",
            row.avg_reaction_ms, row.fastest_reaction_ms, row.slowest_reaction_ms
        )
    } else {
        "-".to_string()
    };

    Row::new(vec![
        Cell::from(row.played_at.format("%Y-%m-%d %H:%M").to_string()),
        Cell::from(format!("{}x{}", row.grid_size, row.grid_size)),
        Cell::from(format!("{} / {}", row.score, row.total_rounds))
            .style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(format!("{:.1}", row.hit_rate))
            .style(Style::default().fg(hit_rate_color(row.hit_rate))),
        Cell::from(reaction),
    ])
}

fn kind_line(history: &[KindHistory]) -> Line<'static> {
    let mut spans = vec![Span::styled(
        "All-time: ",
        Style::default().add_modifier(Modifier::BOLD),
    )];
    for kind in StimulusKind::ALL {
        let color = match kind {
            StimulusKind::Go => Color::Green,
            StimulusKind::NoGo => Color::Red,
            StimulusKind::Displaced => Color::Blue,
        };
        let text = match history.iter().find(|h| h.kind == kind) {
            Some(h) => match h.avg_reaction_ms {
                Some(avg) => format!("{kind} {:.1}% ({avg:.0}ms, n={})  ", h.hit_rate, h.attempts),
                None => format!("{kind} {:.1}% (n={})  ", h.hit_rate, h.attempts),
            },
            None => format!("{kind} -  "),
        };
        spans.push(Span::styled(text, Style::default().fg(color)));
    }
    Line::from(spans)
}

/// Order sessions in place according to the history screen's sort settings
pub fn sort_sessions(sessions: &mut [SessionRow], sort_by: &SortBy, ascending: bool) {
    sessions.sort_by(|a, b| {
        let cmp = match sort_by {
            SortBy::Played => a.id.cmp(&b.id),
            SortBy::Score => a.score.cmp(&b.score),
            SortBy::HitRate => a.hit_rate.partial_cmp(&b.hit_rate).unwrap_or(Ordering::Equal),
            SortBy::AvgReaction => a
                .avg_reaction_ms
                .partial_cmp(&b.avg_reaction_ms)
                .unwrap_or(Ordering::Equal),
        };
        if ascending {
            cmp
        } else {
            cmp.reverse()
        }
    });
}

/// Render the session history screen
pub fn render_history(app: &mut App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Length(1), // per-kind summary
            Constraint::Min(0),    // sessions table
            Constraint::Length(3), // instructions
        ])
        .split(area);

    let sort_direction = if app.history_state.sort_ascending {
        "↑"
    } else {
        "↓"
    };
    let sort_by_text = match app.history_state.sort_by {
        SortBy::Played => "Played",
        SortBy::Score => "Score",
        SortBy::HitRate => "Hit Rate",
        SortBy::AvgReaction => "Avg Reaction",
    };

    let title = Paragraph::new(format!(
        "Session History (Sort: {sort_by_text} {sort_direction})"
    ))
    .block(Block::default().borders(Borders::ALL).title("History"))
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let db = app.game.stats_db();
    let sessions = db.and_then(|db| db.recent_sessions(HISTORY_LIMIT).ok());
    let kinds = db.and_then(|db| db.kind_summary().ok()).unwrap_or_default();

    f.render_widget(
        Paragraph::new(kind_line(&kinds)).alignment(Alignment::Center),
        chunks[1],
    );

    match sessions {
        Some(mut sessions) if !sessions.is_empty() => {
            sort_sessions(
                &mut sessions,
                &app.history_state.sort_by,
                app.history_state.sort_ascending,
            );

            let table_height = chunks[2].height.saturating_sub(3) as usize; // borders + header
            let max_scroll = sessions.len().saturating_sub(table_height);
            if app.history_state.scroll_offset > max_scroll {
                app.history_state.scroll_offset = max_scroll;
            }

            let indicator = |sort: SortBy| {
                if app.history_state.sort_by == sort {
                    sort_direction
                } else {
                    ""
                }
            };
            let header = Row::new(vec![
                Cell::from(format!("Played {}", indicator(SortBy::Played))),
                Cell::from("Grid"),
                Cell::from(format!("Score {}", indicator(SortBy::Score))),
                Cell::from(format!("Hit Rate (%) {}", indicator(SortBy::HitRate))),
                Cell::from(format!("Reaction (ms) {}", indicator(SortBy::AvgReaction))),
            ])
            .style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );

            let visible_rows: Vec<Row> = sessions
                .iter()
                .skip(app.history_state.scroll_offset)
                .take(table_height)
                .map(present_row)
                .collect();

            let widths = [
                Constraint::Length(18),
                Constraint::Length(6),
                Constraint::Length(10),
                Constraint::Length(15),
                Constraint::Min(16),
            ];

            let table = Table::new(visible_rows, widths)
                .header(header)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(format!("Sessions ({})", sessions.len())),
                )
                .column_spacing(2);

            f.render_widget(table, chunks[2]);
        }
        _ => {
            let no_data = Paragraph::new("No sessions recorded yet. Finish a session to see it here.")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Gray));
            f.render_widget(no_data, chunks[2]);
        }
    }

    let instructions = Paragraph::new(
        "(↑/↓) scroll  (PgUp/PgDn) page  (Home) top  (1-4) sort  (space) direction  (b) back  (r) retry",
    )
    .alignment(Alignment::Center)
    .wrap(ratatui::widgets::Wrap { trim: true });
    f.render_widget(instructions, chunks[3]);
}
