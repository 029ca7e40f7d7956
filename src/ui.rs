pub mod charting;
pub mod history;
pub mod screen;

use std::time::Instant;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, Gauge, GraphType, Paragraph, Widget, Wrap},
};

use focustap::game::{FeedbackKind, Game};
use focustap::session::MAX_GRID_SIZE;
use focustap::stimulus::StimulusKind;

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;
const MAX_CELL_HEIGHT: u16 = 5;

const IDLE_CELL: Color = Color::Rgb(51, 51, 51);
const FORBIDDEN_CELL: Color = Color::Rgb(255, 69, 0);
const NOGO_CLICK_CELL: Color = Color::Rgb(139, 0, 0);

/// Screen regions of the play view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayLayout {
    pub title: Rect,
    pub hud: Rect,
    pub timer: Rect,
    pub grid: Rect,
    pub instructions: Rect,
    pub legend: Rect,
}

pub fn play_layout(area: Rect) -> PlayLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Length(1), // hud
            Constraint::Length(1), // response timer
            Constraint::Min(3),    // grid
            Constraint::Length(3), // instructions
            Constraint::Length(1), // legend
        ])
        .split(area);

    PlayLayout {
        title: chunks[0],
        hud: chunks[1],
        timer: chunks[2],
        grid: chunks[3],
        instructions: chunks[4],
        legend: chunks[5],
    }
}

/// Cell rectangles for a `grid_size` x `grid_size` grid centred in `area`, row-major
pub fn grid_cells(area: Rect, grid_size: usize) -> Vec<Rect> {
    let Ok(size) = u16::try_from(grid_size.clamp(1, MAX_GRID_SIZE)) else {
        return vec![];
    };
    let cell_h = (area.height / size).clamp(1, MAX_CELL_HEIGHT);
    // terminal cells are roughly twice as tall as they are wide
    let cell_w = (cell_h * 2 + 2).min(area.width / size).max(1);

    let grid_w = cell_w.saturating_mul(size);
    let grid_h = cell_h.saturating_mul(size);
    let x0 = area.x + area.width.saturating_sub(grid_w) / 2;
    let y0 = area.y + area.height.saturating_sub(grid_h) / 2;

    (0..size)
        .flat_map(|row| {
            (0..size).map(move |col| {
                Rect {
                    x: x0.saturating_add(col.saturating_mul(cell_w)),
                    y: y0.saturating_add(row.saturating_mul(cell_h)),
                    width: cell_w.saturating_sub(1),
                    height: cell_h,
                }
                .intersection(area)
            })
        })
        .collect()
}

/// Index of the cell under terminal position (`col`, `row`)
pub fn cell_at(cells: &[Rect], col: u16, row: u16) -> Option<usize> {
    cells.iter().position(|r| {
        col >= r.x && col < r.x + r.width && row >= r.y && row < r.y + r.height
    })
}

fn stimulus_color(kind: StimulusKind) -> Color {
    match kind {
        StimulusKind::Go => Color::Green,
        StimulusKind::NoGo => Color::Red,
        StimulusKind::Displaced => Color::Blue,
    }
}

fn feedback_color(kind: FeedbackKind) -> Color {
    match kind {
        FeedbackKind::Hit => Color::LightGreen,
        FeedbackKind::Miss => FORBIDDEN_CELL,
        FeedbackKind::NoGoClick => NOGO_CLICK_CELL,
        FeedbackKind::Timeout => Color::Gray,
    }
}

/// Fill colour of `cell` right now
pub fn cell_color(game: &Game, cell: usize, now: Instant) -> Color {
    if let Some(feedback) = game.feedback(now) {
        if feedback.cell == cell {
            return feedback_color(feedback.kind);
        }
    }
    match game.stimulus() {
        Some(s) if s.is_forbidden(cell) => FORBIDDEN_CELL,
        Some(s) if s.target_cell == cell => stimulus_color(s.kind),
        _ => IDLE_CELL,
    }
}

fn render_grid(game: &Game, area: Rect, buf: &mut Buffer, now: Instant) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let cells = grid_cells(area, game.engine().grid_size());

    for (idx, rect) in cells.iter().enumerate() {
        if rect.is_empty() {
            continue;
        }
        let border_style = if idx == game.cursor() {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .style(Style::default().bg(cell_color(game, idx, now)));
        let inner = block.inner(*rect);
        block.render(*rect, buf);

        if inner.height > 0 {
            let label_area = Rect {
                y: inner.y + inner.height / 2,
                height: 1,
                ..inner
            };
            Paragraph::new(Span::styled((idx + 1).to_string(), bold_style.fg(Color::White)))
                .alignment(Alignment::Center)
                .render(label_area, buf);
        }
    }
}

fn render_play(app: &App, area: Rect, buf: &mut Buffer) {
    let game = &app.game;
    let engine = game.engine();
    let now = Instant::now();
    let layout = play_layout(area);

    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    Paragraph::new(Span::styled(
        "FocusTap",
        bold_style.fg(Color::Cyan),
    ))
    .alignment(Alignment::Center)
    .render(layout.title, buf);

    let avg = engine.average_reaction_time();
    let avg_text = if avg > 0.0 {
        format!("{avg:.0}ms")
    } else {
        "--".to_string()
    };
    let hud = format!(
        "Score: {}   Round: {} / {}   Avg Reaction: {}",
        engine.score(),
        engine.current_round().max(1),
        engine.total_rounds(),
        avg_text
    );
    Paragraph::new(Span::styled(hud, bold_style))
        .alignment(Alignment::Center)
        .render(layout.hud, buf);

    if let Some(ratio) = game.remaining_fraction(now) {
        Gauge::default()
            .gauge_style(Style::default().fg(Color::Magenta))
            .ratio(ratio)
            .label("")
            .render(layout.timer, buf);
    }

    render_grid(game, layout.grid, buf, now);

    let instructions = vec![
        Line::from(Span::styled("Green: tap it quickly!", Style::default().fg(Color::Green))),
        Line::from(Span::styled("Red: don't tap anything!", Style::default().fg(Color::Red))),
        Line::from(Span::styled("Blue: always tap the centre!", Style::default().fg(Color::Blue))),
    ];
    Paragraph::new(instructions)
        .alignment(Alignment::Center)
        .style(dim_style)
        .render(layout.instructions, buf);

    let legend = if engine.cell_count() <= 9 {
        "(1-9) tap cell / (arrows) move / (space) tap / (esc)ape"
    } else {
        "(arrows) move / (space) tap / (esc)ape"
    };
    Paragraph::new(Span::styled(legend, italic_style))
        .alignment(Alignment::Center)
        .render(layout.legend, buf);
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);
    let magenta_style = Style::default().fg(Color::Magenta);

    let summary = match app.game.summary() {
        Some(summary) => summary,
        None => return,
    };
    let lines = summary.result_lines();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2),                  // title
            Constraint::Length(lines.len() as u16), // summary
            Constraint::Min(3),                     // chart
            Constraint::Length(1),                  // legend
        ])
        .split(area);

    Paragraph::new(Span::styled(
        "Session Complete!",
        bold_style.fg(Color::Yellow),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let styled: Vec<Line> = lines
        .into_iter()
        .map(|line| {
            let color = if line.starts_with("Go") {
                Color::Green
            } else if line.starts_with("NoGo") {
                Color::Red
            } else if line.starts_with("Displaced") {
                Color::Blue
            } else {
                Color::White
            };
            Line::from(Span::styled(line, Style::default().fg(color)))
        })
        .collect();
    Paragraph::new(styled)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false })
        .render(chunks[1], buf);

    let coords = app.game.reaction_coords();
    let (last_round, slowest) =
        charting::compute_chart_params(&coords, app.game.engine().total_rounds());
    let tuples: Vec<(f64, f64)> = coords.iter().map(|&p| p.into()).collect();
    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(magenta_style)
        .graph_type(GraphType::Line)
        .data(&tuples)];

    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("round")
                .bounds([1.0, last_round])
                .labels(vec![
                    Span::styled("1", bold_style),
                    Span::styled(charting::format_label(last_round), bold_style),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("ms")
                .bounds([0.0, slowest])
                .labels(vec![
                    Span::styled("0", bold_style),
                    Span::styled(charting::format_label(slowest), bold_style),
                ]),
        )
        .render(chunks[2], buf);

    let legend = if app.config.save_results {
        "(r)etry / (h)istory / (esc)ape"
    } else {
        "(r)etry / (h)istory / (esc)ape   [results not saved]"
    };
    Paragraph::new(Span::styled(legend, italic_style)).render(chunks[3], buf);
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.game.is_complete() {
            render_results(self, area, buf);
        } else {
            render_play(self, area, buf);
        }
    }
}
