//! TUI layout and rendering with ratatui.
//!
//! # Overview
//!
//! - Header with the trainee and scan progress
//! - Welcome, star map or completion content
//! - Footer with the keys that work right now
//! - Popups for the briefing, the running challenge and the reset prompt
//!
//! # Example
//!
//! ```no_run
//! use starscan::tui::app::App;
//! use starscan::tui::ui::render;
//! use ratatui::Frame;
//!
//! fn draw(frame: &mut Frame, app: &App) {
//!     render(frame, app);
//! }
//! ```

use std::time::Duration;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::app::{App, Screen, MAP_COLUMNS};
use crate::challenges::{ChallengeView, PALETTE};
use crate::engine::SessionPhase;

/// Width of the timed-hit bar in cells.
const BAR_WIDTH: usize = 50;

fn create_block<'a>(title: impl Into<Line<'a>>) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_set(border::ROUNDED)
        .title(title)
}

/// Render the whole screen for the current state.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_header(frame, app, chunks[0]);
    match app.screen() {
        Screen::Welcome => render_welcome(frame, app, chunks[1]),
        Screen::Map => render_map(frame, app, chunks[1]),
        Screen::Completed => render_completed(frame, app, chunks[1]),
    }
    render_footer(frame, app, chunks[2]);

    if app.screen() == Screen::Map {
        if app.briefing().is_some() {
            render_briefing_dialog(frame, app, area);
        } else if app.engine().phase() == SessionPhase::Calibrating {
            render_challenge_dialog(frame, app, area);
        } else if app.confirm_reset() {
            render_reset_dialog(frame, app, area);
        }
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let mut spans = vec![Span::styled(
        "starscan - Sector 7G",
        Style::default()
            .fg(theme.primary)
            .add_modifier(Modifier::BOLD),
    )];
    let name = app.engine().user_name();
    if !name.is_empty() {
        spans.push(Span::raw(format!("  Trainee {}", name)));
    }
    if app.screen() != Screen::Welcome {
        spans.push(Span::styled(
            format!("  {}", app.engine().progress()),
            Style::default().fg(theme.highlight),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(create_block(""));
    frame.render_widget(header, area);
}

fn render_welcome(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let dialog = centered_rect(60, 50, area);

    let mut lines = vec![
        Line::from(Span::styled(
            "Welcome to the Cartography Academy",
            Style::default()
                .fg(theme.primary)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Chart every star system in Sector 7G."),
        Line::from("Each scan needs a manual calibration."),
        Line::from(""),
        Line::from(vec![
            Span::raw("Designation: "),
            Span::styled(
                format!("{}_", app.name_input()),
                Style::default().fg(theme.highlight),
            ),
        ]),
    ];
    if let Some(notice) = app.notice() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            notice.to_string(),
            Style::default().fg(theme.danger),
        )));
    }

    let welcome = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(create_block(" New Mission "));
    frame.render_widget(welcome, dialog);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let rows = app.engine().world().count().div_ceil(MAP_COLUMNS).max(1);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(rows as u16 * 3 + 2),
            Constraint::Length(3),
            Constraint::Min(3),
        ])
        .split(area);

    render_star_grid(frame, app, chunks[0], rows);
    render_progress(frame, app, chunks[1]);
    render_console(frame, app, chunks[2]);
}

fn render_star_grid(frame: &mut Frame, app: &App, area: Rect, rows: usize) {
    let theme = app.theme();
    let block = create_block(" Star Map ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(3); rows])
        .split(inner);
    let scanning = app.scanning_target();

    for (row, chunk) in app
        .engine()
        .world()
        .targets()
        .chunks(MAP_COLUMNS)
        .enumerate()
    {
        let Some(row_area) = row_areas.get(row) else {
            break;
        };
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, MAP_COLUMNS as u32); MAP_COLUMNS])
            .split(*row_area);

        for (col, target) in chunk.iter().enumerate() {
            let index = row * MAP_COLUMNS + col;
            let is_cursor = index == app.cursor();
            let (marker, colour) = if scanning == Some(target.id.as_str()) {
                ("◎", theme.highlight)
            } else if target.scanned {
                ("★", theme.scanned)
            } else {
                ("☆", theme.normal)
            };

            let mut style = Style::default().fg(colour);
            if is_cursor {
                style = style
                    .fg(theme.inverted_fg)
                    .bg(theme.primary)
                    .add_modifier(Modifier::BOLD);
            }
            let width = cells[col].width.saturating_sub(4) as usize;
            let label = format!("{} {}", marker, truncate_string(&target.name, width));
            let cell = Paragraph::new(Line::from(Span::styled(label, style)))
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::NONE));
            frame.render_widget(cell, inset(cells[col], 1));
        }
    }
}

fn render_progress(frame: &mut Frame, app: &App, area: Rect) {
    let progress = app.engine().progress();
    let ratio = if progress.total == 0 {
        0.0
    } else {
        progress.scanned as f64 / progress.total as f64
    };
    let gauge = Gauge::default()
        .block(create_block(""))
        .gauge_style(Style::default().fg(app.theme().success))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(format!("{} ({:.0}%)", progress, progress.percent()));
    frame.render_widget(gauge, area);
}

fn render_console(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let visible = area.height.saturating_sub(2) as usize;
    let skip = app.console().len().saturating_sub(visible);
    let items: Vec<ListItem> = app
        .console()
        .skip(skip)
        .map(|line| {
            ListItem::new(Line::from(Span::styled(
                format!("> {}", line.text),
                Style::default().fg(theme.severity(line.severity)),
            )))
        })
        .collect();
    frame.render_widget(List::new(items).block(create_block(" Console ")), area);
}

fn render_completed(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let dialog = centered_rect(60, 60, area);
    let progress = app.engine().progress();

    let mut lines = vec![
        Line::from(Span::styled(
            "Mission Complete",
            Style::default()
                .fg(theme.success)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    match app.completion().or(app.engine().completion()) {
        Some(record) => {
            lines.push(Line::from(format!(
                "Trainee {} has charted Sector 7G.",
                record.user_name
            )));
            lines.push(Line::from(format!(
                "Systems charted: {} / {}",
                record.scanned, record.total
            )));
            lines.push(Line::from(format!("Stardate {}", record.stardate)));
            lines.push(Line::from(record.earth_date()));
        }
        None => lines.push(Line::from(progress.to_string())),
    }

    let summary = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(create_block(" Certificate ").border_style(Style::default().fg(theme.success)));
    frame.render_widget(summary, dialog);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let mut spans = Vec::new();
    for (i, (key, what)) in footer_commands(app).iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(
            *key,
            Style::default()
                .fg(theme.highlight)
                .add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(format!(" {}", what), Style::default().fg(theme.dim)));
    }
    if let Some(notice) = app.notice().filter(|_| app.screen() != Screen::Welcome) {
        spans.push(Span::styled(
            format!("  {}", notice),
            Style::default().fg(theme.danger),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)).block(create_block("")), area);
}

fn footer_commands(app: &App) -> Vec<(&'static str, &'static str)> {
    match app.screen() {
        Screen::Welcome => vec![("Enter", "start mission"), ("Esc", "quit")],
        Screen::Completed => vec![("Enter", "new mission"), ("q", "quit")],
        Screen::Map => match app.engine().phase() {
            SessionPhase::Idle if app.confirm_reset() => vec![("y", "reset"), ("n", "keep")],
            SessionPhase::Idle => vec![
                ("←↓↑→/hjkl", "move"),
                ("Enter", "scan"),
                ("r", "reset"),
                ("q", "quit"),
            ],
            SessionPhase::Briefing => vec![("Enter", "start calibration")],
            _ => challenge_commands(app),
        },
    }
}

fn challenge_commands(app: &App) -> Vec<(&'static str, &'static str)> {
    match app.engine().challenge_view() {
        Some(ChallengeView::Pattern { .. }) => vec![
            ("1-9/Space", "toggle cell"),
            ("Arrows", "move"),
            ("Enter", "submit"),
        ],
        Some(ChallengeView::Whack { .. }) => vec![("1-9/Space", "hit cell"), ("Arrows", "move")],
        Some(ChallengeView::Sequence { .. }) => {
            vec![("1-5/Space", "pick colour"), ("←→", "move")]
        }
        Some(ChallengeView::TimedHit { .. }) => vec![("Space", "stop marker")],
        Some(ChallengeView::RateClick { .. }) => vec![("Space", "charge")],
        Some(ChallengeView::Arithmetic { .. }) => vec![("0-9", "type"), ("Enter", "submit")],
        Some(ChallengeView::Prefix { .. }) => vec![("Symbols", "type cipher")],
        None => vec![],
    }
}

fn render_briefing_dialog(frame: &mut Frame, app: &App, area: Rect) {
    let Some(briefing) = app.briefing() else {
        return;
    };
    let theme = app.theme();
    let dialog = centered_rect(60, 40, area);
    frame.render_widget(Clear, dialog);

    let lines = vec![
        Line::from(Span::styled(
            briefing.title.clone(),
            Style::default()
                .fg(theme.highlight)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("Target: {} ({})", briefing.target_name, briefing.target_id)),
        Line::from(""),
        Line::from(briefing.instructions.clone()),
        Line::from(""),
        Line::from(Span::styled(
            "Press Enter to start calibration",
            Style::default().fg(theme.dim),
        )),
    ];
    let popup = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(create_block(" Briefing ").border_style(Style::default().fg(theme.primary)));
    frame.render_widget(popup, dialog);
}

fn render_challenge_dialog(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let dialog = centered_rect(70, 60, area);
    frame.render_widget(Clear, dialog);

    let title = match app.engine().challenge_kind() {
        Some(kind) => format!(" {} ", kind.title()),
        None => " Calibration ".to_string(),
    };
    let mut lines = match app.engine().challenge_view() {
        Some(view) => board_lines(app, &view),
        None => vec![Line::from("Calibrating scanner...")],
    };
    if let Some(verdict) = app.feedback() {
        let colour = if verdict.success {
            theme.success
        } else {
            theme.danger
        };
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            verdict.feedback.clone(),
            Style::default().fg(colour).add_modifier(Modifier::BOLD),
        )));
    }

    let popup = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(create_block(title).border_style(Style::default().fg(theme.highlight)));
    frame.render_widget(popup, dialog);
}

/// Lines drawing one challenge board.
fn board_lines(app: &App, view: &ChallengeView) -> Vec<Line<'static>> {
    let theme = *app.theme();
    let cursor = app.board_cursor();
    match view {
        ChallengeView::Pattern {
            grid_size,
            lit,
            selected,
            required,
            accepting,
        } => {
            let mut lines = grid_lines(*grid_size, |cell| {
                if *lit == Some(cell) {
                    ("██", Style::default().fg(theme.highlight))
                } else if selected.contains(&cell) {
                    ("▓▓", Style::default().fg(theme.primary))
                } else {
                    ("░░", Style::default().fg(theme.dim))
                }
            }, accepting.then_some(cursor), theme.normal);
            lines.push(Line::from(""));
            lines.push(Line::from(if *accepting {
                format!("Selected {} / {}", selected.len(), required)
            } else {
                "Memorize the pattern...".to_string()
            }));
            lines
        }
        ChallengeView::Whack {
            grid_size,
            active,
            score,
            threshold,
            remaining,
        } => {
            let mut lines = grid_lines(*grid_size, |cell| {
                if *active == Some(cell) {
                    ("◉◉", Style::default().fg(theme.danger))
                } else {
                    ("··", Style::default().fg(theme.dim))
                }
            }, Some(cursor), theme.normal);
            lines.push(Line::from(""));
            lines.push(Line::from(format!(
                "Locks {} / {}   {}",
                score,
                threshold,
                format_seconds(*remaining)
            )));
            lines
        }
        ChallengeView::TimedHit {
            marker,
            zone_start,
            zone_width,
            stopped,
        } => {
            let cell_of = |pct: f64| ((pct / 100.0) * BAR_WIDTH as f64).floor() as usize;
            let zone = cell_of(*zone_start)..cell_of(zone_start + zone_width).max(cell_of(*zone_start) + 1);
            let at = cell_of(*marker).min(BAR_WIDTH - 1);
            let bar: Vec<Span<'static>> = (0..BAR_WIDTH)
                .map(|i| {
                    if i == at {
                        Span::styled("▼", Style::default().fg(theme.highlight))
                    } else if zone.contains(&i) {
                        Span::styled("█", Style::default().fg(theme.success))
                    } else {
                        Span::styled("─", Style::default().fg(theme.dim))
                    }
                })
                .collect();
            vec![
                Line::from(bar),
                Line::from(""),
                Line::from(if *stopped { "Marker stopped." } else { "Stop the marker in the zone." }),
            ]
        }
        ChallengeView::Sequence {
            showing,
            entered,
            length,
            accepting,
        } => {
            let flash = match showing {
                Some(index) => Span::styled(
                    format!("  {}  ", PALETTE[*index % PALETTE.len()].to_uppercase()),
                    Style::default()
                        .fg(theme.inverted_fg)
                        .bg(palette_colour(*index))
                        .add_modifier(Modifier::BOLD),
                ),
                None => Span::raw(" "),
            };
            let palette: Vec<Span<'static>> = PALETTE
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let mut style = Style::default().fg(palette_colour(i));
                    if *accepting && i == cursor {
                        style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
                    }
                    Span::styled(format!(" {}:{} ", i + 1, name), style)
                })
                .collect();
            vec![
                Line::from(flash),
                Line::from(""),
                Line::from(palette),
                Line::from(""),
                Line::from(if *accepting {
                    format!("Entered {} / {}", entered, length)
                } else {
                    "Watch the sequence...".to_string()
                }),
            ]
        }
        ChallengeView::RateClick {
            presses,
            target,
            remaining,
        } => {
            let filled = (*presses as usize * 30) / (*target).max(1) as usize;
            vec![
                Line::from(vec![
                    Span::styled("█".repeat(filled.min(30)), Style::default().fg(theme.success)),
                    Span::styled(
                        "░".repeat(30usize.saturating_sub(filled)),
                        Style::default().fg(theme.dim),
                    ),
                ]),
                Line::from(""),
                Line::from(format!(
                    "Charge {} / {}   {}",
                    presses,
                    target,
                    format_seconds(*remaining)
                )),
            ]
        }
        ChallengeView::Arithmetic {
            expression,
            remaining,
        } => vec![
            Line::from(Span::styled(
                format!("{} = ?", expression),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![
                Span::raw("Answer: "),
                Span::styled(
                    format!("{}_", app.answer()),
                    Style::default().fg(theme.highlight),
                ),
            ]),
            Line::from(""),
            Line::from(format_seconds(*remaining)),
        ],
        ChallengeView::Prefix {
            target,
            entered,
            remaining,
        } => vec![
            Line::from(Span::styled(
                target.clone(),
                Style::default()
                    .fg(theme.highlight)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![
                Span::raw("Cipher: "),
                Span::styled(format!("{}_", entered), Style::default().fg(theme.primary)),
            ]),
            Line::from(""),
            Line::from(format_seconds(*remaining)),
        ],
    }
}

/// Square grid of two-character cells; the cursor cell is bracketed.
fn grid_lines(
    side: usize,
    cell: impl Fn(usize) -> (&'static str, Style),
    cursor: Option<usize>,
    bracket: Color,
) -> Vec<Line<'static>> {
    (0..side)
        .map(|row| {
            let spans: Vec<Span<'static>> = (0..side)
                .flat_map(|col| {
                    let index = row * side + col;
                    let (glyph, style) = cell(index);
                    let (open, close) = if cursor == Some(index) {
                        ("[", "]")
                    } else {
                        (" ", " ")
                    };
                    [
                        Span::styled(open, Style::default().fg(bracket)),
                        Span::styled(glyph, style),
                        Span::styled(close, Style::default().fg(bracket)),
                    ]
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

fn render_reset_dialog(frame: &mut Frame, app: &App, area: Rect) {
    let theme = app.theme();
    let dialog = centered_rect(50, 25, area);
    frame.render_widget(Clear, dialog);

    let prompt = Paragraph::new(vec![
        Line::from(Span::styled(
            "Reset mission progress?",
            Style::default()
                .fg(theme.danger)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Every scanned system will be forgotten."),
        Line::from(""),
        Line::from(Span::styled("y: reset   n: keep", Style::default().fg(theme.dim))),
    ])
    .alignment(Alignment::Center)
    .block(create_block(" Confirm ").border_style(Style::default().fg(theme.danger)));
    frame.render_widget(prompt, dialog);
}

// ==================== Helper Functions ====================

fn palette_colour(index: usize) -> Color {
    match PALETTE[index % PALETTE.len()] {
        "red" => Color::Red,
        "blue" => Color::Blue,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        _ => Color::Magenta,
    }
}

/// Remaining time as seconds with one decimal.
///
/// ```
/// use std::time::Duration;
/// use starscan::tui::ui::format_seconds;
///
/// assert_eq!(format_seconds(Duration::from_millis(4250)), "4.2s");
/// ```
#[must_use]
pub fn format_seconds(remaining: Duration) -> String {
    format!("{:.1}s", (remaining.as_millis() / 100) as f64 / 10.0)
}

/// Truncate a string with ellipsis if it exceeds `max_len` characters.
///
/// ```
/// use starscan::tui::ui::truncate_string;
///
/// assert_eq!(truncate_string("Vega", 10), "Vega");
/// assert_eq!(truncate_string("Alpha Centauri", 8), "Alpha...");
/// ```
#[must_use]
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

fn inset(area: Rect, margin: u16) -> Rect {
    Rect {
        x: area.x + margin.min(area.width / 2),
        y: area.y + margin.min(area.height / 2),
        width: area.width.saturating_sub(margin * 2),
        height: area.height.saturating_sub(margin * 2),
    }
}

/// Create a centered rectangle with given percentage of parent.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
