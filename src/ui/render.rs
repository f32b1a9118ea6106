//! Panel rendering
//!
//! Layout: header on top, forms column on the left, live map on the right,
//! event feed along the bottom. The map widget's inner rect is recorded on
//! the App each frame so mouse clicks can be mapped back to the plane.

use crate::domain::EventClass;
use crate::services::projector::PLANE_MAX;
use crate::ui::{App, Focus};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Line as CanvasLine, Points};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::Frame;

const BTS_COLOR: Color = Color::Cyan;
const PATH_COLOR: Color = Color::DarkGray;

fn class_color(class: EventClass) -> Color {
    match class {
        EventClass::Success => Color::Green,
        EventClass::Handover => Color::Yellow,
        EventClass::Error => Color::Red,
    }
}

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),  // Header
            Constraint::Min(12),    // Forms + map
            Constraint::Length(10), // Event feed
        ])
        .split(f.area());

    draw_header(f, chunks[0], app);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(40), Constraint::Min(20)])
        .split(chunks[1]);

    draw_forms(f, body[0], app);
    draw_map(f, body[1], app);
    draw_feed(f, chunks[2], app);
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let mut lines = vec![Line::from(vec![
        Span::styled(
            "Simulator Panel ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("({}) ", env!("GIT_HASH"))),
        Span::raw("| backend: "),
        Span::styled(app.base_url().to_string(), Style::default().fg(Color::Yellow)),
        Span::raw(" | Tab focus · Enter submit · ^T now · ^E export · ^L clear · Esc quit"),
    ])];

    if let Some(status) = &app.status_line {
        lines.push(Line::from(Span::styled(
            status.clone(),
            Style::default().fg(Color::Magenta),
        )));
    }

    let header =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn draw_forms(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),  // Generate
            Constraint::Length(5),  // Replay
            Constraint::Min(9),     // Connect
        ])
        .split(area);

    draw_generate_form(f, chunks[0], app);
    draw_replay_form(f, chunks[1], app);
    draw_connect_form(f, chunks[2], app);
}

fn field_line<'a>(label: &'a str, value: &'a str, focused: bool) -> Line<'a> {
    let marker = if focused { "▸ " } else { "  " };
    let value_style = if focused {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::UNDERLINED)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::raw(marker),
        Span::styled(format!("{:<10}", label), Style::default().fg(Color::DarkGray)),
        Span::styled(value, value_style),
    ])
}

fn status_line(status: &Option<crate::ui::forms::FormStatus>) -> Line<'_> {
    match status {
        Some(s) => {
            let color = if s.ok { Color::Green } else { Color::Red };
            Line::from(Span::styled(s.message.as_str(), Style::default().fg(color)))
        }
        None => Line::from(""),
    }
}

fn draw_generate_form(f: &mut Frame, area: Rect, app: &App) {
    let form = &app.generate;
    let button = if form.busy { "Generating..." } else { "Generate [Enter]" };

    let lines = vec![
        field_line("Users", &form.users, app.focus == Focus::GenerateUsers),
        field_line("Events", &form.events, app.focus == Focus::GenerateEvents),
        Line::from(Span::styled(
            format!("  {}", button),
            Style::default().fg(if form.busy { Color::DarkGray } else { Color::White }),
        )),
        status_line(&form.status),
    ];

    let widget = Paragraph::new(lines).block(
        Block::default()
            .title(" Generate Simulation ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );
    f.render_widget(widget, area);
}

fn draw_replay_form(f: &mut Frame, area: Rect, app: &App) {
    let form = &app.replay;
    let button = if form.busy { "Replaying..." } else { "Replay [Enter]" };

    let lines = vec![
        field_line("CSV file", &form.path, app.focus == Focus::ReplayPath),
        Line::from(Span::styled(
            format!("  {}", button),
            Style::default().fg(if form.busy { Color::DarkGray } else { Color::White }),
        )),
        status_line(&form.status),
    ];

    let widget = Paragraph::new(lines).block(
        Block::default()
            .title(" Replay Simulation ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    );
    f.render_widget(widget, area);
}

fn draw_connect_form(f: &mut Frame, area: Rect, app: &App) {
    let form = &app.connect;
    let button = if form.busy { "Sending..." } else { "Send [Enter]" };
    let keepalive = if form.keepalive { "[x]" } else { "[ ]" };

    let lines = vec![
        field_line("IMEI", &form.imei, app.focus == Focus::ConnectImei),
        field_line("X", &form.x, app.focus == Focus::ConnectX),
        field_line("Y", &form.y, app.focus == Focus::ConnectY),
        field_line("Timestamp", &form.timestamp, app.focus == Focus::ConnectTimestamp),
        field_line("Keepalive", keepalive, app.focus == Focus::ConnectKeepalive),
        Line::from(Span::styled(
            format!("  {}", button),
            Style::default().fg(if form.busy { Color::DarkGray } else { Color::White }),
        )),
        status_line(&form.status),
    ];

    let widget = Paragraph::new(lines).block(
        Block::default()
            .title(" Manual Connect ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(widget, area);
}

fn draw_map(f: &mut Frame, area: Rect, app: &mut App) {
    let title = match &app.selection {
        Some(sel) => format!(" Live Map 0-{} · click ({}, {}) ", PLANE_MAX as i32, sel.x, sel.y),
        None => format!(" Live Map 0-{} · click to set connect coords ", PLANE_MAX as i32),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));
    app.map_area = Some(block.inner(area));

    // Collect marker coordinates per class; canvas y grows upward while the
    // plane's y grows downward, so flip at draw time.
    let mut success: Vec<(f64, f64)> = Vec::new();
    let mut handover: Vec<(f64, f64)> = Vec::new();
    let mut error: Vec<(f64, f64)> = Vec::new();
    for marker in &app.projection.markers {
        let point = (marker.x, PLANE_MAX - marker.y);
        match marker.class {
            EventClass::Success => success.push(point),
            EventClass::Handover => handover.push(point),
            EventClass::Error => error.push(point),
        }
    }

    let projection = &app.projection;
    let bts = &app.bts;

    let canvas = Canvas::default()
        .block(block)
        .x_bounds([0.0, PLANE_MAX])
        .y_bounds([0.0, PLANE_MAX])
        .paint(|ctx| {
            for path in &projection.paths {
                for pair in path.points.windows(2) {
                    ctx.draw(&CanvasLine {
                        x1: pair[0].0,
                        y1: PLANE_MAX - pair[0].1,
                        x2: pair[1].0,
                        y2: PLANE_MAX - pair[1].1,
                        color: PATH_COLOR,
                    });
                }
            }

            ctx.draw(&Points { coords: &success, color: class_color(EventClass::Success) });
            ctx.draw(&Points { coords: &handover, color: class_color(EventClass::Handover) });
            ctx.draw(&Points { coords: &error, color: class_color(EventClass::Error) });

            for location in bts {
                ctx.print(
                    location.x,
                    PLANE_MAX - location.y,
                    Line::from(Span::styled(
                        format!("▲{}", location.bts_id),
                        Style::default().fg(BTS_COLOR),
                    )),
                );
            }
        });

    f.render_widget(canvas, area);
}

fn draw_feed(f: &mut Frame, area: Rect, app: &App) {
    let visible = area.height.saturating_sub(2) as usize;
    let events = app.log.events();
    let tail = &events[events.len().saturating_sub(visible)..];

    let items: Vec<ListItem> = tail
        .iter()
        .map(|event| {
            let class = event.class();
            let tag = match class {
                EventClass::Error => "ERROR",
                EventClass::Handover => "HANDOVER",
                EventClass::Success => "SUCCESS",
            };
            let detail = match class {
                EventClass::Error => {
                    event.response.error.as_deref().unwrap_or("").to_string()
                }
                _ => event
                    .response
                    .detail
                    .as_deref()
                    .unwrap_or("Action completed")
                    .to_string(),
            };

            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("[{} UTC] ", event.timestamp),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("IMEI: {} ", event.imei),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw(format!("({}, {}) ", event.x, event.y)),
                Span::styled(tag, Style::default().fg(class_color(class))),
                Span::styled(format!(" {}", detail), Style::default().fg(Color::Gray)),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(format!(" Live Event Feed ({}) ", app.log.len()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );
    f.render_widget(list, area);
}
