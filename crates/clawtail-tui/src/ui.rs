//! Dashboard rendering.
//!
//! A pure function of the app state and terminal size. Layout, top to
//! bottom: header/help line, status line, counter summary, the two
//! group panels, and a footer with buffer occupancy. Every line is
//! clipped to the available width; ratatui clips to the area bounds,
//! so drawing can never write outside the terminal.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use unicode_width::UnicodeWidthChar;

use crate::app::App;
use crate::store::BoundedBuffer;

const HEADER_STYLE: Style = Style::new().fg(Color::Cyan).add_modifier(Modifier::BOLD);
const MUTED: Style = Style::new().fg(Color::DarkGray);
const OK: Style = Style::new().fg(Color::Green);
const WARN_STYLE: Style = Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD);
const ERROR_STYLE: Style = Style::new().fg(Color::Red).add_modifier(Modifier::BOLD);

/// Render the entire dashboard.
pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header / help
            Constraint::Length(1), // status
            Constraint::Length(4), // counter summary
            Constraint::Min(4),    // group panels
            Constraint::Length(1), // footer
        ])
        .split(frame.area());

    draw_header(frame, chunks[0]);
    draw_status(frame, app, chunks[1]);
    draw_summary(frame, app, chunks[2]);
    draw_panels(frame, app, chunks[3]);
    draw_footer(frame, app, chunks[4]);
}

fn draw_header(frame: &mut Frame, area: Rect) {
    let header = "clawtail  |  q: quit  r: clear  p: pause/resume parsing";
    frame.render_widget(Paragraph::new(Span::styled(header, HEADER_STYLE)), area);
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let paused = if app.paused { " [paused]" } else { "" };
    let status = format!(
        "status={} lines={} parsed={} runtime={}s{} cmd={}",
        app.status_label(),
        app.store.total_lines,
        app.store.parsed_lines,
        app.runtime_secs(),
        paused,
        app.source_desc,
    );
    let clipped = clip(&status, area.width as usize);
    frame.render_widget(Paragraph::new(Span::styled(clipped, MUTED)), area);
}

fn draw_summary(frame: &mut Frame, app: &App, area: Rect) {
    let ctr = &app.store.counters;
    let lines = vec![
        Line::from(Span::styled("Summary", HEADER_STYLE)),
        Line::from(Span::styled(
            format!(
                "LLM req={} lastMessages={} avgMessages={:.1}  Summary ok={} fail={}",
                ctr.llm_req, ctr.llm_messages, ctr.llm_avg, ctr.summary_ok, ctr.summary_fail,
            ),
            OK,
        )),
        Line::from(Span::styled(
            format!(
                "Cache req={} msg={} tool={} reqPct={:.1}%  totalTool={}/{} totalPct={:.1}%",
                ctr.cache_req,
                ctr.cache_messages,
                ctr.cache_tool_result,
                ctr.cache_req_pct,
                ctr.cache_total_tool_result,
                ctr.cache_total_messages,
                ctr.cache_total_pct,
            ),
            OK,
        )),
        Line::from(Span::styled(
            format!(
                "Cache provider={} model={} session={} ts={}",
                ctr.cache_provider, ctr.cache_model, ctr.cache_session, ctr.cache_ts,
            ),
            MUTED,
        )),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn draw_panels(frame: &mut Frame, app: &App, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let recent = app.display.recent_per_panel;
    draw_panel(
        frame,
        halves[0],
        &app.display.primary_label,
        recent,
        &app.store.primary,
    );
    draw_panel(
        frame,
        halves[1],
        &app.display.secondary_label,
        recent,
        &app.store.secondary,
    );
}

/// One scrolling panel: the latest `recent` formatted events, newest
/// at the bottom, each colored by its severity prefix.
fn draw_panel(
    frame: &mut Frame,
    area: Rect,
    label: &str,
    recent: usize,
    buffer: &BoundedBuffer<String>,
) {
    let block = Block::default()
        .title(format!(" {label} (latest {recent}) "))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(MUTED)
        .title_style(HEADER_STYLE);

    let inner_width = area.width.saturating_sub(2) as usize;
    let lines: Vec<Line> = buffer
        .recent(recent)
        .map(|item| Line::from(Span::styled(clip(item, inner_width), event_style(item))))
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let footer = format!(
        "{} events={}  {} events={}  warnings={}  raw={}",
        app.display.primary_label,
        app.store.primary.len(),
        app.display.secondary_label,
        app.store.secondary.len(),
        app.store.warnings.len(),
        app.store.raw.len(),
    );
    let clipped = clip(&footer, area.width as usize);
    frame.render_widget(Paragraph::new(Span::styled(clipped, MUTED)), area);
}

/// Severity coloring keyed off the formatted prefix.
fn event_style(item: &str) -> Style {
    if item.starts_with("[SUM-]") || item.starts_with("[LOG] ERROR") {
        ERROR_STYLE
    } else if item.starts_with("[LOG] WARN") {
        WARN_STYLE
    } else if item.starts_with("[RAW]") {
        MUTED
    } else {
        OK
    }
}

/// Clip a string to `width` display columns, with a `...` marker when
/// something was cut. Unicode-aware so wide glyphs never overflow.
fn clip(text: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    if display_width(text) <= width {
        return text.to_owned();
    }
    if width <= 3 {
        return take_width(text, width);
    }
    format!("{}...", take_width(text, width - 3))
}

fn display_width(s: &str) -> usize {
    s.chars().map(|c| c.width().unwrap_or(0)).sum()
}

/// Longest prefix fitting in `width` display columns.
fn take_width(s: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out
}
