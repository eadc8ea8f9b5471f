#![forbid(unsafe_code)]

use onair_core::columns::{display_cells, event_columns};
use onair_core::ConnectionStatus;
use onair_store::ViewState;
use onair_view::{header_label, project_events, project_now_playing};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Row, Table};
use ratatui::Frame;

use crate::app::{App, FilterForm, FormField, Mode};

pub const HELP: &str = "q quit · r refresh · 1-5 sort · n/p page · +/- page size · f filter · e export";

pub fn badge_style(status: ConnectionStatus) -> Style {
    let color = match status {
        ConnectionStatus::Connected => Color::Green,
        ConnectionStatus::Reconnecting => Color::Yellow,
        ConnectionStatus::Offline => Color::DarkGray,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

pub fn draw(f: &mut Frame, state: &ViewState, app: &App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(5), Constraint::Length(1), Constraint::Length(1)])
        .split(f.size());

    draw_now_playing(f, root[0], state);
    draw_events(f, root[1], state);
    draw_status(f, root[2], state, app);
    f.render_widget(Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray)), root[3]);

    if let Mode::EditFilter(form) = &app.mode {
        draw_filter_editor(f, form);
    }
}

fn draw_now_playing(f: &mut Frame, area: Rect, state: &ViewState) {
    let view = project_now_playing(state.now_playing.as_ref(), state.last_fetched_at.as_ref());
    let block = Block::default().title(" Now playing ").borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(inner);

    let title_style = Style::default().add_modifier(Modifier::BOLD);
    let lines = if view.has_data {
        vec![
            Line::from(Span::styled(view.title.clone(), title_style)),
            Line::from(view.artist.clone()),
            Line::from(format!("[{}] {}", view.event_type, view.play_time)),
            Line::from(Span::styled(format!("updated {}", view.updated), Style::default().fg(Color::DarkGray))),
        ]
    } else {
        vec![
            Line::from(Span::styled(view.title.clone(), title_style.add_modifier(Modifier::ITALIC))),
            Line::from(Span::styled(format!("updated {}", view.updated), Style::default().fg(Color::DarkGray))),
        ]
    };
    f.render_widget(Paragraph::new(lines), parts[0]);
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(view.progress.clamp(0.0, 1.0))
        .label("progress n/a");
    f.render_widget(gauge, parts[1]);
}

fn draw_events(f: &mut Frame, area: Rect, state: &ViewState) {
    let view = project_events(&state.events, &state.sort, &state.page);
    let block = Block::default()
        .title(format!(" Events · {} · page {} ", view.total_label(), view.page_label()))
        .borders(Borders::ALL);
    if view.is_empty() {
        let empty = Paragraph::new(Span::styled("No events for this filter", Style::default().add_modifier(Modifier::ITALIC)))
            .block(block);
        f.render_widget(empty, area);
        return;
    }
    let cols = event_columns();
    let header = Row::new(cols.iter().map(|c| header_label(c, &state.sort)).collect::<Vec<_>>())
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = view.rows.iter().map(|e| Row::new(display_cells(e).to_vec())).collect();
    let widths: Vec<Constraint> = cols
        .iter()
        .map(|c| if c.key == onair_core::SortKey::Title { Constraint::Min(c.width) } else { Constraint::Length(c.width) })
        .collect();
    let table = Table::new(rows, widths).header(header).block(block).column_spacing(2);
    f.render_widget(table, area);
}

fn draw_status(f: &mut Frame, area: Rect, state: &ViewState, app: &App) {
    let filter = &state.filter;
    let mut spans = vec![
        Span::styled(format!("● {}", state.status), badge_style(state.status)),
        Span::raw(format!("  {} · limit {} · {}  · {} per page", filter.kind, filter.limit, filter.order, state.page.page_size)),
    ];
    if let Some(msg) = &app.message {
        spans.push(Span::styled(format!("  {msg}"), Style::default().fg(Color::Cyan)));
    } else if let (ConnectionStatus::Reconnecting, Some(err)) = (state.status, &state.last_error) {
        spans.push(Span::styled(format!("  {err}"), Style::default().fg(Color::DarkGray)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_filter_editor(f: &mut Frame, form: &FilterForm) {
    let area = centered(f.size(), 56, 7);
    let focused = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let field = |which: FormField, label: &str, value: String| {
        let style = if form.focus == which { focused } else { Style::default() };
        Line::from(vec![Span::raw(format!("{label:<7}")), Span::styled(value, style)])
    };
    let lines = vec![
        field(FormField::Kind, "type", form.kind.to_string()),
        field(FormField::Limit, "limit", format!("{}_", form.limit)),
        field(FormField::Order, "order", form.order.to_string()),
        Line::from(""),
        Line::from(Span::styled("tab next · space change · enter apply · esc cancel", Style::default().fg(Color::DarkGray))),
    ];
    f.render_widget(Clear, area);
    f.render_widget(Paragraph::new(lines).block(Block::default().title(" Filter ").borders(Borders::ALL)), area);
}

fn centered(outer: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(outer.width);
    let h = height.min(outer.height);
    Rect { x: outer.x + (outer.width - w) / 2, y: outer.y + (outer.height - h) / 2, width: w, height: h }
}
