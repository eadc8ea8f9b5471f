//! On-Air render layer.
//!
//! Pure projections of the view state: the events table (sorted copy, then
//! one page of it) and the now-playing panel. Formatting into text lives in
//! `text`, CSV export in `export`.

#![forbid(unsafe_code)]

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use onair_core::columns::ColumnSpec;
use onair_core::{time, Event, NowPlaying, Order, PageState, SortKey, SortSpec};
use serde::Serialize;

pub mod export;
pub mod text;

pub const NO_DATA: &str = "No data";
pub const UNTITLED: &str = "(untitled)";
pub const NEVER: &str = "—";

/// Compare two events by one column, ascending.
pub fn compare(key: SortKey, a: &Event, b: &Event) -> Ordering {
    match key {
        SortKey::PlayTime => time::sort_millis(&a.play_time).cmp(&time::sort_millis(&b.play_time)),
        _ => key.value(a).cmp(key.value(b)),
    }
}

/// Sorted view over `events`; the input is left untouched and ties keep their
/// original relative order in both directions.
pub fn sort_events<'a>(events: &'a [Event], sort: &SortSpec) -> Vec<&'a Event> {
    let mut rows: Vec<&Event> = events.iter().collect();
    let key = sort.key;
    match sort.direction {
        Order::Asc => rows.sort_by(|a, b| compare(key, a, b)),
        Order::Desc => rows.sort_by(|a, b| compare(key, b, a)),
    }
    rows
}

/// One rendered page of the events table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventsView<'a> {
    pub total: usize,
    /// Page actually shown, clamped into `[1, page_count]`.
    pub page: usize,
    pub page_count: usize,
    pub rows: Vec<&'a Event>,
}

impl EventsView<'_> {
    pub fn is_empty(&self) -> bool { self.total == 0 }

    pub fn total_label(&self) -> String {
        match self.total {
            1 => "1 event".to_string(),
            n => format!("{n} events"),
        }
    }

    pub fn page_label(&self) -> String { format!("{}/{}", self.page, self.page_count) }
}

pub fn project_events<'a>(events: &'a [Event], sort: &SortSpec, page: &PageState) -> EventsView<'a> {
    let total = events.len();
    let page_count = page.page_count(total);
    let current = page.clamped_page(total);
    if total == 0 {
        return EventsView { total, page: current, page_count, rows: Vec::new() };
    }
    let size = page.page_size.max(1);
    let start = size.saturating_mul(current - 1).min(total);
    let end = size.saturating_mul(current).min(total);
    let rows = sort_events(events, sort).drain(start..end).collect();
    EventsView { total, page: current, page_count, rows }
}

/// Header text with the sort arrow on the active column.
pub fn header_label(col: &ColumnSpec, sort: &SortSpec) -> String {
    if col.key != sort.key {
        return col.label.to_string();
    }
    match sort.direction {
        Order::Asc => format!("{} ↑", col.label),
        Order::Desc => format!("{} ↓", col.label),
    }
}

/// The now-playing panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NowPlayingView {
    pub has_data: bool,
    pub title: String,
    pub artist: String,
    pub event_type: String,
    pub play_time: String,
    pub updated: String,
    /// Always 0: the upstream exposes no elapsed/remaining time.
    pub progress: f64,
}

pub fn project_now_playing(np: Option<&NowPlaying>, last_fetched_at: Option<&DateTime<Utc>>) -> NowPlayingView {
    let updated = last_fetched_at.map(time::format_instant).unwrap_or_else(|| NEVER.to_string());
    match np {
        None => NowPlayingView {
            has_data: false,
            title: NO_DATA.to_string(),
            artist: String::new(),
            event_type: String::new(),
            play_time: String::new(),
            updated,
            progress: 0.0,
        },
        Some(np) => NowPlayingView {
            has_data: true,
            title: if np.title.is_empty() { UNTITLED.to_string() } else { np.title.clone() },
            artist: np.artist.clone(),
            event_type: np.event_type.clone(),
            play_time: time::format_local(&np.play_time),
            updated,
            progress: 0.0,
        },
    }
}
