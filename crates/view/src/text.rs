//! Plain-text rendering used by the CLI.

#![forbid(unsafe_code)]

use onair_core::columns::{display_cells, event_columns};
use onair_core::SortSpec;

use crate::{header_label, EventsView, NowPlayingView};

/// Pad or cut `s` to exactly `width` characters.
pub fn fit(s: &str, width: usize) -> String {
    let n = s.chars().count();
    if n <= width {
        let mut out = s.to_string();
        out.extend(std::iter::repeat(' ').take(width - n));
        return out;
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(width - 1).collect();
    out.push('…');
    out
}

pub fn render_events(view: &EventsView<'_>, sort: &SortSpec) -> String {
    if view.is_empty() {
        return "No events".to_string();
    }
    let cols = event_columns();
    let mut lines = Vec::with_capacity(view.rows.len() + 2);
    let header: Vec<String> = cols.iter().map(|c| fit(&header_label(c, sort), c.width as usize)).collect();
    lines.push(header.join("  ").trim_end().to_string());
    for e in &view.rows {
        let cells = display_cells(e);
        let row: Vec<String> = cols.iter().zip(cells.iter()).map(|(c, v)| fit(v, c.width as usize)).collect();
        lines.push(row.join("  ").trim_end().to_string());
    }
    lines.push(format!("{} · page {}", view.total_label(), view.page_label()));
    lines.join("\n")
}

pub fn render_now_playing(view: &NowPlayingView) -> String {
    if !view.has_data {
        return format!("{}\nupdated: {}", view.title, view.updated);
    }
    let mut out = view.title.clone();
    if !view.artist.is_empty() {
        out.push_str(" — ");
        out.push_str(&view.artist);
    }
    out.push_str(&format!("\n[{}] {}\nupdated: {}", view.event_type, view.play_time, view.updated));
    out
}
