//! Columns of the events table.
//!
//! This module provides:
//! - Column specs (sort key, header label, CSV name, width)
//! - A projector turning an `Event` into display cells

#![forbid(unsafe_code)]

use crate::{time, Event, SortKey};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    pub key: SortKey,
    pub label: &'static str,
    /// Header used in CSV exports.
    pub csv_name: &'static str,
    pub width: u16,
}

fn col(key: SortKey, label: &'static str, csv_name: &'static str, width: u16) -> ColumnSpec {
    ColumnSpec { key, label, csv_name, width }
}

/// Columns in display order: time, type, artist, title, filename.
pub fn event_columns() -> Vec<ColumnSpec> {
    SortKey::ALL.iter().map(|k| column_for(*k)).collect()
}

pub fn column_for(key: SortKey) -> ColumnSpec {
    match key {
        SortKey::PlayTime => col(key, "Time", "time", 20),
        SortKey::EventType => col(key, "Type", "type", 6),
        SortKey::Artist => col(key, "Artist", "artist", 24),
        SortKey::Title => col(key, "Title", "title", 32),
        SortKey::Filename => col(key, "Filename", "filename", 24),
    }
}

/// Display cells for one event, in `event_columns()` order. Play time is shown in local time.
pub fn display_cells(e: &Event) -> [String; 5] {
    [
        time::format_local(&e.play_time),
        e.event_type.clone(),
        e.artist.clone(),
        e.title.clone(),
        e.filename.clone(),
    ]
}

/// Raw cells for exports, in `event_columns()` order.
pub fn raw_cells(e: &Event) -> [&str; 5] {
    [&e.play_time, &e.event_type, &e.artist, &e.title, &e.filename]
}
