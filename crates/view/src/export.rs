//! CSV export of the full fetched event set.

#![forbid(unsafe_code)]

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use onair_core::columns::{event_columns, raw_cells};
use onair_core::{time, Event, EventKind};
use tracing::info;

fn needs_quotes(s: &str) -> bool { s.contains(&[',', '"', '\n'][..]) }

/// Quote a field when it carries a comma, a quote or a newline.
pub fn csv_field(s: &str) -> Cow<'_, str> {
    if needs_quotes(s) {
        Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(s)
    }
}

/// Header plus one line per event, in fetch order; no trailing newline.
pub fn to_csv(events: &[Event]) -> String {
    let header: Vec<&str> = event_columns().iter().map(|c| c.csv_name).collect();
    let mut lines = Vec::with_capacity(events.len() + 1);
    lines.push(header.join(","));
    for e in events {
        let row: Vec<Cow<'_, str>> = raw_cells(e).iter().map(|v| csv_field(v)).collect();
        lines.push(row.join(","));
    }
    lines.join("\n")
}

pub fn export_file_name(kind: &EventKind, unix_millis: i64) -> String {
    format!("events_{}_{}.csv", kind.as_str().to_lowercase(), unix_millis)
}

/// Write the export into `dir` and return the file path.
pub fn write_export(dir: &Path, kind: &EventKind, events: &[Event]) -> std::io::Result<PathBuf> {
    let path = dir.join(export_file_name(kind, time::unix_millis()));
    std::fs::write(&path, to_csv(events))?;
    info!(path = %path.display(), rows = events.len(), "export: csv written");
    Ok(path)
}
