//! On-Air core types: filter, play events, sort and page state.

#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

pub mod columns;
pub mod time;

pub const LIMIT_MIN: u32 = 1;
pub const LIMIT_MAX: u32 = 500;
pub const LIMIT_DEFAULT: u32 = 50;
pub const PAGE_SIZE_DEFAULT: usize = 25;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid order: {0} (expect asc or desc)")]
    Order(String),
    #[error("invalid sort key: {0}")]
    SortKey(String),
}

/// Kind of aired item as reported by the upstream (`SONG`, `AD`, `ID`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    Song,
    Ad,
    Id,
    Other(String),
}

impl EventKind {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s.to_ascii_uppercase().as_str() {
            "SONG" => Self::Song,
            "AD" => Self::Ad,
            "ID" => Self::Id,
            _ => Self::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Song => "SONG",
            Self::Ad => "AD",
            Self::Id => "ID",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Cycle through the well-known kinds (used by selectors).
    pub fn next(&self) -> Self {
        match self {
            Self::Song => Self::Ad,
            Self::Ad => Self::Id,
            Self::Id | Self::Other(_) => Self::Song,
        }
    }
}

impl Default for EventKind {
    fn default() -> Self { Self::Song }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl From<String> for EventKind {
    fn from(s: String) -> Self { Self::parse(&s) }
}

impl From<EventKind> for String {
    fn from(k: EventKind) -> Self { k.as_str().to_string() }
}

/// Ascending/descending; used for both the upstream `order` parameter and column sorting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

impl Order {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn flip(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Order {
    type Err = ParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ParseError::Order(s.to_string())),
        }
    }
}

/// Query used by the events feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub limit: u32,
    pub order: Order,
}

impl Default for Filter {
    fn default() -> Self {
        Self { kind: EventKind::Song, limit: LIMIT_DEFAULT, order: Order::Desc }
    }
}

impl Filter {
    /// Build a filter from raw form inputs. Unknown orders fall back to `desc`.
    pub fn from_inputs(kind: &str, limit: &str, order: &str) -> Self {
        Self {
            kind: EventKind::parse(kind),
            limit: clamp_limit(limit),
            order: order.parse().unwrap_or_default(),
        }
    }

    /// Query pairs in the order the upstream expects them.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("type", self.kind.as_str().to_string()),
            ("limit", self.limit.to_string()),
            ("order", self.order.as_str().to_string()),
        ]
    }
}

/// Parse the limit input: non-numeric or non-positive input yields the default,
/// anything else (infinity included) is clamped into `[LIMIT_MIN, LIMIT_MAX]`.
pub fn clamp_limit(input: &str) -> u32 {
    match parse_number(input) {
        Some(v) if v > 0.0 => v.clamp(LIMIT_MIN as f64, LIMIT_MAX as f64) as u32,
        _ => LIMIT_DEFAULT,
    }
}

/// Numeric text as a browser number input reads it: decimal or exponent
/// notation, `Infinity`, and unsigned `0x`/`0o`/`0b` integers.
fn parse_number(input: &str) -> Option<f64> {
    let s = input.trim();
    let radix = match s.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&s[2..], radix).ok().map(|v| v as f64);
    }
    match s {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    if s.bytes().any(|b| b.is_ascii_alphabetic() && !matches!(b, b'e' | b'E')) {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn lenient_string<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(de)?;
    Ok(match v {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// A historical play record. Missing or null fields read as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default, deserialize_with = "lenient_string")]
    pub play_time: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub event_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub artist: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub filename: String,
}

/// The currently airing item; same shape as a historical event.
pub type NowPlaying = Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    PlayTime,
    EventType,
    Artist,
    Title,
    Filename,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [Self::PlayTime, Self::EventType, Self::Artist, Self::Title, Self::Filename];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PlayTime => "play_time",
            Self::EventType => "event_type",
            Self::Artist => "artist",
            Self::Title => "title",
            Self::Filename => "filename",
        }
    }

    pub fn value(self, e: &Event) -> &str {
        match self {
            Self::PlayTime => &e.play_time,
            Self::EventType => &e.event_type,
            Self::Artist => &e.artist,
            Self::Title => &e.title,
            Self::Filename => &e.filename,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for SortKey {
    type Err = ParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "play_time" | "time" => Ok(Self::PlayTime),
            "event_type" | "type" => Ok(Self::EventType),
            "artist" => Ok(Self::Artist),
            "title" => Ok(Self::Title),
            "filename" => Ok(Self::Filename),
            _ => Err(ParseError::SortKey(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: Order,
}

impl Default for SortSpec {
    fn default() -> Self { Self { key: SortKey::PlayTime, direction: Order::Desc } }
}

impl SortSpec {
    /// Column-header click: same key flips direction, a new key starts ascending.
    pub fn select(&mut self, key: SortKey) {
        if self.key == key {
            self.direction = self.direction.flip();
        } else {
            self.key = key;
            self.direction = Order::Asc;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageState {
    fn default() -> Self { Self { page: 1, page_size: PAGE_SIZE_DEFAULT } }
}

impl PageState {
    pub fn new(page_size: usize) -> Self { Self { page: 1, page_size: page_size.max(1) } }

    /// `ceil(total / page_size)`, never below 1.
    pub fn page_count(&self, total: usize) -> usize {
        let size = self.page_size.max(1);
        total.div_ceil(size).max(1)
    }

    pub fn clamped_page(&self, total: usize) -> usize { self.page.clamp(1, self.page_count(total)) }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Offline,
    Connected,
    Reconnecting,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Independently polled store fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    NowPlaying,
    Events,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NowPlaying => "now_playing",
            Self::Events => "events",
        }
    }
}

pub mod prelude {
    pub use super::{
        ConnectionStatus, Event, EventKind, Field, Filter, NowPlaying, Order, PageState, SortKey, SortSpec,
    };
}
