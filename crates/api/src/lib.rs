//! On-Air relay client façade.
//!
//! This crate defines the single fetch operation the dashboard core depends on,
//! plus decoders for the three upstream feeds. Implementations: `HttpApi`
//! (reqwest, relay-prefixed or direct upstream) and `MockApi` for tests.

#![forbid(unsafe_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use onair_core::{Event, Filter, NowPlaying};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_UPSTREAM: &str = "https://rbs.elektranbroadcast.com";

pub const NOW_ON_AIR: &str = "/now-on-air";
pub const EVENTS_BY_TYPE: &str = "/events/by-type";
pub const SPOTS_ALL: &str = "/stats/spots/all";

/// Fetch failures. Every variant is treated the same by the poller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum FetchError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("HTTP {status} {reason} - {body}")]
    Status { status: u16, reason: String, body: String },
    #[error("parse: {0}")]
    Parse(String),
}

pub type FetchResult<T> = Result<T, FetchError>;

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(serde_json::Value),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl FetchResponse {
    pub fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".into(), "application/json".into())],
            body: Body::Json(value),
        }
    }

    pub fn text(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            headers: vec![("content-type".into(), "text/plain".into())],
            body: Body::Text(text.into()),
        }
    }

    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }
}

/// Where requests go: through a relay (paths under `/api`) or straight to the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseUrl {
    Relay(String),
    Direct(String),
}

impl BaseUrl {
    /// Relay mode wins when a relay origin is configured.
    pub fn from_options(relay: Option<String>, upstream: String) -> Self {
        match relay.filter(|r| !r.trim().is_empty()) {
            Some(r) => Self::Relay(r),
            None => Self::Direct(upstream),
        }
    }

    pub fn url_for(&self, path: &str) -> String {
        match self {
            Self::Relay(origin) => format!("{}/api{}", origin.trim_end_matches('/'), path),
            Self::Direct(origin) => format!("{}{}", origin.trim_end_matches('/'), path),
        }
    }
}

impl Default for BaseUrl {
    fn default() -> Self { Self::Direct(DEFAULT_UPSTREAM.to_string()) }
}

fn parse_err(e: serde_json::Error) -> FetchError { FetchError::Parse(e.to_string()) }

fn body_value(body: Body) -> FetchResult<Option<serde_json::Value>> {
    match body {
        Body::Json(v) => Ok(Some(v)),
        Body::Text(t) if t.trim().is_empty() => Ok(None),
        Body::Text(t) => serde_json::from_str(&t).map(Some).map_err(parse_err),
    }
}

/// Now-on-air body: an object, or `null`/empty for nothing airing.
pub fn decode_now_playing(body: Body) -> FetchResult<Option<NowPlaying>> {
    match body_value(body)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v @ serde_json::Value::Object(_)) => serde_json::from_value(v).map(Some).map_err(parse_err),
        Some(other) => Err(FetchError::Parse(format!("now-on-air: expected object, got {}", json_kind(&other)))),
    }
}

/// Events body: a JSON array, or an object carrying an `items` array. `null` is no events.
pub fn decode_events(body: Body) -> FetchResult<Vec<Event>> {
    match body_value(body)? {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(v @ serde_json::Value::Array(_)) => serde_json::from_value(v).map_err(parse_err),
        Some(serde_json::Value::Object(mut obj)) => match obj.remove("items") {
            Some(items @ serde_json::Value::Array(_)) => serde_json::from_value(items).map_err(parse_err),
            _ => Err(FetchError::Parse("events: object without an items array".into())),
        },
        Some(other) => Err(FetchError::Parse(format!("events: expected array, got {}", json_kind(&other)))),
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn spots_query(page: Option<u32>, limit: Option<u32>) -> Vec<(&'static str, String)> {
    let mut q = Vec::new();
    if let Some(p) = page { q.push(("page", p.to_string())); }
    if let Some(l) = limit { q.push(("limit", l.to_string())); }
    q
}

/// Relay client surface consumed by the poller and the CLI.
#[async_trait::async_trait]
pub trait RelayApi: Send + Sync {
    /// GET `path` with `query`; non-2xx answers are returned as `FetchError::Status`.
    async fn fetch(&self, path: &str, query: &[(&str, String)]) -> FetchResult<FetchResponse>;

    async fn now_playing(&self) -> FetchResult<Option<NowPlaying>> {
        let resp = self.fetch(NOW_ON_AIR, &[]).await?;
        decode_now_playing(resp.body)
    }

    async fn events(&self, filter: &Filter) -> FetchResult<Vec<Event>> {
        let query = filter.query();
        let resp = self.fetch(EVENTS_BY_TYPE, &query).await?;
        decode_events(resp.body)
    }

    /// Raw spot statistics; the payload shape is passed through untouched.
    async fn spot_stats(&self, page: Option<u32>, limit: Option<u32>) -> FetchResult<serde_json::Value> {
        let query = spots_query(page, limit);
        let resp = self.fetch(SPOTS_ALL, &query).await?;
        Ok(body_value(resp.body)?.unwrap_or(serde_json::Value::Null))
    }
}

fn ensure_success(resp: FetchResponse) -> FetchResult<FetchResponse> {
    if resp.is_success() {
        return Ok(resp);
    }
    let body = match &resp.body {
        Body::Json(v) => v.to_string(),
        Body::Text(t) => t.clone(),
    };
    let reason = reqwest::StatusCode::from_u16(resp.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
        .to_string();
    Err(FetchError::Status { status: resp.status, reason, body })
}

// ----------------- HTTP implementation -----------------

/// reqwest-backed client.
pub struct HttpApi {
    client: reqwest::Client,
    base: BaseUrl,
}

impl HttpApi {
    pub fn new(base: BaseUrl, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }
}

#[async_trait::async_trait]
impl RelayApi for HttpApi {
    async fn fetch(&self, path: &str, query: &[(&str, String)]) -> FetchResult<FetchResponse> {
        let t0 = Instant::now();
        let url = self.base.url_for(path);
        let mut req = self.client.get(&url);
        if !query.is_empty() {
            req = req.query(query);
        }
        let resp = req.send().await.map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let headers: Vec<(String, String)> = resp
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();
        let bytes = resp.bytes().await.map_err(|e| FetchError::Transport(e.to_string()))?;
        let is_json = headers
            .iter()
            .any(|(k, v)| k.eq_ignore_ascii_case("content-type") && v.contains("application/json"));
        let ok = (200..300).contains(&status);
        let body = if is_json && ok {
            Body::Json(serde_json::from_slice(&bytes).map_err(parse_err)?)
        } else {
            Body::Text(String::from_utf8_lossy(&bytes).into_owned())
        };
        debug!(url = %url, status, bytes = bytes.len(), took_ms = %t0.elapsed().as_millis(), "api: fetch done");
        ensure_success(FetchResponse { status, headers, body })
    }
}

// ----------------- Mock implementation -----------------

/// A scripted reply; `delay` is awaited before answering.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub result: FetchResult<FetchResponse>,
    pub delay: Duration,
}

impl MockReply {
    pub fn ok(resp: FetchResponse) -> Self { Self { result: Ok(resp), delay: Duration::ZERO } }
    pub fn err(e: FetchError) -> Self { Self { result: Err(e), delay: Duration::ZERO } }
    pub fn after(mut self, delay: Duration) -> Self { self.delay = delay; self }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
}

/// In-memory implementation for tests. Replies are consumed in order per path;
/// the last one keeps answering once the queue is down to it.
#[derive(Default)]
pub struct MockApi {
    routes: Mutex<HashMap<String, VecDeque<MockReply>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockApi {
    pub fn new() -> Self { Self::default() }

    pub fn push(&self, path: &str, reply: MockReply) -> &Self {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        routes.entry(path.to_string()).or_default().push_back(reply);
        self
    }

    pub fn json(&self, path: &str, value: serde_json::Value) -> &Self {
        self.push(path, MockReply::ok(FetchResponse::json(200, value)))
    }

    pub fn fail(&self, path: &str, err: FetchError) -> &Self { self.push(path, MockReply::err(err)) }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }

    fn next_reply(&self, path: &str) -> Option<MockReply> {
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        let queue = routes.get_mut(path)?;
        if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() }
    }
}

#[async_trait::async_trait]
impl RelayApi for MockApi {
    async fn fetch(&self, path: &str, query: &[(&str, String)]) -> FetchResult<FetchResponse> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).push(RecordedRequest {
            path: path.to_string(),
            query: query.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        });
        let reply = self
            .next_reply(path)
            .ok_or_else(|| FetchError::Transport(format!("no mock route for {}", path)))?;
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        ensure_success(reply.result?)
    }
}
