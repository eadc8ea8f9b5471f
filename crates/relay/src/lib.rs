//! On-Air CORS relay.
//!
//! Each route is a stateless pass-through to one fixed upstream path:
//! whitelisted query parameters are forwarded, upstream status and body are
//! mirrored, permissive cross-origin headers are added. Mounted under `/api`.

#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use metrics::{counter, histogram};
use onair_api::{DEFAULT_UPSTREAM, EVENTS_BY_TYPE, NOW_ON_AIR, SPOTS_ALL};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

pub const ALLOW_METHODS: &str = "GET,OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";
pub const DEFAULT_BIND: &str = "127.0.0.1:8787";

/// One pass-through endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayRoute {
    /// Upstream path; the relay serves it at `/api` + path.
    pub path: &'static str,
    /// Query parameters forwarded, in this order.
    pub params: &'static [&'static str],
}

impl RelayRoute {
    pub fn mount_path(&self) -> String { format!("/api{}", self.path) }

    fn label(&self) -> &'static str { self.path.trim_start_matches('/') }
}

pub const ROUTES: &[RelayRoute] = &[
    RelayRoute { path: NOW_ON_AIR, params: &[] },
    RelayRoute { path: EVENTS_BY_TYPE, params: &["type", "limit", "order"] },
    RelayRoute { path: SPOTS_ALL, params: &["page", "limit"] },
];

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub upstream: String,
    pub timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self { Self { upstream: DEFAULT_UPSTREAM.to_string(), timeout: Duration::from_secs(10) } }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("http client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: std::io::Error },
    #[error("serve: {0}")]
    Serve(std::io::Error),
}

#[derive(Clone)]
struct RelayState {
    client: reqwest::Client,
    upstream: String,
}

/// Parameters to forward: whitelisted, first occurrence, non-empty only.
pub fn forward_query(route: &RelayRoute, params: &[(String, String)]) -> Vec<(&'static str, String)> {
    route
        .params
        .iter()
        .filter_map(|name| {
            params
                .iter()
                .find(|(k, _)| k == name)
                .filter(|(_, v)| !v.is_empty())
                .map(|(_, v)| (*name, v.clone()))
        })
        .collect()
}

pub fn router(cfg: &RelayConfig) -> Result<Router, RelayError> {
    let client = reqwest::Client::builder().timeout(cfg.timeout).build()?;
    let state = RelayState { client, upstream: cfg.upstream.trim_end_matches('/').to_string() };
    let mut app: Router<RelayState> = Router::new();
    for route in ROUTES {
        app = app.route(
            &route.mount_path(),
            any(move |State(st): State<RelayState>, method: Method, Query(params): Query<Vec<(String, String)>>| {
                handle(st, route, method, params)
            }),
        );
    }
    Ok(app.layer(TraceLayer::new_for_http()).with_state(state))
}

async fn handle(st: RelayState, route: &'static RelayRoute, method: Method, params: Vec<(String, String)>) -> Response {
    match method {
        Method::OPTIONS => preflight(),
        Method::GET => pass_through(&st, route, &params).await,
        other => {
            debug!(route = route.label(), method = %other, "relay: method not allowed");
            (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, HeaderValue::from_static(ALLOW_METHODS))]).into_response()
        }
    }
}

fn preflight() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
            (header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS)),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS)),
        ],
    )
        .into_response()
}

async fn pass_through(st: &RelayState, route: &'static RelayRoute, params: &[(String, String)]) -> Response {
    let t0 = Instant::now();
    let label = route.label();
    counter!("relay_requests_total", 1, "route" => label);
    let query = forward_query(route, params);
    let url = format!("{}{}", st.upstream, route.path);
    let result = upstream_get(&st.client, &url, &query).await;
    histogram!("relay_ms", t0.elapsed().as_secs_f64() * 1000.0, "route" => label);
    match result {
        Ok((status, content_type, body)) => {
            debug!(route = label, status = status.as_u16(), bytes = body.len(), took_ms = %t0.elapsed().as_millis(), "relay: upstream answered");
            (
                status,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
                    (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
                ],
                body,
            )
                .into_response()
        }
        Err(e) => {
            counter!("relay_upstream_fail_total", 1, "route" => label);
            warn!(route = label, error = %e, took_ms = %t0.elapsed().as_millis(), "relay: upstream unreachable");
            bad_gateway(&e.to_string())
        }
    }
}

async fn upstream_get(
    client: &reqwest::Client,
    url: &str,
    query: &[(&'static str, String)],
) -> Result<(StatusCode, HeaderValue, Vec<u8>), reqwest::Error> {
    let mut req = client.get(url);
    if !query.is_empty() {
        req = req.query(query);
    }
    let resp = req.send().await?;
    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));
    let body = resp.bytes().await?;
    Ok((status, content_type, body.to_vec()))
}

pub fn bad_gateway(detail: &str) -> Response {
    let body = serde_json::json!({ "error": "Bad Gateway", "detail": detail }).to_string();
    (StatusCode::BAD_GATEWAY, [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))], body).into_response()
}

/// Bind and serve until Ctrl-C.
pub async fn serve(cfg: RelayConfig, bind: SocketAddr) -> Result<(), RelayError> {
    let app = router(&cfg)?;
    let listener = TcpListener::bind(bind).await.map_err(|source| RelayError::Bind { addr: bind, source })?;
    info!(addr = %bind, upstream = %cfg.upstream, routes = ROUTES.len(), "relay: listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(RelayError::Serve)?;
    info!("relay: stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "relay: ctrl-c handler failed; shutting down");
    }
}
