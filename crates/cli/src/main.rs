use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use onair_api::{BaseUrl, HttpApi, RelayApi, DEFAULT_UPSTREAM};
use onair_core::{Filter, Order, PageState, SortKey, SortSpec};
use onair_poller::{PollConfig, Poller};
use onair_relay::RelayConfig;
use onair_store::{spawn_store, ViewState};
use onair_view::{export, project_events, project_now_playing, text};
use tokio::signal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "onairctl", version, about = "On-Air relay and telemetry CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Station API origin
    #[arg(long, env = "ONAIR_UPSTREAM", global = true, default_value = DEFAULT_UPSTREAM)]
    upstream: String,

    /// Relay origin; when set, requests go to <relay>/api/...
    #[arg(long = "relay-url", env = "ONAIR_RELAY_URL", global = true)]
    relay_url: Option<String>,

    /// Per-request timeout
    #[arg(long = "timeout-ms", env = "ONAIR_HTTP_TIMEOUT_MS", global = true, default_value_t = 10_000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

/// Raw filter inputs; the limit is clamped the same way the dashboard does it.
#[derive(Args, Debug, Clone)]
struct FilterArgs {
    /// Event type (SONG, AD, ID, ...)
    #[arg(long = "type", default_value = "SONG")]
    kind: String,
    /// 1..=500; anything unparsable or non-positive means 50
    #[arg(long, default_value = "50", allow_hyphen_values = true)]
    limit: String,
    /// asc or desc
    #[arg(long, default_value = "desc")]
    order: String,
}

impl FilterArgs {
    fn filter(&self) -> Filter { Filter::from_inputs(&self.kind, &self.limit, &self.order) }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the CORS relay endpoints under /api
    Relay {
        #[arg(long, env = "ONAIR_BIND", default_value = onair_relay::DEFAULT_BIND)]
        bind: SocketAddr,
    },
    /// Show what is on air now
    Now,
    /// List recent events, sorted and paginated
    Events {
        #[command(flatten)]
        filter: FilterArgs,
        /// Column to sort by (time, type, artist, title, filename)
        #[arg(long, default_value = "play_time")]
        sort: SortKey,
        /// Sort direction
        #[arg(long = "sort-order", default_value = "desc")]
        sort_order: Order,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long = "page-size", env = "ONAIR_PAGE_SIZE", default_value_t = onair_core::PAGE_SIZE_DEFAULT)]
        page_size: usize,
    },
    /// Advertisement spot statistics
    Spots {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Fetch events and write them as CSV
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        /// Target directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Poll both feeds and print every change until Ctrl-C
    Watch {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long = "now-ms", env = "ONAIR_NOW_MS", default_value_t = 3000)]
        now_ms: u64,
        #[arg(long = "events-ms", env = "ONAIR_EVENTS_MS", default_value_t = 7000)]
        events_ms: u64,
        #[arg(long = "page-size", env = "ONAIR_PAGE_SIZE", default_value_t = onair_core::PAGE_SIZE_DEFAULT)]
        page_size: usize,
    },
}

fn init_tracing() {
    let env = std::env::var("ONAIR_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("ONAIR_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid ONAIR_METRICS_ADDR; expected host:port");
        }
    }
}

impl Cli {
    fn base(&self) -> BaseUrl { BaseUrl::from_options(self.relay_url.clone(), self.upstream.clone()) }

    fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms.max(1)) }

    fn client(&self) -> Result<HttpApi> { HttpApi::new(self.base(), self.timeout()).context("building http client") }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Relay { bind } => {
            info!(bind = %bind, upstream = %cli.upstream, "relay invoked");
            let cfg = RelayConfig { upstream: cli.upstream.clone(), timeout: cli.timeout() };
            onair_relay::serve(cfg, *bind).await?;
        }
        Commands::Now => {
            let api = cli.client()?;
            let np = api.now_playing().await.map_err(|e| {
                error!(error = %e, "now-on-air fetch failed");
                e
            })?;
            match cli.output {
                Output::Human => {
                    let view = project_now_playing(np.as_ref(), Some(&chrono::Utc::now()));
                    println!("{}", text::render_now_playing(&view));
                }
                Output::Json => print_json(&np)?,
            }
        }
        Commands::Events { filter, sort, sort_order, page, page_size } => {
            let filter = filter.filter();
            info!(kind = %filter.kind, limit = filter.limit, order = %filter.order, "events invoked");
            let api = cli.client()?;
            let events = api.events(&filter).await.context("fetching events")?;
            let sort = SortSpec { key: *sort, direction: *sort_order };
            let page = PageState { page: (*page).max(1), page_size: (*page_size).max(1) };
            let view = project_events(&events, &sort, &page);
            match cli.output {
                Output::Human => println!("{}", text::render_events(&view, &sort)),
                Output::Json => print_json(&view)?,
            }
        }
        Commands::Spots { page, limit } => {
            let api = cli.client()?;
            let stats = api.spot_stats(*page, *limit).await.context("fetching spot statistics")?;
            match cli.output {
                Output::Human => println!("{}", summarize_spots(&stats)),
                Output::Json => print_json(&stats)?,
            }
        }
        Commands::Export { filter, dir } => {
            let filter = filter.filter();
            let api = cli.client()?;
            let events = api.events(&filter).await.context("fetching events")?;
            let path = export::write_export(dir, &filter.kind, &events)
                .with_context(|| format!("writing export into {}", dir.display()))?;
            match cli.output {
                Output::Human => println!("{} ({} rows)", path.display(), events.len()),
                Output::Json => print_json(&serde_json::json!({ "path": path, "rows": events.len() }))?,
            }
        }
        Commands::Watch { filter, now_ms, events_ms, page_size } => {
            let api: Arc<dyn RelayApi> = Arc::new(cli.client()?);
            let mut initial = ViewState::new(*page_size);
            initial.filter = filter.filter();
            let store = spawn_store(initial, 256);
            let mut poller = Poller::new(api, store.clone(), PollConfig::from_millis(*now_ms, *events_ms));
            let mut epoch = store.subscribe_epoch();
            info!(now_ms, events_ms, "watch invoked");
            poller.start();
            loop {
                tokio::select! {
                    changed = epoch.changed() => {
                        if changed.is_err() { break; }
                        print_snapshot(&store.current(), cli.output)?;
                    }
                    _ = signal::ctrl_c() => {
                        info!("Ctrl-C received; stopping watch");
                        break;
                    }
                }
            }
            poller.stop();
        }
    }

    Ok(())
}

fn print_snapshot(state: &ViewState, output: Output) -> Result<()> {
    let view = project_events(&state.events, &state.sort, &state.page);
    match output {
        Output::Human => {
            let np = project_now_playing(state.now_playing.as_ref(), state.last_fetched_at.as_ref());
            println!("── {} ──", state.status);
            println!("{}", text::render_now_playing(&np));
            println!("{}", text::render_events(&view, &state.sort));
        }
        Output::Json => {
            let line = serde_json::json!({
                "status": state.status,
                "now_playing": state.now_playing,
                "last_error": state.last_error,
                "events": view,
            });
            println!("{line}");
        }
    }
    Ok(())
}

/// Short human summary of the spot-statistics payload, whose shape the CLI does not assume.
fn summarize_spots(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "no spot statistics".to_string(),
        serde_json::Value::Array(items) => format!("{} entries", items.len()),
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(k, v)| match v {
                serde_json::Value::Array(a) => format!("{k}: {} entries", a.len()),
                serde_json::Value::Object(o) => format!("{k}: {} fields", o.len()),
                serde_json::Value::String(s) => format!("{k}: {s}"),
                other => format!("{k}: {other}"),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}
