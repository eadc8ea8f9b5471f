//! On-Air polling engine.
//!
//! Two loops, one per feed. Each fires immediately, then on its own interval,
//! and also whenever the store raises the matching trigger. Every firing
//! spawns an independent fetch (requests may overlap) tagged with a per-feed
//! sequence number; the store drops results older than the newest applied.

#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use onair_api::RelayApi;
use onair_core::Field;
use onair_store::{StoreHandle, Update};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub const NOW_PLAYING_EVERY: Duration = Duration::from_millis(3000);
pub const EVENTS_EVERY: Duration = Duration::from_millis(7000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub now_every: Duration,
    pub events_every: Duration,
}

impl Default for PollConfig {
    fn default() -> Self { Self { now_every: NOW_PLAYING_EVERY, events_every: EVENTS_EVERY } }
}

impl PollConfig {
    pub fn from_millis(now_ms: u64, events_ms: u64) -> Self {
        Self {
            now_every: Duration::from_millis(now_ms.max(1)),
            events_every: Duration::from_millis(events_ms.max(1)),
        }
    }

    fn every(&self, field: Field) -> Duration {
        match field {
            Field::NowPlaying => self.now_every,
            Field::Events => self.events_every,
        }
    }
}

#[derive(Default)]
struct Seqs {
    now_playing: AtomicU64,
    events: AtomicU64,
}

struct Ctx {
    api: Arc<dyn RelayApi>,
    store: StoreHandle,
    seqs: Seqs,
}

impl Ctx {
    fn next_seq(&self, field: Field) -> u64 {
        let slot = match field {
            Field::NowPlaying => &self.seqs.now_playing,
            Field::Events => &self.seqs.events,
        };
        slot.fetch_add(1, Ordering::Relaxed) + 1
    }
}

pub struct Poller {
    ctx: Arc<Ctx>,
    cfg: PollConfig,
    tasks: Vec<JoinHandle<()>>,
}

impl Poller {
    pub fn new(api: Arc<dyn RelayApi>, store: StoreHandle, cfg: PollConfig) -> Self {
        Self { ctx: Arc::new(Ctx { api, store, seqs: Seqs::default() }), cfg, tasks: Vec::new() }
    }

    /// (Re)start both loops. Previously running loops are aborted first;
    /// sequence numbers keep counting so late results stay comparable.
    pub fn start(&mut self) {
        self.stop();
        for field in [Field::NowPlaying, Field::Events] {
            let every = self.cfg.every(field);
            let ctx = Arc::clone(&self.ctx);
            self.tasks.push(tokio::spawn(run_loop(field, every, ctx)));
        }
        info!(now_ms = %self.cfg.now_every.as_millis(), events_ms = %self.cfg.events_every.as_millis(), "poller: started");
    }

    /// Abort the loops. Fetches already in flight still report back.
    pub fn stop(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        for t in self.tasks.drain(..) {
            t.abort();
        }
        info!("poller: stopped");
    }

    pub fn is_running(&self) -> bool { !self.tasks.is_empty() }
}

impl Drop for Poller {
    fn drop(&mut self) { self.stop(); }
}

async fn run_loop(field: Field, every: Duration, ctx: Arc<Ctx>) {
    let triggers = ctx.store.triggers();
    let trigger = match field {
        Field::NowPlaying => &triggers.now_playing,
        Field::Events => &triggers.events,
    };
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = trigger.notified() => {
                debug!(field = field.as_str(), "poller: triggered fetch");
            }
        }
        dispatch(field, &ctx);
    }
}

/// Spawn one fetch. The events filter is read now, not when the response lands.
fn dispatch(field: Field, ctx: &Arc<Ctx>) {
    let seq = ctx.next_seq(field);
    let ctx = Arc::clone(ctx);
    match field {
        Field::NowPlaying => {
            tokio::spawn(async move {
                let t0 = Instant::now();
                let res = ctx.api.now_playing().await;
                settle(field, seq, t0, res.as_ref().err());
                deliver(&ctx, field, seq, Update::NowPlaying { seq, result: res.map_err(|e| e.to_string()) }).await;
            });
        }
        Field::Events => {
            let filter = ctx.store.current().filter.clone();
            tokio::spawn(async move {
                let t0 = Instant::now();
                let res = ctx.api.events(&filter).await;
                settle(field, seq, t0, res.as_ref().err());
                deliver(&ctx, field, seq, Update::Events { seq, result: res.map_err(|e| e.to_string()) }).await;
            });
        }
    }
}

async fn deliver(ctx: &Ctx, field: Field, seq: u64, update: Update) {
    if ctx.store.report(update).await.is_err() {
        debug!(field = field.as_str(), seq, "poller: store closed; result dropped");
    }
}

fn settle(field: Field, seq: u64, t0: Instant, err: Option<&onair_api::FetchError>) {
    let label = field.as_str();
    let ms = t0.elapsed().as_secs_f64() * 1000.0;
    histogram!("poll_ms", ms, "field" => label);
    match err {
        None => {
            counter!("poll_ok_total", 1, "field" => label);
            debug!(field = label, seq, took_ms = %t0.elapsed().as_millis(), "poller: fetch ok");
        }
        Some(e) => {
            counter!("poll_fail_total", 1, "field" => label);
            warn!(field = label, seq, error = %e, took_ms = %t0.elapsed().as_millis(), "poller: fetch failed");
        }
    }
}
