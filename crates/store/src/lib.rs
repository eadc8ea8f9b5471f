//! On-Air view-state store.
//!
//! All writers (poll results and interaction handlers) go through
//! `ViewState::apply`, executed by one store task. Readers get immutable
//! snapshots and an epoch channel that ticks after every change.

#![forbid(unsafe_code)]

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use metrics::counter;
use onair_core::{ConnectionStatus, Event, Field, Filter, NowPlaying, PageState, SortKey, SortSpec};
use tokio::sync::{mpsc, watch, Notify};
use tracing::{debug, info};

/// User interactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ApplyFilter(Filter),
    SortBy(SortKey),
    NextPage,
    PrevPage,
    GoToPage(usize),
    SetPageSize(usize),
    /// Fetch both feeds now; leaves the state untouched.
    Refresh,
}

/// Everything that can mutate the store. Poll results carry the request
/// sequence number they were dispatched with.
#[derive(Debug, Clone)]
pub enum Update {
    NowPlaying { seq: u64, result: Result<Option<NowPlaying>, String> },
    Events { seq: u64, result: Result<Vec<Event>, String> },
    Action(Action),
}

/// What applying an update did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Effects {
    pub changed: bool,
    /// The update was a poll result older than one already applied; it was dropped.
    pub stale: bool,
    pub fetch_now_playing: bool,
    pub fetch_events: bool,
}

impl Effects {
    fn changed() -> Self { Self { changed: true, ..Self::default() } }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct AppliedSeq {
    now_playing: u64,
    events: u64,
}

#[derive(Debug, Clone)]
pub struct ViewState {
    pub filter: Filter,
    /// Full fetched set, unsorted and unpaginated.
    pub events: Arc<Vec<Event>>,
    pub now_playing: Option<NowPlaying>,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub sort: SortSpec,
    pub page: PageState,
    pub status: ConnectionStatus,
    pub last_error: Option<String>,
    /// Bumped on every change.
    pub epoch: u64,
    applied: AppliedSeq,
}

impl Default for ViewState {
    fn default() -> Self { Self::new(onair_core::PAGE_SIZE_DEFAULT) }
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        Self {
            filter: Filter::default(),
            events: Arc::new(Vec::new()),
            now_playing: None,
            last_fetched_at: None,
            sort: SortSpec::default(),
            page: PageState::new(page_size),
            status: ConnectionStatus::Offline,
            last_error: None,
            epoch: 0,
            applied: AppliedSeq::default(),
        }
    }

    pub fn page_count(&self) -> usize { self.page.page_count(self.events.len()) }

    /// Sequence number of the newest settled request applied for `field`.
    pub fn applied_seq(&self, field: Field) -> u64 {
        match field {
            Field::NowPlaying => self.applied.now_playing,
            Field::Events => self.applied.events,
        }
    }

    /// Accept a settled request unless a newer one was already applied.
    fn accept(&mut self, field: Field, seq: u64) -> bool {
        let slot = match field {
            Field::NowPlaying => &mut self.applied.now_playing,
            Field::Events => &mut self.applied.events,
        };
        if seq < *slot {
            return false;
        }
        *slot = seq;
        true
    }

    /// The single mutation entry point.
    pub fn apply(&mut self, update: Update) -> Effects {
        let fx = match update {
            Update::NowPlaying { seq, result } => {
                if !self.accept(Field::NowPlaying, seq) {
                    return Effects { stale: true, ..Effects::default() };
                }
                match result {
                    Ok(np) => {
                        self.now_playing = np;
                        self.last_fetched_at = Some(Utc::now());
                        self.settled_ok();
                    }
                    Err(e) => self.settled_err(e),
                }
                Effects::changed()
            }
            Update::Events { seq, result } => {
                if !self.accept(Field::Events, seq) {
                    return Effects { stale: true, ..Effects::default() };
                }
                match result {
                    Ok(events) => {
                        self.events = Arc::new(events);
                        self.settled_ok();
                    }
                    Err(e) => self.settled_err(e),
                }
                Effects::changed()
            }
            Update::Action(action) => self.apply_action(action),
        };
        if fx.changed {
            self.epoch = self.epoch.saturating_add(1);
        }
        fx
    }

    fn settled_ok(&mut self) {
        self.status = ConnectionStatus::Connected;
        self.last_error = None;
    }

    // Prior data stays as it was.
    fn settled_err(&mut self, e: String) {
        self.status = ConnectionStatus::Reconnecting;
        self.last_error = Some(e);
    }

    fn apply_action(&mut self, action: Action) -> Effects {
        match action {
            Action::ApplyFilter(filter) => {
                self.filter = filter;
                self.page.page = 1;
                Effects { changed: true, fetch_events: true, ..Effects::default() }
            }
            Action::SortBy(key) => {
                self.sort.select(key);
                self.page.page = 1;
                Effects::changed()
            }
            Action::NextPage => {
                let cur = self.page.clamped_page(self.events.len());
                self.set_page(cur.saturating_add(1))
            }
            Action::PrevPage => {
                let cur = self.page.clamped_page(self.events.len());
                self.set_page(cur.saturating_sub(1))
            }
            Action::GoToPage(n) => self.set_page(n),
            Action::SetPageSize(size) => {
                self.page.page_size = size.max(1);
                self.page.page = 1;
                Effects::changed()
            }
            Action::Refresh => Effects { fetch_now_playing: true, fetch_events: true, ..Effects::default() },
        }
    }

    fn set_page(&mut self, n: usize) -> Effects {
        let next = n.clamp(1, self.page_count());
        if next == self.page.page {
            return Effects::default();
        }
        self.page.page = next;
        Effects::changed()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("store task is gone")]
pub struct StoreClosed;

/// Out-of-schedule fetch requests raised by the store for the poller.
#[derive(Debug, Default)]
pub struct Triggers {
    pub now_playing: Notify,
    pub events: Notify,
}

/// Handle for writers and readers. Cheap to clone.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<Update>,
    snap: Arc<ArcSwap<ViewState>>,
    epoch_rx: watch::Receiver<u64>,
    triggers: Arc<Triggers>,
}

impl StoreHandle {
    pub fn current(&self) -> Arc<ViewState> { self.snap.load_full() }
    pub fn subscribe_epoch(&self) -> watch::Receiver<u64> { self.epoch_rx.clone() }
    pub fn triggers(&self) -> Arc<Triggers> { Arc::clone(&self.triggers) }

    pub async fn dispatch(&self, action: Action) -> Result<(), StoreClosed> {
        self.report(Update::Action(action)).await
    }

    pub async fn report(&self, update: Update) -> Result<(), StoreClosed> {
        self.tx.send(update).await.map_err(|_| StoreClosed)
    }
}

fn update_label(u: &Update) -> &'static str {
    match u {
        Update::NowPlaying { .. } => Field::NowPlaying.as_str(),
        Update::Events { .. } => Field::Events.as_str(),
        Update::Action(_) => "action",
    }
}

/// Spawn the store loop. Updates are applied one at a time in arrival order;
/// each change publishes a fresh snapshot before the next update is read.
pub fn spawn_store(initial: ViewState, cap: usize) -> StoreHandle {
    let (tx, mut rx) = mpsc::channel::<Update>(cap.max(1));
    let snap = Arc::new(ArcSwap::from_pointee(initial.clone()));
    let (epoch_tx, epoch_rx) = watch::channel(initial.epoch);
    let triggers = Arc::new(Triggers::default());
    let snap_clone = Arc::clone(&snap);
    let triggers_clone = Arc::clone(&triggers);

    tokio::spawn(async move {
        let mut state = initial;
        while let Some(update) = rx.recv().await {
            let label = update_label(&update);
            let fx = state.apply(update);
            if fx.stale {
                counter!("poll_stale_total", 1, "field" => label);
                debug!(field = label, "store: stale response dropped");
            }
            if fx.changed {
                snap_clone.store(Arc::new(state.clone()));
                let _ = epoch_tx.send(state.epoch);
            }
            if fx.fetch_now_playing {
                triggers_clone.now_playing.notify_one();
            }
            if fx.fetch_events {
                triggers_clone.events.notify_one();
            }
        }
        info!("store loop stopped");
    });

    StoreHandle { tx, snap, epoch_rx, triggers }
}
