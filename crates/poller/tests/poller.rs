use std::sync::Arc;
use std::time::Duration;

use onair_api::{FetchError, FetchResponse, MockApi, MockReply, RelayApi, EVENTS_BY_TYPE, NOW_ON_AIR};
use onair_core::{ConnectionStatus, EventKind, Filter, Order};
use onair_poller::{PollConfig, Poller};
use onair_store::{spawn_store, Action, StoreHandle, ViewState};
use serde_json::json;

fn song(title: &str) -> serde_json::Value {
    json!({"play_time": "2024-01-01T10:00:00Z", "event_type": "SONG", "artist": "A", "title": title, "filename": "f.mp3"})
}

fn setup(mock: &Arc<MockApi>) -> (StoreHandle, Poller) {
    let store = spawn_store(ViewState::default(), 64);
    let api: Arc<dyn RelayApi> = Arc::clone(mock) as Arc<dyn RelayApi>;
    let poller = Poller::new(api, store.clone(), PollConfig::default());
    (store, poller)
}

/// Let spawned fetches and the store loop run. Time is paused, so short
/// sleeps only advance the mock clock.
async fn settle() {
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn both_feeds_fire_immediately_on_start() {
    let mock = Arc::new(MockApi::new());
    mock.json(NOW_ON_AIR, song("now"));
    mock.json(EVENTS_BY_TYPE, json!([song("one"), song("two")]));
    let (store, mut poller) = setup(&mock);
    poller.start();
    settle().await;

    assert_eq!(mock.count(NOW_ON_AIR), 1);
    assert_eq!(mock.count(EVENTS_BY_TYPE), 1);
    let snap = store.current();
    assert_eq!(snap.status, ConnectionStatus::Connected);
    assert_eq!(snap.now_playing.as_ref().map(|n| n.title.as_str()), Some("now"));
    assert_eq!(snap.events.len(), 2);
    assert!(snap.last_fetched_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn feeds_keep_their_own_cadence() {
    let mock = Arc::new(MockApi::new());
    mock.json(NOW_ON_AIR, json!(null));
    mock.json(EVENTS_BY_TYPE, json!([]));
    let (_store, mut poller) = setup(&mock);
    poller.start();
    tokio::time::sleep(Duration::from_millis(9_500)).await;
    settle().await;

    // Ticks at 0, 3000, 6000, 9000 and 0, 7000.
    assert_eq!(mock.count(NOW_ON_AIR), 4);
    assert_eq!(mock.count(EVENTS_BY_TYPE), 2);
}

#[tokio::test(start_paused = true)]
async fn failure_keeps_last_good_data() {
    let mock = Arc::new(MockApi::new());
    mock.json(NOW_ON_AIR, song("kept"));
    mock.fail(NOW_ON_AIR, FetchError::Transport("connection reset".into()));
    mock.json(EVENTS_BY_TYPE, json!([]));
    let (store, mut poller) = setup(&mock);
    poller.start();
    settle().await;
    assert_eq!(store.current().status, ConnectionStatus::Connected);

    tokio::time::sleep(Duration::from_millis(3_000)).await;
    settle().await;
    let snap = store.current();
    assert_eq!(snap.status, ConnectionStatus::Reconnecting);
    assert_eq!(snap.now_playing.as_ref().map(|n| n.title.as_str()), Some("kept"));
    assert!(snap.last_error.as_deref().unwrap_or("").contains("connection reset"));
}

#[tokio::test(start_paused = true)]
async fn non_2xx_counts_as_failure() {
    let mock = Arc::new(MockApi::new());
    // No now-on-air route: that feed fails too.
    mock.push(EVENTS_BY_TYPE, MockReply::ok(FetchResponse::text(500, "boom")));
    let (store, mut poller) = setup(&mock);
    poller.start();
    settle().await;
    let snap = store.current();
    assert_eq!(snap.status, ConnectionStatus::Reconnecting);
    assert!(snap.events.is_empty());
    assert!(snap.last_error.is_some());
    assert_eq!(snap.applied_seq(onair_core::Field::Events), 1);
}

#[tokio::test(start_paused = true)]
async fn apply_filter_fetches_with_the_new_filter_and_late_results_are_dropped() {
    let mock = Arc::new(MockApi::new());
    mock.json(NOW_ON_AIR, json!(null));
    // First events request answers late with data that must never show.
    mock.push(EVENTS_BY_TYPE, MockReply::ok(FetchResponse::json(200, json!([song("old")]))).after(Duration::from_secs(10)));
    mock.json(EVENTS_BY_TYPE, json!([song("new")]));
    let (store, mut poller) = setup(&mock);
    poller.start();
    settle().await;

    let filter = Filter { kind: EventKind::Ad, limit: 20, order: Order::Asc };
    store.dispatch(Action::ApplyFilter(filter)).await.unwrap();
    settle().await;

    let reqs = mock.requests();
    let events_reqs: Vec<_> = reqs.iter().filter(|r| r.path == EVENTS_BY_TYPE).collect();
    assert_eq!(events_reqs.len(), 2);
    assert_eq!(
        events_reqs[1].query,
        vec![("type".to_string(), "AD".to_string()), ("limit".to_string(), "20".to_string()), ("order".to_string(), "asc".to_string())]
    );
    assert_eq!(store.current().events[0].title, "new");

    tokio::time::sleep(Duration::from_secs(11)).await;
    settle().await;
    let snap = store.current();
    assert_eq!(snap.events.len(), 1);
    assert_eq!(snap.events[0].title, "new");
}

#[tokio::test(start_paused = true)]
async fn refresh_fetches_both_feeds_out_of_schedule() {
    let mock = Arc::new(MockApi::new());
    mock.json(NOW_ON_AIR, json!(null));
    mock.json(EVENTS_BY_TYPE, json!([]));
    let (store, mut poller) = setup(&mock);
    poller.start();
    settle().await;
    store.dispatch(Action::Refresh).await.unwrap();
    settle().await;
    assert_eq!(mock.count(NOW_ON_AIR), 2);
    assert_eq!(mock.count(EVENTS_BY_TYPE), 2);
}

#[tokio::test(start_paused = true)]
async fn restart_replaces_loops_and_stop_halts_them() {
    let mock = Arc::new(MockApi::new());
    mock.json(NOW_ON_AIR, json!(null));
    mock.json(EVENTS_BY_TYPE, json!([]));
    let (_store, mut poller) = setup(&mock);
    poller.start();
    poller.start();
    settle().await;
    assert_eq!(mock.count(NOW_ON_AIR), 1);
    assert_eq!(mock.count(EVENTS_BY_TYPE), 1);

    poller.stop();
    assert!(!poller.is_running());
    tokio::time::sleep(Duration::from_secs(30)).await;
    settle().await;
    assert_eq!(mock.count(NOW_ON_AIR), 1);
    assert_eq!(mock.count(EVENTS_BY_TYPE), 1);
}

#[tokio::test(start_paused = true)]
async fn only_events_requests_carry_the_filter() {
    let mock = Arc::new(MockApi::new());
    mock.json(NOW_ON_AIR, json!(null));
    mock.json(EVENTS_BY_TYPE, json!([]));
    let (store, mut poller) = setup(&mock);
    poller.start();
    settle().await;
    store.dispatch(Action::ApplyFilter(Filter { kind: EventKind::Id, limit: 5, order: Order::Asc })).await.unwrap();
    tokio::time::sleep(Duration::from_millis(3_100)).await;
    settle().await;

    let reqs = mock.requests();
    let now: Vec<_> = reqs.iter().filter(|r| r.path == NOW_ON_AIR).collect();
    assert_eq!(now.len(), 2);
    assert!(now.iter().all(|r| r.query.is_empty()));
    let events: Vec<_> = reqs.iter().filter(|r| r.path == EVENTS_BY_TYPE).collect();
    assert_eq!(events[0].query[0], ("type".to_string(), "SONG".to_string()));
    assert_eq!(events[1].query[0], ("type".to_string(), "ID".to_string()));
}
