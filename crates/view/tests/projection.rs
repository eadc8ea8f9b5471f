use chrono::{TimeZone, Utc};
use onair_core::{Event, Order, PageState, SortKey, SortSpec};
use onair_view::{project_events, project_now_playing, sort_events, text, NEVER, NO_DATA, UNTITLED};

fn ev(play_time: &str, title: &str, artist: &str) -> Event {
    Event {
        play_time: play_time.into(),
        event_type: "SONG".into(),
        artist: artist.into(),
        title: title.into(),
        filename: format!("{title}.mp3"),
    }
}

fn ordering(key: SortKey, direction: Order) -> SortSpec { SortSpec { key, direction } }

#[test]
fn play_time_desc_puts_latest_first() {
    let events = vec![ev("2024-01-01T10:00:00Z", "Z", "a"), ev("2024-01-01T11:00:00Z", "A", "b")];
    let view = project_events(&events, &ordering(SortKey::PlayTime, Order::Desc), &PageState::default());
    assert_eq!(view.rows, vec![&events[1], &events[0]]);
    assert_eq!(view.total, 2);
    assert_eq!(view.page_label(), "1/1");
}

#[test]
fn play_time_compares_instants_not_text() {
    let events = vec![ev("2024-01-01T12:00:00+02:00", "noon+2", ""), ev("2024-01-01T11:00:00Z", "eleven", "")];
    let rows = sort_events(&events, &ordering(SortKey::PlayTime, Order::Asc));
    assert_eq!(rows[0].title, "noon+2");
}

#[test]
fn unparsable_times_sort_as_epoch() {
    let events = vec![ev("2024-01-01T10:00:00Z", "real", ""), ev("garbage", "bad", "")];
    let rows = sort_events(&events, &ordering(SortKey::PlayTime, Order::Asc));
    assert_eq!(rows[0].title, "bad");
}

#[test]
fn desc_reverses_asc_but_ties_keep_input_order() {
    let events = vec![
        ev("", "b", "1"),
        ev("", "a", "2"),
        ev("", "b", "3"),
        ev("", "c", "4"),
        ev("", "a", "5"),
    ];
    let asc: Vec<&str> = sort_events(&events, &ordering(SortKey::Title, Order::Asc)).iter().map(|e| e.artist.as_str()).collect();
    let desc: Vec<&str> = sort_events(&events, &ordering(SortKey::Title, Order::Desc)).iter().map(|e| e.artist.as_str()).collect();
    assert_eq!(asc, vec!["2", "5", "1", "3", "4"]);
    assert_eq!(desc, vec!["4", "1", "3", "2", "5"]);
    // The input is untouched.
    assert_eq!(events[0].artist, "1");
}

#[test]
fn string_keys_are_case_sensitive() {
    let events = vec![ev("", "apple", ""), ev("", "Banana", "")];
    let rows = sort_events(&events, &ordering(SortKey::Title, Order::Asc));
    assert_eq!(rows[0].title, "Banana");
}

#[test]
fn pages_concatenate_to_the_sorted_sequence() {
    let events: Vec<Event> = (0..23).map(|i| ev("", &format!("{:02}", (i * 7) % 23), &i.to_string())).collect();
    let sort = ordering(SortKey::Title, Order::Desc);
    let full = sort_events(&events, &sort);
    let first = project_events(&events, &sort, &PageState::new(5));
    assert_eq!(first.page_count, 5);
    let mut joined = Vec::new();
    for page in 1..=first.page_count {
        let view = project_events(&events, &sort, &PageState { page, page_size: 5 });
        assert!(view.rows.len() <= 5);
        joined.extend(view.rows);
    }
    assert_eq!(joined, full);
}

#[test]
fn rendering_is_idempotent() {
    let events: Vec<Event> = (0..12).map(|i| ev("2024-05-01 08:00:00", &format!("t{}", i % 3), "")).collect();
    let sort = ordering(SortKey::Title, Order::Asc);
    let page = PageState { page: 2, page_size: 5 };
    let a = project_events(&events, &sort, &page);
    let b = project_events(&events, &sort, &page);
    assert_eq!(a, b);
    assert_eq!(text::render_events(&a, &sort), text::render_events(&b, &sort));
}

#[test]
fn stale_page_is_clamped_on_render() {
    let events: Vec<Event> = (0..7).map(|i| ev("", &i.to_string(), "")).collect();
    let view = project_events(&events, &SortSpec::default(), &PageState { page: 9, page_size: 5 });
    assert_eq!(view.page, 2);
    assert_eq!(view.rows.len(), 2);
}

#[test]
fn empty_events_render_the_empty_state() {
    let view = project_events(&[], &SortSpec::default(), &PageState::default());
    assert!(view.is_empty());
    assert!(view.rows.is_empty());
    assert_eq!(view.page_label(), "1/1");
    assert_eq!(view.total_label(), "0 events");
    assert_eq!(text::render_events(&view, &SortSpec::default()), "No events");
}

#[test]
fn table_header_marks_the_sorted_column() {
    let events = vec![ev("", "x", "y")];
    let sort = ordering(SortKey::Artist, Order::Asc);
    let out = text::render_events(&project_events(&events, &sort, &PageState::default()), &sort);
    let header = out.lines().next().unwrap();
    assert!(header.contains("Artist ↑"));
    assert!(out.ends_with("1 event · page 1/1"));
}

#[test]
fn fit_pads_and_cuts() {
    assert_eq!(text::fit("ab", 4), "ab  ");
    assert_eq!(text::fit("abcdef", 4), "abc…");
    assert_eq!(text::fit("abc", 0), "");
}

#[test]
fn now_playing_placeholder_and_fallbacks() {
    let none = project_now_playing(None, None);
    assert!(!none.has_data);
    assert_eq!(none.title, NO_DATA);
    assert_eq!(none.updated, NEVER);
    assert_eq!(none.progress, 0.0);

    let untitled = Event { artist: "Someone".into(), ..Event::default() };
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
    let view = project_now_playing(Some(&untitled), Some(&at));
    assert!(view.has_data);
    assert_eq!(view.title, UNTITLED);
    assert_eq!(view.artist, "Someone");
    assert_eq!(view.play_time, "");
    assert_ne!(view.updated, NEVER);
    assert_eq!(view.progress, 0.0);
}
