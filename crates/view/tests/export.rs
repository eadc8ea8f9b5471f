use onair_core::{Event, EventKind};
use onair_view::export::{csv_field, export_file_name, to_csv, write_export};

#[test]
fn empty_export_is_header_only() {
    assert_eq!(to_csv(&[]), "time,type,artist,title,filename");
}

#[test]
fn rows_keep_fetch_order_and_raw_values() {
    let events = vec![
        Event { play_time: "2024-01-01T11:00:00Z".into(), event_type: "AD".into(), artist: "B".into(), title: "t2".into(), filename: "b.mp3".into() },
        Event { play_time: "2024-01-01T10:00:00Z".into(), event_type: "AD".into(), artist: "A".into(), title: "t1".into(), filename: "a.mp3".into() },
    ];
    let csv = to_csv(&events);
    let lines: Vec<&str> = csv.split('\n').collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "2024-01-01T11:00:00Z,AD,B,t2,b.mp3");
    assert_eq!(lines[2], "2024-01-01T10:00:00Z,AD,A,t1,a.mp3");
    assert!(!csv.ends_with('\n'));
}

#[test]
fn special_characters_are_quoted() {
    assert_eq!(csv_field("plain"), "plain");
    assert_eq!(csv_field("a,b"), "\"a,b\"");
    assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
}

#[test]
fn file_name_uses_lowercase_kind() {
    assert_eq!(export_file_name(&EventKind::Song, 1700000000000), "events_song_1700000000000.csv");
    assert_eq!(export_file_name(&EventKind::parse("Promo"), 5), "events_promo_5.csv");
}

#[test]
fn write_export_creates_the_file() {
    let dir = std::env::temp_dir().join(format!("onair-export-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let events = vec![Event { title: "x, y".into(), ..Event::default() }];
    let path = write_export(&dir, &EventKind::Id, &events).unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("events_id_") && name.ends_with(".csv"));
    let body = std::fs::read_to_string(&path).unwrap();
    assert_eq!(body, "time,type,artist,title,filename\n,,,\"x, y\",");
    std::fs::remove_dir_all(&dir).unwrap();
}
