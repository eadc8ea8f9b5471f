use onair_core::{ConnectionStatus, Event, SortKey};
use onair_store::{Action, Update, ViewState};
use onair_tui::ui::{badge_style, draw};
use onair_tui::App;
use ratatui::backend::TestBackend;
use ratatui::style::Color;
use ratatui::Terminal;

fn screen(state: &ViewState, app: &App) -> String {
    let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
    terminal.draw(|f| draw(f, state, app)).unwrap();
    let buf = terminal.backend().buffer().clone();
    let mut out = String::new();
    for y in 0..buf.area.height {
        for x in 0..buf.area.width {
            out.push_str(buf.get(x, y).symbol());
        }
        out.push('\n');
    }
    out
}

#[test]
fn startup_shows_placeholders_and_offline_badge() {
    let out = screen(&ViewState::default(), &App::new());
    assert!(out.contains("No data"));
    assert!(out.contains("No events for this filter"));
    assert!(out.contains("offline"));
    assert!(out.contains("SONG · limit 50 · desc"));
}

#[test]
fn events_table_shows_rows_and_sort_arrow() {
    let mut state = ViewState::new(10);
    let events = (0..3)
        .map(|i| Event { title: format!("track-{i}"), artist: "Band".into(), event_type: "SONG".into(), ..Event::default() })
        .collect();
    state.apply(Update::Events { seq: 1, result: Ok(events) });
    state.apply(Update::Action(Action::SortBy(SortKey::Title)));
    let out = screen(&state, &App::new());
    assert!(out.contains("track-0"));
    assert!(out.contains("track-2"));
    assert!(out.contains("Title ↑"));
    assert!(out.contains("3 events · page 1/1"));
    assert!(out.contains("connected"));
}

#[test]
fn filter_editor_overlays_the_dashboard() {
    let mut app = App::new();
    let state = ViewState::default();
    app.handle_key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Char('f')), &state);
    let out = screen(&state, &app);
    assert!(out.contains("Filter"));
    assert!(out.contains("enter apply"));
}

#[test]
fn badge_colours() {
    assert_eq!(badge_style(ConnectionStatus::Connected).fg, Some(Color::Green));
    assert_eq!(badge_style(ConnectionStatus::Reconnecting).fg, Some(Color::Yellow));
    assert_eq!(badge_style(ConnectionStatus::Offline).fg, Some(Color::DarkGray));
}
