use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::api::{ApiClient, Episode, Work};
use crate::config::Config;
use crate::db::Database;
use crate::format::{ImageFit, ImageFormat};
use crate::http::RetryPolicy;
use crate::outline::{ActivationPolicy, PanelState};

use super::actions::{drain_fetch_results, drain_render_results};
use super::render::ReaderAreas;
use super::{
    Fetched, HomeScreen, Load, ReaderData, ReaderScreen, Rendered, Screen, ScrollState, TuiContext,
    handle_key,
};

const RENDER_WAIT: Duration = Duration::from_secs(5);

fn config() -> Config {
    Config {
        api_url: "http://127.0.0.1:9".to_string(),
        image_domain: "img.test".to_string(),
        site_url: "https://comic.test".to_string(),
        header_offset: 2,
        wide_threshold: 100,
        activation: ActivationPolicy::LastReported,
        cover_fit: ImageFit::Cover,
        cover_format: ImageFormat::Auto,
    }
}

fn client() -> ApiClient {
    ApiClient::with_policy(
        "http://127.0.0.1:9",
        RetryPolicy {
            connect_timeout: Duration::from_millis(50),
            read_timeout: Duration::from_millis(50),
            attempts: 1,
            retry_delay: Duration::from_millis(1),
        },
    )
}

fn open_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().expect("temp dir");
    let db = Database::open(&dir.path().join("history.db")).expect("open db");
    db.migrate().expect("migrate");
    (dir, db)
}

fn work() -> Work {
    serde_json::from_value(serde_json::json!({
        "id": "w1",
        "type": "comic",
        "title": "Night Shift",
        "slug": "night-shift",
        "author": "Mika",
    }))
    .expect("work json")
}

fn episode(number: i64, content: &str) -> Episode {
    serde_json::from_value(serde_json::json!({
        "id": format!("e{number}"),
        "work_id": "w1",
        "episode_number": number,
        "title": format!("Part {number}"),
        "slug": format!("ep-{number}"),
        "content": content,
    }))
    .expect("episode json")
}

fn loaded(current: i64) -> ReaderData {
    let episodes = vec![episode(1, "# One\n\n## Sub"), episode(2, "# Two")];
    ReaderData {
        work: work(),
        episode: episodes[current as usize - 1].clone(),
        episodes,
    }
}

fn reader(ctx: &mut TuiContext<'_>) -> ReaderScreen {
    ReaderScreen {
        id: ctx.next_id(),
        request: 0,
        work_slug: "night-shift".to_string(),
        episode_slug: "ep-1".to_string(),
        data: Load::Loading,
        document: None,
        layout: None,
        tracker: ctx.config.outline_tracker(),
        scroll: ScrollState::default(),
        cursor: None,
        areas: ReaderAreas::default(),
    }
}

fn press(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn reader_of(screens: &[Screen]) -> &ReaderScreen {
    match screens.last() {
        Some(Screen::Reader(reader)) => &**reader,
        _ => panic!("reader should be on top"),
    }
}

fn outline_text(reader: &ReaderScreen) -> Vec<String> {
    reader
        .tracker
        .outline()
        .iter()
        .map(|entry| entry.text.clone())
        .collect()
}

/// Delivers an episode load for the reader's current request.
fn deliver_episode(
    screens: &mut [Screen],
    ctx: &mut TuiContext<'_>,
    data: ReaderData,
    status: &mut String,
) {
    let (reader_id, request) = {
        let reader = reader_of(screens);
        (reader.id, reader.request)
    };
    let (tx, rx) = mpsc::channel();
    tx.send(Fetched::Episode {
        reader: reader_id,
        request,
        result: Ok(data),
    })
    .expect("send episode");
    drain_fetch_results(&rx, screens, ctx, status);
}

fn deliver_render(screens: &mut [Screen], rendered: Rendered, status: &mut String) {
    let (tx, rx) = mpsc::channel();
    tx.send(rendered).expect("send render");
    drain_render_results(&rx, screens, status);
}

#[test]
fn render_from_a_replaced_episode_is_discarded() {
    let client = client();
    let config = config();
    let (_dir, db) = open_db();
    // Background fetches go to a channel nobody drains.
    let (fetch_tx, _fetch_rx) = mpsc::channel();
    let (render_tx, render_rx) = mpsc::channel();
    let mut ctx = TuiContext {
        client: &client,
        config: &config,
        db: &db,
        fetch_tx,
        render_tx,
        next_id: 0,
    };
    let mut status = String::new();
    let mut first = reader(&mut ctx);
    first.request = ctx.next_id();
    let mut screens = vec![
        Screen::Home(HomeScreen::default()),
        Screen::Reader(Box::new(first)),
    ];

    deliver_episode(&mut screens, &mut ctx, loaded(1), &mut status);
    let stale = render_rx.recv_timeout(RENDER_WAIT).expect("first render");

    handle_key(press(KeyCode::Char('n')), &mut screens, &mut ctx, &mut status);
    assert_eq!(reader_of(&screens).episode_slug, "ep-2");
    deliver_episode(&mut screens, &mut ctx, loaded(2), &mut status);
    let fresh = render_rx.recv_timeout(RENDER_WAIT).expect("second render");
    assert!(stale.generation < fresh.generation);

    deliver_render(&mut screens, stale, &mut status);
    let current = reader_of(&screens);
    assert!(current.tracker.outline().is_empty());
    assert!(current.document.is_none());

    deliver_render(&mut screens, fresh, &mut status);
    let current = reader_of(&screens);
    assert_eq!(outline_text(current), ["Two"]);
    assert!(current.document.is_some());
    assert_eq!(db.list_history().expect("history")[0].episode_slug, "ep-2");
}

#[test]
fn superseded_episode_load_is_dropped() {
    let client = client();
    let config = config();
    let (_dir, db) = open_db();
    let (fetch_tx, _fetch_rx) = mpsc::channel();
    let (render_tx, _render_rx) = mpsc::channel();
    let mut ctx = TuiContext {
        client: &client,
        config: &config,
        db: &db,
        fetch_tx,
        render_tx,
        next_id: 0,
    };
    let mut status = String::new();
    let mut first = reader(&mut ctx);
    first.request = ctx.next_id();
    let old_request = first.request;
    first.request = ctx.next_id();
    let reader_id = first.id;
    let mut screens = vec![Screen::Reader(Box::new(first))];

    let (tx, rx) = mpsc::channel();
    tx.send(Fetched::Episode {
        reader: reader_id,
        request: old_request,
        result: Ok(loaded(1)),
    })
    .expect("send episode");
    drain_fetch_results(&rx, &mut screens, &mut ctx, &mut status);

    assert!(matches!(reader_of(&screens).data, Load::Loading));
    assert!(db.list_history().expect("history").is_empty());
}

#[test]
fn closing_a_reader_drops_its_pending_render() {
    let client = client();
    let config = config();
    let (_dir, db) = open_db();
    let (fetch_tx, _fetch_rx) = mpsc::channel();
    let (render_tx, render_rx) = mpsc::channel();
    let mut ctx = TuiContext {
        client: &client,
        config: &config,
        db: &db,
        fetch_tx,
        render_tx,
        next_id: 0,
    };
    let mut status = String::new();
    let mut first = reader(&mut ctx);
    first.request = ctx.next_id();
    let mut screens = vec![
        Screen::Home(HomeScreen::default()),
        Screen::Reader(Box::new(first)),
    ];

    deliver_episode(&mut screens, &mut ctx, loaded(1), &mut status);
    let pending = render_rx.recv_timeout(RENDER_WAIT).expect("render");

    handle_key(press(KeyCode::Esc), &mut screens, &mut ctx, &mut status);
    assert_eq!(screens.len(), 1);

    let before = status.clone();
    deliver_render(&mut screens, pending, &mut status);
    assert_eq!(screens.len(), 1);
    assert!(matches!(screens[0], Screen::Home(_)));
    assert_eq!(status, before);
}

#[test]
fn escape_closes_a_shown_outline_before_the_reader() {
    let client = client();
    let config = config();
    let (_dir, db) = open_db();
    let (fetch_tx, _fetch_rx) = mpsc::channel();
    let (render_tx, _render_rx) = mpsc::channel();
    let mut ctx = TuiContext {
        client: &client,
        config: &config,
        db: &db,
        fetch_tx,
        render_tx,
        next_id: 0,
    };
    let mut status = String::new();
    let mut first = reader(&mut ctx);
    first.tracker.on_layout_width(60);
    first.tracker.toggle_panel();
    assert_eq!(first.tracker.panel_state(), PanelState::OverlayShown);
    let mut screens = vec![
        Screen::Home(HomeScreen::default()),
        Screen::Reader(Box::new(first)),
    ];

    handle_key(press(KeyCode::Esc), &mut screens, &mut ctx, &mut status);
    assert_eq!(screens.len(), 2);
    assert_eq!(
        reader_of(&screens).tracker.panel_state(),
        PanelState::OverlayHidden
    );

    handle_key(press(KeyCode::Esc), &mut screens, &mut ctx, &mut status);
    assert_eq!(screens.len(), 1);
}
