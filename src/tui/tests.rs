// SPDX-FileCopyrightText: 2026 The Tesuji Authors
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::backend::TestBackend;
use ratatui::Terminal;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

use super::logger::LogSink;
use super::{App, PageId};
use crate::client::demo::DemoClient;
use crate::client::{
    ClientError, Coord, Game, GameClient, GameEvent, GameId, GameState, LiveGameList, Overview,
    Phase, ServerEvent, StoneColor, UserId,
};
use crate::sched::Work;

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

/// Demo client with call counters, for asserting how often the app hits the
/// server and that slow teardown calls stay off the UI task.
struct InstrumentedClient {
    inner: DemoClient,
    overview_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    disconnect_delay: Duration,
}

impl InstrumentedClient {
    fn new(disconnect_delay: Duration) -> Self {
        Self {
            inner: DemoClient::new(),
            overview_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            disconnect_delay,
        }
    }
}

impl GameClient for InstrumentedClient {
    fn user_id(&self) -> UserId {
        self.inner.user_id()
    }

    fn overview(&self) -> Result<Overview, ClientError> {
        self.overview_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.overview()
    }

    fn live_games(&self, limit: usize) -> Result<LiveGameList, ClientError> {
        self.inner.live_games(limit)
    }

    fn game(&self, id: GameId) -> Result<Game, ClientError> {
        self.inner.game(id)
    }

    fn game_state(&self, id: GameId) -> Result<GameState, ClientError> {
        self.inner.game_state(id)
    }

    fn connect_game(&self, id: GameId) -> Result<(), ClientError> {
        self.inner.connect_game(id)
    }

    fn disconnect_game(&self, id: GameId) -> Result<(), ClientError> {
        std::thread::sleep(self.disconnect_delay);
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.disconnect_game(id)
    }

    fn join_chat(&self, id: GameId) -> Result<(), ClientError> {
        self.inner.join_chat(id)
    }

    fn submit_move(&self, id: GameId, at: Coord) -> Result<(), ClientError> {
        self.inner.submit_move(id, at)
    }

    fn pass(&self, id: GameId) -> Result<(), ClientError> {
        self.inner.pass(id)
    }

    fn resign(&self, id: GameId) -> Result<(), ClientError> {
        self.inner.resign(id)
    }

    fn accept_removal(&self, id: GameId) -> Result<(), ClientError> {
        self.inner.accept_removal(id)
    }

    fn send_chat(&self, id: GameId, move_number: u32, body: &str) -> Result<(), ClientError> {
        self.inner.send_chat(id, move_number, body)
    }

    fn ping(&self, drift_ms: i64, latency_ms: i64) -> Result<(), ClientError> {
        self.inner.ping(drift_ms, latency_ms)
    }

    fn subscribe(&self) -> UnboundedReceiver<ServerEvent> {
        self.inner.subscribe()
    }

    fn subscribe_game(&self, id: GameId) -> UnboundedReceiver<GameEvent> {
        self.inner.subscribe_game(id)
    }
}

fn new_app() -> (Arc<DemoClient>, App, UnboundedReceiver<Work<App>>) {
    let client = Arc::new(DemoClient::new());
    let (app, work_rx) = App::new(client.clone(), LogSink::new());
    (client, app, work_rx)
}

/// Runs scheduled work until the app has been quiet for a beat. Tickers fire at
/// one-second cadence, so a 250ms window outlasts any in-flight load without
/// ever waiting for the next tick.
async fn settle(app: &mut App, rx: &mut UnboundedReceiver<Work<App>>) {
    while let Ok(Some(work)) = timeout(Duration::from_millis(250), rx.recv()).await {
        work(app);
        while let Ok(more) = rx.try_recv() {
            more(app);
        }
    }
}

fn screen_text(app: &mut App) -> String {
    let mut terminal = Terminal::new(TestBackend::new(100, 32)).expect("test terminal");
    terminal.draw(|frame| app.draw(frame)).expect("draw");
    terminal.backend().buffer().content.iter().map(|cell| cell.symbol()).collect()
}

#[tokio::test]
async fn initial_load_lands_on_home_with_the_game_list() {
    let (_client, mut app, mut rx) = new_app();
    app.start();
    settle(&mut app, &mut rx).await;

    assert_eq!(app.active, PageId::Home);
    assert!(!app.busy);
    let text = screen_text(&mut app);
    assert!(text.contains("Active Games (2)"), "missing game list in: {text}");
    assert!(text.contains("tenuki-bot"));
}

#[tokio::test]
async fn small_terminal_shows_the_size_notice_instead_of_the_page() {
    let (_client, mut app, mut rx) = new_app();
    app.start();
    settle(&mut app, &mut rx).await;

    let mut terminal = Terminal::new(TestBackend::new(40, 10)).expect("test terminal");
    terminal.draw(|frame| app.draw(frame)).expect("draw");
    let text: String =
        terminal.backend().buffer().content.iter().map(|cell| cell.symbol()).collect();
    assert!(text.contains("Terminal too small"));
}

#[tokio::test]
async fn opening_a_game_from_home_and_escaping_returns_home() {
    let (_client, mut app, mut rx) = new_app();
    app.start();
    settle(&mut app, &mut rx).await;

    app.handle_key(key(KeyCode::Down));
    app.handle_key(key(KeyCode::Enter));
    settle(&mut app, &mut rx).await;
    assert_eq!(app.active, PageId::Game(GameId(101)));
    assert_eq!(app.current_game, Some(GameId(101)));
    let text = screen_text(&mut app);
    assert!(text.contains("Your turn"), "game page not rendered: {text}");

    app.handle_key(key(KeyCode::Esc));
    settle(&mut app, &mut rx).await;
    assert_eq!(app.active, PageId::Home);
    assert!(!app.pages.contains_key(&PageId::Game(GameId(101))));
    // The rotation pointer outlives the page.
    assert_eq!(app.current_game, Some(GameId(101)));
}

#[tokio::test]
async fn game_opened_from_watch_returns_to_watch() {
    let (_client, mut app, mut rx) = new_app();
    app.start();
    settle(&mut app, &mut rx).await;

    app.handle_key(key(KeyCode::Char('W')));
    settle(&mut app, &mut rx).await;
    assert_eq!(app.active, PageId::Watch);

    app.handle_key(key(KeyCode::Down));
    app.handle_key(key(KeyCode::Enter));
    settle(&mut app, &mut rx).await;
    assert_eq!(app.active, PageId::Game(GameId(101)));

    app.handle_key(key(KeyCode::Esc));
    settle(&mut app, &mut rx).await;
    assert_eq!(app.active, PageId::Watch);
}

#[tokio::test]
async fn failed_game_load_keeps_the_previous_page_active() {
    let (_client, mut app, mut rx) = new_app();
    app.start();
    settle(&mut app, &mut rx).await;

    app.open_game(GameId(777), None);
    // The previous page stays active while the load is in flight and after
    // it fails; the half-mounted page is discarded again.
    assert_eq!(app.active, PageId::Home);
    settle(&mut app, &mut rx).await;

    assert_eq!(app.active, PageId::Home);
    assert!(!app.pages.contains_key(&PageId::Game(GameId(777))));
    assert!(app.popup.is_some(), "load failure must surface a notice");
}

#[tokio::test]
async fn next_with_an_empty_queue_shows_a_notice_and_stays_put() {
    let (_client, mut app, mut rx) = new_app();
    app.start();
    settle(&mut app, &mut rx).await;

    app.handle_key(key(KeyCode::Char('N')));
    assert_eq!(app.active, PageId::Home);
    assert!(app.popup.is_some());
}

#[tokio::test]
async fn next_rotates_through_actionable_games_in_ascending_order() {
    let (client, mut app, mut rx) = new_app();
    app.start();
    settle(&mut app, &mut rx).await;

    for game in client.overview().expect("overview").active_games {
        let id = game.id;
        app.ctx.turns.upsert(id, game, true);
    }
    assert_eq!(app.ctx.turns.count(), 2);

    app.handle_key(key(KeyCode::Char('N')));
    settle(&mut app, &mut rx).await;
    assert_eq!(app.active, PageId::Game(GameId(101)));

    app.handle_key(key(KeyCode::Char('N')));
    settle(&mut app, &mut rx).await;
    assert_eq!(app.active, PageId::Game(GameId(102)));
    // Rotating away unmounts the previous game page.
    assert!(!app.pages.contains_key(&PageId::Game(GameId(101))));

    app.handle_key(key(KeyCode::Char('N')));
    settle(&mut app, &mut rx).await;
    assert_eq!(app.active, PageId::Game(GameId(101)));
}

#[tokio::test]
async fn tab_cycles_focus_and_escape_asks_to_quit() {
    let (_client, mut app, mut rx) = new_app();
    app.start();
    settle(&mut app, &mut rx).await;

    assert_eq!(app.focus, 0);
    app.handle_key(key(KeyCode::Tab));
    assert_eq!(app.focus, 1);
    app.handle_key(key(KeyCode::BackTab));
    app.handle_key(key(KeyCode::BackTab));
    assert_eq!(app.focus, 3, "backtab wraps around");

    // Esc on a plain widget leaves, which on a singleton is the quit prompt.
    app.handle_key(key(KeyCode::Esc));
    assert!(app.popup.is_some());
    assert!(!app.should_quit);
}

#[tokio::test]
async fn escape_in_the_chat_input_drops_focus_before_leaving() {
    let (_client, mut app, mut rx) = new_app();
    app.start();
    settle(&mut app, &mut rx).await;

    app.open_game(GameId(101), None);
    settle(&mut app, &mut rx).await;

    // Focus index 2 is the chat input; Esc only defocuses it.
    app.focus = 2;
    app.handle_key(key(KeyCode::Esc));
    assert_eq!(app.focus, 0);
    assert_eq!(app.active, PageId::Game(GameId(101)));
    assert!(app.popup.is_none());

    // From the board the next Esc backs out of the game.
    app.handle_key(key(KeyCode::Esc));
    settle(&mut app, &mut rx).await;
    assert_eq!(app.active, PageId::Home);
}

#[tokio::test]
async fn quit_prompt_defaults_to_cancel() {
    let (_client, mut app, mut rx) = new_app();
    app.start();
    settle(&mut app, &mut rx).await;

    app.handle_key(key(KeyCode::Char('q')));
    assert!(app.popup.is_some());
    app.handle_key(key(KeyCode::Enter));
    assert!(app.popup.is_none());
    assert!(!app.should_quit);

    app.handle_key(key(KeyCode::Char('q')));
    app.handle_key(key(KeyCode::Left));
    app.handle_key(key(KeyCode::Enter));
    assert!(app.should_quit);
}

#[tokio::test]
async fn text_entry_focus_swallows_the_global_shortcuts() {
    let (_client, mut app, mut rx) = new_app();
    app.start();
    settle(&mut app, &mut rx).await;

    app.open_game(GameId(101), None);
    settle(&mut app, &mut rx).await;
    assert_eq!(app.active, PageId::Game(GameId(101)));

    // Focus index 2 is the chat input.
    app.focus = 2;
    app.handle_key(key(KeyCode::Char('W')));
    app.handle_key(key(KeyCode::Char('q')));
    assert_eq!(app.active, PageId::Game(GameId(101)));
    assert!(app.popup.is_none());

    // Tab still escapes the input, after which shortcuts work again.
    app.handle_key(key(KeyCode::Tab));
    app.handle_key(key(KeyCode::Char('W')));
    settle(&mut app, &mut rx).await;
    assert_eq!(app.active, PageId::Watch);
}

#[tokio::test]
async fn playing_a_move_reaches_the_server_and_updates_the_board() {
    let (client, mut app, mut rx) = new_app();
    app.start();
    settle(&mut app, &mut rx).await;

    app.open_game(GameId(101), None);
    settle(&mut app, &mut rx).await;

    // Board focus, cursor starts at the center of the 9x9.
    app.handle_key(key(KeyCode::Enter));
    settle(&mut app, &mut rx).await;

    let state = client.game_state(GameId(101)).expect("state");
    let at = crate::client::Coord { x: 4, y: 4 };
    assert_eq!(state.stone_at(at), Some(StoneColor::Black));
}

#[tokio::test]
async fn pass_requires_confirmation_before_it_is_sent() {
    let (client, mut app, mut rx) = new_app();
    app.start();
    settle(&mut app, &mut rx).await;

    app.open_game(GameId(101), None);
    settle(&mut app, &mut rx).await;

    app.handle_key(key(KeyCode::Char('P')));
    assert!(app.popup.is_some());
    assert_eq!(client.game_state(GameId(101)).expect("state").phase, Phase::Play);

    // Default button is the affirmative one for confirms.
    app.handle_key(key(KeyCode::Enter));
    settle(&mut app, &mut rx).await;
    assert_eq!(client.game_state(GameId(101)).expect("state").phase, Phase::StoneRemoval);
}

#[tokio::test]
async fn badge_drift_refetches_the_home_list_once() {
    let client = Arc::new(InstrumentedClient::new(Duration::ZERO));
    let (mut app, mut rx) = App::new(client.clone(), LogSink::new());
    app.start();
    settle(&mut app, &mut rx).await;

    app.open_game(GameId(101), None);
    settle(&mut app, &mut rx).await;
    assert_eq!(app.active, PageId::Game(GameId(101)));
    let baseline = client.overview_calls.load(Ordering::SeqCst);

    // The badge changes while the game page is front.
    for game in client.inner.overview().expect("overview").active_games {
        let id = game.id;
        app.ctx.turns.upsert(id, game, true);
    }

    // Give the home ticker a few rounds: the first drift triggers a refetch,
    // and the recorded count stops any further ones.
    let deadline = tokio::time::Instant::now() + Duration::from_millis(2600);
    while tokio::time::Instant::now() < deadline {
        if let Ok(Some(work)) = timeout(Duration::from_millis(100), rx.recv()).await {
            work(&mut app);
        }
    }
    assert_eq!(client.overview_calls.load(Ordering::SeqCst) - baseline, 1);
    assert!(!app.busy, "background refreshes never raise the loading modal");
}

#[tokio::test]
async fn leaving_a_game_does_not_wait_for_the_disconnect() {
    let client = Arc::new(InstrumentedClient::new(Duration::from_millis(400)));
    let (mut app, mut rx) = App::new(client.clone(), LogSink::new());
    app.start();
    settle(&mut app, &mut rx).await;

    app.open_game(GameId(101), None);
    settle(&mut app, &mut rx).await;
    assert_eq!(app.active, PageId::Game(GameId(101)));

    let started = std::time::Instant::now();
    app.handle_key(key(KeyCode::Esc));
    assert!(
        started.elapsed() < Duration::from_millis(200),
        "leave must not block the display on the disconnect"
    );
    assert_eq!(app.active, PageId::Home);

    // The disconnect still happens, on its own blocking task.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while client.disconnect_calls.load(Ordering::SeqCst) == 0
        && tokio::time::Instant::now() < deadline
    {
        if let Ok(Some(work)) = timeout(Duration::from_millis(100), rx.recv()).await {
            work(&mut app);
        }
    }
    assert_eq!(client.disconnect_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn server_events_feed_the_turn_badge() {
    let (client, mut app, mut rx) = new_app();
    app.start();
    settle(&mut app, &mut rx).await;
    assert_eq!(app.ctx.turns.count(), 0);

    // A bot reply makes game 101 actionable again; the demo emits the
    // ActiveGame event roughly 600ms after our move.
    app.open_game(GameId(101), None);
    settle(&mut app, &mut rx).await;
    app.handle_key(key(KeyCode::Enter));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while app.ctx.turns.count() == 0 && tokio::time::Instant::now() < deadline {
        if let Ok(Some(work)) = timeout(Duration::from_millis(100), rx.recv()).await {
            work(&mut app);
        }
    }
    assert_eq!(app.ctx.turns.count(), 1);
    assert_eq!(app.ctx.turns.next(GameId::default()).expect("entry").id, GameId(101));
    // The listener dumps each payload to the debug log.
    assert!(app.ctx.log.tail(50).iter().any(|line| line.text.contains("active_game")));
    let _ = client;
}
