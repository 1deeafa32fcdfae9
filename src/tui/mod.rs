// SPDX-FileCopyrightText: 2026 The Tesuji Authors
// SPDX-License-Identifier: MIT

//! Terminal interface.
//!
//! [`run`] owns the terminal and a current-thread runtime. One loop drains two
//! streams: scheduled display work (see [`crate::sched`]) and key events read on
//! a dedicated thread. All display state lives in [`App`], which only the loop
//! touches; background tasks get to it exclusively by scheduling work units.

use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Rect};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::{Frame, Terminal};
use tokio::sync::mpsc;

use crate::client::{ClientError, GameClient, GameId, ServerEvent, UserId};
use crate::load::{self, BusyScreen};
use crate::notify::TurnQueue;
use crate::sched::{self, Scheduler, Work};

mod board;
mod game;
mod hints;
mod home;
pub mod logger;
mod page;
mod theme;
mod watch;
mod widgets;

#[cfg(test)]
mod tests;

use game::GamePage;
use logger::LogSink;
use page::{Command, GameSnapshot, LeaveAction, Page, PageId, PageUpdate, Request};

const MIN_WIDTH: u16 = 70;
const MIN_HEIGHT: u16 = 24;

const HEARTBEAT: Duration = Duration::from_secs(10);

/// Shared handles every page and background task works with.
#[derive(Clone)]
pub(crate) struct Ctx {
    pub(crate) client: Arc<dyn GameClient>,
    pub(crate) sched: Scheduler<App>,
    pub(crate) turns: Arc<TurnQueue>,
    pub(crate) log: LogSink,
    pub(crate) link: Arc<LinkHealth>,
    pub(crate) me: UserId,
}

/// Connection quality as seen by the heartbeat, shown in the corner indicator.
pub(crate) struct LinkHealth {
    drift_ms: AtomicI64,
    latency_ms: AtomicI64,
    healthy: AtomicBool,
}

impl Default for LinkHealth {
    fn default() -> Self {
        // Latency below zero means no pong yet.
        Self {
            drift_ms: AtomicI64::new(0),
            latency_ms: AtomicI64::new(-1),
            healthy: AtomicBool::new(true),
        }
    }
}

impl LinkHealth {
    pub(crate) fn record(&self, drift_ms: i64, latency_ms: i64) {
        self.drift_ms.store(drift_ms, Ordering::Relaxed);
        self.latency_ms.store(latency_ms, Ordering::Relaxed);
        self.healthy.store(true, Ordering::Relaxed);
    }

    pub(crate) fn mark_down(&self) {
        self.healthy.store(false, Ordering::Relaxed);
    }

    pub(crate) fn last(&self) -> (i64, i64) {
        (self.drift_ms.load(Ordering::Relaxed), self.latency_ms.load(Ordering::Relaxed))
    }

    pub(crate) fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub(crate) fn label(&self) -> String {
        if !self.is_healthy() {
            return "offline".to_owned();
        }
        match self.latency_ms.load(Ordering::Relaxed) {
            ms if ms < 0 => "--".to_owned(),
            ms => format!("{ms}ms"),
        }
    }
}

enum PopupAction {
    Command(Command),
    Quit,
}

/// Modal dialog; swallows all keys while open.
struct Popup {
    message: String,
    buttons: Vec<&'static str>,
    actions: Vec<Option<PopupAction>>,
    selected: usize,
}

impl Popup {
    fn notice(message: impl Into<String>) -> Self {
        Self { message: message.into(), buttons: vec!["OK"], actions: vec![None], selected: 0 }
    }

    fn confirm(message: impl Into<String>, command: Command) -> Self {
        Self {
            message: message.into(),
            buttons: vec!["OK", "Cancel"],
            actions: vec![Some(PopupAction::Command(command)), None],
            selected: 0,
        }
    }

    fn quit_prompt() -> Self {
        Self {
            message: "Log out and quit?".to_owned(),
            buttons: vec!["Quit", "Cancel"],
            actions: vec![Some(PopupAction::Quit), None],
            selected: 1,
        }
    }
}

/// What a finished page refresh does with the activation state.
#[derive(Clone, Copy)]
enum Activation {
    /// Render in place; failures are logged only. Used by ticker refreshes.
    Keep,
    /// Activate the page once its data has rendered; failures surface a notice
    /// and leave the previous page active.
    OnSuccess { discard_on_fail: bool },
}

/// The whole display state. Owned by the UI loop; everything else reaches it
/// through scheduled work units.
pub(crate) struct App {
    ctx: Ctx,
    pages: BTreeMap<PageId, Box<dyn Page>>,
    active: PageId,
    focus: usize,
    /// Cursor for the `N` rotation; survives leaving the game it points at.
    current_game: Option<GameId>,
    busy: bool,
    popup: Option<Popup>,
    show_log: bool,
    should_quit: bool,
}

impl BusyScreen for App {
    fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }
}

impl App {
    pub(crate) fn new(
        client: Arc<dyn GameClient>,
        log: LogSink,
    ) -> (Self, mpsc::UnboundedReceiver<Work<App>>) {
        let (sched, work_rx) = sched::channel();
        let me = client.user_id();
        let ctx = Ctx {
            client,
            sched,
            turns: Arc::new(TurnQueue::new()),
            log,
            link: Arc::new(LinkHealth::default()),
            me,
        };
        let mut pages: BTreeMap<PageId, Box<dyn Page>> = BTreeMap::new();
        pages.insert(PageId::Home, Box::new(home::HomePage::new()));
        pages.insert(PageId::Watch, Box::new(watch::WatchPage::new()));
        let app = Self {
            ctx,
            pages,
            active: PageId::Home,
            focus: 0,
            current_game: None,
            busy: false,
            popup: None,
            show_log: false,
            should_quit: false,
        };
        (app, work_rx)
    }

    pub(crate) fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Kicks off the initial load and the session-wide background tasks.
    pub(crate) fn start(&mut self) {
        self.switch_to(PageId::Home);
        self.spawn_server_listener();
        self.spawn_heartbeat();
    }

    /// Feeds server-wide events into the turn queue and the link indicator.
    fn spawn_server_listener(&self) {
        let mut events = self.ctx.client.subscribe();
        let sched = self.ctx.sched.clone();
        let turns = self.ctx.turns.clone();
        let link = self.ctx.link.clone();
        let log = self.ctx.log.clone();
        let me = self.ctx.me;
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    ServerEvent::ActiveGame(game) => {
                        let actionable = game.needs_action(me);
                        log.debug_object("active_game", &game);
                        turns.upsert(game.id, game, actionable);
                        sched.schedule(|_: &mut App| {});
                    }
                    ServerEvent::NetPong { drift_ms, latency_ms } => {
                        link.record(drift_ms, latency_ms);
                        sched.schedule(|_: &mut App| {});
                    }
                }
            }
        });
    }

    fn spawn_heartbeat(&self) {
        let client = self.ctx.client.clone();
        let link = self.ctx.link.clone();
        let log = self.ctx.log.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(HEARTBEAT);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tick.tick().await;
                let client = client.clone();
                let last = link.last();
                let sent = tokio::task::spawn_blocking(move || client.ping(last.0, last.1)).await;
                match sent {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        link.mark_down();
                        log.warn(format!("ping failed: {err}"));
                    }
                    Err(err) => log.error(format!("ping task died: {err}")),
                }
            }
        });
    }

    /// Starts the target's refresh; the current page stays active and focused
    /// until the data has landed. Asking for a page that was never mounted is a
    /// navigation defect, not an environmental condition.
    fn switch_to(&mut self, to: PageId) {
        assert!(self.pages.contains_key(&to), "switch to unmounted page {to}");
        self.refresh_page(to, Activation::OnSuccess { discard_on_fail: false });
    }

    /// Quiet refreshes come from tickers; their failures are logged, not shown.
    pub(crate) fn refresh_page_quiet(&mut self, id: PageId) {
        self.refresh_page(id, Activation::Keep);
    }

    fn refresh_page(&mut self, id: PageId, activation: Activation) {
        let Some(page) = self.pages.get(&id) else {
            self.ctx.log.debug(format!("refresh for unmounted page {id}"));
            return;
        };
        let task = page.refresh_task(&self.ctx);
        let done = move |app: &mut App, result: Result<PageUpdate, ClientError>| match result {
            Ok(update) => {
                let ctx = app.ctx.clone();
                let Some(page) = app.pages.get_mut(&id) else { return };
                page.render(update, &ctx);
                if let Activation::OnSuccess { .. } = activation {
                    if app.active != id {
                        app.active = id;
                        app.focus = 0;
                    }
                    if let PageId::Game(game) = id {
                        app.current_game = Some(game);
                    }
                }
            }
            Err(err) => {
                app.ctx.log.error(format!("loading {id} failed: {err}"));
                if let Activation::OnSuccess { discard_on_fail } = activation {
                    app.popup = Some(Popup::notice(err.to_string()));
                    if discard_on_fail && app.active != id {
                        app.discard_unactivated(id);
                    }
                }
            }
        };
        // Ticker refreshes stay invisible: no debounce modal over the active page.
        match activation {
            Activation::Keep => load::run_quiet(&self.ctx.sched, task, done),
            Activation::OnSuccess { .. } => load::run(&self.ctx.sched, task, done),
        }
    }

    /// Drops a page that was mounted for a navigation that never completed.
    fn discard_unactivated(&mut self, id: PageId) {
        let ctx = self.ctx.clone();
        if let Some(mut page) = self.pages.remove(&id) {
            let _ = page.leave(&ctx);
        }
    }

    /// Mounts (or re-targets) the page for `id` and switches to it.
    fn open_game(&mut self, id: GameId, return_to: Option<PageId>) {
        let back = return_to.unwrap_or(match self.active {
            PageId::Game(_) => PageId::Home,
            other => other,
        });
        let created = if let Some(page) = self.game_page_mut(id) {
            page.set_return_to(back);
            false
        } else {
            self.pages.insert(PageId::Game(id), Box::new(GamePage::new(id, back)));
            true
        };
        self.refresh_page(
            PageId::Game(id),
            Activation::OnSuccess { discard_on_fail: created },
        );
    }

    /// `N`: rotate to the next game awaiting action, ascending by id.
    fn next_actionable(&mut self) {
        let current = self.current_game.unwrap_or_default();
        let Some(next) = self.ctx.turns.next(current) else {
            self.popup = Some(Popup::notice("No games need your attention"));
            return;
        };
        if self.active == PageId::Game(next.id) {
            self.refresh_page(self.active, Activation::OnSuccess { discard_on_fail: false });
            return;
        }
        let back = match self.active {
            PageId::Game(current) => {
                // Step off the page being closed before its replacement loads.
                let back = self.close_game_page(current);
                self.active = back;
                self.focus = 0;
                back
            }
            other => other,
        };
        self.open_game(next.id, Some(back));
    }

    /// Tears down a mounted game page, returning where it wanted to go back to.
    fn close_game_page(&mut self, id: GameId) -> PageId {
        let ctx = self.ctx.clone();
        match self.pages.get_mut(&PageId::Game(id)) {
            Some(page) => match page.leave(&ctx) {
                LeaveAction::Return { to, unmount } => {
                    if unmount {
                        self.pages.remove(&PageId::Game(id));
                    }
                    to
                }
                LeaveAction::Quit => PageId::Home,
            },
            None => PageId::Home,
        }
    }

    /// Esc at the top focus level: back out of a game, quit prompt elsewhere.
    /// The return target is a resident singleton, so it becomes active at once
    /// and its data is refreshed in place.
    fn leave_active(&mut self) {
        match self.active {
            PageId::Game(id) => {
                let back = self.close_game_page(id);
                assert!(self.pages.contains_key(&back), "return page {back} not mounted");
                self.active = back;
                self.focus = 0;
                self.refresh_page(back, Activation::OnSuccess { discard_on_fail: false });
            }
            _ => self.popup = Some(Popup::quit_prompt()),
        }
    }

    fn dispatch_command(&mut self, cmd: Command) {
        let client = self.ctx.client.clone();
        let sched = self.ctx.sched.clone();
        let log = self.ctx.log.clone();
        let game = cmd.game();
        let label = match &cmd {
            Command::PlayMove { .. } => "move",
            Command::Pass { .. } => "pass",
            Command::Resign { .. } => "resign",
            Command::AcceptRemoval { .. } => "accept removal",
            Command::Chat { .. } => "chat",
        };
        tokio::spawn(async move {
            let sent = tokio::task::spawn_blocking(move || match cmd {
                Command::PlayMove { game, at } => client.submit_move(game, at),
                Command::Pass { game } => client.pass(game),
                Command::Resign { game } => client.resign(game),
                Command::AcceptRemoval { game } => client.accept_removal(game),
                Command::Chat { game, move_number, body } => {
                    client.send_chat(game, move_number, &body)
                }
            })
            .await;
            match sent {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    log.warn(format!("{label} for game {game} failed: {err}"));
                    sched.schedule(move |app: &mut App| {
                        match app.game_page_mut(game) {
                            Some(page) => page.set_status(format!("{label} failed: {err}")),
                            None => app.popup = Some(Popup::notice(err.to_string())),
                        }
                        app.refresh_page_quiet(PageId::Game(game));
                    });
                }
                Err(err) => log.error(format!("{label} task died: {err}")),
            }
        });
    }

    pub(crate) fn game_page_mut(&mut self, id: GameId) -> Option<&mut GamePage> {
        self.pages.get_mut(&PageId::Game(id)).and_then(|page| page.as_game_mut())
    }

    /// Applies a refetched snapshot if the page is still mounted; late results
    /// for closed games are dropped here.
    pub(crate) fn apply_game_snapshot(&mut self, id: GameId, snapshot: GameSnapshot) {
        let ctx = self.ctx.clone();
        if let Some(page) = self.game_page_mut(id) {
            page.apply_snapshot(snapshot, &ctx);
        }
    }

    fn apply_request(&mut self, request: Request) {
        match request {
            Request::Redraw => {}
            Request::SwitchTo(to) => self.switch_to(to),
            Request::OpenGame { id, return_to } => self.open_game(id, return_to),
            Request::NextActionable => self.next_actionable(),
            Request::Leave => self.leave_active(),
            Request::Refresh => {
                self.refresh_page(self.active, Activation::OnSuccess { discard_on_fail: false })
            }
            Request::Command(cmd) => self.dispatch_command(cmd),
            Request::Confirm { message, command } => {
                self.popup = Some(Popup::confirm(message, command));
            }
            Request::QuitPrompt => self.popup = Some(Popup::quit_prompt()),
        }
    }

    fn cycle_focus(&mut self, delta: i64) {
        let len = self.pages.get(&self.active).map_or(0, |page| page.focusables().len());
        if len == 0 {
            return;
        }
        self.focus = (self.focus as i64 + delta).rem_euclid(len as i64) as usize;
    }

    fn popup_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.popup = None,
            KeyCode::Enter => {
                if let Some(popup) = self.popup.take() {
                    let action = popup.actions.into_iter().nth(popup.selected).flatten();
                    match action {
                        Some(PopupAction::Command(cmd)) => self.dispatch_command(cmd),
                        Some(PopupAction::Quit) => self.should_quit = true,
                        None => {}
                    }
                }
            }
            KeyCode::Left | KeyCode::BackTab | KeyCode::Char('h') => {
                if let Some(popup) = &mut self.popup {
                    popup.selected =
                        popup.selected.checked_sub(1).unwrap_or(popup.buttons.len() - 1);
                }
            }
            KeyCode::Right | KeyCode::Tab | KeyCode::Char('l') => {
                if let Some(popup) = &mut self.popup {
                    popup.selected = (popup.selected + 1) % popup.buttons.len();
                }
            }
            _ => {}
        }
    }

    pub(crate) fn handle_event(&mut self, event: Event) {
        if let Event::Key(key) = event {
            self.handle_key(key);
        }
    }

    /// Global dispatch order: popup, log overlay, Esc (drops text-entry focus,
    /// leaves otherwise), focus cycling, then the cross-page shortcuts (skipped
    /// while a text input has focus), then the page.
    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        if self.popup.is_some() {
            self.popup_key(key);
            return;
        }
        if self.show_log {
            if matches!(key.code, KeyCode::Char('D') | KeyCode::Esc) {
                self.show_log = false;
            }
            return;
        }
        let in_text_entry = self
            .pages
            .get(&self.active)
            .and_then(|page| page.focusables().get(self.focus))
            .map_or(false, |f| f.text_entry);
        match key.code {
            KeyCode::Esc => {
                if in_text_entry {
                    self.focus = 0;
                } else {
                    self.leave_active();
                }
                return;
            }
            KeyCode::Tab => {
                self.cycle_focus(1);
                return;
            }
            KeyCode::BackTab => {
                self.cycle_focus(-1);
                return;
            }
            _ => {}
        }
        if !in_text_entry {
            match key.code {
                KeyCode::Char('D') => {
                    self.show_log = true;
                    return;
                }
                KeyCode::Char('H') => {
                    if self.active != PageId::Home {
                        self.switch_to(PageId::Home);
                    }
                    return;
                }
                KeyCode::Char('W') => {
                    if self.active != PageId::Watch {
                        self.switch_to(PageId::Watch);
                    }
                    return;
                }
                KeyCode::Char('N') => {
                    self.next_actionable();
                    return;
                }
                KeyCode::Char('q') => {
                    self.popup = Some(Popup::quit_prompt());
                    return;
                }
                _ => {}
            }
        }
        let focus = self.focus;
        let ctx = self.ctx.clone();
        let request =
            self.pages.get_mut(&self.active).and_then(|page| page.handle_key(key, focus, &ctx));
        if let Some(request) = request {
            self.apply_request(request);
        }
    }

    pub(crate) fn draw(&mut self, frame: &mut Frame<'_>) {
        let area = frame.size();
        if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
            frame.render_widget(
                Paragraph::new(format!(
                    "Terminal too small: need {MIN_WIDTH}x{MIN_HEIGHT}, have {}x{}",
                    area.width, area.height
                ))
                .alignment(Alignment::Center)
                .style(theme::error()),
                area,
            );
            return;
        }
        frame.render_widget(Block::default().style(theme::base()), area);

        let ctx = self.ctx.clone();
        let focus = self.focus;
        if let Some(page) = self.pages.get_mut(&self.active) {
            page.draw(frame, area, focus, &ctx);
        }

        let label = format!(" {} ", self.ctx.link.label());
        let style =
            if self.ctx.link.is_healthy() { theme::success() } else { theme::error() };
        let width = (label.chars().count() as u16).min(area.width);
        frame.render_widget(
            Paragraph::new(Line::styled(label, style)),
            Rect { x: area.x, y: area.y, width, height: 1 },
        );

        if self.busy {
            widgets::draw_modal(frame, area, "Loading ...", &[], 0);
        }
        if let Some(popup) = &self.popup {
            widgets::draw_modal(frame, area, &popup.message, &popup.buttons, popup.selected);
        }
        if self.show_log {
            self.draw_log(frame, area);
        }
    }

    fn draw_log(&self, frame: &mut Frame<'_>, area: Rect) {
        let rect = widgets::centered_rect(
            area,
            area.width.saturating_sub(8),
            area.height.saturating_sub(4),
        );
        frame.render_widget(Clear, rect);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Debug Log ")
            .title_alignment(Alignment::Center)
            .style(theme::contrast_panel());
        let inner = block.inner(rect);
        frame.render_widget(block, rect);
        let lines: Vec<Line<'_>> =
            self.ctx.log.tail(inner.height as usize).iter().map(|line| line.to_line()).collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

/// Raw-mode alternate-screen session; `Drop` restores the terminal even on an
/// error path out of the run loop.
struct TerminalSession {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalSession {
    fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        crossterm::execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = crossterm::execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Runs the interface until the user quits.
pub fn run(client: Arc<dyn GameClient>, log: LogSink) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(async move {
        let (mut app, mut work_rx) = App::new(client, log);

        // Input runs on its own thread; crossterm reads block.
        let (input_tx, mut input_rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            while let Ok(event) = event::read() {
                if input_tx.send(event).is_err() {
                    break;
                }
            }
        });

        let mut session = TerminalSession::new()?;
        app.start();

        while !app.should_quit() {
            session.terminal.draw(|frame| app.draw(frame))?;
            tokio::select! {
                work = work_rx.recv() => {
                    let Some(work) = work else { break };
                    work(&mut app);
                    // Coalesce whatever else is queued into this one redraw.
                    while let Ok(more) = work_rx.try_recv() {
                        more(&mut app);
                    }
                }
                input = input_rx.recv() => {
                    let Some(input) = input else { break };
                    app.handle_event(input);
                    while let Ok(more) = input_rx.try_recv() {
                        app.handle_event(more);
                    }
                }
            }
        }
        Ok(())
    })
}
