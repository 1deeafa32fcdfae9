// SPDX-FileCopyrightText: 2026 The Tesuji Authors
// SPDX-License-Identifier: MIT

//! Game page: one connected game with its board, clocks and chat.
//!
//! The page owns two background tasks, a per-second clock ticker and the
//! consumer of the game's event subscription. Both are aborted in `leave`, and
//! everything they schedule re-checks that the page is still mounted before
//! touching it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use ratatui::Frame;
use tokio::task::AbortHandle;

use super::page::{
    fetch_game_snapshot, Command, Focusable, GameSnapshot, LeaveAction, Page, PageId, PageUpdate,
    RefreshTask, Request,
};
use super::{board, hints, theme, widgets, Ctx};
use crate::chat::ChatTimeline;
use crate::client::{
    format_clock_ms, Clock, Coord, Game, GameEvent, GameState, Move, Phase, StoneColor,
};
use crate::client::GameId;

const FOCUSABLES: [Focusable; 6] = [
    Focusable::widget("board"),
    Focusable::widget("chats"),
    Focusable::text_input("chat"),
    Focusable::widget("next"),
    Focusable::widget("back"),
    Focusable::widget("logout"),
];

pub(crate) struct GamePage {
    id: GameId,
    return_to: PageId,
    game: Option<Game>,
    state: Option<GameState>,
    clock: Option<Clock>,
    clock_at: Option<Instant>,
    cursor: Option<Coord>,
    status: Option<String>,
    chats: Arc<ChatTimeline>,
    chat_table: TableState,
    input: String,
    ticker: Option<AbortHandle>,
    events: Option<AbortHandle>,
}

impl GamePage {
    pub(crate) fn new(id: GameId, return_to: PageId) -> Self {
        Self {
            id,
            return_to,
            game: None,
            state: None,
            clock: None,
            clock_at: None,
            cursor: None,
            status: None,
            chats: Arc::new(ChatTimeline::new()),
            chat_table: TableState::default(),
            input: String::new(),
            ticker: None,
            events: None,
        }
    }

    /// Where to return on leave; updated when the page is re-opened from a
    /// different place.
    pub(crate) fn set_return_to(&mut self, to: PageId) {
        self.return_to = to;
    }

    pub(crate) fn set_clock(&mut self, clock: Clock) {
        self.clock = Some(clock);
        self.clock_at = Some(Instant::now());
    }

    pub(crate) fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub(crate) fn apply_snapshot(&mut self, snapshot: GameSnapshot, ctx: &Ctx) {
        self.set_clock(snapshot.game.clock);
        self.game = Some(snapshot.game);
        let my_turn = snapshot.state.is_my_turn(ctx.me);
        self.state = Some(snapshot.state);
        if my_turn && self.cursor.is_none() {
            self.cursor = Some(self.initial_cursor());
        }
        if !my_turn {
            self.cursor = None;
        }
    }

    fn initial_cursor(&self) -> Coord {
        let state = self.state.as_ref();
        if let Some(Move::Play(at)) = state.and_then(|s| s.last_move) {
            return at;
        }
        let mid = state.map_or(4, |s| s.size() / 2);
        Coord { x: mid, y: mid }
    }

    fn move_cursor(&mut self, dx: i16, dy: i16) {
        let Some(state) = &self.state else { return };
        let size = state.size();
        let at = self.cursor.unwrap_or_else(|| self.initial_cursor());
        self.cursor = Some(Coord {
            x: (at.x + dx).clamp(0, size - 1),
            y: (at.y + dy).clamp(0, size - 1),
        });
    }

    fn scroll_chat(&mut self, delta: i64) {
        let len = self.chats.len();
        if len == 0 {
            return;
        }
        let at = self.chat_table.selected().map_or(len - 1, |at| {
            (at as i64 + delta).clamp(0, len as i64 - 1) as usize
        });
        self.chat_table.select(Some(at));
    }

    fn my_color(&self, ctx: &Ctx) -> Option<StoneColor> {
        self.game.as_ref().and_then(|g| g.color_of(ctx.me))
    }

    /// Clock as it stands now: the running side keeps counting down between
    /// server updates.
    fn remaining_ms(&self, color: StoneColor) -> Option<i64> {
        let clock = self.clock?;
        let game = self.game.as_ref()?;
        let mut ms = clock.remaining_ms(color);
        let running =
            game.phase == Phase::Play && clock.current == game.seat(color).player.id;
        if running {
            if let Some(at) = self.clock_at {
                ms -= at.elapsed().as_millis() as i64;
            }
        }
        Some(ms)
    }

    fn status_line(&self, ctx: &Ctx) -> String {
        if let Some(status) = &self.status {
            return status.clone();
        }
        let (Some(game), Some(state)) = (&self.game, &self.state) else {
            return format!("Connecting to game {} ...", self.id);
        };
        match state.phase {
            Phase::Finished => state
                .outcome
                .clone()
                .map_or_else(|| "Game finished".to_owned(), |o| format!("Game finished: {o}")),
            Phase::StoneRemoval => "Stone removal: press A to accept".to_owned(),
            Phase::Play => {
                if !game.is_my_game(ctx.me) {
                    format!("Spectating, move {}", state.move_number)
                } else if state.is_my_turn(ctx.me) {
                    "Your turn".to_owned()
                } else {
                    "Waiting for opponent".to_owned()
                }
            }
        }
    }

    /// Once a second, wake the UI loop so the running clock counts down.
    fn spawn_ticker(&mut self, ctx: &Ctx) {
        if self.ticker.is_some() {
            return;
        }
        let sched = ctx.sched.clone();
        let task = tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(1));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tick.tick().await;
                sched.schedule(|_: &mut super::App| {});
            }
        });
        self.ticker = Some(task.abort_handle());
    }

    /// Consumes the game's event stream. Chat lines land directly in the shared
    /// timeline; everything that changes the position triggers a refetch, which
    /// is applied on the UI task only if this page is still mounted.
    fn spawn_event_listener(&mut self, ctx: &Ctx) {
        if self.events.is_some() {
            return;
        }
        let id = self.id;
        let client = ctx.client.clone();
        let sched = ctx.sched.clone();
        let chats = self.chats.clone();
        let log = ctx.log.clone();
        let mut events = client.subscribe_game(id);
        let task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    GameEvent::Chat(line) => {
                        chats.insert(line);
                        sched.schedule(|_: &mut super::App| {});
                    }
                    GameEvent::Clock(clock) => {
                        sched.schedule(move |app: &mut super::App| {
                            if let Some(page) = app.game_page_mut(id) {
                                page.set_clock(clock);
                            }
                        });
                    }
                    GameEvent::RemovalAccepted { player, phase, outcome } => {
                        log.debug(format!("game {id}: removal accepted by {player}"));
                        sched.schedule(move |app: &mut super::App| {
                            if let Some(page) = app.game_page_mut(id) {
                                if phase == Phase::Finished {
                                    page.set_status(
                                        outcome
                                            .map_or_else(
                                                || "Game finished".to_owned(),
                                                |o| format!("Game finished: {o}"),
                                            ),
                                    );
                                } else {
                                    page.set_status(format!("Player {player} accepted removal"));
                                }
                            }
                            app.refresh_page_quiet(PageId::Game(id));
                        });
                    }
                    GameEvent::Data(_) | GameEvent::Phase(_) | GameEvent::Move { .. } => {
                        let client = client.clone();
                        let result = tokio::task::spawn_blocking(move || {
                            fetch_game_snapshot(client.as_ref(), id)
                        })
                        .await;
                        match result {
                            Ok(Ok(snapshot)) => {
                                sched.schedule(move |app: &mut super::App| {
                                    app.apply_game_snapshot(id, snapshot);
                                });
                            }
                            Ok(Err(err)) => log.warn(format!("game {id} refetch failed: {err}")),
                            Err(err) => log.error(format!("game {id} refetch task died: {err}")),
                        }
                    }
                }
            }
        });
        self.events = Some(task.abort_handle());
    }

    fn board_key(&mut self, key: KeyEvent, ctx: &Ctx) -> Option<Request> {
        let my_color = self.my_color(ctx);
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => {
                self.move_cursor(-1, 0);
                Some(Request::Redraw)
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.move_cursor(1, 0);
                Some(Request::Redraw)
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_cursor(0, -1);
                Some(Request::Redraw)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_cursor(0, 1);
                Some(Request::Redraw)
            }
            KeyCode::Enter => {
                let state = self.state.as_ref()?;
                let at = self.cursor?;
                if my_color.is_none() || !state.is_my_turn(ctx.me) || state.stone_at(at).is_some()
                {
                    return None;
                }
                Some(Request::Command(Command::PlayMove { game: self.id, at }))
            }
            KeyCode::Char('P') => {
                let state = self.state.as_ref()?;
                if my_color.is_none() || !state.is_my_turn(ctx.me) {
                    return None;
                }
                Some(Request::Confirm {
                    message: "Pass?".to_owned(),
                    command: Command::Pass { game: self.id },
                })
            }
            KeyCode::Char('R') => {
                if my_color.is_none()
                    || self.state.as_ref().map_or(true, |s| s.phase == Phase::Finished)
                {
                    return None;
                }
                Some(Request::Confirm {
                    message: "Resign the game?".to_owned(),
                    command: Command::Resign { game: self.id },
                })
            }
            KeyCode::Char('A') => {
                if my_color.is_none()
                    || self.state.as_ref().map_or(true, |s| s.phase != Phase::StoneRemoval)
                {
                    return None;
                }
                Some(Request::Confirm {
                    message: "Accept the marked stones as dead?".to_owned(),
                    command: Command::AcceptRemoval { game: self.id },
                })
            }
            KeyCode::Char('r') => Some(Request::Refresh),
            _ => None,
        }
    }

    fn input_key(&mut self, key: KeyEvent) -> Option<Request> {
        match key.code {
            KeyCode::Char(ch) => {
                self.input.push(ch);
                Some(Request::Redraw)
            }
            KeyCode::Backspace => {
                self.input.pop();
                Some(Request::Redraw)
            }
            KeyCode::Enter => {
                let body = self.input.trim().to_owned();
                if body.is_empty() {
                    return None;
                }
                self.input.clear();
                let move_number = self.state.as_ref().map_or(0, |s| s.move_number);
                Some(Request::Command(Command::Chat { game: self.id, move_number, body }))
            }
            _ => None,
        }
    }

    fn draw_seat_panel(
        &self,
        frame: &mut Frame<'_>,
        area: Rect,
        color: StoneColor,
        ctx: &Ctx,
    ) {
        let Some(game) = &self.game else { return };
        let seat = game.seat(color);
        let running = game.phase == Phase::Play
            && self.clock.map_or(false, |c| c.current == seat.player.id);
        let clock_label =
            self.remaining_ms(color).map_or_else(String::new, format_clock_ms);
        let stone = if color == StoneColor::Black { '⚫' } else { '⚪' };
        let you = if seat.player.id == ctx.me { " (you)" } else { "" };
        let style = if running { theme::tertiary() } else { theme::base() };
        let text = vec![
            Line::from(format!("{stone} {}{you}", seat.player)),
            Line::from(clock_label),
        ];
        frame.render_widget(
            Paragraph::new(text).style(style).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(theme::panel_border(false)),
            ),
            area,
        );
    }
}

impl Page for GamePage {
    fn focusables(&self) -> &[Focusable] {
        &FOCUSABLES
    }

    fn refresh_task(&self, ctx: &Ctx) -> RefreshTask {
        let client = ctx.client.clone();
        let id = self.id;
        Box::new(move || {
            let snapshot = fetch_game_snapshot(client.as_ref(), id)?;
            client.connect_game(id)?;
            client.join_chat(id)?;
            Ok(PageUpdate::Game(Box::new(snapshot)))
        })
    }

    fn render(&mut self, update: PageUpdate, ctx: &Ctx) {
        if let PageUpdate::Game(snapshot) = update {
            self.status = None;
            self.apply_snapshot(*snapshot, ctx);
        }
        self.spawn_ticker(ctx);
        self.spawn_event_listener(ctx);
    }

    fn leave(&mut self, ctx: &Ctx) -> LeaveAction {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if let Some(events) = self.events.take() {
            events.abort();
        }
        // The disconnect may block on I/O, so it runs off the UI task.
        let client = ctx.client.clone();
        let log = ctx.log.clone();
        let id = self.id;
        tokio::task::spawn_blocking(move || {
            if let Err(err) = client.disconnect_game(id) {
                log.warn(format!("disconnect game {id}: {err}"));
            }
        });
        LeaveAction::Return { to: self.return_to, unmount: true }
    }

    fn handle_key(&mut self, key: KeyEvent, focus: usize, ctx: &Ctx) -> Option<Request> {
        match FOCUSABLES.get(focus)?.name {
            "board" => self.board_key(key, ctx),
            "chats" => match key.code {
                KeyCode::Down | KeyCode::Char('j') => {
                    self.scroll_chat(1);
                    Some(Request::Redraw)
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    self.scroll_chat(-1);
                    Some(Request::Redraw)
                }
                _ => None,
            },
            "chat" => self.input_key(key),
            "next" if key.code == KeyCode::Enter => Some(Request::NextActionable),
            "back" if key.code == KeyCode::Enter => Some(Request::Leave),
            "logout" if key.code == KeyCode::Enter => Some(Request::QuitPrompt),
            _ => None,
        }
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, focus: usize, ctx: &Ctx) {
        let [navbar, main, status, hint] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(10),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

        let next_label = format!("Next ({})", ctx.turns.count());
        widgets::draw_navbar(
            frame,
            navbar,
            &[next_label.as_str(), "Back", "Logout"],
            focus.checked_sub(3),
        );

        let board_width = self.state.as_ref().map_or(9, |s| s.size()) as u16 * 2 + 2;
        let [board_area, side] =
            Layout::horizontal([Constraint::Length(board_width), Constraint::Min(20)])
                .areas(main);

        let title = self.game.as_ref().map_or_else(
            || format!(" Game {} ", self.id),
            |g| format!(" {} ", widgets::trim_to_width(&g.name, board_width as usize - 4)),
        );
        let board_block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .title_alignment(Alignment::Center)
            .border_style(theme::panel_border(focus == 0));
        let board_inner = board_block.inner(board_area);
        frame.render_widget(board_block, board_area);
        if let Some(state) = &self.state {
            let cursor = if focus == 0 { self.cursor } else { None };
            frame.render_widget(Paragraph::new(board::board_text(state, cursor)), board_inner);
        }

        let [black_area, white_area, chat_area, input_area] = Layout::vertical([
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .areas(side);
        self.draw_seat_panel(frame, black_area, StoneColor::Black, ctx);
        self.draw_seat_panel(frame, white_area, StoneColor::White, ctx);

        let lines = self.chats.snapshot();
        let rows = lines.iter().map(|line| {
            Row::new([
                Cell::from(format!("{:3}", line.move_number)),
                Cell::from(line.from.username.clone()),
                Cell::from(line.body.clone()),
            ])
            .style(theme::base())
        });
        let chat = Table::new(
            rows,
            [Constraint::Length(4), Constraint::Length(12), Constraint::Min(10)],
        )
        .highlight_style(theme::selection())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Chat ")
                .border_style(theme::panel_border(focus == 1)),
        )
        .style(theme::base());
        if self.chat_table.selected().is_none() && !lines.is_empty() {
            // Follow the newest line until the user scrolls.
            self.chat_table.select(Some(lines.len() - 1));
        }
        frame.render_stateful_widget(chat, chat_area, &mut self.chat_table);

        frame.render_widget(
            Paragraph::new(self.input.as_str()).style(theme::base()).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Say ")
                    .border_style(theme::panel_border(focus == 2)),
            ),
            input_area,
        );

        let status_style =
            if self.status.is_some() { theme::warning() } else { theme::tertiary() };
        frame.render_widget(
            Paragraph::new(Line::from(self.status_line(ctx)))
                .alignment(Alignment::Center)
                .style(status_style),
            status,
        );
        frame.render_widget(
            Paragraph::new(hints::hint_line(&[
                "←↓↑→hjkl cursor",
                "CR play",
                "Pass",
                "Resign",
                "Accept",
            ]))
            .alignment(Alignment::Center),
            hint,
        );
    }

    fn as_game_mut(&mut self) -> Option<&mut GamePage> {
        Some(self)
    }
}
