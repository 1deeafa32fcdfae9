// SPDX-FileCopyrightText: 2026 The Tesuji Authors
// SPDX-License-Identifier: MIT

//! Home page: the signed-in user's active games.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use ratatui::Frame;
use tokio::task::AbortHandle;

use super::page::{Focusable, LeaveAction, Page, PageId, PageUpdate, RefreshTask, Request};
use super::{hints, theme, widgets, Ctx};
use crate::client::{format_clock_ms, Overview, StoneColor};

const FOCUSABLES: [Focusable; 4] = [
    Focusable::widget("games"),
    Focusable::widget("next"),
    Focusable::widget("watch"),
    Focusable::widget("logout"),
];

pub(crate) struct HomePage {
    overview: Option<Overview>,
    table: TableState,
    status: Option<String>,
    ticker: Option<AbortHandle>,
    /// Turn count as of the last refresh, compared by the ticker to spot a
    /// stale list.
    seen_turns: Arc<AtomicUsize>,
}

impl HomePage {
    pub(crate) fn new() -> Self {
        Self {
            overview: None,
            table: TableState::default(),
            status: None,
            ticker: None,
            seen_turns: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn games_len(&self) -> usize {
        self.overview.as_ref().map_or(0, |ov| ov.active_games.len())
    }

    fn move_selection(&mut self, delta: i64) {
        let len = self.games_len();
        if len == 0 {
            return;
        }
        let at = self.table.selected().map_or(0, |at| {
            (at as i64 + delta).rem_euclid(len as i64) as usize
        });
        self.table.select(Some(at));
    }

    /// Refreshes the list when the actionable-game count drifts from the count
    /// the last refresh saw, so a move made elsewhere updates the table too.
    /// The refresh records the new count, so one change costs one refetch.
    fn spawn_ticker(&mut self, ctx: &Ctx) {
        if self.ticker.is_some() {
            return;
        }
        let sched = ctx.sched.clone();
        let turns = ctx.turns.clone();
        let seen = self.seen_turns.clone();
        let task = tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(1));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tick.tick().await;
                if turns.count() != seen.load(Ordering::Relaxed) {
                    sched.schedule(|app: &mut super::App| app.refresh_page_quiet(PageId::Home));
                } else {
                    // Keep clocks moving.
                    sched.schedule(|_: &mut super::App| {});
                }
            }
        });
        self.ticker = Some(task.abort_handle());
    }
}

impl Page for HomePage {
    fn focusables(&self) -> &[Focusable] {
        &FOCUSABLES
    }

    fn refresh_task(&self, ctx: &Ctx) -> RefreshTask {
        let client = ctx.client.clone();
        Box::new(move || client.overview().map(PageUpdate::Home))
    }

    fn render(&mut self, update: PageUpdate, ctx: &Ctx) {
        if let PageUpdate::Home(overview) = update {
            self.overview = Some(overview);
            self.status = None;
            if self.table.selected().map_or(true, |at| at >= self.games_len()) {
                self.table.select(None);
            }
        }
        self.seen_turns.store(ctx.turns.count(), Ordering::Relaxed);
        self.spawn_ticker(ctx);
    }

    fn leave(&mut self, _ctx: &Ctx) -> LeaveAction {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        LeaveAction::Quit
    }

    fn handle_key(&mut self, key: KeyEvent, focus: usize, _ctx: &Ctx) -> Option<Request> {
        match FOCUSABLES.get(focus)?.name {
            "games" => match key.code {
                KeyCode::Down | KeyCode::Char('j') => {
                    self.move_selection(1);
                    Some(Request::Redraw)
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    self.move_selection(-1);
                    Some(Request::Redraw)
                }
                KeyCode::Enter => {
                    let at = self.table.selected()?;
                    let game = self.overview.as_ref()?.active_games.get(at)?;
                    self.status = Some(format!("Connecting to game {} ...", game.id));
                    Some(Request::OpenGame { id: game.id, return_to: None })
                }
                KeyCode::Char('r') => Some(Request::Refresh),
                _ => None,
            },
            "next" if key.code == KeyCode::Enter => Some(Request::NextActionable),
            "watch" if key.code == KeyCode::Enter => Some(Request::SwitchTo(PageId::Watch)),
            "logout" if key.code == KeyCode::Enter => Some(Request::QuitPrompt),
            _ => None,
        }
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, focus: usize, ctx: &Ctx) {
        let badge = ctx.turns.count();
        let [navbar, table_area, status, hint] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

        let next_label = format!("Next ({badge})");
        widgets::draw_navbar(
            frame,
            navbar,
            &[next_label.as_str(), "Watch", "Logout"],
            focus.checked_sub(1),
        );

        let games = self.overview.as_ref().map(|ov| ov.active_games.as_slice()).unwrap_or(&[]);
        let header = Row::new(["#", "Move", "Game", "Flags", "Opponent", "Clock", "Size"])
            .style(theme::secondary());
        let rows = games.iter().enumerate().map(|(i, g)| {
            let style =
                if g.is_my_turn(ctx.me) { theme::tertiary() } else { theme::base() };
            let mut flags = String::new();
            if g.handicap > 0 {
                flags.push('🤏');
            }
            if g.private {
                flags.push('🔒');
            }
            let to_move = if g.clock.current == g.black.player.id {
                StoneColor::Black
            } else {
                StoneColor::White
            };
            Row::new([
                Cell::from((i + 1).to_string()),
                Cell::from(format!("{:3}", g.move_number)),
                Cell::from(widgets::trim_to_width(&g.name, 30)),
                Cell::from(flags),
                Cell::from(g.opponent(ctx.me).to_string()),
                Cell::from(format_clock_ms(g.clock.remaining_ms(to_move))),
                Cell::from(format!("{0}x{0}", g.width)),
            ])
            .style(style)
        });
        let table = Table::new(
            rows,
            [
                Constraint::Length(3),
                Constraint::Length(4),
                Constraint::Length(30),
                Constraint::Length(5),
                Constraint::Length(20),
                Constraint::Length(8),
                Constraint::Length(6),
            ],
        )
        .header(header)
        .highlight_style(theme::selection())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Active Games ({}) ", games.len()))
                .title_alignment(Alignment::Center)
                .border_style(theme::panel_border(focus == 0)),
        )
        .style(theme::base());
        frame.render_stateful_widget(table, table_area, &mut self.table);

        let status_text = self
            .status
            .clone()
            .unwrap_or_else(|| format!("You have {} active games", games.len()));
        frame.render_widget(
            Paragraph::new(Line::from(status_text))
                .alignment(Alignment::Center)
                .style(theme::tertiary()),
            status,
        );
        frame.render_widget(
            Paragraph::new(hints::hint_line(&["↓↑jk select", "CR connect", "refresh"]))
                .alignment(Alignment::Center),
            hint,
        );
    }
}
