// SPDX-FileCopyrightText: 2026 The Tesuji Authors
// SPDX-License-Identifier: MIT

//! Watch page: public live games open for spectating.

use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use ratatui::Frame;
use tokio::task::AbortHandle;

use super::page::{Focusable, LeaveAction, Page, PageId, PageUpdate, RefreshTask, Request};
use super::{hints, theme, widgets, Ctx};
use crate::client::LiveGameList;

const LIST_LIMIT: usize = 50;

const FOCUSABLES: [Focusable; 4] = [
    Focusable::widget("games"),
    Focusable::widget("next"),
    Focusable::widget("home"),
    Focusable::widget("logout"),
];

pub(crate) struct WatchPage {
    list: Option<LiveGameList>,
    table: TableState,
    status: Option<String>,
    ticker: Option<AbortHandle>,
}

impl WatchPage {
    pub(crate) fn new() -> Self {
        Self { list: None, table: TableState::default(), status: None, ticker: None }
    }

    fn results_len(&self) -> usize {
        self.list.as_ref().map_or(0, |list| list.results.len())
    }

    fn move_selection(&mut self, delta: i64) {
        let len = self.results_len();
        if len == 0 {
            return;
        }
        let at = self.table.selected().map_or(0, |at| {
            (at as i64 + delta).rem_euclid(len as i64) as usize
        });
        self.table.select(Some(at));
    }

    /// Once a second, wake the UI loop so the turn badge stays current.
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
}

impl Page for WatchPage {
    fn focusables(&self) -> &[Focusable] {
        &FOCUSABLES
    }

    fn refresh_task(&self, ctx: &Ctx) -> RefreshTask {
        let client = ctx.client.clone();
        Box::new(move || client.live_games(LIST_LIMIT).map(PageUpdate::Watch))
    }

    fn render(&mut self, update: PageUpdate, ctx: &Ctx) {
        if let PageUpdate::Watch(list) = update {
            self.list = Some(list);
            self.status = None;
            if self.table.selected().map_or(true, |at| at >= self.results_len()) {
                self.table.select(None);
            }
        }
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
                    let game = self.list.as_ref()?.results.get(at)?;
                    self.status = Some(format!("Connecting to game {} ...", game.id));
                    Some(Request::OpenGame { id: game.id, return_to: Some(PageId::Watch) })
                }
                KeyCode::Char('r') => Some(Request::Refresh),
                _ => None,
            },
            "next" if key.code == KeyCode::Enter => Some(Request::NextActionable),
            "home" if key.code == KeyCode::Enter => Some(Request::SwitchTo(PageId::Home)),
            "logout" if key.code == KeyCode::Enter => Some(Request::QuitPrompt),
            _ => None,
        }
    }

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, focus: usize, ctx: &Ctx) {
        let [navbar, table_area, status, hint] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

        let next_label = format!("Next ({})", ctx.turns.count());
        widgets::draw_navbar(
            frame,
            navbar,
            &[next_label.as_str(), "Home", "Logout"],
            focus.checked_sub(1),
        );

        let results = self.list.as_ref().map(|list| list.results.as_slice()).unwrap_or(&[]);
        let header = Row::new(["#", "Move", "Black", "White", "Flags", "Size"])
            .style(theme::secondary());
        let rows = results.iter().enumerate().map(|(i, g)| {
            let mut flags = String::new();
            if g.bot_game {
                flags.push('🤖');
            }
            if g.handicap > 0 {
                flags.push('🤏');
            }
            if g.private {
                flags.push('🔒');
            }
            Row::new([
                Cell::from((i + 1).to_string()),
                Cell::from(format!("{:3}", g.move_number)),
                Cell::from(g.black.to_string()),
                Cell::from(g.white.to_string()),
                Cell::from(flags),
                Cell::from(format!("{0}x{0}", g.width)),
            ])
            .style(theme::base())
        });
        let total = self.list.as_ref().map_or(0, |list| list.total);
        let table = Table::new(
            rows,
            [
                Constraint::Length(3),
                Constraint::Length(4),
                Constraint::Length(24),
                Constraint::Length(24),
                Constraint::Length(6),
                Constraint::Length(6),
            ],
        )
        .header(header)
        .highlight_style(theme::selection())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Live Games ({} of {total}) ", results.len()))
                .title_alignment(Alignment::Center)
                .border_style(theme::panel_border(focus == 0)),
        )
        .style(theme::base());
        frame.render_stateful_widget(table, table_area, &mut self.table);

        let status_text =
            self.status.clone().unwrap_or_else(|| "Spectating is read only".to_owned());
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
