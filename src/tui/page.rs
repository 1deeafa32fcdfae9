// SPDX-FileCopyrightText: 2026 The Tesuji Authors
// SPDX-License-Identifier: MIT

//! Page lifecycle protocol.
//!
//! A page is a navigable unit of the interface. The navigator drives each page
//! through `refresh` (a background fetch built by [`Page::refresh_task`], which must
//! not touch the display), [`Page::render`] (applies the fetched data, UI task only)
//! and [`Page::leave`] (tears down tickers/subscriptions and says where to go next).
//! Key handling returns a [`Request`] instead of mutating the navigator directly,
//! which keeps pages free of navigation state.

use std::fmt;

use crossterm::event::KeyEvent;
use ratatui::layout::Rect;
use ratatui::Frame;

use super::Ctx;
use crate::client::{ClientError, Coord, Game, GameId, GameState, LiveGameList, Overview};

/// Identity of a mounted page. Game pages are transient, the rest are singletons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum PageId {
    Home,
    Watch,
    Game(GameId),
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => write!(f, "home"),
            Self::Watch => write!(f, "watch"),
            Self::Game(id) => write!(f, "game {id}"),
        }
    }
}

/// A focusable element of a page; the first one is the default focus target.
/// Text-entry elements swallow the cross-page shortcuts while focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Focusable {
    pub name: &'static str,
    pub text_entry: bool,
}

impl Focusable {
    pub(crate) const fn widget(name: &'static str) -> Self {
        Self { name, text_entry: false }
    }

    pub(crate) const fn text_input(name: &'static str) -> Self {
        Self { name, text_entry: true }
    }
}

/// Where to go when a page is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LeaveAction {
    /// Switch back to `to`; `unmount` drops the page from the registry first.
    Return { to: PageId, unmount: bool },
    /// Leaving a singleton page quits the application.
    Quit,
}

/// Data produced by a page's refresh, applied later by `render`.
#[derive(Debug)]
pub(crate) enum PageUpdate {
    Home(Overview),
    Watch(LiveGameList),
    Game(Box<GameSnapshot>),
}

/// Full fetched view of one game.
#[derive(Debug, Clone)]
pub(crate) struct GameSnapshot {
    pub game: Game,
    pub state: GameState,
}

/// The off-thread part of a refresh. Runs on a blocking task.
pub(crate) type RefreshTask = Box<dyn FnOnce() -> Result<PageUpdate, ClientError> + Send>;

/// Fire-and-forget server command issued from the UI.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    PlayMove { game: GameId, at: Coord },
    Pass { game: GameId },
    Resign { game: GameId },
    AcceptRemoval { game: GameId },
    Chat { game: GameId, move_number: u32, body: String },
}

impl Command {
    pub(crate) fn game(&self) -> GameId {
        match self {
            Self::PlayMove { game, .. }
            | Self::Pass { game }
            | Self::Resign { game }
            | Self::AcceptRemoval { game }
            | Self::Chat { game, .. } => *game,
        }
    }
}

/// What a page asks the navigator to do in response to a key.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Request {
    /// Handled; nothing beyond the redraw that follows anyway.
    Redraw,
    SwitchTo(PageId),
    OpenGame { id: GameId, return_to: Option<PageId> },
    NextActionable,
    Leave,
    /// Re-run the active page's refresh/render cycle.
    Refresh,
    Command(Command),
    Confirm { message: String, command: Command },
    QuitPrompt,
}

pub(crate) trait Page {
    fn focusables(&self) -> &[Focusable];

    /// Builds the blocking fetch for this page. The closure runs off the UI task
    /// and must not touch display state.
    fn refresh_task(&self, ctx: &Ctx) -> RefreshTask;

    /// Applies fetched data to display state. UI task only.
    fn render(&mut self, update: PageUpdate, ctx: &Ctx);

    /// Stops background work owned by the page and reports where to go next.
    /// Teardown is best effort: disconnect failures are logged, never surfaced.
    fn leave(&mut self, ctx: &Ctx) -> LeaveAction;

    /// Page-specific key handling for the focused element. `None` when ignored.
    fn handle_key(&mut self, key: KeyEvent, focus: usize, ctx: &Ctx) -> Option<Request>;

    fn draw(&mut self, frame: &mut Frame<'_>, area: Rect, focus: usize, ctx: &Ctx);

    /// Narrowing hook so scheduled work can reach a mounted game page.
    fn as_game_mut(&mut self) -> Option<&mut super::game::GamePage> {
        None
    }
}

/// Shared fetch used both by the game page refresh and by its event listener.
pub(crate) fn fetch_game_snapshot(
    client: &dyn crate::client::GameClient,
    id: GameId,
) -> Result<GameSnapshot, ClientError> {
    let game = client.game(id)?;
    let state = client.game_state(id)?;
    Ok(GameSnapshot { game, state })
}
