// SPDX-FileCopyrightText: 2026 The Tesuji Authors
// SPDX-License-Identifier: MIT

//! Game-server collaborator interface.
//!
//! Everything the UI knows about the server goes through [`GameClient`]: blocking
//! queries and commands, plus push-style event subscriptions delivered over channels.
//! The shapes mirror the OGS real-time API closely enough that a network-backed
//! implementation can slot in behind the same trait.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub mod demo;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GameId(pub i64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoneColor {
    Black,
    White,
}

impl StoneColor {
    pub fn opponent(self) -> Self {
        match self {
            Self::Black => Self::White,
            Self::White => Self::Black,
        }
    }
}

impl fmt::Display for StoneColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Black => write!(f, "Black"),
            Self::White => write!(f, "White"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Play,
    StoneRemoval,
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Play => write!(f, "play"),
            Self::StoneRemoval => write!(f, "stone removal"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// OGS-style ranking: 0..=29 are kyu grades (0 = 30k), 30+ are dan grades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: UserId,
    pub username: String,
    pub ranking: i32,
    pub professional: bool,
}

impl Player {
    pub fn rank_label(&self) -> String {
        if self.professional {
            format!("{}p", (self.ranking - 36).max(1))
        } else if self.ranking < 30 {
            format!("{}k", 30 - self.ranking)
        } else {
            format!("{}d", self.ranking - 29)
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.username, self.rank_label())
    }
}

/// One side of a game. `accepted_stones` is the removal string the player has
/// agreed to during the stone-removal phase, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub player: Player,
    pub accepted_stones: Option<String>,
}

/// Board intersection, zero-based from the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coord {
    pub x: i16,
    pub y: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    Pass,
    Play(Coord),
}

/// Entry of the "my active games" overview; also the summary carried by the
/// turn-notification queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveGame {
    pub id: GameId,
    pub name: String,
    pub width: u8,
    pub handicap: u8,
    pub private: bool,
    pub move_number: u32,
    pub phase: Phase,
    pub player_to_move: UserId,
    pub black: Seat,
    pub white: Seat,
    pub clock: Clock,
}

impl ActiveGame {
    pub fn is_my_turn(&self, me: UserId) -> bool {
        self.phase == Phase::Play && self.player_to_move == me
    }

    pub fn opponent(&self, me: UserId) -> &Player {
        if self.black.player.id == me {
            &self.white.player
        } else {
            &self.black.player
        }
    }

    /// Whether this game currently requires `me` to act. Finished games never
    /// do; stone removal does until my acceptance is in; play does on my turn.
    pub fn needs_action(&self, me: UserId) -> bool {
        match self.phase {
            Phase::Finished => false,
            Phase::StoneRemoval => {
                (self.black.player.id == me && self.black.accepted_stones.is_none())
                    || (self.white.player.id == me && self.white.accepted_stones.is_none())
            }
            Phase::Play => self.player_to_move == me,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub active_games: Vec<ActiveGame>,
}

/// Entry of the public live-game listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveGame {
    pub id: GameId,
    pub name: String,
    pub width: u8,
    pub handicap: u8,
    pub komi: f32,
    pub move_number: u32,
    pub phase: Phase,
    pub bot_game: bool,
    pub private: bool,
    pub black: Player,
    pub white: Player,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveGameList {
    pub total: u32,
    pub results: Vec<LiveGame>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    pub width: u8,
    pub rules: String,
    pub speed: String,
    pub komi: f32,
    pub handicap: u8,
    pub ranked: bool,
    pub private: bool,
    pub phase: Phase,
    pub black: Seat,
    pub white: Seat,
    pub clock: Clock,
}

impl Game {
    pub fn is_my_game(&self, me: UserId) -> bool {
        self.black.player.id == me || self.white.player.id == me
    }

    pub fn seat(&self, color: StoneColor) -> &Seat {
        match color {
            StoneColor::Black => &self.black,
            StoneColor::White => &self.white,
        }
    }

    pub fn color_of(&self, user: UserId) -> Option<StoneColor> {
        if self.black.player.id == user {
            Some(StoneColor::Black)
        } else if self.white.player.id == user {
            Some(StoneColor::White)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub game_id: GameId,
    pub move_number: u32,
    pub phase: Phase,
    pub player_to_move: UserId,
    pub board: Vec<Vec<Option<StoneColor>>>,
    pub last_move: Option<Move>,
    pub removed: Vec<Coord>,
    pub outcome: Option<String>,
}

impl GameState {
    pub fn size(&self) -> i16 {
        self.board.len() as i16
    }

    pub fn is_my_turn(&self, me: UserId) -> bool {
        self.phase == Phase::Play && self.player_to_move == me
    }

    pub fn stone_at(&self, at: Coord) -> Option<StoneColor> {
        self.board
            .get(at.y as usize)
            .and_then(|row| row.get(at.x as usize))
            .copied()
            .flatten()
    }
}

/// Main-time snapshot for both players, valid as of the moment it was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    pub current: UserId,
    pub black_ms: i64,
    pub white_ms: i64,
}

impl Clock {
    pub fn remaining_ms(&self, color: StoneColor) -> i64 {
        match color {
            StoneColor::Black => self.black_ms,
            StoneColor::White => self.white_ms,
        }
    }
}

/// Formats a millisecond budget as a short clock label ("04:31", "2h 05m", "3d 11h").
pub fn format_clock_ms(ms: i64) -> String {
    let total = ms.max(0) / 1000;
    let days = total / 86_400;
    let hours = total % 86_400 / 3600;
    let minutes = total % 3600 / 60;
    let seconds = total % 60;
    if days > 0 {
        format!("{days}d {hours:02}h")
    } else if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatLine {
    pub id: String,
    pub at_ms: i64,
    pub move_number: u32,
    pub from: Player,
    pub body: String,
}

/// Server-wide push events, delivered on a background task.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// State of one of my games changed (move made, phase advanced, clock started).
    ActiveGame(ActiveGame),
    NetPong { drift_ms: i64, latency_ms: i64 },
}

/// Per-game push events for a connected game.
#[derive(Debug, Clone)]
pub enum GameEvent {
    Data(Box<Game>),
    Phase(Phase),
    Move { move_number: u32, mv: Move },
    Clock(Clock),
    Chat(ChatLine),
    RemovalAccepted { player: UserId, phase: Phase, outcome: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    Network(String),
    Rejected(String),
    GameNotFound(GameId),
    Internal(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(detail) => write!(f, "network error: {detail}"),
            Self::Rejected(reason) => write!(f, "rejected by server: {reason}"),
            Self::GameNotFound(id) => write!(f, "game {id} not found"),
            Self::Internal(detail) => write!(f, "internal error: {detail}"),
        }
    }
}

impl std::error::Error for ClientError {}

/// Blocking client for an OGS-style server. Query and command methods may block
/// on I/O and must only be called off the UI task; subscriptions hand back the
/// receiving half of an unbounded channel fed from the client's own tasks.
pub trait GameClient: Send + Sync {
    fn user_id(&self) -> UserId;

    fn overview(&self) -> Result<Overview, ClientError>;
    fn live_games(&self, limit: usize) -> Result<LiveGameList, ClientError>;
    fn game(&self, id: GameId) -> Result<Game, ClientError>;
    fn game_state(&self, id: GameId) -> Result<GameState, ClientError>;

    /// Start streaming `GameEvent`s for `id` to game subscribers.
    fn connect_game(&self, id: GameId) -> Result<(), ClientError>;
    fn disconnect_game(&self, id: GameId) -> Result<(), ClientError>;
    fn join_chat(&self, id: GameId) -> Result<(), ClientError>;

    fn submit_move(&self, id: GameId, at: Coord) -> Result<(), ClientError>;
    fn pass(&self, id: GameId) -> Result<(), ClientError>;
    fn resign(&self, id: GameId) -> Result<(), ClientError>;
    fn accept_removal(&self, id: GameId) -> Result<(), ClientError>;
    fn send_chat(&self, id: GameId, move_number: u32, body: &str) -> Result<(), ClientError>;

    /// Fire a heartbeat; the reply arrives as [`ServerEvent::NetPong`].
    fn ping(&self, drift_ms: i64, latency_ms: i64) -> Result<(), ClientError>;

    fn subscribe(&self) -> mpsc::UnboundedReceiver<ServerEvent>;
    fn subscribe_game(&self, id: GameId) -> mpsc::UnboundedReceiver<GameEvent>;
}
